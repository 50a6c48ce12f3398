use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

const SECRET_KEY_BYTES: usize = 64;

pub(super) fn default_secret_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".secret_key")
}

/// Reads the signing key persisted at `path`, creating it on first start so
/// tokens survive restarts in development.
pub(super) fn load_or_create_secret_key(path: &Path) -> String {
    if let Some(existing) = read_secret(path) {
        return existing;
    }

    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            tracing::warn!(error = %err, path = %parent.display(), "Cannot create secret key directory");
        }
    }

    let generated = generate_secret_key();
    match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            restrict_permissions(&file, path);
            if let Err(err) = file.write_all(generated.as_bytes()) {
                tracing::warn!(error = %err, path = %path.display(), "Cannot persist secret key");
            }
            generated
        }
        // Another process won the race; prefer its key.
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            read_secret(path).unwrap_or(generated)
        }
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "Cannot create secret key file");
            generated
        }
    }
}

fn read_secret(path: &Path) -> Option<String> {
    let raw = fs::read_to_string(path).ok()?;
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File, path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(err) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
        tracing::warn!(error = %err, path = %path.display(), "Cannot restrict secret key permissions");
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File, _path: &Path) {}

fn generate_secret_key() -> String {
    let mut bytes = [0u8; SECRET_KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
