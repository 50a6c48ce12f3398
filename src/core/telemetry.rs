use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::Settings;

// sqlx and the AWS SDK are chatty at info; keep them quiet unless asked.
const NOISY_TARGETS: &[&str] = &["sqlx=warn", "aws_config=warn", "aws_smithy_runtime=warn"];

pub(crate) fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => default_filter(&settings.telemetry().log_level)?,
    };

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(fmt::format::FmtSpan::CLOSE);

    let installed = if settings.telemetry().json {
        builder.json().flatten_event(true).try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|err| anyhow::anyhow!(err.to_string()))
}

fn default_filter(level: &str) -> anyhow::Result<EnvFilter> {
    let mut filter = EnvFilter::try_new(level)?;
    for directive in NOISY_TARGETS {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::default_filter;

    #[test]
    fn default_filter_accepts_configured_level() {
        assert!(default_filter("debug").is_ok());
        assert!(default_filter("coursegate=trace,info").is_ok());
    }
}
