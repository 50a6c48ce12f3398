use super::parsing::{
    env_optional, env_or_default, is_supported_submission_extension, parse_bool,
    parse_cors_origins, parse_environment, parse_string_list, parse_task_gating, parse_u16,
    parse_u64, SUPPORTED_SUBMISSION_EXTENSIONS,
};
use super::secret::{default_secret_path, load_or_create_secret_key};
use super::types::{
    ApiSettings, ConfigError, CorsSettings, DatabaseSettings, EngineSettings, RedisSettings,
    RuntimeSettings, S3Settings, SecuritySettings, ServerHost, ServerPort, ServerSettings,
    Settings, StorageSettings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let settings = Self {
            server: ServerSettings::from_env()?,
            runtime: RuntimeSettings::from_env(),
            api: ApiSettings {
                project_name: env_or_default("PROJECT_NAME", "Coursegate API"),
                version: env_or_default("VERSION", env!("CARGO_PKG_VERSION")),
                api_v1_str: env_or_default("API_V1_STR", "/api/v1"),
            },
            security: SecuritySettings::from_env()?,
            cors: CorsSettings {
                origins: parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?,
            },
            database: DatabaseSettings::from_env()?,
            redis: RedisSettings::from_env()?,
            storage: StorageSettings::from_env()?,
            s3: S3Settings {
                endpoint: env_or_default("S3_ENDPOINT", "http://localhost:9000"),
                access_key: env_or_default("S3_ACCESS_KEY", ""),
                secret_key: env_or_default("S3_SECRET_KEY", ""),
                bucket: env_or_default("S3_BUCKET", "coursegate-submissions"),
                region: env_or_default("S3_REGION", "us-east-1"),
            },
            engine: EngineSettings::from_env()?,
            telemetry: TelemetrySettings {
                log_level: env_or_default("COURSEGATE_LOG_LEVEL", "info"),
                json: env_flag("COURSEGATE_LOG_JSON"),
                prometheus_enabled: env_flag("PROMETHEUS_ENABLED"),
            },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub(crate) fn s3(&self) -> &S3Settings {
        &self.s3
    }

    pub(crate) fn engine(&self) -> &EngineSettings {
        &self.engine
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.allowed_submission_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ALLOWED_SUBMISSION_EXTENSIONS",
                value: String::from("<empty>"),
            });
        }

        for extension in &self.storage.allowed_submission_extensions {
            if !is_supported_submission_extension(extension) {
                return Err(ConfigError::InvalidValue {
                    field: "ALLOWED_SUBMISSION_EXTENSIONS",
                    value: extension.clone(),
                });
            }
        }

        if self.storage.max_upload_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_UPLOAD_SIZE_MB",
                value: "0".to_string(),
            });
        }

        if self.engine.submit_rate_limit_per_minute == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SUBMIT_RATE_LIMIT_PER_MINUTE",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.s3.access_key.is_empty() || self.s3.secret_key.is_empty() {
            return Err(ConfigError::MissingSecret("S3_ACCESS_KEY/S3_SECRET_KEY"));
        }

        Ok(())
    }
}

fn env_flag(key: &str) -> bool {
    env_optional(key).map(|value| parse_bool(&value)).unwrap_or(false)
}

fn env_u64(key: &'static str, default: &str) -> Result<u64, ConfigError> {
    parse_u64(key, env_or_default(key, default))
}

fn env_u16(key: &'static str, default: &str) -> Result<u16, ConfigError> {
    parse_u16(key, env_or_default(key, default))
}

impl ServerSettings {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: ServerHost::parse(env_or_default("COURSEGATE_HOST", "0.0.0.0"))?,
            port: ServerPort::parse(env_or_default("COURSEGATE_PORT", "8000"))?,
        })
    }
}

impl RuntimeSettings {
    fn from_env() -> Self {
        let environment = parse_environment(
            env_optional("COURSEGATE_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        // Production always validates secrets, whatever the flag says.
        let strict_config = env_flag("COURSEGATE_STRICT_CONFIG") || environment.is_production();
        Self { environment, strict_config }
    }
}

impl SecuritySettings {
    fn from_env() -> Result<Self, ConfigError> {
        let secret_key = env_optional("SECRET_KEY")
            .unwrap_or_else(|| load_or_create_secret_key(&default_secret_path()));

        Ok(Self {
            secret_key,
            access_token_expire_minutes: env_u64("ACCESS_TOKEN_EXPIRE_MINUTES", "10080")?,
            algorithm: env_or_default("ALGORITHM", "HS256"),
        })
    }
}

impl DatabaseSettings {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            postgres_server: env_or_default("POSTGRES_SERVER", "localhost"),
            postgres_port: env_u16("POSTGRES_PORT", "5432")?,
            postgres_user: env_or_default("POSTGRES_USER", "coursegate"),
            postgres_password: env_or_default("POSTGRES_PASSWORD", ""),
            postgres_db: env_or_default("POSTGRES_DB", "coursegate"),
            database_url: env_optional("DATABASE_URL"),
        })
    }
}

impl RedisSettings {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_or_default("REDIS_HOST", "localhost"),
            port: env_u16("REDIS_PORT", "6379")?,
            db: env_u16("REDIS_DB", "0")?,
            password: env_or_default("REDIS_PASSWORD", ""),
        })
    }
}

impl StorageSettings {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            max_upload_size_mb: env_u64("MAX_UPLOAD_SIZE_MB", "20")?,
            allowed_submission_extensions: parse_string_list(
                env_optional("ALLOWED_SUBMISSION_EXTENSIONS"),
                SUPPORTED_SUBMISSION_EXTENSIONS,
            ),
            presigned_url_expire_minutes: env_u64("PRESIGNED_URL_EXPIRE_MINUTES", "5")?,
        })
    }
}

impl EngineSettings {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            task_gating: parse_task_gating(env_optional("TASK_GATING"))?,
            submit_rate_limit_per_minute: env_u64("SUBMIT_RATE_LIMIT_PER_MINUTE", "30")?,
            progress_cache_ttl_seconds: env_u64("PROGRESS_CACHE_TTL_SECONDS", "300")?,
        })
    }
}
