//! Configuration management for the FTPS client
//!
//! Every setting has a default so the client starts without a file. Values
//! are layered: defaults, then `config.toml`, then `FTPS_CLIENT_*`
//! environment variables (sections separated by `__`, e.g.
//! `FTPS_CLIENT_AUTH__PASSWORD`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 21;
const DEFAULT_USERNAME: &str = "anonymous";
const DEFAULT_MAX_REPLY_LENGTH: usize = 8192;
const DEFAULT_MAX_COMMAND_LENGTH: usize = 512;
const DEFAULT_TRANSFER_BUFFER_SIZE: usize = 4096;
const DEFAULT_LOCAL_DIRECTORY: &str = ".";

/// Shortest limit that still fits `PASV\r\n`.
const MIN_COMMAND_LENGTH: usize = 6;

/// Complete client configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClientConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub tls: TlsConfig,
    pub limits: LimitsConfig,
    pub local: LocalConfig,
}

/// Where the server lives and how long to wait for it
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// 0 waits forever
    pub connect_timeout_secs: u64,

    /// Bounds every reply read and TLS handshake; 0 waits forever
    pub reply_timeout_secs: u64,

    /// Replace private/unspecified PASV addresses with the control peer IP
    pub pasv_nat_workaround: bool,
}

/// Login credentials
#[derive(Deserialize, Clone)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

/// Trust settings shared by the control and data channels
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TlsConfig {
    /// Name used for SNI and certificate verification; defaults to the host
    pub server_name: Option<String>,

    /// PEM bundle of extra trusted CA certificates
    pub ca_file: Option<String>,

    /// Accept any server certificate. Opt-in for legacy servers only.
    pub relaxed_security: bool,
}

/// Size limits for replies, commands and transfer chunks
#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    pub max_reply_length: usize,
    pub max_command_length: usize,
    pub transfer_buffer_size: usize,
}

/// Local side of file transfers
#[derive(Debug, Deserialize, Clone)]
pub struct LocalConfig {
    /// Directory RETR writes into and STOR reads from
    pub directory: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout_secs: 0,
            reply_timeout_secs: 0,
            pasv_nat_workaround: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            password: String::new(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_reply_length: DEFAULT_MAX_REPLY_LENGTH,
            max_command_length: DEFAULT_MAX_COMMAND_LENGTH,
            transfer_buffer_size: DEFAULT_TRANSFER_BUFFER_SIZE,
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            directory: DEFAULT_LOCAL_DIRECTORY.to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from config.toml with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        // Installed layout first, then the working directory
        Self::load_from(&["ftps-client/config", "config"])
    }

    /// Load configuration from the given file stems (missing files are skipped)
    pub fn load_from(config_paths: &[&str]) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", DEFAULT_HOST)?
            .set_default("server.port", i64::from(DEFAULT_PORT))?
            .set_default("server.connect_timeout_secs", 0_i64)?
            .set_default("server.reply_timeout_secs", 0_i64)?
            .set_default("server.pasv_nat_workaround", false)?
            .set_default("auth.username", DEFAULT_USERNAME)?
            .set_default("auth.password", "")?
            .set_default("tls.relaxed_security", false)?
            .set_default("limits.max_reply_length", DEFAULT_MAX_REPLY_LENGTH as i64)?
            .set_default("limits.max_command_length", DEFAULT_MAX_COMMAND_LENGTH as i64)?
            .set_default(
                "limits.transfer_buffer_size",
                DEFAULT_TRANSFER_BUFFER_SIZE as i64,
            )?
            .set_default("local.directory", DEFAULT_LOCAL_DIRECTORY)?;

        for config_path in config_paths {
            builder = builder.add_source(File::with_name(config_path).required(false));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("FTPS_CLIENT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ClientConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Message("server.host cannot be empty".into()));
        }

        if self.server.port == 0 {
            return Err(ConfigError::Message("server.port cannot be 0".into()));
        }

        if self.limits.max_reply_length == 0 {
            return Err(ConfigError::Message(
                "limits.max_reply_length must be greater than 0".into(),
            ));
        }

        if self.limits.max_command_length < MIN_COMMAND_LENGTH {
            return Err(ConfigError::Message(format!(
                "limits.max_command_length must be at least {MIN_COMMAND_LENGTH}"
            )));
        }

        if self.limits.transfer_buffer_size == 0 {
            return Err(ConfigError::Message(
                "limits.transfer_buffer_size must be greater than 0".into(),
            ));
        }

        if self.local.directory.trim().is_empty() {
            return Err(ConfigError::Message("local.directory cannot be empty".into()));
        }

        Ok(())
    }
}

impl ServerConfig {
    /// Host and port of the control connection
    pub fn control_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.connect_timeout_secs)
    }

    pub fn reply_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.reply_timeout_secs)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
