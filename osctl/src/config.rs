//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `osctl.yaml` but can be specified via `-f` flag or `OSCTL_CONFIG`
//! environment variable. A missing file is not an error: everything can come from the environment.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `osctl.yaml`)
//! 2. **Environment variables** - Variables prefixed with `OSCTL_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `OSCTL_CLOUD__PASSWORD=secret` sets the `cloud.password` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use osctl::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Uploading into container {}", config.cloud.container);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Structure
//!
//! - **Cloud**: `cloud.auth_url`, `cloud.storage_url` - identity and object-store endpoints
//! - **Credentials**: `cloud.tenant_id`, `cloud.user_name`, `cloud.password`
//! - **Requests**: `cloud.container`, `cloud.request_timeout`
//! - **Local files**: `storage.staging_dir`, `storage.download_home`, `storage.object_extension`
//! - **Telemetry**: `enable_otel_export`
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! OSCTL_CLOUD__AUTH_URL=https://identity.example.com/v2.0
//! OSCTL_CLOUD__TENANT_ID=3f1b0c...
//! OSCTL_CLOUD__PASSWORD=secret
//! OSCTL_STORAGE__DOWNLOAD_HOME=/srv/downloads
//! ```

use clap::{Parser, Subcommand};
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::errors::Error;
use crate::storage::is_plain_name;
use crate::types::Credentials;

/// Container every object is written under unless configured otherwise
pub const DEFAULT_CONTAINER: &str = "on7_storage";

/// CLI args - config file location plus the operation to run
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "OSCTL_CONFIG", default_value = "osctl.yaml")]
    pub config: String,

    /// Validate configuration and exit without contacting the cloud.
    #[arg(long)]
    pub validate: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Authenticate and print the issued token id
    Token,
    /// Upload a local file and print the stored object as JSON
    Upload {
        /// File to upload
        path: PathBuf,
        /// Object name to use instead of a generated one
        #[arg(long)]
        name: Option<String>,
    },
    /// Download an object into today's directory under the download home
    Download {
        /// Local file name to write
        #[arg(long)]
        name: String,
        /// Full URL of the object
        #[arg(long)]
        address: Url,
    },
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Identity and object-store connection settings
    pub cloud: CloudConfig,
    /// Local filesystem locations for staging and downloads
    pub storage: StorageConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// Remote endpoints and the credentials used against them.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CloudConfig {
    /// Identity API base URL; tokens are requested from `{auth_url}/tokens`
    pub auth_url: Url,
    /// Object-store account URL; objects live at `{storage_url}/{container}/{name}`
    pub storage_url: Url,
    pub tenant_id: String,
    pub user_name: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Container objects are uploaded into
    pub container: String,
    /// Deadline applied to every identity and object-store request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            auth_url: "http://localhost:5000/v2.0".parse().expect("Failed to parse default auth URL"),
            storage_url: "http://localhost:8080/v1".parse().expect("Failed to parse default storage URL"),
            tenant_id: String::new(),
            user_name: String::new(),
            password: String::new(),
            container: DEFAULT_CONTAINER.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for CloudConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudConfig")
            .field("auth_url", &self.auth_url.as_str())
            .field("storage_url", &self.storage_url.as_str())
            .field("tenant_id", &self.tenant_id)
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .field("container", &self.container)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl CloudConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.tenant_id, &self.user_name, &self.password)
    }
}

/// Local filesystem settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Where uploads are staged before transmission (default: system temp dir)
    pub staging_dir: Option<PathBuf>,
    /// Root for downloads, which land in `{download_home}/{YYYY-MM-DD}/` (default: user home)
    pub download_home: Option<PathBuf>,
    /// Extension appended to generated object names.
    ///
    /// Applied regardless of the uploaded content's real type.
    pub object_extension: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            staging_dir: None,
            download_home: None,
            object_extension: "png".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Falls back to the current directory when no home directory can be determined.
    pub fn download_home(&self) -> PathBuf {
        self.download_home
            .clone()
            .or_else(std::env::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Config {
    /// Load configuration from the file named in `args`, then apply environment overrides.
    ///
    /// Extraction and validation failures are both reported as [`Error::Config`].
    pub fn load(args: &Args) -> Result<Self, Error> {
        let config: Self = Self::figment(args)
            .extract()
            .map_err(|e| Error::Config { message: e.to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        let required = [
            ("cloud.tenant_id", &self.cloud.tenant_id),
            ("cloud.user_name", &self.cloud.user_name),
            ("cloud.password", &self.cloud.password),
            ("cloud.container", &self.cloud.container),
            ("storage.object_extension", &self.storage.object_extension),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config {
                    message: format!(
                        "{field} is not configured. Set it in the config file or via OSCTL_{} environment variable.",
                        field.to_uppercase().replace('.', "__")
                    ),
                });
            }
        }

        if self.cloud.container.contains(['/', '\\', ':', '?', '#', '%']) {
            return Err(Error::Config {
                message: format!(
                    "cloud.container ({}) must not contain any of / \\ : ? # %",
                    self.cloud.container
                ),
            });
        }

        if self.storage.object_extension.starts_with('.') {
            return Err(Error::Config {
                message: format!(
                    "storage.object_extension ({}) should be given without the leading dot",
                    self.storage.object_extension
                ),
            });
        }

        // Generated names are "{uuid}.{extension}" and must pass the same check as any object name
        if !is_plain_name(&format!("x.{}", self.storage.object_extension)) {
            return Err(Error::Config {
                message: format!(
                    "storage.object_extension ({}) would not produce a plain object name",
                    self.storage.object_extension
                ),
            });
        }

        if self.cloud.request_timeout.is_zero() {
            return Err(Error::Config {
                message: "cloud.request_timeout must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can override specific values. OSCTL_CONFIG names the file
            // itself and is not a config key.
            .merge(Env::prefixed("OSCTL_").ignore(&["config"]).split("__"))
    }
}
