//! # osctl: object storage client
//!
//! `osctl` moves files between local disk and a Swift-style object store that sits behind a
//! Keystone v2 style identity service. It is deliberately thin: sequential request/response calls
//! over `reqwest`, with no caching, retries or background work.
//!
//! ## Overview
//!
//! Every operation starts by exchanging the configured tenant/user/password for a bearer token
//! ([`identity`]). Tokens are never cached, so each upload or download costs one extra round trip
//! to the identity endpoint.
//!
//! An **upload** ([`StorageClient::upload`]) copies its input to a staging file first, then streams
//! that file to `{storage_url}/{container}/{name}` in a single PUT. Unless a name is given, the object
//! is named `{uuid}.{extension}` where the extension comes from configuration (default `png`,
//! whatever the content). The caller gets a [`StoredObject`] back to record wherever it keeps track
//! of objects; this crate keeps no catalog.
//!
//! A **download** ([`StorageClient::download`]) GETs an [`ObjectDescriptor`]'s address and writes
//! the body to `{download_home}/{YYYY-MM-DD}/{name}`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use osctl::{Config, StorageClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = <osctl::config::Args as clap::Parser>::parse();
//!     let config = Config::load(&args)?;
//!     osctl::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let client = StorageClient::new(&config)?;
//!     let stored = client.upload_file(std::path::Path::new("avatar.png")).await?;
//!     let written = client.download(&stored.into()).await?;
//!     println!("round trip landed at {}", written.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod config;
pub mod errors;
pub mod identity;
pub mod storage;
pub mod telemetry;
pub mod types;

#[cfg(test)]
mod test;

pub use config::Config;
pub use errors::{AuthError, DownloadError, Error, UploadError};
pub use storage::StorageClient;
pub use types::{AuthToken, Credentials, ObjectDescriptor, StoredObject};
