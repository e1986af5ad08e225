//! Upload and download against the object store.
//!
//! ```text
//! upload(reader, name?)
//!   ├─ name = name or "{uuid}.{extension}"
//!   ├─ FS: copy reader → {staging_dir}/{name}
//!   ├─ HTTP: POST {auth_url}/tokens            // fresh token, every call
//!   └─ HTTP: PUT {storage_url}/{container}/{name}
//!            X-Auth-Token, body streamed from the staged file
//!
//! download(descriptor)
//!   ├─ HTTP: POST {auth_url}/tokens            // fresh token, every call
//!   ├─ HTTP: GET {descriptor.address}
//!   │        X-Auth-Token, Accept: application/octet-stream
//!   └─ FS: stream body → {download_home}/{YYYY-MM-DD}/{descriptor.name}
//! ```
//!
//! Nothing is retried. Staged files are left in place after an upload, successful or not.

use chrono::{Local, NaiveDate};
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_LENGTH};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, instrument};
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::{AuthError, DownloadError, Error, UploadError};
use crate::identity::{Authenticator, KeystoneAuthenticator, ensure_slash};
use crate::types::{AuthToken, Credentials, ObjectDescriptor, StoredObject, abbrev_uuid};

/// Header carrying the bearer token on object-store requests
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Directory downloads land in for a given day: `{home}/{YYYY-MM-DD}`.
pub fn dated_dir(home: &Path, date: NaiveDate) -> PathBuf {
    home.join(date.format("%Y-%m-%d").to_string())
}

/// Names end up both in a URL path segment and in a local file path, so only plain file names
/// are accepted.
pub(crate) fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '?', '#'])
}

/// Client for the object store, authenticating through the identity endpoint on every call.
pub struct StorageClient {
    http: Client,
    authenticator: Arc<dyn Authenticator>,
    credentials: Credentials,
    storage_url: Url,
    container: String,
    object_extension: String,
    staging_dir: PathBuf,
    download_home: PathBuf,
    request_timeout: Duration,
}

impl StorageClient {
    /// Build a client from configuration, talking to the configured identity endpoint.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http = Client::builder()
            .timeout(config.cloud.request_timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        let authenticator = KeystoneAuthenticator::new(http.clone(), &config.cloud.auth_url, config.cloud.request_timeout)
            .map_err(|e| Error::Config {
                message: format!("cloud.auth_url ({}) cannot be extended with /tokens: {}", config.cloud.auth_url, e),
            })?;
        debug!("Tokens will be requested from {}", authenticator.tokens_url());

        Ok(Self {
            http,
            authenticator: Arc::new(authenticator),
            credentials: config.cloud.credentials(),
            storage_url: ensure_slash(&config.cloud.storage_url),
            container: config.cloud.container.clone(),
            object_extension: config.storage.object_extension.clone(),
            staging_dir: config.storage.staging_dir(),
            download_home: config.storage.download_home(),
            request_timeout: config.cloud.request_timeout,
        })
    }

    /// Replace the identity endpoint client, e.g. with a [`crate::identity::StaticAuthenticator`].
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Exchange the configured credentials for a fresh token.
    pub async fn authenticate(&self) -> Result<AuthToken, AuthError> {
        self.authenticator.authenticate(&self.credentials).await
    }

    /// `{storage_url}/{container}/{name}`, with container and name percent-encoded as path segments.
    pub fn object_address(&self, name: &str) -> Result<Url, url::ParseError> {
        let mut address = self.storage_url.clone();
        address
            .path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(&self.container)
            .push(name);
        Ok(address)
    }

    /// Where an upload named `name` is staged before transmission.
    pub fn staging_path(&self, name: &str) -> PathBuf {
        self.staging_dir.join(name)
    }

    /// A fresh `{uuid}.{extension}` object name.
    pub fn generate_object_name(&self) -> String {
        let id = Uuid::new_v4();
        debug!("Generated object id {}", abbrev_uuid(&id));
        format!("{}.{}", id, self.object_extension)
    }

    /// Stage `reader` locally, then PUT it to the object store.
    ///
    /// A name is generated when `name` is `None`.
    #[instrument(skip(self, reader), err)]
    pub async fn upload<R>(&self, mut reader: R, name: Option<String>) -> Result<StoredObject, UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let name = name.unwrap_or_else(|| self.generate_object_name());
        if !is_plain_name(&name) {
            return Err(UploadError::InvalidName(name));
        }
        let address = self.object_address(&name).map_err(|source| UploadError::InvalidUrl {
            name: name.clone(),
            source,
        })?;

        let staged = self.staging_path(&name);
        let size = stage(&mut reader, &self.staging_dir, &staged).await.map_err(UploadError::Staging)?;
        debug!("Staged {} bytes at {}", size, staged.display());

        let token = self.authenticate().await?;

        let file = fs::File::open(&staged).await.map_err(UploadError::Staging)?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        let response = self
            .http
            .put(address.clone())
            .header(AUTH_TOKEN_HEADER, token.id())
            .header(CONTENT_LENGTH, size)
            .body(body)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(UploadError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Failed to upload {} to object store", name);
            tracing::error!("Url was: {}", address);
            return Err(UploadError::Status { status, body });
        }

        info!("Uploaded {} ({} bytes)", name, size);
        Ok(StoredObject { name, address })
    }

    /// Upload a local file under a generated name.
    pub async fn upload_file(&self, path: &Path) -> Result<StoredObject, UploadError> {
        let file = fs::File::open(path).await.map_err(UploadError::Staging)?;
        self.upload(file, None).await
    }

    /// Fetch `descriptor.address` into today's download directory and return the written path.
    ///
    /// Local write failures are logged and returned as [`DownloadError::LocalWrite`]; a partially
    /// written file is removed.
    #[instrument(skip(self), fields(name = %descriptor.name), err)]
    pub async fn download(&self, descriptor: &ObjectDescriptor) -> Result<PathBuf, DownloadError> {
        if !is_plain_name(&descriptor.name) {
            return Err(DownloadError::InvalidName(descriptor.name.clone()));
        }

        let token = self.authenticate().await?;

        let response = self
            .http
            .get(descriptor.address.clone())
            .header(AUTH_TOKEN_HEADER, token.id())
            .header(ACCEPT, "application/octet-stream")
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(DownloadError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Failed to download {} from object store", descriptor.name);
            tracing::error!("Url was: {}", descriptor.address);
            return Err(DownloadError::Status { status, body });
        }

        let dir = dated_dir(&self.download_home, Local::now().date_naive());
        let path = dir.join(&descriptor.name);

        match write_body(response, &dir, &path).await {
            Ok(size) => {
                info!("Downloaded {} ({} bytes) to {}", descriptor.name, size, path.display());
                Ok(path)
            }
            Err(e) => {
                if let DownloadError::LocalWrite { source, .. } = &e {
                    tracing::error!("Failed to write {}: {}", path.display(), source);
                }
                let _ = fs::remove_file(&path).await;
                Err(e)
            }
        }
    }
}

/// Copy `reader` into a new file at `path`, returning the number of bytes written.
async fn stage<R>(reader: &mut R, dir: &Path, path: &Path) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    fs::create_dir_all(dir).await?;
    let mut file = fs::File::create(path).await?;
    let size = tokio::io::copy(reader, &mut file).await?;
    file.sync_all().await?;
    Ok(size)
}

async fn write_body(response: reqwest::Response, dir: &Path, path: &Path) -> Result<u64, DownloadError> {
    let local_write = |source| DownloadError::LocalWrite {
        path: path.display().to_string(),
        source,
    };

    fs::create_dir_all(dir).await.map_err(local_write)?;
    let mut file = fs::File::create(path).await.map_err(local_write)?;

    let mut size = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(DownloadError::Request)?;
        file.write_all(&chunk).await.map_err(local_write)?;
        size += chunk.len() as u64;
    }
    file.flush().await.map_err(local_write)?;

    Ok(size)
}
