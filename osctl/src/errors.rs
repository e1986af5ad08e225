use reqwest::StatusCode;
use thiserror::Error as ThisError;

/// Failures while exchanging credentials for a token
#[derive(ThisError, Debug)]
pub enum AuthError {
    /// The identity endpoint could not be reached or the connection failed mid-request
    #[error("Identity request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The identity endpoint answered with a non-2xx status
    #[error("Identity endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The response body did not contain `access.token.id`
    #[error("Malformed identity response: {0}")]
    MalformedResponse(#[source] serde_json::Error),
}

/// Failures while staging or transmitting an upload
#[derive(ThisError, Debug)]
pub enum UploadError {
    /// The requested object name is not a plain file name
    #[error("Invalid object name {0:?}")]
    InvalidName(String),

    /// The object name could not be turned into a storage URL
    #[error("Invalid object address for {name}: {source}")]
    InvalidUrl {
        name: String,
        #[source]
        source: url::ParseError,
    },

    /// Writing or re-reading the local staging file failed
    #[error("Failed to stage upload: {0}")]
    Staging(#[source] std::io::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Upload request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The object store answered the PUT with a non-2xx status
    #[error("Object store rejected upload with {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Failures while fetching an object and writing it to disk
#[derive(ThisError, Debug)]
pub enum DownloadError {
    /// The descriptor name would escape the download directory
    #[error("Invalid object name {0:?}")]
    InvalidName(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Download request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The object store answered the GET with a non-2xx status
    #[error("Object store returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The bytes arrived but could not be written locally
    #[error("Failed to write {path}: {source}")]
    LocalWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(ThisError, Debug)]
pub enum Error {
    /// Configuration is missing or inconsistent
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Process exit code for the CLI, grouped by which side of the wire failed.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config { .. } => 78,
            Error::Auth(_) => 77,
            Error::Upload(UploadError::Staging(_)) | Error::Download(DownloadError::LocalWrite { .. }) => 74,
            Error::Upload(_) | Error::Download(_) => 69,
            Error::Other(_) => 1,
        }
    }
}
