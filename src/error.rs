//! The error type shared by every module of the crate.

use std::path::PathBuf;

use reqwest::{StatusCode, Url};
use thiserror::Error;

/// Shorthand for `Result<T, safebooru_dl::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while querying the API or saving an image.
///
/// Nothing is retried: each variant is returned to the caller as soon as it happens.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// The underlying HTTP client could not be built.
    #[error("failed to build the HTTP client")]
    Client(#[source] reqwest::Error),

    /// The connection could not be established, or the request timed out.
    #[error("request to {url} failed")]
    Network {
        /// The requested URL.
        url: Url,
        /// The error reported by the HTTP client.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with something other than `200 OK`.
    #[error("{url} answered with status {status}")]
    Status {
        /// The requested URL.
        url: Url,
        /// The status the server answered with.
        status: StatusCode,
    },

    /// The response body is not the JSON we expected.
    #[error("malformed JSON response from {url}")]
    Parse {
        /// The requested URL.
        url: Url,
        /// The error reported by the JSON parser.
        #[source]
        source: serde_json::Error,
    },

    /// The query cannot be turned into a request URL.
    #[error("invalid query: {0}")]
    InvalidQuery(&'static str),

    /// The requested item is not on the page.
    #[error("item {index} is out of range, the page only has {len} posts")]
    IndexOutOfRange {
        /// The requested zero-based index.
        index: usize,
        /// The number of posts on the page.
        len: usize,
    },

    /// The API has no post with this id.
    #[error("post {0} does not exist")]
    PostNotFound(u64),

    /// The API returned a record we cannot download from.
    #[error("post {id} has an unusable record: {reason}")]
    InvalidRecord {
        /// The id of the offending post.
        id: u64,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The image response has no content.
    #[error("there is no content to download at {0}")]
    EmptyImage(Url),

    /// Creating the directory or writing the image failed.
    #[error("failed to write {}", .path.display())]
    FileWrite {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Whether this error comes from the network round trip itself,
    /// i.e. a connection failure, a timeout or a non-200 status.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Status { .. })
    }

    pub(crate) fn file_write(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::FileWrite { path, source }
    }
}
