use std::error::Error as StdError;

/// Common error type for `context-vacuum-core`.
///
/// Store backends should keep the underlying error chain via
/// [`Error::storage`] so callers can print the full cause.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("name already exists: {0}")]
    DuplicateName(String),

    #[error("no enabled sources to compose")]
    EmptySourceSet,

    #[error("unrecognized source kind: {0}")]
    UnrecognizedKind(String),

    #[error("source '{name}' is a {existing} source and cannot be re-added as {requested}")]
    KindChange {
        name: String,
        existing: String,
        requested: String,
    },

    #[error("unknown output format: {0}")]
    UnknownFormat(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("storage error: {context}")]
    Storage {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("failed to write {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn storage(
        context: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
    ) -> Self {
        Self::Storage {
            context: context.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure to obtain fresh content for a source.
///
/// Every variant is recoverable during reconciliation: the refresh engine
/// falls back to the cached body instead of propagating it.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("content size {size} bytes exceeds limit of {limit} bytes")]
    SizeExceeded { size: u64, limit: u64 },

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("timed out fetching {0}")]
    Timeout(String),

    #[error("could not decode content: {0}")]
    Decode(String),
}
