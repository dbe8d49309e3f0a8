use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The registry references a source whose directory is gone.
    #[error("source '{name}' is registered but {} does not exist", .path.display())]
    SourceMissing { name: String, path: PathBuf },

    /// A link deployment target is already occupied.
    #[error("{} already exists", .path.display())]
    AlreadyExists { path: PathBuf },

    /// Link removal found something that is not a symbolic link.
    #[error("refusing to remove {}: it is not a symbolic link", .path.display())]
    UnsafeRemoval { path: PathBuf },

    #[error("failed to persist registry {}: {source}", .path.display())]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("source '{name}' is already registered")]
    SourceExists { name: String },

    #[error("target directory {} does not exist and was not confirmed for creation", .path.display())]
    TargetRootUnconfirmed { path: PathBuf },

    #[error("invalid name '{name}': must be a single non-empty path component")]
    InvalidName { name: String },

    #[error("failed to execute `{operation}`: {source}")]
    CommandExecution {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("`{operation}` failed: {detail}")]
    CommandFailed {
        operation: &'static str,
        detail: String,
    },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Walkdir(#[from] walkdir::Error),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    #[must_use]
    pub fn persistence(path: impl Into<PathBuf>, source: Error) -> Self {
        Self::PersistenceFailure {
            path: path.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn command_execution(operation: &'static str, source: std::io::Error) -> Self {
        Self::CommandExecution { operation, source }
    }

    #[must_use]
    pub fn command_failed(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::CommandFailed {
            operation,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Attach a path to raw `std::io` results.
pub(crate) trait IoResultExt<T> {
    fn at(self, path: &std::path::Path) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at(self, path: &std::path::Path) -> Result<T> {
        self.map_err(|source| Error::io(path, source))
    }
}
