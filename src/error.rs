use std::{io, path::Path, path::PathBuf};

/// Every failure the object store can report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("malformed object: {0}")]
    MalformedObject(String),

    #[error("corrupt object data: {0}")]
    CorruptData(String),

    #[error("I/O failure at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("compression failed: {0}")]
    Compression(#[source] io::Error),

    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("ambiguous object id prefix: {0}")]
    AmbiguousObjectId(String),

    #[error("not a repository: {}", .0.display())]
    NotARepository(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedObject(reason.into())
    }
}

// Attaches the offending path to raw io errors
pub(crate) trait IoContext<T> {
    fn at(self, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
