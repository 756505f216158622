use thiserror::Error;

#[derive(Error, Debug)]
pub enum KmsError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl KmsError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Negative errno-style result code for this error.
    ///
    /// Backend failures keep the kernel's code untouched; an I/O error without
    /// an OS code reports `-EIO`.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Io(e) => -e.raw_os_error().unwrap_or(libc::EIO),
            Self::InvalidArgument(_) => -libc::EINVAL,
        }
    }
}

// A convenient alias
pub type KmsResult<T> = Result<T, KmsError>;
