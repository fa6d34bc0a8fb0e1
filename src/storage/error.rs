//! Common error types for storage operations

/// A common error type for storage operations.
///
/// Concrete [`FileStore`](super::FileStore) implementations are free to use
/// their own error types; this enum covers the usual failure modes and is
/// simple and portable for `no_std` environments.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// No file exists at the requested path.
    NotFound,
    /// An error occurred during a read operation.
    ReadError,
    /// The file could not be closed cleanly.
    CloseError,
    /// An operation was attempted on a device that was not initialized.
    NotInitialized,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotFound => defmt::write!(f, "NotFound"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::CloseError => defmt::write!(f, "CloseError"),
            Error::NotInitialized => defmt::write!(f, "NotInitialized"),
        }
    }
}
