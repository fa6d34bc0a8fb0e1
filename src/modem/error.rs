//! Common error types for the AT link layer

/// A common error type for AT link operations.
///
/// Transport faults are collapsed into read/write variants so the engine
/// stays generic over the port's own error type. Timeouts are not errors at
/// this layer; they are reported through
/// [`ScanEnd::TimedOut`](super::ScanEnd::TimedOut).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// An error occurred during a write operation on the port.
    WriteError,
    /// An error occurred during a read operation on the port.
    ReadError,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
        }
    }
}
