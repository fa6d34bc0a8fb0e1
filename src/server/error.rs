//! Common error types for the serving engine

use crate::modem;

/// A common error type for serving operations.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// An error occurred during a write operation on the port.
    WriteError,
    /// An error occurred during a read operation on the port.
    ReadError,
    /// The work queue is full; the item was not enqueued.
    QueueFull,
    /// The route table is full; the route was not attached.
    RouteTableFull,
    /// A payload exceeds the per-item capacity.
    PayloadTooLarge,
    /// A file path exceeds the per-item capacity.
    PathTooLong,
    /// A pattern or credential does not fit its buffer.
    BufferOverflow,
    /// A configuration blob could not be parsed.
    InvalidConfig,
}

impl From<modem::Error> for Error {
    fn from(err: modem::Error) -> Self {
        match err {
            modem::Error::WriteError => Error::WriteError,
            modem::Error::ReadError => Error::ReadError,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::QueueFull => defmt::write!(f, "QueueFull"),
            Error::RouteTableFull => defmt::write!(f, "RouteTableFull"),
            Error::PayloadTooLarge => defmt::write!(f, "PayloadTooLarge"),
            Error::PathTooLong => defmt::write!(f, "PathTooLong"),
            Error::BufferOverflow => defmt::write!(f, "BufferOverflow"),
            Error::InvalidConfig => defmt::write!(f, "InvalidConfig"),
        }
    }
}
