//! Hardware abstraction for the serial modem link.
//!
//! The protocol engine never touches a UART register or a system timer
//! directly; it is written against [`SerialPort`] and [`Clock`]. Implement
//! both for your platform and hand them to
//! [`Server::new`](crate::server::Server::new).

/// Byte-oriented serial port connected to the modem.
///
/// The engine polls with [`available`](SerialPort::available) and pulls one
/// byte at a time; writes are buffered by the implementation until
/// [`flush`](SerialPort::flush) is called at the end of each command or
/// payload frame.
pub trait SerialPort {
    /// The type of error that can occur on the port.
    type Error: core::fmt::Debug;

    /// Returns `true` if at least one received byte is waiting to be read.
    fn available(&mut self) -> bool;

    /// Reads the next received byte.
    ///
    /// Only called after [`available`](SerialPort::available) reported data;
    /// an empty receive buffer is an error, not a blocking condition.
    fn read(&mut self) -> Result<u8, Self::Error>;

    /// Queues `buf` for transmission.
    fn write(&mut self, buf: &[u8]) -> Result<(), Self::Error>;

    /// Pushes all queued bytes out on the wire.
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Monotonic millisecond clock.
///
/// Wrap-around is not handled; use a 64-bit source (a 32-bit millisecond
/// counter widened at startup is fine for device lifetimes).
pub trait Clock {
    /// Milliseconds elapsed since some fixed point in the past.
    fn now_ms(&self) -> u64;
}
