//! AT link layer over a [`SerialPort`].
//!
//! [`Link`] owns the port and the clock and implements the two low-level
//! activities everything above it is built from:
//!
//! - **command/response**: write a command frame, then scan the inbound byte
//!   stream for a literal terminator ([`ResponseKind`]) within a timeout
//! - **notification scanning**: while scanning (or while explicitly polling),
//!   watch the same bytes for a `+IPD` inbound request notification
//!
//! The stream is unframed, so terminator recognition has to survive partial
//! overlaps (`OOK\r\n` still ends in `OK\r\n`) and must not fire on a prefix
//! that more data would disprove. The matcher therefore re-probes after a
//! mismatch and, once the terminator has been seen, waits for a few quiet
//! passes over an empty receive buffer before confirming the match.

pub mod error;
pub mod scanner;

use core::fmt::Write as _;

use crate::transport::{Clock, SerialPort};
pub use error::Error;
pub use scanner::{Inbound, IpdScanner, MAX_ROUTE_LEN};

/// Maximum number of response bytes retained per command.
///
/// Responses longer than this are still scanned to completion; only the
/// returned copy is truncated.
pub const MAX_RESPONSE: usize = 256;

/// Collected response bytes for one command.
pub type Response = heapless::Vec<u8, MAX_RESPONSE>;

/// Quiet scan passes required after the terminator before a match is
/// confirmed. Guards against a terminator that is itself a prefix of more
/// data still in flight.
const SETTLE_PASSES: u8 = 10;

/// Terminator the link waits for after sending a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Fire and forget: no response is awaited.
    None,
    /// Ordinary command acknowledgement, `OK\r\n`.
    Generic,
    /// Bulk payload accepted after a channel send, `SEND OK\r\n`.
    BulkAccepted,
    /// Payload prompt after a send directive, `> `.
    SendPrompt,
    /// Firmware banner after a reset, `ready\r\n`.
    DeviceReady,
}

impl ResponseKind {
    fn terminator(self) -> &'static [u8] {
        match self {
            ResponseKind::None => b"",
            ResponseKind::Generic => b"OK\r\n",
            ResponseKind::BulkAccepted => b"SEND OK\r\n",
            ResponseKind::SendPrompt => b"> ",
            ResponseKind::DeviceReady => b"ready\r\n",
        }
    }
}

/// How a scan window ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEnd {
    /// The expected terminator was seen and confirmed.
    Matched,
    /// The window expired without terminator or notification.
    TimedOut,
    /// No response was awaited for this command.
    Skipped,
    /// An inbound request notification ended the window early.
    Inbound(Inbound),
}

/// Outcome of one command or scan window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Response bytes collected during the window (truncated at
    /// [`MAX_RESPONSE`]).
    pub bytes: Response,
    /// How the window ended.
    pub end: ScanEnd,
}

/// Incremental terminator matcher with mismatch re-probing.
#[derive(Debug)]
struct EndMatcher {
    marker: &'static [u8],
    pos: usize,
    settle: u8,
}

impl EndMatcher {
    fn new(kind: ResponseKind) -> Self {
        Self {
            marker: kind.terminator(),
            pos: 0,
            settle: 0,
        }
    }

    fn feed(&mut self, byte: u8) {
        let marker = self.marker;
        if marker.is_empty() {
            return;
        }
        if self.pos == marker.len() - 1 && byte == marker[self.pos] {
            self.pos = 0;
            self.settle = SETTLE_PASSES;
        } else if byte == marker[self.pos] {
            self.pos += 1;
        } else {
            // Mismatch invalidates any pending match, but the byte may
            // itself start a new occurrence.
            self.pos = 0;
            self.settle = 0;
            if byte == marker[0] {
                self.pos = 1;
            }
        }
    }

    /// Called once per quiet pass over an empty receive buffer; returns
    /// `true` once the terminator is confirmed.
    fn settled(&mut self) -> bool {
        if self.marker.is_empty() {
            return false;
        }
        if self.settle > 1 {
            self.settle -= 1;
        }
        self.settle == 1 && self.pos == 0
    }
}

/// AT command link over a serial port.
#[derive(Debug)]
pub struct Link<P, C> {
    port: P,
    clock: C,
}

impl<P: SerialPort, C: Clock> Link<P, C> {
    /// Creates a link over `port`, using `clock` for timeouts.
    pub fn new(port: P, clock: C) -> Self {
        Self { port, clock }
    }

    /// Current time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Returns `true` if unread bytes are waiting on the port.
    pub fn available(&mut self) -> bool {
        self.port.available()
    }

    /// Sends `command` and scans for the `kind` terminator for up to
    /// `timeout_ms`.
    ///
    /// With `append_crlf` the CR LF command terminator is written after the
    /// command; raw payload frames are sent without it. For
    /// [`ResponseKind::None`] the call returns immediately after flushing.
    pub fn send(
        &mut self,
        command: &[u8],
        timeout_ms: u32,
        append_crlf: bool,
        kind: ResponseKind,
    ) -> Result<Reply, Error> {
        self.port.write(command).map_err(|_| Error::WriteError)?;
        if append_crlf {
            self.port.write(b"\r\n").map_err(|_| Error::WriteError)?;
        }
        self.port.flush().map_err(|_| Error::WriteError)?;
        if kind == ResponseKind::None || timeout_ms == 0 {
            return Ok(Reply {
                bytes: Response::new(),
                end: ScanEnd::Skipped,
            });
        }
        self.scan(timeout_ms, kind, true)
    }

    /// Scans the port for up to `timeout_ms` looking only for an inbound
    /// request notification.
    ///
    /// The scanner's state lives for one window: a notification split across
    /// two poll windows is discarded with the rest of the unmatched bytes.
    pub fn poll(&mut self, timeout_ms: u32) -> Result<Option<Inbound>, Error> {
        let reply = self.scan(timeout_ms, ResponseKind::None, false)?;
        match reply.end {
            ScanEnd::Inbound(inbound) => Ok(Some(inbound)),
            _ => Ok(None),
        }
    }

    fn scan(&mut self, timeout_ms: u32, kind: ResponseKind, collect: bool) -> Result<Reply, Error> {
        let mut bytes = Response::new();
        let mut scanner = IpdScanner::new();
        let mut matcher = EndMatcher::new(kind);
        let deadline = self.clock.now_ms().saturating_add(u64::from(timeout_ms));
        while self.clock.now_ms() < deadline {
            while self.port.available() {
                let byte = self.port.read().map_err(|_| Error::ReadError)?;
                if collect {
                    let _ = bytes.push(byte);
                }
                scanner.feed(byte);
                matcher.feed(byte);
                if scanner.is_complete() {
                    // Stop reading so a second buffered notification stays
                    // on the port for the next window.
                    break;
                }
            }
            if matcher.settled() {
                return Ok(Reply {
                    bytes,
                    end: ScanEnd::Matched,
                });
            }
            if scanner.is_complete() {
                return Ok(Reply {
                    bytes,
                    end: ScanEnd::Inbound(scanner.take()),
                });
            }
        }
        Ok(Reply {
            bytes,
            end: ScanEnd::TimedOut,
        })
    }
}

/// Formats a signed integer for splicing into an AT command argument.
pub fn decimal(value: i32) -> heapless::String<11> {
    let mut out = heapless::String::new();
    let _ = write!(out, "{value}");
    out
}

/// Finds the first occurrence of `needle` in `haystack`.
pub(crate) fn find_slice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
