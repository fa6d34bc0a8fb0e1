//! Incremental scanner for `+IPD` connection notifications.
//!
//! The modem announces an inbound HTTP-style request in-band, interleaved
//! with whatever response bytes are currently being awaited:
//!
//! ```text
//! +IPD,<channel>,<length>:<METHOD> <route> <rest of request line...>
//! ```
//!
//! [`IpdScanner`] consumes the stream one byte at a time and reports when a
//! complete notification header (through the route token) has been seen. The
//! `+` is only significant at the start of a line; anything else puts the
//! scanner into a sink state until the next CR or LF, so route payloads or
//! response text containing `+IPD` cannot trigger a false match.

use heapless::Vec;

/// Maximum accepted route length in bytes.
///
/// A notification whose route token exceeds this is abandoned: the scanner
/// sinks the rest of the line and no request is reported.
pub const MAX_ROUTE_LEN: usize = 128;

/// A parsed inbound request notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// Logical connection id announced by the modem (0-4 on real hardware;
    /// not validated here).
    pub channel: u8,
    /// Route token from the request line, e.g. `/index.html`.
    pub route: Vec<u8, MAX_ROUTE_LEN>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// At the start of a line; only `+` can begin a notification here.
    LineStart,
    AfterPlus,
    AfterI,
    AfterP,
    AfterD,
    /// Accumulating the decimal channel id, up to the second comma.
    Channel,
    /// Skipping the advertised byte length, up to the colon.
    Length,
    /// Skipping the method token, up to the first space.
    Method,
    /// Accumulating the route token, up to the next space.
    Route,
    /// Full header seen; sink until [`IpdScanner::take`].
    Complete,
    /// Mid-line noise; sink until CR or LF.
    MidLine,
}

/// Byte-at-a-time `+IPD` notification scanner.
#[derive(Debug)]
pub struct IpdScanner {
    state: State,
    channel: u8,
    route: Vec<u8, MAX_ROUTE_LEN>,
}

impl IpdScanner {
    /// Creates a scanner positioned at the start of a line.
    pub fn new() -> Self {
        Self {
            state: State::LineStart,
            channel: 0,
            route: Vec::new(),
        }
    }

    /// Feeds one received byte through the state machine.
    ///
    /// Bytes arriving after the header is complete are ignored until the
    /// notification is consumed with [`take`](IpdScanner::take).
    pub fn feed(&mut self, byte: u8) {
        self.state = match self.state {
            State::LineStart => match byte {
                b'+' => State::AfterPlus,
                b'\r' | b'\n' => State::LineStart,
                _ => State::MidLine,
            },
            State::MidLine => match byte {
                b'\r' | b'\n' => State::LineStart,
                _ => State::MidLine,
            },
            State::AfterPlus => {
                if byte == b'I' {
                    State::AfterI
                } else {
                    State::LineStart
                }
            }
            State::AfterI => {
                if byte == b'P' {
                    State::AfterP
                } else {
                    State::LineStart
                }
            }
            State::AfterP => {
                if byte == b'D' {
                    State::AfterD
                } else {
                    State::LineStart
                }
            }
            State::AfterD => {
                if byte == b',' {
                    self.channel = 0;
                    State::Channel
                } else {
                    State::LineStart
                }
            }
            State::Channel => {
                if byte == b',' {
                    State::Length
                } else {
                    self.channel = self
                        .channel
                        .wrapping_mul(10)
                        .wrapping_add(byte.wrapping_sub(b'0'));
                    State::Channel
                }
            }
            State::Length => {
                if byte == b':' {
                    State::Method
                } else {
                    State::Length
                }
            }
            State::Method => {
                if byte == b' ' {
                    State::Route
                } else {
                    State::Method
                }
            }
            State::Route => {
                if byte == b' ' {
                    State::Complete
                } else if self.route.push(byte).is_err() {
                    self.route.clear();
                    State::MidLine
                } else {
                    State::Route
                }
            }
            State::Complete => State::Complete,
        };
    }

    /// Returns `true` once a full notification header has been scanned.
    pub fn is_complete(&self) -> bool {
        self.state == State::Complete
    }

    /// Consumes the scanned notification and resumes sinking the remainder
    /// of the request line.
    pub fn take(&mut self) -> Inbound {
        let inbound = Inbound {
            channel: self.channel,
            route: core::mem::take(&mut self.route),
        };
        self.channel = 0;
        self.state = State::MidLine;
        inbound
    }
}

impl Default for IpdScanner {
    fn default() -> Self {
        Self::new()
    }
}
