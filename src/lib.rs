//! # atserve - cooperative AT-modem web serving
//!
//! A library for driving a serial-attached WiFi radio (ESP8266-style
//! AT-command modem) from a microcontroller. It exposes an HTTP-like
//! request/response surface to attached route handlers while streaming files
//! from local storage, all on a single thread of control: the host calls
//! [`server::Server::tick`] from its main loop and every state transition
//! happens inside that call.
//!
//! ## Features
//!
//! ### Protocol layer
//! - **Response matching**: AT commands are sent and their replies recognized
//!   by literal terminator (`OK`, `SEND OK`, `> `, `ready`) within a timeout
//! - **Inbound notification scanning**: `+IPD` connection notifications are
//!   picked out of the same unframed byte stream, even while a command
//!   response is being awaited
//! - **Work queue**: outbound sends, file transfers and channel closes are
//!   serialized per logical connection without blocking the caller
//! - **Chunked file streaming**: at most one chunk of an open file is
//!   transmitted per tick, cooperating with ordinary sends
//!
//! ### Boundaries
//! - [`transport::SerialPort`] and [`transport::Clock`] abstract the UART and
//!   the millisecond clock
//! - [`storage::FileStore`] and [`storage::File`] abstract the file source
//!   (SD card, flash filesystem, RAM images in tests)
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! atserve = "0.1.0"
//! ```
//!
//! ### Serving a file from a route
//!
//! ```rust,no_run
//! use atserve::server::{Config, Handler, MatchMode, Outbox, Server};
//! use atserve::storage::{File, FileStore};
//! use atserve::transport::{Clock, SerialPort};
//! # struct Uart;
//! # impl SerialPort for Uart {
//! #     type Error = ();
//! #     fn available(&mut self) -> bool { false }
//! #     fn read(&mut self) -> Result<u8, ()> { Err(()) }
//! #     fn write(&mut self, _buf: &[u8]) -> Result<(), ()> { Ok(()) }
//! #     fn flush(&mut self) -> Result<(), ()> { Ok(()) }
//! # }
//! # struct Ticker;
//! # impl Clock for Ticker { fn now_ms(&self) -> u64 { 0 } }
//! # struct Sd;
//! # struct SdFile;
//! # impl File for SdFile {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> { Ok(0) }
//! #     fn close(self) -> Result<(), ()> { Ok(()) }
//! # }
//! # impl FileStore for Sd {
//! #     type File = SdFile;
//! #     type Error = ();
//! #     fn open(&mut self, _path: &str) -> Result<SdFile, ()> { Ok(SdFile) }
//! # }
//!
//! struct Index;
//!
//! impl Handler for Index {
//!     fn handle(&mut self, _route: &str, channel: u8, out: &mut Outbox<'_>) {
//!         let _ = out.send_file(channel, "/index.html", 2000);
//!     }
//! }
//!
//! let mut index = Index;
//! let mut server = Server::new(Uart, Ticker, Sd, Config::default());
//! server.attach_route("/", MatchMode::Prefix, &mut index).unwrap();
//! // server.start().unwrap();
//! loop {
//!     let _ = server.tick();
//! }
//! ```
//!
//! ## Platform support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.)
//! - Linux-based hosts with a serial adapter (development and testing)
//! - Any platform supporting Rust's `core` library
//!
//! ## Optional features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `defmt`: Enable defmt formatting of error types for embedded debugging

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

/// Transport boundary: the raw serial link to the modem and the host clock.
///
/// Everything above this module works against these traits, so the same
/// protocol engine runs on hardware UARTs, USB bridges or in-memory test
/// doubles.
pub mod transport;

/// Storage boundary for file streaming.
///
/// Provides the minimal open/read/close surface the file streamer needs from
/// an SD card, a flash filesystem or any other byte source addressed by path.
pub mod storage;

/// AT link layer: command/response matching and inbound notification
/// scanning over the raw byte stream.
pub mod modem;

/// The cooperative engine: route registry, work queue, file streaming and the
/// scheduler tick.
pub mod server;
