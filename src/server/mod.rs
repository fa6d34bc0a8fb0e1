//! Cooperative serving engine.
//!
//! [`Server`] ties the layers together: it polls the [`Link`](crate::modem::Link)
//! for inbound request notifications, dispatches them through the route
//! registry, and drains the work queue one pass per [`tick`](Server::tick).
//! Nothing happens between ticks; the host owns the loop.
//!
//! ## Scheduling rules
//!
//! - Per drain pass, at most one item is executed per channel; later items
//!   for a busy channel wait for the next tick, other channels proceed.
//! - Executing a `Close` arms a quiescent window (500 ms) during which no
//!   further queue work runs on any channel, giving the modem time to settle.
//! - At most one file transfer is in flight at a time, and it moves at most
//!   one chunk per tick.

mod error;
mod queue;
mod router;

use core::fmt::Write as _;

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::modem::{Inbound, Link, Reply, Response, ResponseKind, ScanEnd, decimal, find_slice};
use crate::storage::{File, FileStore};
use crate::transport::{Clock, SerialPort};

pub use error::Error;
pub use queue::{MAX_PATH, MAX_PAYLOAD, Outbox};
pub use router::{Handler, MAX_ROUTES, MatchMode};

use queue::{WorkKind, WorkQueue};
use router::Router;

/// Logical connection channels supported by the modem (ids 0-4).
pub const MAX_CHANNELS: usize = 5;

/// Upper bound for the configurable chunk size.
pub const CHUNK_CAP: usize = 256;

/// Maximum SSID length in bytes.
pub const MAX_SSID: usize = 32;

/// Maximum passphrase length in bytes.
pub const MAX_PASSWORD: usize = 64;

/// Scan window opened when unread bytes are waiting at the top of a tick.
const POLL_WINDOW_MS: u32 = 500;

/// Short scan window used to drain stale bytes before writing a command.
const DRAIN_WINDOW_MS: u32 = 50;

/// Timeout for the `> ` payload prompt after a send directive.
const PROMPT_TIMEOUT_MS: u32 = 30;

/// Quiescent window armed after closing a channel.
const CLOSE_QUIESCENT_MS: u64 = 500;

/// Timeout for the close acknowledgement.
const CLOSE_TIMEOUT_MS: u32 = 100;

/// Default timeout for engine-generated payloads (404, file errors).
const DATA_TIMEOUT_MS: u32 = 2000;

/// Join attempts before giving up on the configured access point.
const JOIN_ATTEMPTS: usize = 5;

const NOT_FOUND_BODY: &[u8] = b"404 - Not found";

/// Radio operating mode, as accepted by `AT+CWMODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WifiMode {
    /// Join an existing access point.
    Station,
    /// Run a soft access point.
    AccessPoint,
    /// Both at once.
    Both,
}

impl WifiMode {
    fn at_value(self) -> u8 {
        match self {
            WifiMode::Station => 1,
            WifiMode::AccessPoint => 2,
            WifiMode::Both => 3,
        }
    }
}

/// Server configuration.
///
/// Loadable from a JSON blob with [`Config::from_json`]; omitted fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network name: the AP to join in station mode, or the advertised name
    /// in access-point mode.
    pub ssid: String<MAX_SSID>,
    /// Network passphrase.
    pub password: String<MAX_PASSWORD>,
    /// Radio operating mode.
    pub mode: WifiMode,
    /// UART baud rate the modem is expected to run at.
    pub baud_rate: u32,
    /// TCP port the listener is started on.
    pub server_port: u16,
    /// File streaming chunk size in bytes (clamped to [`CHUNK_CAP`]).
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ssid: String::try_from("default").unwrap_or_default(),
            password: String::new(),
            mode: WifiMode::AccessPoint,
            baud_rate: 115_200,
            server_port: 80,
            chunk_size: 64,
        }
    }
}

impl Config {
    /// Parses a configuration from a JSON blob.
    pub fn from_json(data: &[u8]) -> Result<Self, Error> {
        serde_json_core::de::from_slice(data)
            .map(|(config, _)| config)
            .map_err(|_| Error::InvalidConfig)
    }
}

/// State of the single in-flight file transfer.
#[derive(Debug)]
struct Transfer<F> {
    file: F,
    channel: u8,
    timeout_ms: u32,
    chunk: heapless::Vec<u8, CHUNK_CAP>,
    eof: bool,
}

/// The cooperative AT-modem server.
///
/// Generic over the serial port, the clock and the file store. Handlers are
/// borrowed for `'h`, so they outlive the server and may carry state of
/// their own.
pub struct Server<'h, P, C, S: FileStore> {
    link: Link<P, C>,
    store: S,
    config: Config,
    router: Router<'h>,
    queue: WorkQueue,
    transfer: Option<Transfer<S::File>>,
    quiet_until: u64,
}

impl<P, C, S: FileStore> core::fmt::Debug for Server<'_, P, C, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("queued", &self.queue.len())
            .field("transfer_active", &self.transfer.is_some())
            .field("quiet_until", &self.quiet_until)
            .finish_non_exhaustive()
    }
}

impl<'h, P: SerialPort, C: Clock, S: FileStore> Server<'h, P, C, S> {
    /// Creates a server over `port`, driven by `clock`, streaming files from
    /// `store`.
    pub fn new(port: P, clock: C, store: S, mut config: Config) -> Self {
        config.chunk_size = config.chunk_size.clamp(1, CHUNK_CAP);
        Self {
            link: Link::new(port, clock),
            store,
            config,
            router: Router::new(),
            queue: WorkQueue::new(),
            transfer: None,
            quiet_until: 0,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sets the network name used at the next [`start`](Server::start).
    pub fn set_ssid(&mut self, ssid: &str) -> Result<(), Error> {
        self.config.ssid = String::try_from(ssid).map_err(|_| Error::BufferOverflow)?;
        Ok(())
    }

    /// Sets the passphrase used at the next [`start`](Server::start).
    pub fn set_password(&mut self, password: &str) -> Result<(), Error> {
        self.config.password = String::try_from(password).map_err(|_| Error::BufferOverflow)?;
        Ok(())
    }

    /// Sets the radio mode used at the next [`start`](Server::start).
    pub fn set_mode(&mut self, mode: WifiMode) {
        self.config.mode = mode;
    }

    /// Switches the modem UART to `baud` and records it in the config.
    ///
    /// The host side of the UART must be reconfigured by the caller once the
    /// acknowledgement has been received at the old rate.
    pub fn set_baud_rate(&mut self, baud: u32) -> Result<Response, Error> {
        let mut cmd: String<24> = String::new();
        let _ = write!(cmd, "AT+CIOBAUD={baud}");
        let response = self.command(cmd.as_bytes(), 200, true, ResponseKind::Generic)?;
        self.config.baud_rate = baud;
        Ok(response)
    }

    /// Queries the modem for its current addresses (`AT+CIFSR`).
    ///
    /// Returns the raw response text; its exact shape varies across firmware
    /// revisions, so no parsing is attempted. Intended for setup and
    /// diagnostics, before the tick loop starts serving requests.
    pub fn radio_info(&mut self) -> Result<Response, Error> {
        self.command(b"AT+CIFSR", 150, true, ResponseKind::Generic)
    }

    /// Brings the radio up and starts the multi-connection listener.
    ///
    /// Resets the modem, applies the configured mode and credentials, then
    /// enables multiplexing and the TCP server. In station or combined mode
    /// the join is retried a few times; a failed join leaves the listener
    /// running without an uplink rather than failing the call.
    pub fn start(&mut self) -> Result<(), Error> {
        self.queue.clear();
        if let Some(transfer) = self.transfer.take() {
            let _ = transfer.file.close();
        }

        self.command(b"AT+RST", 1500, true, ResponseKind::DeviceReady)?;

        let mut cmd: String<160> = String::new();
        let _ = write!(cmd, "AT+CWMODE={}", self.config.mode.at_value());
        self.command(cmd.as_bytes(), 300, true, ResponseKind::Generic)?;

        if self.config.mode != WifiMode::Station {
            cmd.clear();
            let _ = write!(
                cmd,
                "AT+CWSAP=\"{}\",\"{}\",1,0",
                self.config.ssid, self.config.password
            );
            self.command(cmd.as_bytes(), 1500, true, ResponseKind::Generic)?;
        }

        if self.config.mode != WifiMode::AccessPoint {
            for _ in 0..JOIN_ATTEMPTS {
                cmd.clear();
                let _ = write!(
                    cmd,
                    "AT+CWJAP=\"{}\",\"{}\"",
                    self.config.ssid, self.config.password
                );
                let response = self.command(cmd.as_bytes(), 10_000, true, ResponseKind::Generic)?;
                if find_slice(&response, b"OK").is_some() {
                    break;
                }
            }
        }

        self.command(b"AT+CIPMUX=1", 400, true, ResponseKind::Generic)?;

        cmd.clear();
        let _ = write!(cmd, "AT+CIPSERVER=1,{}", self.config.server_port);
        self.command(cmd.as_bytes(), 500, true, ResponseKind::Generic)?;
        Ok(())
    }

    /// Attaches `handler` under `pattern` with the given match mode.
    ///
    /// Routes are consulted in attachment order; the first match wins.
    pub fn attach_route(
        &mut self,
        pattern: &str,
        mode: MatchMode,
        handler: &'h mut dyn Handler,
    ) -> Result<(), Error> {
        self.router.attach(pattern, mode, handler)
    }

    /// Attaches `handler` under `pattern` with exact matching.
    pub fn attach(&mut self, pattern: &str, handler: &'h mut dyn Handler) -> Result<(), Error> {
        self.router.attach(pattern, MatchMode::Exact, handler)
    }

    /// Detaches all routes.
    pub fn clear_routes(&mut self) {
        self.router.clear();
    }

    /// Queues `payload` to be sent over `channel`.
    pub fn send_data(&mut self, channel: u8, payload: &[u8], timeout_ms: u32) -> Result<(), Error> {
        self.queue.push_data(channel, payload, timeout_ms)
    }

    /// Queues the file at `path` to be streamed over `channel`.
    pub fn send_file(&mut self, channel: u8, path: &str, timeout_ms: u32) -> Result<(), Error> {
        self.queue.push_file(channel, path, timeout_ms)
    }

    /// Queues a raw AT command, attributed to `channel` for ordering.
    pub fn send_raw(&mut self, channel: u8, command: &[u8], timeout_ms: u32) -> Result<(), Error> {
        self.queue.push_command(channel, command, timeout_ms)
    }

    /// Runs one scheduler pass. Call this from the host's main loop.
    ///
    /// One tick: poll for an inbound notification if bytes are waiting,
    /// drain the work queue (unless inside a close-quiescent window), then
    /// move the in-flight file transfer by at most one chunk.
    pub fn tick(&mut self) -> Result<(), Error> {
        if self.link.available() {
            if let Some(inbound) = self.link.poll(POLL_WINDOW_MS)? {
                self.dispatch(inbound)?;
            }
        }
        if self.link.now_ms() >= self.quiet_until {
            self.drain_queue()?;
        }
        if self.transfer.is_some() {
            self.transfer_step()?;
        }
        Ok(())
    }

    /// Sends a command through the link, first draining any stale inbound
    /// bytes (which may dispatch a request), and dispatching a notification
    /// that cut the response scan short.
    fn command(
        &mut self,
        command: &[u8],
        timeout_ms: u32,
        append_crlf: bool,
        kind: ResponseKind,
    ) -> Result<Response, Error> {
        while self.link.available() {
            if let Some(inbound) = self.link.poll(DRAIN_WINDOW_MS)? {
                self.dispatch(inbound)?;
            }
        }
        let Reply { bytes, end } = self.link.send(command, timeout_ms, append_crlf, kind)?;
        if let ScanEnd::Inbound(inbound) = end {
            self.dispatch(inbound)?;
        }
        Ok(bytes)
    }

    /// Routes one inbound notification: run the matching handler or queue
    /// the 404 payload, then queue the close.
    fn dispatch(&mut self, inbound: Inbound) -> Result<(), Error> {
        let channel = inbound.channel;
        if channel as usize >= MAX_CHANNELS {
            // Firmware glitch or line noise; nothing sane to answer on.
            return Ok(());
        }
        let matched = core::str::from_utf8(&inbound.route)
            .ok()
            .and_then(|route| self.router.find(route.as_bytes()).map(|idx| (idx, route)));
        match matched {
            Some((index, route)) => {
                let mut out = Outbox::new(&mut self.queue);
                self.router.handler_mut(index).handle(route, channel, &mut out);
            }
            None => {
                self.queue.push_data(channel, NOT_FOUND_BODY, DATA_TIMEOUT_MS)?;
            }
        }
        self.queue.push_close(channel, CLOSE_TIMEOUT_MS)?;
        Ok(())
    }

    /// One pass over the queue: executes at most one item per channel,
    /// skipping channels already served this pass. Executing a close stops
    /// the pass for everyone by marking all channels busy.
    fn drain_queue(&mut self) -> Result<(), Error> {
        let mut busy = [false; MAX_CHANNELS];
        let mut index = 0;
        while index < self.queue.len() {
            let channel = self.queue.get(index).channel;
            let slot = channel as usize;
            if slot >= MAX_CHANNELS {
                self.queue.remove(index);
                continue;
            }
            if busy[slot] {
                index += 1;
                continue;
            }
            let item = self.queue.get(index).clone();
            match item.kind {
                WorkKind::Close => {
                    self.queue.remove(index);
                    let mut cmd: String<16> = String::new();
                    let _ = cmd.push_str("AT+CIPCLOSE=");
                    let _ = cmd.push_str(&decimal(i32::from(channel)));
                    self.command(cmd.as_bytes(), item.timeout_ms, true, ResponseKind::Generic)?;
                    self.quiet_until = self.link.now_ms() + CLOSE_QUIESCENT_MS;
                    busy = [true; MAX_CHANNELS];
                }
                WorkKind::Command(command) => {
                    self.queue.remove(index);
                    self.command(&command, item.timeout_ms, true, ResponseKind::Generic)?;
                    busy[slot] = true;
                }
                WorkKind::Data(payload) => {
                    self.queue.remove(index);
                    self.transmit(channel, &payload, item.timeout_ms)?;
                    busy[slot] = true;
                }
                WorkKind::File(path) => {
                    if self.transfer.is_none() {
                        match self.store.open(path.as_str()) {
                            Ok(file) => {
                                // The item stays queued as the transfer's
                                // marker; it is removed on completion.
                                self.transfer = Some(Transfer {
                                    file,
                                    channel,
                                    timeout_ms: item.timeout_ms,
                                    chunk: heapless::Vec::new(),
                                    eof: false,
                                });
                                index += 1;
                            }
                            Err(_) => {
                                self.queue.remove(index);
                                let mut body: heapless::Vec<u8, MAX_PAYLOAD> = heapless::Vec::new();
                                let _ = body.extend_from_slice(b"ERROR - File not found: ");
                                let _ = body.extend_from_slice(path.as_bytes());
                                self.queue.push_data(channel, &body, item.timeout_ms)?;
                            }
                        }
                    } else {
                        index += 1;
                    }
                    busy[slot] = true;
                }
            }
        }
        Ok(())
    }

    /// Two-phase channel send: `AT+CIPSEND` directive, wait for the `> `
    /// prompt, then the raw payload, wait for `SEND OK`.
    fn transmit(&mut self, channel: u8, payload: &[u8], timeout_ms: u32) -> Result<(), Error> {
        let mut directive: String<24> = String::new();
        let _ = directive.push_str("AT+CIPSEND=");
        let _ = directive.push_str(&decimal(i32::from(channel)));
        let _ = directive.push(',');
        let _ = directive.push_str(&decimal(payload.len() as i32));
        self.command(
            directive.as_bytes(),
            PROMPT_TIMEOUT_MS,
            true,
            ResponseKind::SendPrompt,
        )?;
        self.command(payload, timeout_ms, false, ResponseKind::BulkAccepted)?;
        Ok(())
    }

    /// Moves the in-flight transfer by at most one chunk: top up the chunk
    /// buffer from the file, flush it once full (or at EOF), and tear the
    /// transfer down when everything has gone out.
    fn transfer_step(&mut self) -> Result<(), Error> {
        let quiet_done = self.link.now_ms() >= self.quiet_until;
        let chunk_size = self.config.chunk_size;

        let mut outgoing: Option<(u8, u32, heapless::Vec<u8, CHUNK_CAP>)> = None;
        let mut finished = false;
        if let Some(transfer) = self.transfer.as_mut() {
            if transfer.chunk.len() < chunk_size && !transfer.eof {
                let mut buf = [0u8; CHUNK_CAP];
                let want = chunk_size - transfer.chunk.len();
                match transfer.file.read(&mut buf[..want]) {
                    Ok(0) | Err(_) => transfer.eof = true,
                    Ok(n) => {
                        let _ = transfer.chunk.extend_from_slice(&buf[..n]);
                    }
                }
            }
            let flush = transfer.eof || transfer.chunk.len() >= chunk_size;
            if flush && !transfer.chunk.is_empty() && quiet_done {
                outgoing = Some((
                    transfer.channel,
                    transfer.timeout_ms,
                    core::mem::take(&mut transfer.chunk),
                ));
            }
            if transfer.eof && (quiet_done || transfer.chunk.is_empty()) {
                finished = true;
            }
        }

        if let Some((channel, timeout_ms, chunk)) = outgoing {
            self.transmit(channel, &chunk, timeout_ms)?;
        }
        if finished {
            if let Some(transfer) = self.transfer.take() {
                let channel = transfer.channel;
                let _ = transfer.file.close();
                if let Some(index) = self.queue.find_file(channel) {
                    self.queue.remove(index);
                }
            }
        }
        Ok(())
    }
}
