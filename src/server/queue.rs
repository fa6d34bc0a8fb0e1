//! FIFO work queue feeding the drain pass.
//!
//! Every outbound action is an item here: data payloads, file transfers,
//! raw commands and channel closes. Items for the same channel are strictly
//! ordered; items for different channels may overtake each other when a
//! channel is busy.

use heapless::{String, Vec};

use super::error::Error;

/// Maximum queued work items.
pub(crate) const MAX_QUEUE: usize = 16;

/// Maximum payload bytes per queued data item.
pub const MAX_PAYLOAD: usize = 256;

/// Maximum file path length per queued file item.
pub const MAX_PATH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WorkKind {
    /// Send a payload over the channel (two-phase CIPSEND).
    Data(Vec<u8, MAX_PAYLOAD>),
    /// Stream the file at this path over the channel, chunk by chunk.
    File(String<MAX_PATH>),
    /// Send a raw AT command (channel field is bookkeeping only).
    Command(Vec<u8, MAX_PAYLOAD>),
    /// Close the channel.
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WorkItem {
    pub channel: u8,
    pub timeout_ms: u32,
    pub kind: WorkKind,
}

#[derive(Debug)]
pub(crate) struct WorkQueue {
    items: Vec<WorkItem, MAX_QUEUE>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, index: usize) -> &WorkItem {
        &self.items[index]
    }

    pub fn remove(&mut self, index: usize) -> WorkItem {
        self.items.remove(index)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// First queued file item for `channel`, if any.
    pub fn find_file(&self, channel: u8) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.channel == channel && matches!(item.kind, WorkKind::File(_)))
    }

    pub fn push_data(&mut self, channel: u8, payload: &[u8], timeout_ms: u32) -> Result<(), Error> {
        let payload = Vec::from_slice(payload).map_err(|_| Error::PayloadTooLarge)?;
        self.push(WorkItem {
            channel,
            timeout_ms,
            kind: WorkKind::Data(payload),
        })
    }

    pub fn push_file(&mut self, channel: u8, path: &str, timeout_ms: u32) -> Result<(), Error> {
        let path = String::try_from(path).map_err(|_| Error::PathTooLong)?;
        self.push(WorkItem {
            channel,
            timeout_ms,
            kind: WorkKind::File(path),
        })
    }

    pub fn push_command(
        &mut self,
        channel: u8,
        command: &[u8],
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let command = Vec::from_slice(command).map_err(|_| Error::PayloadTooLarge)?;
        self.push(WorkItem {
            channel,
            timeout_ms,
            kind: WorkKind::Command(command),
        })
    }

    pub fn push_close(&mut self, channel: u8, timeout_ms: u32) -> Result<(), Error> {
        self.push(WorkItem {
            channel,
            timeout_ms,
            kind: WorkKind::Close,
        })
    }

    fn push(&mut self, item: WorkItem) -> Result<(), Error> {
        self.items.push(item).map_err(|_| Error::QueueFull)
    }
}

/// Enqueue-only view of the work queue handed to route handlers.
///
/// Handlers run in the middle of a tick; giving them the whole server would
/// let them recurse into the scheduler. Through an `Outbox` they can only
/// append work, which the same or a later tick drains.
#[derive(Debug)]
pub struct Outbox<'q> {
    queue: &'q mut WorkQueue,
}

impl<'q> Outbox<'q> {
    pub(crate) fn new(queue: &'q mut WorkQueue) -> Self {
        Self { queue }
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_fifo_order() {
        let mut queue = WorkQueue::new();
        queue.push_data(0, b"first", 100).unwrap();
        queue.push_close(0, 100).unwrap();
        queue.push_data(1, b"second", 100).unwrap();
        assert_eq!(queue.len(), 3);
        assert!(matches!(queue.get(0).kind, WorkKind::Data(_)));
        assert!(matches!(queue.get(1).kind, WorkKind::Close));
        assert_eq!(queue.remove(0).channel, 0);
        assert!(matches!(queue.get(0).kind, WorkKind::Close));
    }

    #[test]
    fn rejects_when_full() {
        let mut queue = WorkQueue::new();
        for _ in 0..MAX_QUEUE {
            queue.push_close(0, 100).unwrap();
        }
        assert_eq!(queue.push_close(0, 100), Err(Error::QueueFull));
    }

    #[test]
    fn rejects_oversized_payload() {
        let mut queue = WorkQueue::new();
        let big = [0u8; MAX_PAYLOAD + 1];
        assert_eq!(queue.push_data(0, &big, 100), Err(Error::PayloadTooLarge));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn finds_first_file_item_per_channel() {
        let mut queue = WorkQueue::new();
        queue.push_file(1, "/a.html", 100).unwrap();
        queue.push_file(0, "/b.html", 100).unwrap();
        queue.push_file(0, "/c.html", 100).unwrap();
        assert_eq!(queue.find_file(0), Some(1));
        assert_eq!(queue.find_file(2), None);
    }
}
