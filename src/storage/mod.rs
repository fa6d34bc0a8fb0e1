//! Path-addressed file access for the streaming engine.
//!
//! The server streams files it does not own a copy of: it opens a path on a
//! [`FileStore`], reads one chunk per tick from the returned [`File`] and
//! closes it when the transfer completes. SD card drivers, flash filesystems
//! and in-memory stores all fit behind these two traits.

pub mod error;

/// An open file being streamed out.
pub trait File {
    /// The type of error that can occur while reading or closing.
    type Error: core::fmt::Debug;

    /// Reads up to `buf.len()` bytes from the current position.
    ///
    /// Returns the number of bytes read; `Ok(0)` means end of file. Short
    /// reads are fine, the caller keeps asking until it sees `Ok(0)`.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Closes the file, releasing its handle.
    fn close(self) -> Result<(), Self::Error>;
}

/// A source of files addressed by path.
pub trait FileStore {
    /// The open-file type this store produces.
    type File: File;
    /// The type of error that can occur while opening.
    type Error: core::fmt::Debug;

    /// Opens the file at `path` for reading.
    fn open(&mut self, path: &str) -> Result<Self::File, Self::Error>;
}
