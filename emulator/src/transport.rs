//! Links carrying protocol lines between the processor and the memory.
//!
//! A [`Link`] is an ordered, point-to-point, line-oriented channel. Two implementations exist:
//!   - [`StreamLink`], over any buffered reader and writer (typically stdin/stdout),
//!   - [`ChannelLink`], over a pair of `crossbeam` channels, optionally with a bounded wait on
//!     receive. It can also be bridged to a pair of byte streams with pump threads, which is how
//!     the processor talks to a memory running in a child process.

use std::io::{BufRead, BufReader, Read, Write};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel as cbc;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("the other side of the link hung up")]
    Disconnected,

    #[error("no reply after {0:?}")]
    Timeout(Duration),

    #[error("I/O error on the link")]
    Io(#[from] std::io::Error),
}

/// A bidirectional, ordered, line-oriented channel
pub trait Link {
    /// Send one line. The line must not contain a line break.
    ///
    /// # Errors
    ///
    /// Fails if the other side is gone or the underlying stream failed.
    fn send_line(&mut self, line: &str) -> Result<(), TransportError>;

    /// Receive the next line, without its line terminator.
    ///
    /// Returns `None` once the other side closed the link.
    ///
    /// # Errors
    ///
    /// Fails if the underlying stream failed, or on a bounded wait that expired.
    fn recv_line(&mut self) -> Result<Option<String>, TransportError>;
}

impl<L: Link + ?Sized> Link for &mut L {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        (**self).send_line(line)
    }

    fn recv_line(&mut self) -> Result<Option<String>, TransportError> {
        (**self).recv_line()
    }
}

/// A link over a reader and a writer. Every line is flushed as soon as it is sent.
pub struct StreamLink<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> StreamLink<R, W> {
    pub const fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R: BufRead, W: Write> Link for StreamLink<R, W> {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }

    fn recv_line(&mut self) -> Result<Option<String>, TransportError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        let len = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(len);
        Ok(Some(line))
    }
}

/// A link over a pair of channels
#[derive(Debug)]
pub struct ChannelLink {
    tx: cbc::Sender<String>,
    rx: cbc::Receiver<String>,
    timeout: Option<Duration>,
}

impl ChannelLink {
    /// Create two connected ends of a link, both waiting indefinitely on receive
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = cbc::unbounded();
        let (b_tx, a_rx) = cbc::unbounded();
        (
            Self {
                tx: a_tx,
                rx: a_rx,
                timeout: None,
            },
            Self {
                tx: b_tx,
                rx: b_rx,
                timeout: None,
            },
        )
    }

    /// Bound the wait of [`Link::recv_line`]. `None` waits forever.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bridge a pair of byte streams to a channel link.
    ///
    /// Two threads pump lines between the streams and the channels. The reader thread stops at
    /// the end of the stream; the writer thread stops once the returned link is dropped, closing
    /// the writer. The writer thread handle is returned so the caller can make sure every line
    /// was flushed.
    ///
    /// # Errors
    ///
    /// Fails if one of the threads can't be spawned.
    pub fn over_streams<R, W>(
        reader: R,
        writer: W,
    ) -> std::io::Result<(Self, JoinHandle<std::io::Result<()>>)>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let (local, remote) = Self::pair();
        let Self {
            tx: remote_tx,
            rx: remote_rx,
            ..
        } = remote;

        std::thread::Builder::new()
            .name("link-reader".into())
            .spawn(move || {
                for line in BufReader::new(reader).lines() {
                    let Ok(line) = line else { break };
                    if remote_tx.send(line).is_err() {
                        break;
                    }
                }
                debug!("Link reader reached end of stream");
            })?;

        let writer = std::thread::Builder::new()
            .name("link-writer".into())
            .spawn(move || {
                let mut writer = writer;
                for line in remote_rx {
                    writeln!(writer, "{line}")?;
                    writer.flush()?;
                }
                debug!("Link writer closed");
                Ok(())
            })?;

        Ok((local, writer))
    }

    /// Receive a line if one is already waiting
    #[must_use]
    pub fn try_recv_line(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

impl Link for ChannelLink {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        trace!(line, "Sending");
        self.tx
            .send(line.to_owned())
            .map_err(|_| TransportError::Disconnected)
    }

    fn recv_line(&mut self) -> Result<Option<String>, TransportError> {
        let line = match self.timeout {
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(line) => Some(line),
                Err(cbc::RecvTimeoutError::Timeout) => return Err(TransportError::Timeout(timeout)),
                Err(cbc::RecvTimeoutError::Disconnected) => None,
            },
            None => self.rx.recv().ok(),
        };

        trace!(?line, "Received");
        Ok(line)
    }
}
