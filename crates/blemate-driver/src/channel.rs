//! Byte channels the driver talks through.
//!
//! The driver only needs four things from a transport: how many bytes are
//! waiting, one byte at a time, a burst write, and a way to wait until the
//! write has drained. Reads must never block; the driver polls.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

/// A non-blocking, byte-oriented serial channel.
pub trait Channel {
    /// Number of received bytes ready to be read without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read one byte if one is available.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Queue `data` for transmission.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Wait until everything written has left the host.
    fn flush(&mut self) -> io::Result<()>;

    /// Human-readable name of the endpoint, for logs and metric labels.
    fn endpoint(&self) -> String {
        "channel".to_string()
    }
}

impl<T: Channel + ?Sized> Channel for Box<T> {
    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        (**self).read_byte()
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn endpoint(&self) -> String {
        (**self).endpoint()
    }
}

// ============================================================================
// TCP
// ============================================================================

/// Size of the scratch buffer used to drain the socket.
const TCP_READ_CHUNK: usize = 256;

/// A channel over a TCP connection to a UART bridge.
///
/// The socket runs in non-blocking mode; whatever it has ready is moved into
/// an internal queue each time availability is checked.
#[derive(Debug)]
pub struct TcpChannel {
    stream: TcpStream,
    rx: VecDeque<u8>,
    peer: String,
    closed: bool,
}

impl TcpChannel {
    /// Connect to a UART bridge.
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        Self::from_stream(stream)
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        stream.set_nonblocking(true)?;
        let peer = stream
            .peer_addr()
            .map(|a| format!("tcp://{}", a))
            .unwrap_or_else(|_| "tcp://unknown".to_string());
        Ok(TcpChannel {
            stream,
            rx: VecDeque::new(),
            peer,
            closed: false,
        })
    }

    /// Move everything the socket has ready into the receive queue.
    fn fill(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        let mut buf = [0u8; TCP_READ_CHUNK];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => {
                    self.closed = true;
                    return Ok(());
                }
                Ok(n) => self.rx.extend(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl Channel for TcpChannel {
    fn bytes_available(&mut self) -> io::Result<usize> {
        self.fill()?;
        if self.rx.is_empty() && self.closed {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{} closed the connection", self.peer),
            ));
        }
        Ok(self.rx.len())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if self.rx.is_empty() {
            self.fill()?;
        }
        Ok(self.rx.pop_front())
    }

    fn write_all(&mut self, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            match self.stream.write(data) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => data = &data[n..],
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => std::thread::yield_now(),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }

    fn endpoint(&self) -> String {
        self.peer.clone()
    }
}

// ============================================================================
// Serial port
// ============================================================================

#[cfg(feature = "serial")]
pub use serial::SerialChannel;

#[cfg(feature = "serial")]
mod serial {
    use super::Channel;
    use std::io::{self, Read, Write};
    use std::time::Duration;

    /// Read timeout for the underlying port. Reads are only issued when bytes
    /// are known to be waiting, so this only bounds pathological cases.
    const READ_TIMEOUT: Duration = Duration::from_millis(10);

    /// A channel over a native serial port.
    pub struct SerialChannel {
        port: Box<dyn serialport::SerialPort>,
        path: String,
    }

    impl SerialChannel {
        /// Open `path` at `baud` bps, 8N1, no flow control.
        pub fn open(path: &str, baud: u32) -> Result<Self, serialport::Error> {
            let port = serialport::new(path, baud).timeout(READ_TIMEOUT).open()?;
            Ok(SerialChannel {
                port,
                path: path.to_string(),
            })
        }
    }

    impl std::fmt::Debug for SerialChannel {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("SerialChannel").field("path", &self.path).finish()
        }
    }

    impl Channel for SerialChannel {
        fn bytes_available(&mut self) -> io::Result<usize> {
            Ok(self.port.bytes_to_read()? as usize)
        }

        fn read_byte(&mut self) -> io::Result<Option<u8>> {
            let mut byte = [0u8; 1];
            match self.port.read(&mut byte) {
                Ok(1) => Ok(Some(byte[0])),
                Ok(_) => Ok(None),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
                Err(e) => Err(e),
            }
        }

        fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
            Write::write_all(&mut self.port, data)
        }

        fn flush(&mut self) -> io::Result<()> {
            Write::flush(&mut self.port)
        }

        fn endpoint(&self) -> String {
            self.path.clone()
        }
    }
}
