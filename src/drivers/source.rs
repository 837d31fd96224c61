use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::time::Duration;
use log::{info, warn};
use crate::drivers::reassembler::FRAME_LEN;
use crate::drivers::LinkError;
/// Largest notification payload after MTU 247 negotiation.
pub const MAX_CHUNK_LEN: usize = 247;
/// What the transport hands to the core, in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    Chunk(Vec<u8>),
    Disconnected,
}
/// Trait representing something that yields transport events on demand.
///
/// `Ok(None)` means "nothing right now"; the caller may poll again.
pub trait ChunkSource {
    fn next_event(&mut self) -> Result<Option<TransportEvent>, LinkError>;
}
impl<S: ChunkSource + ?Sized> ChunkSource for Box<S> {
    fn next_event(&mut self) -> Result<Option<TransportEvent>, LinkError> {
        (**self).next_event()
    }
}
/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<TransportEvent>,
}
impl ManualSource {
    pub fn new(events: impl IntoIterator<Item = TransportEvent>) -> Self {
        Self {
            queue: events.into_iter().collect(),
        }
    }
    /// Splits `bytes` into chunks of `chunk_len` and queues them.
    pub fn from_stream(bytes: &[u8], chunk_len: usize) -> Self {
        Self::new(
            bytes
                .chunks(chunk_len.max(1))
                .map(|c| TransportEvent::Chunk(c.to_vec())),
        )
    }
    pub fn push(&mut self, event: TransportEvent) {
        self.queue.push_back(event);
    }
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
impl ChunkSource for ManualSource {
    fn next_event(&mut self) -> Result<Option<TransportEvent>, LinkError> {
        Ok(self.queue.pop_front())
    }
}
/// Reads notification payloads forwarded by a BLE-to-UART bridge.
///
/// A UART read does not keep notification boundaries: one read may carry
/// several reports. Each read is cut into pieces of at most `FRAME_LEN`
/// bytes, so the reassembler never sees an oversized chunk. The link is not
/// retried: once it breaks the source reports one disconnect and then closes.
pub struct SerialSource {
    port: Box<dyn serialport::SerialPort>,
    buf: [u8; MAX_CHUNK_LEN],
    pending: VecDeque<Vec<u8>>,
    closed: bool,
}
impl SerialSource {
    pub fn open(path: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self, LinkError> {
        let port = serialport::new(path, baud_rate)
            .timeout(read_timeout)
            .open()?;
        info!("serial bridge opened: {path} @ {baud_rate} baud");
        Ok(Self::from_port(port))
    }
    /// Wraps a port that is already open and configured.
    pub fn from_port(port: Box<dyn serialport::SerialPort>) -> Self {
        Self {
            port,
            buf: [0u8; MAX_CHUNK_LEN],
            pending: VecDeque::new(),
            closed: false,
        }
    }
}
impl ChunkSource for SerialSource {
    fn next_event(&mut self) -> Result<Option<TransportEvent>, LinkError> {
        if let Some(chunk) = self.pending.pop_front() {
            return Ok(Some(TransportEvent::Chunk(chunk)));
        }
        if self.closed {
            return Err(LinkError::SourceClosed);
        }
        match self.port.read(&mut self.buf) {
            Ok(0) => Ok(None),
            Ok(n) => {
                self.pending.extend(self.buf[..n].chunks(FRAME_LEN).map(<[u8]>::to_vec));
                Ok(self.pending.pop_front().map(TransportEvent::Chunk))
            }
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(e) => {
                warn!("serial bridge lost: {e}");
                self.closed = true;
                Ok(Some(TransportEvent::Disconnected))
            }
        }
    }
}
