//! USART receive/transmit ring buffer
//!
//! A single-producer single-consumer byte queue of [`BUFFER_SIZE`] bytes.
//! [`UsartBuffer::split`] hands out the two ends: the [`Producer`] goes to
//! the interrupt handler, the [`Consumer`] stays in the foreground. The
//! queue's head index is only written by the consumer and its tail index
//! only by the producer, so neither end needs a lock.

use heapless::spsc::{self, Queue};

use super::{UsartError, UsartResult};
use crate::config::BUFFER_SIZE;

/// Backing slots; one slot stays free to tell full from empty
pub const BUFFER_SLOTS: usize = BUFFER_SIZE + 1;

/// Byte FIFO holding up to [`BUFFER_SIZE`] bytes
pub struct UsartBuffer {
    queue: Queue<u8, BUFFER_SLOTS>,
}

impl UsartBuffer {
    /// An empty buffer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
        }
    }

    /// Drop all contents
    pub fn init(&mut self) {
        self.queue = Queue::new();
    }

    /// Append a byte
    ///
    /// # Errors
    ///
    /// `BufferFull` when [`BUFFER_SIZE`] bytes are queued; contents are
    /// unchanged.
    pub fn push(&mut self, byte: u8) -> UsartResult<()> {
        self.queue.enqueue(byte).map_err(|_| UsartError::BufferFull)
    }

    /// Remove the oldest byte
    ///
    /// # Errors
    ///
    /// `BufferEmpty` when nothing is queued.
    pub fn get_byte(&mut self) -> UsartResult<u8> {
        self.queue.dequeue().ok_or(UsartError::BufferEmpty)
    }

    /// Bytes queued
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether another push would fail
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    /// Maximum number of queued bytes
    #[must_use]
    pub const fn capacity(&self) -> usize {
        BUFFER_SIZE
    }

    /// Split into interrupt-side and foreground ends
    pub fn split(&mut self) -> (Producer<'_>, Consumer<'_>) {
        let (p, c) = self.queue.split();
        (Producer(p), Consumer(c))
    }
}

impl Default for UsartBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Writing end of a split [`UsartBuffer`]
pub struct Producer<'a>(spsc::Producer<'a, u8, BUFFER_SLOTS>);

impl Producer<'_> {
    /// Append a byte
    ///
    /// # Errors
    ///
    /// `BufferFull`; the byte is dropped.
    pub fn push(&mut self, byte: u8) -> UsartResult<()> {
        self.0.enqueue(byte).map_err(|_| UsartError::BufferFull)
    }

    /// Whether another push would fail
    #[must_use]
    pub fn is_full(&self) -> bool {
        !self.0.ready()
    }

    /// Bytes queued
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.len() == 0
    }
}

/// Reading end of a split [`UsartBuffer`]
pub struct Consumer<'a>(spsc::Consumer<'a, u8, BUFFER_SLOTS>);

impl Consumer<'_> {
    /// Remove the oldest byte
    ///
    /// # Errors
    ///
    /// `BufferEmpty` when nothing is queued.
    pub fn get_byte(&mut self) -> UsartResult<u8> {
        self.0.dequeue().ok_or(UsartError::BufferEmpty)
    }

    /// Oldest byte, left in place
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.0.peek().copied()
    }

    /// Bytes queued
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.0.ready()
    }
}
