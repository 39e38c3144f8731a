//! Lock-Free Sample Buffer
//!
//! SPSC ring buffer connecting a location provider (producer) to the
//! classifying consumer. The producer side never blocks: a provider
//! delivers fixes on its own schedule and must not stall behind a slow
//! consumer. Overflow drops the event and increments a counter.
//!
//! Built on the `rtrb` crate, with sequence numbers and statistics kept
//! alongside the raw buffer.

use super::types::ProviderEvent;
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default buffer capacity (must be a power of 2).
pub const DEFAULT_CAPACITY: usize = 1024;

/// One buffered provider event with its stream sequence number.
#[derive(Debug, Clone)]
pub struct StreamSlot {
    /// The buffered event.
    pub event: ProviderEvent,
    /// Position in the stream, starting at 0.
    pub sequence: u64,
}

/// Buffer statistics for monitoring.
#[derive(Debug, Default)]
pub struct BufferStats {
    /// Total events pushed.
    pub events_pushed: AtomicU64,
    /// Events dropped because the buffer was full.
    pub events_dropped: AtomicU64,
    /// Events successfully consumed.
    pub events_consumed: AtomicU64,
    /// Peak buffer occupancy.
    pub peak_occupancy: AtomicU64,
}

/// SPSC buffer of provider events.
pub struct SampleRingBuffer {
    producer: Option<Producer<StreamSlot>>,
    consumer: Option<Consumer<StreamSlot>>,
    sequence: AtomicU64,
    stats: Arc<BufferStats>,
    capacity: usize,
}

impl SampleRingBuffer {
    /// Create a buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a buffer with the given capacity.
    ///
    /// # Panics
    /// Panics if `capacity` is not a power of 2.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "Sample buffer capacity must be a power of 2"
        );

        let (producer, consumer) = RingBuffer::new(capacity);

        Self {
            producer: Some(producer),
            consumer: Some(consumer),
            sequence: AtomicU64::new(0),
            stats: Arc::new(BufferStats::default()),
            capacity,
        }
    }

    /// Split into the producer half (provider thread) and the consumer
    /// half (classifier loop). Must be called exactly once.
    pub fn split(mut self) -> (SampleProducer, SampleConsumer) {
        let producer = self.producer.take().expect("Producer already taken");
        let consumer = self.consumer.take().expect("Consumer already taken");

        (
            SampleProducer {
                inner: producer,
                sequence: Arc::new(self.sequence),
                stats: Arc::clone(&self.stats),
                capacity: self.capacity,
            },
            SampleConsumer {
                inner: consumer,
                stats: Arc::clone(&self.stats),
            },
        )
    }

    /// Shared statistics handle.
    pub fn stats(&self) -> Arc<BufferStats> {
        Arc::clone(&self.stats)
    }
}

impl Default for SampleRingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer half of the sample buffer.
pub struct SampleProducer {
    inner: Producer<StreamSlot>,
    sequence: Arc<AtomicU64>,
    stats: Arc<BufferStats>,
    capacity: usize,
}

impl SampleProducer {
    /// Push an event into the buffer.
    ///
    /// Lock-free and non-blocking. If the buffer is full the event is
    /// dropped and counted. Returns true if the event was buffered.
    #[inline]
    pub fn push(&mut self, event: ProviderEvent) -> bool {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let slot = StreamSlot { event, sequence };

        match self.inner.push(slot) {
            Ok(()) => {
                self.stats.events_pushed.fetch_add(1, Ordering::Relaxed);

                // Update peak occupancy
                let occupied = self.capacity - self.inner.slots();
                let mut peak = self.stats.peak_occupancy.load(Ordering::Relaxed);
                while occupied as u64 > peak {
                    match self.stats.peak_occupancy.compare_exchange_weak(
                        peak,
                        occupied as u64,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => break,
                        Err(p) => peak = p,
                    }
                }

                true
            }
            Err(_) => {
                self.stats.events_dropped.fetch_add(1, Ordering::Relaxed);
                // Roll back so sequence numbers stay gapless
                self.sequence.fetch_sub(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Free slots remaining.
    #[inline]
    pub fn available_slots(&self) -> usize {
        self.inner.slots()
    }

    /// Whether the buffer is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    /// Current sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

/// Consumer half of the sample buffer.
pub struct SampleConsumer {
    inner: Consumer<StreamSlot>,
    stats: Arc<BufferStats>,
}

impl SampleConsumer {
    /// Pop the next event, if any.
    #[inline]
    pub fn pop(&mut self) -> Option<StreamSlot> {
        match self.inner.pop() {
            Ok(slot) => {
                self.stats.events_consumed.fetch_add(1, Ordering::Relaxed);
                Some(slot)
            }
            Err(_) => None,
        }
    }

    /// Whether any events are waiting.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of events waiting.
    #[inline]
    pub fn available(&self) -> usize {
        self.inner.slots()
    }

    /// Pop up to `max_count` events at once.
    pub fn pop_batch(&mut self, max_count: usize) -> Vec<StreamSlot> {
        let mut batch = Vec::with_capacity(max_count.min(64));
        for _ in 0..max_count {
            if let Some(slot) = self.pop() {
                batch.push(slot);
            } else {
                break;
            }
        }
        batch
    }
}
