//! Bounded per-input packet ring with drop-oldest backpressure
//!
//! Each input executor owns one ring: the source fills a contiguous window
//! at the tail, the executor drains contiguous batches from the head. The
//! ring is never shared across threads. When the source outruns the
//! consumer the oldest pending batch is discarded rather than blocking the
//! producer.

use crate::packet::{PacketMetadata, TsPacket};

pub struct PacketRing {
    buffer: Vec<TsPacket>,
    metadata: Vec<PacketMetadata>,
    out_first: usize,
    out_count: usize,
    max_input_packets: usize,
}

impl PacketRing {
    pub fn new(capacity: usize, max_input_packets: usize) -> Self {
        assert!(capacity > 0);
        assert!(max_input_packets > 0);
        Self {
            buffer: vec![TsPacket::null(); capacity],
            metadata: vec![PacketMetadata::default(); capacity],
            out_first: 0,
            out_count: 0,
            max_input_packets,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of received packets not yet handed to the consumer.
    pub fn len(&self) -> usize {
        self.out_count
    }

    pub fn is_empty(&self) -> bool {
        self.out_count == 0
    }

    /// Drop-oldest backpressure: when the ring is full, advance the head
    /// past up to one receive batch. Returns the number of packets dropped.
    pub fn make_room(&mut self) -> usize {
        assert!(self.out_first < self.capacity());
        assert!(self.out_count <= self.capacity());
        if self.out_count < self.capacity() {
            return 0;
        }
        let dropped = self.max_input_packets.min(self.capacity() - self.out_first);
        self.out_first = (self.out_first + dropped) % self.capacity();
        self.out_count -= dropped;
        dropped
    }

    /// Contiguous window where the next batch is received:
    /// `(in_first, in_count)`. The ring must not be full.
    pub fn receive_range(&self) -> (usize, usize) {
        let cap = self.capacity();
        let in_first = (self.out_first + self.out_count) % cap;
        let in_count = self
            .max_input_packets
            .min(cap - self.out_count)
            .min(cap - in_first);
        (in_first, in_count)
    }

    /// Mutable access to a receive window. Metadata in the window is reset.
    pub fn window_mut(
        &mut self,
        first: usize,
        count: usize,
    ) -> (&mut [TsPacket], &mut [PacketMetadata]) {
        assert!(first + count <= self.capacity());
        let metadata = &mut self.metadata[first..first + count];
        for meta in metadata.iter_mut() {
            meta.reset();
        }
        (&mut self.buffer[first..first + count], metadata)
    }

    /// Account for `count` packets received into the current window.
    pub fn commit(&mut self, count: usize) {
        assert!(self.out_count + count <= self.capacity());
        self.out_count += count;
    }

    /// Oldest contiguous run of pending packets.
    pub fn pending(&self) -> (&[TsPacket], &[PacketMetadata]) {
        let run = self.out_count.min(self.capacity() - self.out_first);
        (
            &self.buffer[self.out_first..self.out_first + run],
            &self.metadata[self.out_first..self.out_first + run],
        )
    }

    /// Mark `count` packets from the head as consumed.
    pub fn consume(&mut self, count: usize) {
        assert!(count <= self.out_count);
        self.out_first = (self.out_first + count) % self.capacity();
        self.out_count -= count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Receive one full batch into the ring, tagging packets with PCRs
    /// `seq..seq+n` so they stay identifiable.
    fn fill_batch(ring: &mut PacketRing, seq: &mut u64) -> usize {
        let dropped = ring.make_room();
        let (first, count) = ring.receive_range();
        let (packets, _meta) = ring.window_mut(first, count);
        for pkt in packets.iter_mut() {
            *pkt = TsPacket::with_pcr(*seq);
            *seq += 1;
        }
        ring.commit(count);
        dropped
    }

    #[test]
    fn fills_up_to_capacity() {
        let mut ring = PacketRing::new(16, 4);
        let mut seq = 0;
        for _ in 0..4 {
            assert_eq!(fill_batch(&mut ring, &mut seq), 0);
        }
        assert_eq!(ring.len(), 16);
    }

    #[test]
    fn drop_oldest_when_full() {
        // Capacity 16, batches of 4, source produces 20 packets while the
        // consumer never drains.
        let mut ring = PacketRing::new(16, 4);
        let mut seq = 0;
        for _ in 0..4 {
            fill_batch(&mut ring, &mut seq);
        }
        let dropped = fill_batch(&mut ring, &mut seq);
        assert_eq!(dropped, 4);
        assert_eq!(ring.len(), 16);
        assert!(ring.len() <= ring.capacity());
        // The first batch is gone; the head now starts at packet 4.
        let (packets, _) = ring.pending();
        assert_eq!(packets[0].pcr(), Some(4));
    }

    #[test]
    fn consume_advances_head() {
        let mut ring = PacketRing::new(16, 4);
        let mut seq = 0;
        fill_batch(&mut ring, &mut seq);
        fill_batch(&mut ring, &mut seq);
        assert_eq!(ring.len(), 8);

        let run = ring.pending().0.len();
        assert_eq!(run, 8);
        ring.consume(4);
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.pending().0[0].pcr(), Some(4));
    }

    #[test]
    fn receive_window_wraps() {
        let mut ring = PacketRing::new(16, 8);
        let mut seq = 0;
        fill_batch(&mut ring, &mut seq); // 0..8
        ring.consume(8);
        fill_batch(&mut ring, &mut seq); // 8..16 at positions 8..16
        // Tail is at the physical end; the next window is clipped to the
        // wrap point even though more than 8 slots are free.
        let (first, count) = ring.receive_range();
        assert_eq!(first, 0);
        assert_eq!(count, 8);
    }

    #[test]
    fn pending_is_contiguous_after_wrap() {
        let mut ring = PacketRing::new(16, 8);
        let mut seq = 0;
        fill_batch(&mut ring, &mut seq);
        ring.consume(8);
        fill_batch(&mut ring, &mut seq); // occupies 8..16
        fill_batch(&mut ring, &mut seq); // wraps into 0..8
        assert_eq!(ring.len(), 16);
        // First run covers the physical tail only.
        let run = ring.pending().0.len();
        assert_eq!(run, 8);
        ring.consume(run);
        let (packets, _) = ring.pending();
        assert_eq!(packets.len(), 8);
        assert_eq!(packets[0].pcr(), Some(16));
    }

    #[test]
    fn window_resets_metadata() {
        let mut ring = PacketRing::new(16, 4);
        {
            let (first, count) = ring.receive_range();
            let (_pkts, meta) = ring.window_mut(first, count);
            for m in meta.iter_mut() {
                m.set_input_timestamp(42);
            }
        }
        // Same window again: metadata must come back clean.
        let (first, count) = ring.receive_range();
        let (_pkts, meta) = ring.window_mut(first, count);
        assert!(meta.iter().all(|m| !m.has_input_timestamp()));
    }
}
