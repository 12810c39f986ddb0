//! Gapless playback of agent audio.
//!
//! The protocol side holds a [`PlaybackHandle`] and pushes decoded PCM16 chunks
//! and interrupt controls into a single-producer/single-consumer ring. The audio
//! callback owns the [`AudioConcatProcessor`] and pulls exactly as many samples
//! as the device asks for. Neither side ever waits on the other: a full ring
//! rejects the control instead of blocking the producer, and the consumer only
//! drains what is already there.

use crate::audio::sample_to_f32;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::collections::VecDeque;

/// Number of pending controls the ring can hold between two pulls.
pub const DEFAULT_CONTROL_CAPACITY: usize = 512;

const QUEUE_PREALLOCATION: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("playback control queue is full")]
    Full,
}

enum Control {
    Enqueue(Vec<u8>),
    Interrupt,
    ClearIfInterrupted,
}

/// Creates a connected producer handle and processor.
pub fn playback_channel(capacity: usize) -> (PlaybackHandle, AudioConcatProcessor) {
    let (tx, rx) = HeapRb::<Control>::new(capacity).split();
    (PlaybackHandle { tx }, AudioConcatProcessor::new(rx))
}

/// Producer half, used from the protocol event context.
pub struct PlaybackHandle {
    tx: HeapProd<Control>,
}

impl PlaybackHandle {
    /// Queues a chunk of little-endian PCM16 bytes and clears a pending interrupt.
    pub fn enqueue(&mut self, chunk: Vec<u8>) -> Result<(), PlaybackError> {
        self.push(Control::Enqueue(chunk))
    }

    /// Marks the buffered audio as stale without dropping it yet.
    pub fn interrupt(&mut self) -> Result<(), PlaybackError> {
        self.push(Control::Interrupt)
    }

    /// Drops all buffered audio if it is still marked stale.
    pub fn clear_if_interrupted(&mut self) -> Result<(), PlaybackError> {
        self.push(Control::ClearIfInterrupted)
    }

    fn push(&mut self, control: Control) -> Result<(), PlaybackError> {
        self.tx.try_push(control).map_err(|_| PlaybackError::Full)
    }
}

/// Consumer half, driven by the playback sink's real-time callback.
pub struct AudioConcatProcessor {
    controls: HeapCons<Control>,
    queue: VecDeque<Vec<u8>>,
    current: Option<Vec<u8>>,
    /// Byte offset into `current`.
    position: usize,
    interrupted: bool,
    exhausted: bool,
    on_exhausted: Option<Box<dyn FnMut() + Send>>,
}

impl AudioConcatProcessor {
    fn new(controls: HeapCons<Control>) -> Self {
        Self {
            controls,
            queue: VecDeque::with_capacity(QUEUE_PREALLOCATION),
            current: None,
            position: 0,
            interrupted: false,
            // Nothing has played yet, so an initial empty pull is not a transition.
            exhausted: true,
            on_exhausted: None,
        }
    }

    /// Installs a callback invoked once each time playback runs dry.
    pub fn with_exhausted_callback(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_exhausted = Some(Box::new(callback));
        self
    }

    /// Fills `out` with the next samples. Positions past the end of the queued
    /// audio are set to silence.
    ///
    /// Returns `true` only on the pull where the queue runs dry after having
    /// had audio; later empty pulls return `false` until new audio is played
    /// out again.
    pub fn pull(&mut self, out: &mut [f32]) -> bool {
        self.apply_controls();

        let mut written = 0;
        while written < out.len() {
            if self.current.is_none() {
                match self.queue.pop_front() {
                    Some(next) => {
                        self.current = Some(next);
                        self.position = 0;
                    }
                    None => break,
                }
            }
            let Some(chunk) = self.current.as_deref() else {
                break;
            };

            let available = (chunk.len() - self.position) / 2;
            let take = available.min(out.len() - written);
            let source = chunk[self.position..].chunks_exact(2);
            for (slot, pair) in out[written..written + take].iter_mut().zip(source) {
                *slot = sample_to_f32(i16::from_le_bytes([pair[0], pair[1]]));
            }
            written += take;
            self.position += take * 2;

            if chunk.len() - self.position < 2 {
                self.current = None;
                self.position = 0;
            }
        }

        if written > 0 {
            self.exhausted = false;
        }

        if written < out.len() {
            out[written..].fill(0.0);
            if !self.exhausted {
                self.exhausted = true;
                if let Some(callback) = self.on_exhausted.as_mut() {
                    callback();
                }
                return true;
            }
        }
        false
    }

    /// Allocating variant of [`pull`](Self::pull) for callers without a device buffer.
    pub fn pull_samples(&mut self, count: usize) -> (Vec<f32>, bool) {
        let mut samples = vec![0.0; count];
        let exhausted = self.pull(&mut samples);
        (samples, exhausted)
    }

    /// Whether the processor currently has nothing to play.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Samples buffered but not yet pulled, counting only applied controls.
    pub fn buffered_samples(&self) -> usize {
        let current = self
            .current
            .as_ref()
            .map_or(0, |chunk| (chunk.len() - self.position) / 2);
        current + self.queue.iter().map(|chunk| chunk.len() / 2).sum::<usize>()
    }

    fn apply_controls(&mut self) {
        while let Some(control) = self.controls.try_pop() {
            match control {
                Control::Enqueue(chunk) => {
                    self.interrupted = false;
                    self.queue.push_back(chunk);
                }
                Control::Interrupt => self.interrupted = true,
                Control::ClearIfInterrupted => {
                    if self.interrupted {
                        tracing::trace!(dropped = self.buffered_samples(), "clearing interrupted audio");
                        self.queue.clear();
                        self.current = None;
                        self.position = 0;
                        self.interrupted = false;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{convert_i16_to_f32, ToBinary};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn chunk(samples: &[i16]) -> Vec<u8> {
        samples.to_binary()
    }

    #[test]
    fn arbitrary_pull_sizes_reproduce_the_stream() {
        let (mut handle, mut processor) = playback_channel(16);
        let first: Vec<i16> = (0..7).map(|i| i * 1000).collect();
        let second: Vec<i16> = (0..5).map(|i| -i * 700).collect();
        let third: Vec<i16> = vec![i16::MIN, i16::MAX, 3];
        handle.enqueue(chunk(&first)).unwrap();
        handle.enqueue(chunk(&second)).unwrap();
        handle.enqueue(chunk(&third)).unwrap();

        let mut expected = convert_i16_to_f32(&first);
        expected.extend(convert_i16_to_f32(&second));
        expected.extend(convert_i16_to_f32(&third));

        let mut collected = Vec::new();
        let mut exhausted_reports = 0;
        for size in [1, 4, 3, 2, 6, 5, 9] {
            let (samples, exhausted) = processor.pull_samples(size);
            let remaining = expected.len() - collected.len().min(expected.len());
            collected.extend(samples.into_iter().take(remaining.min(size)));
            if exhausted {
                exhausted_reports += 1;
            }
        }

        assert_eq!(collected, expected);
        assert_eq!(exhausted_reports, 1);
    }

    #[test]
    fn short_queue_pads_with_silence() {
        let (mut handle, mut processor) = playback_channel(4);
        handle.enqueue(chunk(&[16384, 16384])).unwrap();

        let mut out = [9.0_f32; 5];
        assert!(processor.pull(&mut out));
        assert_eq!(out, [0.5, 0.5, 0.0, 0.0, 0.0]);
        assert!(processor.is_exhausted());
    }

    #[test]
    fn exhaustion_is_edge_triggered() {
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();
        let (mut handle, processor) = playback_channel(8);
        let mut processor = processor.with_exhausted_callback(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // Empty pulls before any audio are not a transition.
        assert!(!processor.pull_samples(4).1);
        assert_eq!(notified.load(Ordering::SeqCst), 0);

        handle.enqueue(chunk(&[1, 2, 3])).unwrap();
        assert!(!processor.pull_samples(3).1);
        assert!(processor.pull_samples(3).1);
        assert!(!processor.pull_samples(3).1);
        assert!(!processor.pull_samples(3).1);
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        handle.enqueue(chunk(&[4])).unwrap();
        assert!(processor.pull_samples(2).1);
        assert_eq!(notified.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn resumes_mid_chunk_across_pulls() {
        let (mut handle, mut processor) = playback_channel(4);
        handle.enqueue(chunk(&[100, 200, 300, 400, 500])).unwrap();

        let (a, _) = processor.pull_samples(2);
        let (b, _) = processor.pull_samples(2);
        assert_eq!(a, convert_i16_to_f32(&[100, 200]));
        assert_eq!(b, convert_i16_to_f32(&[300, 400]));
        assert_eq!(processor.buffered_samples(), 1);
    }

    #[test]
    fn enqueue_after_interrupt_survives_clear() {
        let (mut handle, mut processor) = playback_channel(8);
        handle.interrupt().unwrap();
        handle.enqueue(chunk(&[8192, 8192])).unwrap();
        handle.clear_if_interrupted().unwrap();

        let (samples, _) = processor.pull_samples(2);
        assert_eq!(samples, vec![0.25, 0.25]);
    }

    #[test]
    fn confirmed_interrupt_discards_buffered_audio() {
        let (mut handle, mut processor) = playback_channel(8);
        handle.enqueue(chunk(&[1, 2, 3, 4])).unwrap();
        let _ = processor.pull_samples(1);

        handle.interrupt().unwrap();
        handle.clear_if_interrupted().unwrap();
        let (samples, exhausted) = processor.pull_samples(3);
        assert_eq!(samples, vec![0.0; 3]);
        assert!(exhausted);
        assert_eq!(processor.buffered_samples(), 0);
    }

    #[test]
    fn interrupt_alone_keeps_audio() {
        let (mut handle, mut processor) = playback_channel(8);
        handle.enqueue(chunk(&[16384])).unwrap();
        handle.interrupt().unwrap();
        assert_eq!(processor.pull_samples(1).0, vec![0.5]);
    }

    #[test]
    fn full_ring_rejects_without_blocking() {
        let (mut handle, _processor) = playback_channel(2);
        handle.enqueue(chunk(&[1])).unwrap();
        handle.interrupt().unwrap();
        assert_eq!(handle.enqueue(chunk(&[2])), Err(PlaybackError::Full));
    }
}
