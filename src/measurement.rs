//! Watch slots holding the latest interval measured by each capture channel.
//!
//! Every slot has exactly one writer, the interrupt handler of its channel, and any number
//! of readers. Values are single machine words, so a read never observes a torn update.
//! A reader that falls behind silently loses the intermediate samples; the capture count
//! next to each slot only tells it how many it missed.

use core::convert::Infallible;
use core::future::poll_fn;
use core::sync::atomic::{AtomicU32, Ordering};
use core::task::Poll;

use embassy_sync::waitqueue::AtomicWaker;

use crate::capture::{ChannelId, CHANNEL_COUNT};

/// Slots written by the bound capture interrupt handlers.
///
/// Safe to inspect from a debugger at any time.
pub static WATCH: Measurements = Measurements::new();

/// Latest measurement and capture count for every channel.
pub struct Measurements {
    latest: [AtomicU32; CHANNEL_COUNT],
    captures: [AtomicU32; CHANNEL_COUNT],
    wakers: [AtomicWaker; CHANNEL_COUNT],
    // bumped by every `clear`, lets readers restart their capture counting from zero
    epoch: AtomicU32,
}

impl Default for Measurements {
    fn default() -> Self {
        Self::new()
    }
}

impl Measurements {
    /// Empty slots. Every channel reads zero until its first capture.
    pub const fn new() -> Self {
        Self {
            latest: [const { AtomicU32::new(0) }; CHANNEL_COUNT],
            captures: [const { AtomicU32::new(0) }; CHANNEL_COUNT],
            wakers: [const { AtomicWaker::new() }; CHANNEL_COUNT],
            epoch: AtomicU32::new(0),
        }
    }

    /// Stores a new interval for `id`, overwriting the previous one.
    ///
    /// Must only be called from the context that owns channel `id`.
    pub(crate) fn record(&self, id: ChannelId, ticks: u32) {
        let i = id.index();
        self.latest[i].store(ticks, Ordering::Release);

        // single writer per slot, so a plain load/store pair is enough
        let n = self.captures[i].load(Ordering::Relaxed);
        self.captures[i].store(n.wrapping_add(1), Ordering::Release);

        self.wakers[i].wake();
    }

    /// Latest interval of `id` in counter ticks, zero if nothing was captured yet.
    pub fn latest(&self, id: ChannelId) -> u32 {
        self.latest[id.index()].load(Ordering::Acquire)
    }

    /// Number of captures serviced on `id`. Wraps at `u32::MAX`.
    pub fn captures(&self, id: ChannelId) -> u32 {
        self.captures[id.index()].load(Ordering::Acquire)
    }

    /// Latest interval of every channel, indexed by [`ChannelId::index`].
    pub fn snapshot(&self) -> [u32; CHANNEL_COUNT] {
        let mut out = [0; CHANNEL_COUNT];
        for (slot, value) in self.latest.iter().zip(out.iter_mut()) {
            *value = slot.load(Ordering::Acquire);
        }
        out
    }

    /// Zeroes every slot and capture count.
    ///
    /// Pending [`Self::wait`] calls and existing [`Monitor`]s keep working: they only report
    /// captures recorded after the clear.
    pub fn clear(&self) {
        critical_section::with(|_| {
            for i in 0..CHANNEL_COUNT {
                self.latest[i].store(0, Ordering::Relaxed);
                self.captures[i].store(0, Ordering::Relaxed);
            }
            let epoch = self.epoch.load(Ordering::Relaxed);
            self.epoch.store(epoch.wrapping_add(1), Ordering::Release);
        });
    }

    /// Clear epoch and capture count of slot `i`, read together.
    fn observe(&self, i: usize) -> (u32, u32) {
        critical_section::with(|_| {
            (
                self.epoch.load(Ordering::Acquire),
                self.captures[i].load(Ordering::Acquire),
            )
        })
    }

    /// Waits for the next capture on `id` and returns its interval.
    ///
    /// Only one task may wait on a given channel at a time.
    pub async fn wait(&self, id: ChannelId) -> u32 {
        let i = id.index();
        let (mut epoch, mut start) = self.observe(i);

        poll_fn(|cx| {
            self.wakers[i].register(cx.waker());

            let (now_epoch, count) = self.observe(i);
            if now_epoch != epoch {
                // cleared meanwhile, count restarted at zero
                epoch = now_epoch;
                start = 0;
            }

            if count != start {
                Poll::Ready(self.latest[i].load(Ordering::Acquire))
            } else {
                Poll::Pending
            }
        })
        .await
    }
}

/// Non-blocking reader that reports each capture at most once.
pub struct Monitor<'w> {
    watch: &'w Measurements,
    seen: [u32; CHANNEL_COUNT],
    epochs: [u32; CHANNEL_COUNT],
}

impl<'w> Monitor<'w> {
    /// Starts watching `watch`. Captures that already happened are not reported.
    pub fn new(watch: &'w Measurements) -> Self {
        let mut seen = [0; CHANNEL_COUNT];
        let mut epochs = [0; CHANNEL_COUNT];
        for i in 0..CHANNEL_COUNT {
            (epochs[i], seen[i]) = watch.observe(i);
        }
        Self { watch, seen, epochs }
    }

    /// Latest interval of `id` if a capture happened since the previous successful poll.
    pub fn poll(&mut self, id: ChannelId) -> nb::Result<u32, Infallible> {
        let i = id.index();
        let (epoch, count) = self.watch.observe(i);
        if epoch != self.epochs[i] {
            self.epochs[i] = epoch;
            self.seen[i] = 0;
        }
        if count == self.seen[i] {
            return Err(nb::Error::WouldBlock);
        }

        self.seen[i] = count;
        Ok(self.watch.latest(id))
    }

    /// Captures on `id` not yet reported by [`Self::poll`].
    pub fn pending(&self, id: ChannelId) -> u32 {
        let i = id.index();
        let (epoch, count) = self.watch.observe(i);
        if epoch != self.epochs[i] {
            count
        } else {
            count.wrapping_sub(self.seen[i])
        }
    }
}
