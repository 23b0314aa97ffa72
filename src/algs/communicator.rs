//! Thin façade over block-to-block message passing.
//!
//! Messages are contiguous byte slices. Handles are waitable but non-blocking:
//! the union exchange calls `.wait()` on every handle before it trusts that a
//! buffer is ready, and drains all of them even after the first failure.
//!
//! Only an in-process backend ships here ([`RayonComm`], one block per thread).
//! A real inter-process transport plugs in by implementing [`Communicator`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;

/// Typed message tag. Rounds and phases of one exchange are derived from a base
/// tag with [`CommTag::offset`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(u16);

impl CommTag {
    #[inline]
    pub const fn new(tag: u16) -> Self {
        CommTag(tag)
    }
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
    #[inline]
    pub const fn offset(self, k: u16) -> Self {
        CommTag(self.0.wrapping_add(k))
    }
}

/// Non-blocking communication interface.
pub trait Communicator: Send + Sync {
    type SendHandle: Wait;
    type RecvHandle: Wait;

    /// Post a send of `buf` to `peer`.
    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive from `peer`. `buf` hints the expected size; the handle
    /// yields the full message, and the caller validates its length.
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Single-block communicator: rank 0 of 1, every operation is a no-op.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
}

// --- RayonComm: intra-process, one block per thread ---

/// (universe, src, dst, tag)
type Key = (u64, usize, usize, u16);

static MAILBOX: Lazy<DashMap<Key, VecDeque<Bytes>>> = Lazy::new(DashMap::new);
static NEXT_UNIVERSE: AtomicU64 = AtomicU64::new(1);

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// In-process communicator backed by a global FIFO mailbox.
///
/// Messages with the same `(src, dst, tag)` are delivered in send order.
/// Communicators built by [`RayonComm::group`] live in a private universe so
/// that concurrently running groups never see each other's messages.
#[derive(Clone, Debug)]
pub struct RayonComm {
    universe: u64,
    rank: usize,
    size: usize,
    timeout: Duration,
}

impl RayonComm {
    /// Rank `rank` of `size` in the shared default universe.
    pub fn new(rank: usize, size: usize) -> Self {
        Self {
            universe: 0,
            rank,
            size,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// `size` communicators (ranks `0..size`) in a fresh universe.
    pub fn group(size: usize) -> Vec<Self> {
        let universe = NEXT_UNIVERSE.fetch_add(1, Ordering::Relaxed);
        (0..size)
            .map(|rank| Self {
                universe,
                rank,
                size,
                timeout: DEFAULT_TIMEOUT,
            })
            .collect()
    }

    /// How long a receive waits before giving up and yielding `None`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct LocalHandle {
    key: Key,
    timeout: Duration,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(mut queue) = MAILBOX.get_mut(&self.key) {
                if let Some(bytes) = queue.pop_front() {
                    return Some(bytes.to_vec());
                }
            }
            if Instant::now() >= deadline {
                log::warn!(
                    "receive from rank {} (tag {}) timed out after {:?}",
                    self.key.1,
                    self.key.3,
                    self.timeout
                );
                return None;
            }
            std::thread::yield_now();
        }
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        let key = (self.universe, self.rank, peer, tag);
        MAILBOX
            .entry(key)
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> Self::RecvHandle {
        LocalHandle {
            key: (self.universe, peer, self.rank, tag),
            timeout: self.timeout,
        }
    }

    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }
}
