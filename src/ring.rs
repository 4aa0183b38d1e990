//! A fixed-capacity byte buffer shared between exactly one reader and
//! exactly one writer, with wait-free read/write and a transactional
//! multi-part write commit.
//!
//! The synchronization discipline is deliberately narrow: each operation
//! begins with a single acquire-ordered load of the other party's head,
//! does all its work against local copies, and ends (for a mutating
//! operation) with a single release-ordered store of its own head.
//! Nothing else touches the heads. Cache-line padding on the two head
//! fields (via `crossbeam_utils`'s `CachePadded`) keeps the reader and
//! writer from false-sharing a line on the hot path.
//!
//! This is always a single producer and a single consumer for the ring's
//! lifetime; it does not generalize to MPSC or MPMC.

use crossbeam_utils::CachePadded;
use std::alloc::Layout;
use std::cell::UnsafeCell;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::alloc::AllocatorHandle;
use crate::status::Status;

/// A snapshot of both heads taken by [`Ring::begin_write`], amended
/// locally by [`Ring::amend_write`] and published by [`Ring::commit_write`].
///
/// Nothing is visible to the reader until `commit_write` runs: the
/// transaction tracks its own projected write head separately from the
/// ring's published one.
#[derive(Debug, Clone, Copy)]
pub struct RingTransaction {
    read_head: u32,
    write_head: u32,
}

/// A single-producer, single-consumer, lock-free byte ring.
///
/// Capacity is rounded up to the next power of two; the usable capacity
/// is one less than that (the single-byte gap disambiguates full from
/// empty). All operations are wait-free: no allocation, no locks, no
/// blocking syscalls, after construction.
///
/// `write`/`begin_write`/`amend_write`/`commit_write` and
/// `read`/`peek`/`skip` all take `&self` rather than `&mut self` so that a
/// writer and a reader on two different threads can share one `Ring`
/// (typically via `Arc<Ring>`): buffer slots are
/// never touched by both parties at once because the writer only ever
/// writes ahead of `read_head` and the reader only ever reads behind
/// `write_head`, and nothing but `reset` ever reads or writes a head that
/// isn't its own party's.
pub struct Ring {
    write_head: CachePadded<AtomicU32>,
    read_head: CachePadded<AtomicU32>,
    size: u32,
    size_mask: u32,
    buf: UnsafeCell<NonNull<u8>>,
    layout: Layout,
    allocator: AllocatorHandle,
}

// SAFETY: the buffer is never aliased mutably: the writer only writes
// slots in `[write_head, write_head + write_space)` and the reader only
// reads slots in `[read_head, read_head + read_space)`, and those ranges
// are disjoint by construction (the acquire/release protocol on the
// heads is exactly what guarantees that). `reset`, `mlock`, `new`, and
// `free` are documented as not thread-safe and must be externally
// serialized by the caller. The buffer pointer itself is set
// once at construction and never reassigned, so sharing it across the
// reader's and writer's threads is sound.
unsafe impl Send for Ring {}
unsafe impl Sync for Ring {}

fn next_power_of_two(mut size: u32) -> u32 {
    if size == 0 {
        return 1;
    }
    size -= 1;
    size |= size >> 1;
    size |= size >> 2;
    size |= size >> 4;
    size |= size >> 8;
    size |= size >> 16;
    size + 1
}

fn read_space_internal(read_head: u32, write_head: u32, size_mask: u32) -> u32 {
    write_head.wrapping_sub(read_head) & size_mask
}

fn write_space_internal(read_head: u32, write_head: u32, size_mask: u32) -> u32 {
    read_head.wrapping_sub(write_head).wrapping_sub(1) & size_mask
}

impl Ring {
    /// Creates a ring whose usable capacity is at least `capacity_hint`
    /// bytes, using the given allocator for the backing buffer. The
    /// buffer is rounded up to the next power of two, so the actual
    /// usable capacity (see [`Ring::capacity`]) may be larger than
    /// requested.
    ///
    /// # Errors
    /// Returns `Status::OutOfMemory` if the allocator cannot supply the
    /// backing buffer.
    pub fn with_allocator(allocator: AllocatorHandle, capacity_hint: u32) -> Result<Self, Status> {
        let size = next_power_of_two(capacity_hint.max(2));
        let layout = Layout::array::<u8>(size as usize).map_err(|_| Status::BadArgument)?;
        let Some(ptr) = allocator.alloc(layout) else {
            return Err(Status::OutOfMemory);
        };
        // SAFETY: `ptr` was just allocated for exactly `layout`'s size.
        unsafe { ptr.as_ptr().write_bytes(0, size as usize) };
        Ok(Self {
            write_head: CachePadded::new(AtomicU32::new(0)),
            read_head: CachePadded::new(AtomicU32::new(0)),
            size,
            size_mask: size - 1,
            buf: UnsafeCell::new(ptr),
            layout,
            allocator,
        })
    }

    /// Creates a ring using the system allocator.
    ///
    /// # Panics
    /// Panics if the system allocator fails to supply the backing buffer.
    #[must_use]
    pub fn new(capacity_hint: u32) -> Self {
        Self::with_allocator(AllocatorHandle::default(), capacity_hint)
            .expect("system allocator should not fail for a ring buffer")
    }

    fn buf_slice(&self) -> &[u8] {
        // SAFETY: the pointer is valid for `size` bytes for the life of
        // `self`; access is synchronized by the acquire/release protocol
        // on the two heads (see the module doc comment).
        unsafe { std::slice::from_raw_parts((*self.buf.get()).as_ptr(), self.size as usize) }
    }

    #[allow(clippy::mut_from_ref)]
    fn buf_slice_mut(&self) -> &mut [u8] {
        // SAFETY: see `buf_slice`; only the writer ever calls the methods
        // that reach this, and only over its own unpublished range.
        unsafe { std::slice::from_raw_parts_mut((*self.buf.get()).as_ptr(), self.size as usize) }
    }

    /// The usable capacity in bytes (one less than the rounded buffer
    /// size, since one byte is always held back to distinguish full from
    /// empty).
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.size - 1
    }

    /// The number of bytes currently available to read.
    ///
    /// Takes a single acquire-ordered load of `write_head`; `read_head`
    /// is this party's own, read non-atomically.
    #[must_use]
    pub fn read_space(&self) -> u32 {
        let r = self.read_head.load(Ordering::Relaxed);
        let w = self.write_head.load(Ordering::Acquire);
        read_space_internal(r, w, self.size_mask)
    }

    /// The number of bytes currently available to write.
    ///
    /// Takes a single acquire-ordered load of `read_head`; `write_head`
    /// is this party's own, read non-atomically.
    #[must_use]
    pub fn write_space(&self) -> u32 {
        let r = self.read_head.load(Ordering::Acquire);
        let w = self.write_head.load(Ordering::Relaxed);
        write_space_internal(r, w, self.size_mask)
    }

    /// Copies `dst.len()` or fewer bytes from the ring starting at
    /// `read_head` into `dst`, without advancing `read_head`.
    /// Returns the number of bytes copied.
    ///
    /// # Safety
    /// The caller (the reader) must have already established, via an
    /// acquire load of `write_head`, that these `n` bytes were published.
    fn peek_internal(&self, read_head: u32, dst: &mut [u8]) -> u32 {
        // SAFETY: only the reader calls this, and only over the range it
        // just confirmed via an acquire load of `write_head`, which never
        // overlaps the writer's currently-unpublished region.
        let buf = self.buf_slice();
        let n = dst.len() as u32;
        let first_half = n.min(self.size - (read_head & self.size_mask));
        let start = (read_head & self.size_mask) as usize;
        dst[..first_half as usize].copy_from_slice(&buf[start..start + first_half as usize]);
        if first_half < n {
            let remaining = (n - first_half) as usize;
            dst[first_half as usize..].copy_from_slice(&buf[..remaining]);
        }
        n
    }

    /// Copies up to `dst.len()` bytes into `dst` without consuming them.
    /// Returns the number of bytes actually copied (fewer than
    /// `dst.len()` if the ring does not hold that many).
    pub fn peek(&self, dst: &mut [u8]) -> u32 {
        let r = self.read_head.load(Ordering::Relaxed);
        let w = self.write_head.load(Ordering::Acquire);
        let space = read_space_internal(r, w, self.size_mask);
        let n = dst.len() as u32;
        let to_copy = n.min(space);
        if to_copy == 0 {
            return 0;
        }
        self.peek_internal(r, &mut dst[..to_copy as usize])
    }

    /// Copies up to `dst.len()` bytes into `dst` and advances
    /// `read_head` past them. Returns the number of bytes copied.
    pub fn read(&self, dst: &mut [u8]) -> u32 {
        let r = self.read_head.load(Ordering::Relaxed);
        let w = self.write_head.load(Ordering::Acquire);
        let space = read_space_internal(r, w, self.size_mask);
        let n = dst.len() as u32;
        let to_copy = n.min(space);
        if to_copy == 0 {
            return 0;
        }
        self.peek_internal(r, &mut dst[..to_copy as usize]);
        self.read_head
            .store(r.wrapping_add(to_copy), Ordering::Release);
        to_copy
    }

    /// Advances `read_head` by up to `n` bytes without copying anything.
    /// Returns the number of bytes actually skipped.
    pub fn skip(&self, n: u32) -> u32 {
        let r = self.read_head.load(Ordering::Relaxed);
        let w = self.write_head.load(Ordering::Acquire);
        let space = read_space_internal(r, w, self.size_mask);
        let to_skip = n.min(space);
        if to_skip == 0 {
            return 0;
        }
        self.read_head
            .store(r.wrapping_add(to_skip), Ordering::Release);
        to_skip
    }

    /// Writes `src` into the buffer at `write_head`, wrapping as needed.
    ///
    /// # Safety
    /// Only the writer calls this, and only after confirming (via the
    /// transaction's local write-space check against an acquire-loaded
    /// `read_head`) that these bytes don't reach into the reader's
    /// unconsumed region.
    fn write_internal(&self, write_head: u32, src: &[u8]) {
        // SAFETY: see above; the writer is the sole mutator of this range.
        let buf = self.buf_slice_mut();
        let n = src.len() as u32;
        let first_half = n.min(self.size - (write_head & self.size_mask));
        let start = (write_head & self.size_mask) as usize;
        buf[start..start + first_half as usize].copy_from_slice(&src[..first_half as usize]);
        if first_half < n {
            let remaining = (n - first_half) as usize;
            buf[..remaining].copy_from_slice(&src[first_half as usize..]);
        }
    }

    /// Writes `src` to the ring in a single step, returning `src.len()`
    /// if it fit or `0` if it didn't: a too-large single write is a
    /// no-op rather than a partial write.
    pub fn write(&self, src: &[u8]) -> u32 {
        let mut tx = self.begin_write();
        if self.amend_write(&mut tx, src).is_err() {
            return 0;
        }
        let n = src.len() as u32;
        self.commit_write(tx);
        n
    }

    /// Snapshots both heads to begin a multi-part write. Nothing written
    /// via [`Ring::amend_write`] is visible to the reader until
    /// [`Ring::commit_write`] runs.
    #[must_use]
    pub fn begin_write(&self) -> RingTransaction {
        let r = self.read_head.load(Ordering::Acquire);
        let w = self.write_head.load(Ordering::Relaxed);
        RingTransaction {
            read_head: r,
            write_head: w,
        }
    }

    /// Appends `src` to the ring at the transaction's projected write
    /// head, checking remaining space against the transaction's local
    /// heads (not the ring's). On success, advances the transaction's
    /// projected write head; nothing becomes visible until the
    /// transaction is committed. Composable: call repeatedly to build up
    /// a multi-part write before committing.
    ///
    /// # Errors
    /// Returns `Status::NoSpace` if `src` does not fit in the remaining
    /// transactional write space; the transaction is left unadvanced.
    pub fn amend_write(&self, tx: &mut RingTransaction, src: &[u8]) -> Result<(), Status> {
        let space = write_space_internal(tx.read_head, tx.write_head, self.size_mask);
        let n = src.len() as u32;
        if n > space {
            return Err(Status::NoSpace);
        }
        self.write_internal(tx.write_head, src);
        tx.write_head = tx.write_head.wrapping_add(n);
        Ok(())
    }

    /// Publishes the transaction's projected write head with a single
    /// release store, making every amended byte visible to the reader at
    /// once.
    pub fn commit_write(&self, tx: RingTransaction) {
        self.write_head.store(tx.write_head, Ordering::Release);
    }

    /// Best-effort locks the ring's backing buffer into physical memory,
    /// so the hot read/write path never takes a page fault.
    ///
    /// Not thread-safe and not realtime-safe: call once, right after
    /// construction, before a reader or writer starts using the ring.
    ///
    /// # Errors
    /// Returns `Status::NotSupported` if the platform offers no locking
    /// primitive, or the underlying call fails (e.g. the process lacks
    /// `CAP_IPC_LOCK` or exceeds `RLIMIT_MEMLOCK`).
    pub fn mlock(&self) -> Status {
        #[cfg(unix)]
        {
            // SAFETY: exclusive access is documented as a precondition;
            // the pointer and length describe the live backing buffer.
            let buf = self.buf_slice();
            let ptr = buf.as_ptr().cast::<libc::c_void>();
            let rc = unsafe { libc::mlock(ptr, buf.len()) };
            if rc == 0 {
                Status::Success
            } else {
                Status::NotSupported
            }
        }
        #[cfg(not(unix))]
        {
            Status::NotSupported
        }
    }

    /// Empties the ring, resetting both heads to zero.
    ///
    /// Not thread-safe: may only be called when there is no concurrent
    /// reader or writer (typically right after construction, or during
    /// teardown/reuse between sessions).
    pub fn reset(&mut self) {
        self.read_head.store(0, Ordering::Relaxed);
        self.write_head.store(0, Ordering::Relaxed);
    }
}

impl Drop for Ring {
    fn drop(&mut self) {
        let ptr = unsafe { *self.buf.get() };
        // SAFETY: `ptr`/`self.layout` are exactly what `self.allocator`
        // returned from the matching `alloc` call in `with_allocator`.
        unsafe { self.allocator.dealloc(ptr, self.layout) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_rounds_up_to_power_of_two() {
        let ring = Ring::new(8);
        assert_eq!(ring.capacity(), 7);
    }

    #[test]
    fn small_round_trip() {
        let ring = Ring::new(8);
        assert_eq!(ring.write(b"ab"), 2);

        let mut one = [0u8; 1];
        assert_eq!(ring.peek(&mut one), 1);
        assert_eq!(one[0], b'a');

        assert_eq!(ring.skip(1), 1);
        assert_eq!(ring.read(&mut one), 1);
        assert_eq!(one[0], b'b');

        assert_eq!(ring.read_space(), 0);
        assert_eq!(ring.peek(&mut one), 0);
    }

    #[test]
    fn filling_the_ring_rejects_an_oversized_write() {
        let ring = Ring::new(8);
        let usable = ring.capacity();
        let payload = vec![7u8; usable as usize];
        assert_eq!(ring.write(&payload), usable);
        assert_eq!(ring.write_space(), 0);

        let mut one = [0u8; 1];
        assert_eq!(ring.write(&one), 0);

        assert_eq!(ring.read(&mut one), 1);
        assert_eq!(ring.write_space(), 1);
    }

    #[test]
    fn write_wraps_around_the_buffer() {
        let ring = Ring::new(8);
        let usable = ring.capacity();

        assert_eq!(ring.write(&vec![1u8; usable as usize - 1]), usable - 1);
        let mut drain = vec![0u8; usable as usize - 1];
        assert_eq!(ring.read(&mut drain), usable - 1);

        assert_eq!(ring.write(b"wrap!!!"), 7);
        let mut out = [0u8; 7];
        assert_eq!(ring.read(&mut out), 7);
        assert_eq!(&out, b"wrap!!!");
    }

    #[test]
    fn transaction_is_invisible_until_committed() {
        let ring = Ring::new(16);
        let mut tx = ring.begin_write();
        ring.amend_write(&mut tx, b"hello").unwrap();
        assert_eq!(ring.read_space(), 0);

        ring.commit_write(tx);
        assert_eq!(ring.read_space(), 5);
        let mut out = [0u8; 5];
        ring.read(&mut out);
        assert_eq!(&out, b"hello");
    }

    #[test]
    fn multi_part_transaction_composes_before_commit() {
        let ring = Ring::new(16);
        let mut tx = ring.begin_write();
        ring.amend_write(&mut tx, b"foo").unwrap();
        ring.amend_write(&mut tx, b"bar").unwrap();
        ring.commit_write(tx);

        let mut out = [0u8; 6];
        assert_eq!(ring.read(&mut out), 6);
        assert_eq!(&out, b"foobar");
    }

    #[test]
    fn amend_write_rejects_overflow_without_advancing_transaction() {
        let ring = Ring::new(8);
        let mut tx = ring.begin_write();
        let usable = ring.capacity();
        assert!(ring.amend_write(&mut tx, &vec![0u8; usable as usize]).is_ok());
        assert_eq!(
            ring.amend_write(&mut tx, &[1]),
            Err(Status::NoSpace)
        );
        ring.commit_write(tx);
        assert_eq!(ring.read_space(), usable);
    }

    #[test]
    fn read_and_write_space_are_conserved() {
        let ring = Ring::new(32);
        assert_eq!(ring.read_space() + ring.write_space() + 1, ring.size);
    }

    #[test]
    fn reset_empties_the_ring() {
        let mut ring = Ring::new(16);
        ring.write(b"hello");
        assert_eq!(ring.read_space(), 5);

        ring.reset();
        assert_eq!(ring.read_space(), 0);
        assert_eq!(ring.write_space(), ring.capacity());
    }

    #[test]
    fn mlock_is_best_effort() {
        let ring = Ring::new(16);
        // Either the platform supports it or it reports NotSupported; it
        // must never panic or corrupt the ring.
        let _ = ring.mlock();
        assert_eq!(ring.capacity(), 15);
    }
}
