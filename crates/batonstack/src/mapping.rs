//! Memory that stays shared across `fork`.
//!
//! On Unix a [`SharedMapping`] is an anonymous `MAP_SHARED` mapping: a child
//! created with `fork` sees the very same pages as its parent instead of a
//! copy-on-write snapshot. Elsewhere it falls back to a heap allocation,
//! which is still shared between threads.

use std::io;
use std::ops::Deref;
use std::ptr::NonNull;

/// Owns one `R` placed in process-shared memory.
///
/// `R` must be usable from several participants through `&R`, i.e. all its
/// mutable state lives behind atomics or equivalent.
pub struct SharedMapping<R> {
    ptr: NonNull<R>,
}

// Safety: the mapping hands out &R and drops R on whichever thread drops it
unsafe impl<R: Send + Sync> Send for SharedMapping<R> {}
unsafe impl<R: Send + Sync> Sync for SharedMapping<R> {}

#[cfg(unix)]
impl<R> SharedMapping<R> {
    /// Maps fresh shared memory and moves `value` into it.
    pub fn new(value: R) -> io::Result<Self> {
        let len = Self::mapped_len();

        // SAFETY: anonymous mapping, no file descriptor or fixed address involved
        let addr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        // mmap returns page-aligned memory, which covers any alignment of R
        debug_assert_eq!(addr as usize % std::mem::align_of::<R>(), 0);
        let ptr = NonNull::new(addr.cast::<R>()).ok_or_else(|| io::Error::other("null mapping"))?;

        // SAFETY: ptr is valid for writes of size_of::<R>() bytes and aligned
        unsafe { ptr.as_ptr().write(value) };
        Ok(Self { ptr })
    }

    fn mapped_len() -> usize {
        std::mem::size_of::<R>().max(1)
    }
}

#[cfg(unix)]
impl<R> Drop for SharedMapping<R> {
    fn drop(&mut self) {
        // SAFETY: the value was written in new() and is dropped exactly once;
        // the mapping was created with the same length.
        unsafe {
            std::ptr::drop_in_place(self.ptr.as_ptr());
            libc::munmap(self.ptr.as_ptr().cast(), Self::mapped_len());
        }
    }
}

#[cfg(not(unix))]
impl<R> SharedMapping<R> {
    /// Moves `value` onto the heap. Sharing is limited to threads.
    pub fn new(value: R) -> io::Result<Self> {
        Ok(Self {
            ptr: NonNull::from(Box::leak(Box::new(value))),
        })
    }
}

#[cfg(not(unix))]
impl<R> Drop for SharedMapping<R> {
    fn drop(&mut self) {
        // SAFETY: ptr came from Box::leak in new()
        drop(unsafe { Box::from_raw(self.ptr.as_ptr()) });
    }
}

impl<R> Deref for SharedMapping<R> {
    type Target = R;

    fn deref(&self) -> &R {
        // SAFETY: ptr is valid and initialized until drop
        unsafe { self.ptr.as_ref() }
    }
}
