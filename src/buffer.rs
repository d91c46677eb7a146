//! Cache-line aligned element buffers.

use crate::errors::CodingError;
use crate::simd::Lane;
use std::alloc::{self, Layout};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

/// Alignment of every buffer: one cache line, one 512-bit vector.
pub const BUFFER_ALIGN: usize = 64;

/// Owned, zero-initialised, 64-byte aligned storage for `len` lanes.
///
/// Derefs to a slice, so codecs take it wherever they take `&[T]`.
pub struct AlignedBuffer<T: Lane> {
    ptr: NonNull<T>,
    len: usize,
}

// SAFETY: the buffer uniquely owns its allocation and lanes are plain integers
unsafe impl<T: Lane> Send for AlignedBuffer<T> {}
unsafe impl<T: Lane> Sync for AlignedBuffer<T> {}

impl<T: Lane> AlignedBuffer<T> {
    pub fn zeroed(len: usize) -> Result<Self, CodingError> {
        let Some(layout) = Self::layout(len) else {
            return Err(CodingError::InvalidConfig(format!(
                "buffer of {} elements exceeds the address space",
                len
            )));
        };
        if layout.size() == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                len,
            });
        }

        // SAFETY: layout has non-zero size; all-zero bits are a valid integer
        let raw = unsafe { alloc::alloc_zeroed(layout) } as *mut T;
        match NonNull::new(raw) {
            Some(ptr) => Ok(Self { ptr, len }),
            None => alloc::handle_alloc_error(layout),
        }
    }

    pub fn from_slice(values: &[T]) -> Result<Self, CodingError> {
        let mut buffer = Self::zeroed(values.len())?;
        buffer.copy_from_slice(values);
        Ok(buffer)
    }

    /// Overwrites every element with `f(index)`.
    pub fn fill_with(&mut self, mut f: impl FnMut(usize) -> T) {
        for (i, slot) in self.iter_mut().enumerate() {
            *slot = f(i);
        }
    }

    fn layout(len: usize) -> Option<Layout> {
        let size = len.checked_mul(std::mem::size_of::<T>())?;
        Layout::from_size_align(size, BUFFER_ALIGN).ok()
    }
}

impl<T: Lane> Deref for AlignedBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // SAFETY: ptr is valid for len initialised elements (or dangling with
        // a zero-sized layout)
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Lane> DerefMut for AlignedBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: as in deref, and &mut self guarantees unique access
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Lane> Drop for AlignedBuffer<T> {
    fn drop(&mut self) {
        if let Some(layout) = Self::layout(self.len)
            && layout.size() != 0
        {
            // SAFETY: allocated in zeroed() with this exact layout
            unsafe { alloc::dealloc(self.ptr.as_ptr() as *mut u8, layout) };
        }
    }
}

impl<T: Lane> Clone for AlignedBuffer<T> {
    fn clone(&self) -> Self {
        match Self::from_slice(self) {
            Ok(buffer) => buffer,
            // The layout was valid when self was allocated
            Err(_) => unreachable!("layout of an existing buffer is valid"),
        }
    }
}

impl<T: Lane> fmt::Debug for AlignedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len)
            .field("data", &self.deref())
            .finish()
    }
}
