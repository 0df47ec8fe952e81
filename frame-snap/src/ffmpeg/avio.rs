//! `AVIOContext` over the memory buffers.
//!
//! FFmpeg only sees an opaque pointer to the boxed adapter; the box is leaked into a raw
//! pointer for the lifetime of the context so its address never changes, and reclaimed after
//! the context is freed.

use std::ffi::{c_int, c_void};
use std::ptr;

use ffmpeg_next::ffi;
use ffmpeg_next::util::error::EINVAL;

use crate::{
    buffer::{ByteBufferSink, ByteBufferSource},
    error::{Result, SnapError},
};

type WriteFn = unsafe extern "C" fn(*mut c_void, *const u8, c_int) -> c_int;

unsafe extern "C" fn read_source(opaque: *mut c_void, buf: *mut u8, buf_size: c_int) -> c_int {
    if opaque.is_null() || buf.is_null() || buf_size <= 0 {
        return ffi::AVERROR(EINVAL);
    }
    let source = unsafe { &mut *(opaque as *mut ByteBufferSource) };
    let buf = unsafe { std::slice::from_raw_parts_mut(buf, buf_size as usize) };
    match source.read(buf) {
        Some(n) => n as c_int,
        None => ffi::AVERROR_EOF,
    }
}

unsafe extern "C" fn write_sink(opaque: *mut c_void, buf: *const u8, buf_size: c_int) -> c_int {
    if opaque.is_null() || buf.is_null() || buf_size < 0 {
        return ffi::AVERROR(EINVAL);
    }
    let sink = unsafe { &mut *(opaque as *mut ByteBufferSink) };
    let buf = unsafe { std::slice::from_raw_parts(buf, buf_size as usize) };
    match sink.write(buf) {
        Ok(n) => n as c_int,
        Err(_) => ffi::AVERROR_BUFFER_TOO_SMALL,
    }
}

/// An I/O context plus the adapter its callbacks drive.
pub(crate) struct MemoryIo<T> {
    ctx: *mut ffi::AVIOContext,
    state: *mut T,
}

impl MemoryIo<ByteBufferSource> {
    pub(crate) fn reader(source: ByteBufferSource, buffer_size: usize) -> Result<Self> {
        Self::alloc(source, buffer_size, |buffer, size, opaque| unsafe {
            ffi::avio_alloc_context(buffer, size, 0, opaque, Some(read_source), None, None)
        })
    }
}

impl MemoryIo<ByteBufferSink> {
    pub(crate) fn writer(sink: ByteBufferSink, buffer_size: usize) -> Result<Self> {
        Self::alloc(sink, buffer_size, |buffer, size, opaque| unsafe {
            // write_packet takes `*mut u8` before FFmpeg 7 and `*const u8` since; same ABI
            let write: WriteFn = write_sink;
            ffi::avio_alloc_context(
                buffer,
                size,
                1,
                opaque,
                None,
                Some(std::mem::transmute(write)),
                None,
            )
        })
    }

    /// Pushes whatever FFmpeg still buffers into the sink.
    pub(crate) fn flush(&mut self) {
        unsafe { ffi::avio_flush(self.ctx) };
    }
}

impl<T> MemoryIo<T> {
    fn alloc<F>(state: T, buffer_size: usize, make: F) -> Result<Self>
    where
        F: FnOnce(*mut u8, c_int, *mut c_void) -> *mut ffi::AVIOContext,
    {
        let size = c_int::try_from(buffer_size.max(1)).map_err(|_| SnapError::Alloc("io buffer"))?;
        let buffer = unsafe { ffi::av_malloc(size as usize) as *mut u8 };
        if buffer.is_null() {
            return Err(SnapError::Alloc("io buffer"));
        }
        let state = Box::into_raw(Box::new(state));
        let ctx = make(buffer, size, state as *mut c_void);
        if ctx.is_null() {
            unsafe {
                ffi::av_free(buffer as *mut c_void);
                drop(Box::from_raw(state));
            }
            return Err(SnapError::Alloc("io context"));
        }
        Ok(Self { ctx, state })
    }

    pub(crate) fn as_ptr(&self) -> *mut ffi::AVIOContext {
        self.ctx
    }

    pub(crate) fn state(&self) -> &T {
        unsafe { &*self.state }
    }

    /// Frees the context and hands back the adapter.
    pub(crate) fn into_state(mut self) -> T {
        self.release_context();
        let state = std::mem::replace(&mut self.state, ptr::null_mut());
        *unsafe { Box::from_raw(state) }
    }

    fn release_context(&mut self) {
        if self.ctx.is_null() {
            return;
        }
        unsafe {
            // the context may have swapped in its own buffer, free whatever it holds now
            ffi::av_freep(&mut (*self.ctx).buffer as *mut *mut u8 as *mut c_void);
            ffi::avio_context_free(&mut self.ctx);
        }
        self.ctx = ptr::null_mut();
    }
}

impl<T> Drop for MemoryIo<T> {
    fn drop(&mut self) {
        self.release_context();
        if !self.state.is_null() {
            unsafe { drop(Box::from_raw(self.state)) };
            self.state = ptr::null_mut();
        }
    }
}

unsafe impl<T: Send> Send for MemoryIo<T> {}
