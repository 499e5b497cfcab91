// This file is part of fftdma, a diagnostic that drives an FFT accelerator through a DMA engine.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// fftdma is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// fftdma is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! Host-side source buffer and the cache maintenance that hands it to hardware.
//!
//! [`SignalBuffer`] is aligned to [`CACHE_LINE_SIZE`] through its type, so a flush of
//! the buffer never touches a cache line shared with unrelated data. The alignment is
//! checked at compile time.
//!
//! [`CoherentBuffer::publish`] is the single point where host writes are made visible
//! to a device that reads memory without going through the CPU cache.

use crate::config::{BYTES_PER_SAMPLE, CACHE_LINE_SIZE, FFT_N_POINTS};
use crate::error::FftDmaError;
use crate::platforms::platform::CacheMaintenance;
use log::trace;
use std::ptr;

/// Sample buffer of [`FFT_N_POINTS`] words, cache-line aligned.
#[repr(C, align(32))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalBuffer {
    words: [u32; FFT_N_POINTS],
}

const _: () = assert!(align_of::<SignalBuffer>() >= CACHE_LINE_SIZE);
const _: () = assert!(size_of::<SignalBuffer>() % CACHE_LINE_SIZE == 0);

impl Default for SignalBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalBuffer {
    /// A zeroed buffer.
    pub fn new() -> Self {
        SignalBuffer {
            words: [0; FFT_N_POINTS],
        }
    }

    /// A zeroed buffer on the heap. The buffer is 4 KiB, so this is what long-lived owners use.
    pub fn boxed() -> Box<Self> {
        Box::new(Self::new())
    }

    pub fn capacity(&self) -> usize {
        FFT_N_POINTS
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.words
    }

    pub fn as_mut_slice(&mut self) -> &mut [u32] {
        &mut self.words
    }

    /// Volatile read of sample `index`, or `None` past the end of the buffer.
    pub fn read_volatile(&self, index: usize) -> Option<u32> {
        let word = self.words.get(index)?;
        // SAFETY: `word` is a live, aligned reference into `self`.
        Some(unsafe { ptr::read_volatile(word) })
    }

    /// Host address of the first sample.
    pub fn addr(&self) -> usize {
        self.words.as_ptr() as usize
    }

    pub fn len_bytes(&self) -> usize {
        FFT_N_POINTS * BYTES_PER_SAMPLE
    }
}

/// Publishes host writes to [`SignalBuffer`]s through a platform's cache maintenance.
pub struct CoherentBuffer<'a> {
    cache: &'a dyn CacheMaintenance,
}

impl<'a> CoherentBuffer<'a> {
    pub fn new(cache: &'a dyn CacheMaintenance) -> Self {
        CoherentBuffer { cache }
    }

    /// Make every write to `buffer[..byte_length]` visible to DMA-capable devices.
    ///
    /// Call once, after the buffer is fully populated and before any transfer reads it.
    /// Publishing the same range again has no further effect.
    ///
    /// # Returns: `Result<(), FftDmaError>`
    /// * `Ok(())` - the range has been flushed
    /// * `Err(FftDmaError::Argument)` - `byte_length` is not word granular or exceeds the buffer
    pub fn publish(&self, buffer: &SignalBuffer, byte_length: usize) -> Result<(), FftDmaError> {
        if byte_length % BYTES_PER_SAMPLE != 0 {
            return Err(FftDmaError::Argument(format!(
                "publish length {byte_length} is not a multiple of {BYTES_PER_SAMPLE}"
            )));
        }
        if byte_length > buffer.len_bytes() {
            return Err(FftDmaError::Argument(format!(
                "publish length {byte_length} exceeds the {} byte buffer",
                buffer.len_bytes()
            )));
        }
        trace!("Flushing {byte_length} bytes at {:#x}", buffer.addr());
        self.cache.flush_range(buffer.addr(), byte_length);
        Ok(())
    }
}
