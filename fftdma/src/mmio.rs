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

//! Word-granular access to memory-mapped regions.
//!
//! [`MmioRegion`] is the only place in the crate that turns addresses into pointers. Every
//! access is a volatile 32-bit read or write, so the compiler can neither elide, merge nor
//! reorder accesses to memory that a device observes.
//!
//! A region has two addresses:
//! - the *host* pointer through which the CPU reaches the memory (a `/dev/mem` mapping, a
//!   UIO mapping or plain process memory in the simulator), and
//! - the *bus* address under which the DMA engine sees the same memory.
//!
//! A region borrows whatever owns the memory behind it, so it cannot outlive a mapping or
//! a simulated BRAM:
//!
//! ```compile_fail
//! use fftdma::platforms::simulated_components::sim_memory::SimulatedBram;
//!
//! let region = {
//!     let bram = SimulatedBram::new(0x4000_0000, 0x100);
//!     bram.region()
//! };
//! region.read(0).unwrap();
//! ```
//!
//! Neither can it be kept across [`Platform::cleanup`](crate::platforms::platform::Platform::cleanup):
//!
//! ```compile_fail
//! use fftdma::platforms::platform::Platform;
//! use fftdma::platforms::simulated::SimulatedPlatform;
//!
//! let mut platform = SimulatedPlatform::new();
//! platform.init().unwrap();
//! let output = platform.output_region().unwrap();
//! platform.cleanup();
//! output.read(0).unwrap();
//! ```

use crate::error::FftDmaError;
use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::rc::Rc;

/// Volatile, bounds-checked window onto device-visible memory owned for `'a`.
#[derive(Clone, Copy)]
pub struct MmioRegion<'a> {
    base: NonNull<u32>,
    bus_addr: usize,
    words: usize,
    _memory: PhantomData<&'a [UnsafeCell<u32>]>,
}

impl<'a> MmioRegion<'a> {
    /// Creates a new region over `words` 32-bit words starting at `base`.
    ///
    /// # Safety
    ///
    /// - `base` must be 4-byte aligned and valid for volatile reads and writes of
    ///   `words * 4` bytes for all of `'a`.
    /// - No Rust reference may alias the memory during `'a`.
    /// - `bus_addr` must be the address under which the DMA engine sees `base`.
    pub unsafe fn new(base: NonNull<u32>, bus_addr: usize, words: usize) -> Self {
        MmioRegion {
            base,
            bus_addr,
            words,
            _memory: PhantomData,
        }
    }

    /// Bus address of the first word.
    pub fn bus_addr(&self) -> usize {
        self.bus_addr
    }

    /// Capacity in words.
    pub fn len_words(&self) -> usize {
        self.words
    }

    /// Capacity in bytes.
    pub fn len_bytes(&self) -> usize {
        self.words * size_of::<u32>()
    }

    /// Whether the bus address ranges of `self` and `other` share at least one byte.
    pub fn overlaps(&self, other: &MmioRegion<'_>) -> bool {
        let (a_start, a_end) = (self.bus_addr, self.bus_addr + self.len_bytes());
        let (b_start, b_end) = (other.bus_addr, other.bus_addr + other.len_bytes());
        a_start < b_end && b_start < a_end
    }

    fn check_index(&self, index: usize) -> Result<(), FftDmaError> {
        if index >= self.words {
            return Err(FftDmaError::Bounds(format!(
                "word {index} is outside of the {} word region at {:#010x}",
                self.words, self.bus_addr
            )));
        }
        Ok(())
    }

    /// Volatile read of word `index`.
    pub fn read(&self, index: usize) -> Result<u32, FftDmaError> {
        self.check_index(index)?;
        // SAFETY: index is within the region, which `new` requires to be readable.
        Ok(unsafe { self.base.as_ptr().add(index).read_volatile() })
    }

    /// Volatile write of `value` to word `index`.
    pub fn write(&self, index: usize, value: u32) -> Result<(), FftDmaError> {
        self.check_index(index)?;
        // SAFETY: index is within the region, which `new` requires to be writable.
        unsafe { self.base.as_ptr().add(index).write_volatile(value) };
        Ok(())
    }

    /// Volatile read of the register at byte offset `offset`.
    pub fn read_reg(&self, offset: usize) -> Result<u32, FftDmaError> {
        self.read(offset / size_of::<u32>())
    }

    /// Volatile write of the register at byte offset `offset`.
    pub fn write_reg(&self, offset: usize, value: u32) -> Result<(), FftDmaError> {
        self.write(offset / size_of::<u32>(), value)
    }

    /// Read-modify-write of the register at byte offset `offset`.
    pub fn modify_reg(&self, offset: usize, f: impl FnOnce(u32) -> u32) -> Result<(), FftDmaError> {
        let value = self.read_reg(offset)?;
        self.write_reg(offset, f(value))
    }
}

/// Owner of device-visible memory that hands out [`MmioRegion`]s borrowing it.
pub trait MmioMemory {
    /// Window onto all of the memory.
    fn region(&self) -> MmioRegion<'_>;
}

impl<T: MmioMemory + ?Sized> MmioMemory for Rc<T> {
    fn region(&self) -> MmioRegion<'_> {
        (**self).region()
    }
}

impl fmt::Debug for MmioRegion<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MmioRegion")
            .field("bus_addr", &format_args!("{:#010x}", self.bus_addr))
            .field("words", &self.words)
            .finish()
    }
}
