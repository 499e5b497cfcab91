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

//! Process memory standing in for the two BRAMs of the block design.

use crate::config::{BRAM_SIZE, INTERMEDIATE_BRAM_BASE_ADDR, OUTPUT_BRAM_BASE_ADDR};
use crate::mmio::{MmioMemory, MmioRegion};
use std::cell::UnsafeCell;
use std::ptr::NonNull;

/// One simulated BRAM, addressed by bus address.
pub struct SimulatedBram {
    bus_addr: usize,
    cells: Box<[UnsafeCell<u32>]>,
}

impl SimulatedBram {
    pub fn new(bus_addr: usize, bytes: usize) -> Self {
        SimulatedBram {
            bus_addr,
            cells: (0..bytes / size_of::<u32>())
                .map(|_| UnsafeCell::new(0))
                .collect(),
        }
    }

    pub fn bus_addr(&self) -> usize {
        self.bus_addr
    }

    pub fn len_bytes(&self) -> usize {
        self.cells.len() * size_of::<u32>()
    }

    /// Whether `[addr, addr + len)` lies inside this BRAM.
    pub fn contains(&self, addr: usize, len: usize) -> bool {
        addr >= self.bus_addr
            && addr
                .checked_add(len)
                .is_some_and(|end| end <= self.bus_addr + self.len_bytes())
    }

    /// Host view of the whole BRAM, valid while `self` is borrowed.
    pub fn region(&self) -> MmioRegion<'_> {
        let base = NonNull::new(self.cells.as_ptr() as *mut u32)
            .unwrap_or_else(NonNull::dangling);
        // SAFETY: the cells are owned by `self`, which the region borrows, and are only
        // ever accessed through raw pointers; `UnsafeCell<u32>` has the layout of `u32`.
        unsafe { MmioRegion::new(base, self.bus_addr, self.cells.len()) }
    }

    fn cell(&self, addr: usize) -> Option<*mut u32> {
        if addr % size_of::<u32>() != 0 || !self.contains(addr, size_of::<u32>()) {
            return None;
        }
        Some(self.cells[(addr - self.bus_addr) / size_of::<u32>()].get())
    }

    /// Device-side read of the word at bus address `addr`.
    pub fn read(&self, addr: usize) -> Option<u32> {
        // SAFETY: the pointer comes from an owned cell.
        self.cell(addr).map(|p| unsafe { p.read_volatile() })
    }

    /// Device-side write of the word at bus address `addr`.
    pub fn write(&self, addr: usize, value: u32) -> Option<()> {
        // SAFETY: the pointer comes from an owned cell.
        self.cell(addr).map(|p| unsafe { p.write_volatile(value) })
    }
}

impl MmioMemory for SimulatedBram {
    fn region(&self) -> MmioRegion<'_> {
        SimulatedBram::region(self)
    }
}

/// The memory the simulated DMA engine can reach.
pub struct SimulatedBus {
    staging: SimulatedBram,
    output: SimulatedBram,
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBus {
    /// Both BRAMs at the addresses of the reference block design.
    pub fn new() -> Self {
        SimulatedBus {
            staging: SimulatedBram::new(INTERMEDIATE_BRAM_BASE_ADDR, BRAM_SIZE),
            output: SimulatedBram::new(OUTPUT_BRAM_BASE_ADDR, BRAM_SIZE),
        }
    }

    pub fn staging(&self) -> &SimulatedBram {
        &self.staging
    }

    pub fn output(&self) -> &SimulatedBram {
        &self.output
    }

    /// The BRAM holding all of `[addr, addr + len)`, if any.
    pub fn bram_for(&self, addr: usize, len: usize) -> Option<&SimulatedBram> {
        [&self.staging, &self.output]
            .into_iter()
            .find(|bram| bram.contains(addr, len))
    }
}
