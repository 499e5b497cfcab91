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

//! Simulated platform for dry runs and tests.
//!
//! The platform models the reference block design in process memory: one AXI DMA engine
//! (device id [`DMA_DEV_ID`]) whose MM2S stream passes through an identity FFT core into
//! its S2MM stream, and the two BRAMs at their usual bus addresses. Because the core is
//! the identity, a pass returns exactly the words that were staged.
//!
//! The engine's latency and faults are set with [`SimulatedDmaOptions`]. The platform
//! also records cache flushes and init/cleanup calls so that tests can check the
//! pipeline's side effects.
//!
//! # Registration
//!
//! The platform registers itself with the compatibility string "simulated" via the
//! `#[platform]` procedural macro.

use crate::config::{AXI_DMA_REGISTER_SPAN, DEFAULT_BUFFER_LENGTH_WIDTH, DMA_DEV_ID};
use crate::error::FftDmaError;
use crate::mmio::MmioRegion;
use crate::platforms::platform::{
    CacheMaintenance, DeviceDirectory, DmaConfig, DmaDriver, Platform,
};
use crate::platforms::simulated_components::sim_dma::{
    SimulatedDma, SimulatedDmaLog, SimulatedDmaOptions,
};
use crate::platforms::simulated_components::sim_memory::SimulatedBus;
use fftdma_macros::platform;
use log::trace;
use std::cell::RefCell;
use std::rc::Rc;

/// Bus address of the simulated engine's register window.
const SIMULATED_DMA_BASE_ADDR: usize = 0x4040_0000;

/// Directory holding the single simulated engine.
#[derive(Debug)]
pub struct SimulatedDirectory {
    configs: Vec<DmaConfig>,
}

impl SimulatedDirectory {
    fn new() -> Self {
        SimulatedDirectory {
            configs: vec![DmaConfig {
                device_id: DMA_DEV_ID,
                base_addr: SIMULATED_DMA_BASE_ADDR,
                register_span: AXI_DMA_REGISTER_SPAN,
                has_mm2s: true,
                has_s2mm: true,
                max_transfer_len: (1 << DEFAULT_BUFFER_LENGTH_WIDTH) - 1,
                addr_width: 32,
            }],
        }
    }
}

impl DeviceDirectory for SimulatedDirectory {
    fn lookup(&self, device_id: u16) -> Option<DmaConfig> {
        self.configs
            .iter()
            .find(|config| config.device_id == device_id)
            .cloned()
    }
}

/// Cache maintenance that only records what was flushed.
#[derive(Debug, Default)]
pub struct SimulatedCache {
    flushes: RefCell<Vec<(usize, usize)>>,
}

impl CacheMaintenance for SimulatedCache {
    fn flush_range(&self, addr: usize, len: usize) {
        trace!("simulated flush of {len} bytes at {addr:#x}");
        self.flushes.borrow_mut().push((addr, len));
    }
}

#[platform(compat_string = "simulated")]
pub struct SimulatedPlatform {
    options: SimulatedDmaOptions,
    bus: Rc<SimulatedBus>,
    directory: SimulatedDirectory,
    cache: SimulatedCache,
    log: Rc<RefCell<SimulatedDmaLog>>,
    driver_taken: bool,
    initialized: bool,
    init_calls: u32,
    cleanup_calls: u32,
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPlatform {
    /// A platform whose engine completes every transfer on the first poll.
    pub fn new() -> Self {
        Self::with_options(SimulatedDmaOptions::default())
    }

    pub fn with_options(options: SimulatedDmaOptions) -> Self {
        trace!("creating new simulated platform with {options:?}");
        SimulatedPlatform {
            options,
            bus: Rc::new(SimulatedBus::new()),
            directory: SimulatedDirectory::new(),
            cache: SimulatedCache::default(),
            log: Rc::new(RefCell::new(SimulatedDmaLog::default())),
            driver_taken: false,
            initialized: false,
            init_calls: 0,
            cleanup_calls: 0,
        }
    }

    pub fn bus(&self) -> &SimulatedBus {
        &self.bus
    }

    /// Snapshot of everything the engine has been asked to do.
    pub fn dma_log(&self) -> SimulatedDmaLog {
        self.log.borrow().clone()
    }

    /// Every `(address, length)` pair flushed so far.
    pub fn flushes(&self) -> Vec<(usize, usize)> {
        self.cache.flushes.borrow().clone()
    }

    pub fn init_calls(&self) -> u32 {
        self.init_calls
    }

    pub fn cleanup_calls(&self) -> u32 {
        self.cleanup_calls
    }

    fn ensure_initialized(&self) -> Result<(), FftDmaError> {
        if self.initialized {
            Ok(())
        } else {
            Err(FftDmaError::Internal(
                "the simulated platform has not been initialized".into(),
            ))
        }
    }
}

impl Platform for SimulatedPlatform {
    fn name(&self) -> &str {
        Self::COMPAT_STRING
    }

    fn init(&mut self) -> Result<(), FftDmaError> {
        self.init_calls += 1;
        self.initialized = true;
        Ok(())
    }

    fn cleanup(&mut self) {
        self.cleanup_calls += 1;
        self.initialized = false;
    }

    fn directory(&self) -> &dyn DeviceDirectory {
        &self.directory
    }

    fn take_driver(&mut self) -> Result<Box<dyn DmaDriver>, FftDmaError> {
        if self.driver_taken {
            return Err(FftDmaError::Internal(
                "the simulated DMA driver is already in use".into(),
            ));
        }
        self.driver_taken = true;
        Ok(Box::new(SimulatedDma::with_log(
            Rc::clone(&self.bus),
            self.options.clone(),
            Rc::clone(&self.log),
        )))
    }

    fn cache(&self) -> &dyn CacheMaintenance {
        &self.cache
    }

    fn staging_region(&self) -> Result<MmioRegion<'_>, FftDmaError> {
        self.ensure_initialized()?;
        Ok(self.bus.staging().region())
    }

    fn output_region(&self) -> Result<MmioRegion<'_>, FftDmaError> {
        self.ensure_initialized()?;
        Ok(self.bus.output().region())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{INTERMEDIATE_BRAM_BASE_ADDR, OUTPUT_BRAM_BASE_ADDR};
    use googletest::prelude::*;

    #[gtest]
    fn test_driver_is_handed_out_once() {
        let mut platform = SimulatedPlatform::new();
        expect_that!(platform.take_driver().map(|_| ()), ok(anything()));
        expect_that!(
            platform.take_driver().map(|_| ()),
            err(displays_as(contains_substring("already in use")))
        );
    }

    #[gtest]
    fn test_regions_require_init() {
        let mut platform = SimulatedPlatform::new();
        expect_that!(
            platform.staging_region().map(|r| r.bus_addr()),
            err(displays_as(contains_substring("FftDmaError::Internal")))
        );
        platform.init().unwrap();
        expect_that!(
            platform.staging_region().unwrap().bus_addr(),
            eq(INTERMEDIATE_BRAM_BASE_ADDR)
        );
        expect_that!(
            platform.output_region().unwrap().bus_addr(),
            eq(OUTPUT_BRAM_BASE_ADDR)
        );
        platform.cleanup();
        expect_that!(platform.output_region().map(|_| ()), err(anything()));
        expect_that!(platform.cleanup_calls(), eq(1));
    }

    #[gtest]
    fn test_directory_knows_only_the_fft_engine() {
        let platform = SimulatedPlatform::new();
        let config = platform.directory().lookup(DMA_DEV_ID).unwrap();
        expect_that!(config.max_transfer_len, eq(16383));
        expect_that!(platform.directory().lookup(DMA_DEV_ID + 1).is_none(), eq(true));
    }
}
