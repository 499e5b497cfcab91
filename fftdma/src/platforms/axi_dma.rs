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

//! Linux userspace platform for a Xilinx AXI DMA engine in front of the FFT core.
//!
//! - The engine is found through UIO ([`UioDirectory`]) and its registers are mapped
//!   through the matching `/dev/uioN` when the driver is configured.
//! - The staging and output BRAMs are mapped from [`DEV_MEM_PATH`] with `O_SYNC` at
//!   [`Platform::init`], which makes both windows uncached.
//! - The source buffer is only ever read by the CPU, which copies it into the staging
//!   BRAM. Publishing it therefore only needs a memory fence, not a cache clean.
//!
//! # Registration
//!
//! The platform registers itself with the compatibility string "xlnx,axi-dma" via the
//! `#[platform]` procedural macro.

use crate::config::{BRAM_SIZE, DEV_MEM_PATH, INTERMEDIATE_BRAM_BASE_ADDR, OUTPUT_BRAM_BASE_ADDR};
use crate::error::FftDmaError;
use crate::mmio::MmioRegion;
use crate::platforms::axi_dma_components::axi_dma_driver::AxiDmaDriver;
use crate::platforms::axi_dma_components::uio_directory::UioDirectory;
use crate::platforms::platform::{CacheMaintenance, DeviceDirectory, DmaDriver, Platform};
use crate::system_io::{MappedMemory, map_device};
use fftdma_macros::platform;
use log::{info, trace};
use std::path::{Path, PathBuf};
use std::sync::atomic::{Ordering, fence};

/// Cache maintenance for memory the device only sees through uncached mappings.
#[derive(Debug, Default)]
pub struct FenceCache;

impl CacheMaintenance for FenceCache {
    fn flush_range(&self, addr: usize, len: usize) {
        trace!("fence for {len} bytes at {addr:#x}");
        fence(Ordering::SeqCst);
    }
}

#[platform(compat_string = "xlnx,axi-dma")]
#[derive(Debug)]
pub struct AxiDmaPlatform {
    directory: UioDirectory,
    mem_path: PathBuf,
    staging: Option<MappedMemory>,
    output: Option<MappedMemory>,
    cache: FenceCache,
    driver_taken: bool,
}

impl Default for AxiDmaPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl AxiDmaPlatform {
    pub fn new() -> Self {
        Self::with_paths(UioDirectory::new(), Path::new(DEV_MEM_PATH))
    }

    pub fn with_paths(directory: UioDirectory, mem_path: &Path) -> Self {
        trace!("creating new AXI DMA platform over {mem_path:?}");
        AxiDmaPlatform {
            directory,
            mem_path: mem_path.to_owned(),
            staging: None,
            output: None,
            cache: FenceCache,
            driver_taken: false,
        }
    }

    fn region<'a>(
        mapping: &'a Option<MappedMemory>,
        bus_addr: usize,
        what: &str,
    ) -> Result<MmioRegion<'a>, FftDmaError> {
        mapping
            .as_ref()
            .map(|m| m.region(bus_addr))
            .ok_or_else(|| FftDmaError::Internal(format!("the {what} BRAM is not mapped")))
    }
}

impl Platform for AxiDmaPlatform {
    fn name(&self) -> &str {
        Self::COMPAT_STRING
    }

    fn init(&mut self) -> Result<(), FftDmaError> {
        self.staging = Some(map_device(&self.mem_path, INTERMEDIATE_BRAM_BASE_ADDR, BRAM_SIZE)?);
        self.output = Some(map_device(&self.mem_path, OUTPUT_BRAM_BASE_ADDR, BRAM_SIZE)?);
        info!("mapped staging and output BRAMs through {:?}", self.mem_path);
        Ok(())
    }

    fn cleanup(&mut self) {
        self.staging = None;
        self.output = None;
    }

    fn directory(&self) -> &dyn DeviceDirectory {
        &self.directory
    }

    fn take_driver(&mut self) -> Result<Box<dyn DmaDriver>, FftDmaError> {
        if self.driver_taken {
            return Err(FftDmaError::Internal(
                "the AXI DMA driver is already in use".into(),
            ));
        }
        self.driver_taken = true;
        Ok(Box::new(AxiDmaDriver::new(self.directory.clone())))
    }

    fn cache(&self) -> &dyn CacheMaintenance {
        &self.cache
    }

    fn staging_region(&self) -> Result<MmioRegion<'_>, FftDmaError> {
        Self::region(&self.staging, INTERMEDIATE_BRAM_BASE_ADDR, "staging")
    }

    fn output_region(&self) -> Result<MmioRegion<'_>, FftDmaError> {
        Self::region(&self.output, OUTPUT_BRAM_BASE_ADDR, "output")
    }
}
