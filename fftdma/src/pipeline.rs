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

//! The complete diagnostic: one pass of the reference signal through the FFT core.
//!
//! [`Pipeline::run`] executes the phases in order, fill, publish, open, pass and decode,
//! inside a [`PlatformSession`]. The session initializes the platform when it is acquired
//! and cleans it up when dropped, so teardown happens on every exit path.

use crate::accelerator::AcceleratorHandle;
use crate::buffer::{CoherentBuffer, SignalBuffer};
use crate::config::{
    DDR_SOURCE_ADDR, DEFAULT_PLATFORM, DMA_DEV_ID, FFT_N_POINTS, INTERMEDIATE_BRAM_BASE_ADDR,
    OUTPUT_BRAM_BASE_ADDR, TRANSFER_LENGTH,
};
use crate::decoder::{ComplexSample, ResultDecoder};
use crate::error::FftDmaError;
use crate::orchestrator::TransferOrchestrator;
use crate::platforms::platform::{Platform, platform_for_known_platform};
use crate::signal::SignalSource;
use crate::spin::SpinPolicy;
use log::{debug, error, info};
use std::ops::{Deref, DerefMut};

/// Runtime options of a diagnostic run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Compatibility string of the platform to run on.
    pub platform: String,
    pub device_id: u16,
    pub spin: SpinPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            platform: DEFAULT_PLATFORM.to_string(),
            device_id: DMA_DEV_ID,
            spin: SpinPolicy::default(),
        }
    }
}

/// An initialized platform, cleaned up on drop.
pub struct PlatformSession<'a> {
    platform: &'a mut dyn Platform,
}

impl<'a> PlatformSession<'a> {
    /// Initialize `platform`. A failed init is cleaned up before the error is returned.
    pub fn acquire(platform: &'a mut dyn Platform) -> Result<Self, FftDmaError> {
        debug!("initializing platform {}", platform.name());
        if let Err(e) = platform.init() {
            platform.cleanup();
            return Err(e);
        }
        Ok(PlatformSession { platform })
    }
}

impl Deref for PlatformSession<'_> {
    type Target = dyn Platform;

    fn deref(&self) -> &Self::Target {
        &*self.platform
    }
}

impl DerefMut for PlatformSession<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.platform
    }
}

impl Drop for PlatformSession<'_> {
    fn drop(&mut self) {
        debug!("cleaning up platform {}", self.platform.name());
        self.platform.cleanup();
    }
}

/// Address and size summary printed before a run.
pub fn banner() -> String {
    format!(
        "--- Entering FFT DMA Test (DDR Input via CPU Copy) ---\n\
         Intermediate BRAM Addr: {INTERMEDIATE_BRAM_BASE_ADDR:#010X}\n\
         Output BRAM Addr:       {OUTPUT_BRAM_BASE_ADDR:#010X}\n\
         DDR Source Addr:        {DDR_SOURCE_ADDR:#010X}\n\
         Transfer Size:          {TRANSFER_LENGTH} bytes ({FFT_N_POINTS} samples)"
    )
}

/// Owner of the source buffer, reused by every run.
pub struct Pipeline {
    options: RunOptions,
    source: Box<SignalBuffer>,
}

impl Pipeline {
    pub fn new(options: RunOptions) -> Self {
        Pipeline {
            options,
            source: SignalBuffer::boxed(),
        }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// The source buffer as left by the last run.
    pub fn source(&self) -> &SignalBuffer {
        &self.source
    }

    /// Run on the registered platform matching the configured compatibility string.
    pub fn run_registered(&mut self) -> Result<Vec<ComplexSample>, FftDmaError> {
        let mut platform = platform_for_known_platform(&self.options.platform)?;
        self.run(platform.as_mut())
    }

    /// Run one pass on `platform` and decode all [`FFT_N_POINTS`] output samples.
    ///
    /// # Returns: `Result<Vec<ComplexSample>, FftDmaError>`
    /// * `Ok(Vec<ComplexSample>)` - The decoded FFT output
    /// * `Err(FftDmaError)` - The first phase that failed. The platform has been cleaned up.
    pub fn run(&mut self, platform: &mut dyn Platform) -> Result<Vec<ComplexSample>, FftDmaError> {
        let mut session = PlatformSession::acquire(platform)
            .inspect_err(|e| error!("Platform initialization failed: {e}"))?;

        SignalSource.fill(&mut self.source, FFT_N_POINTS)?;
        CoherentBuffer::new(session.cache()).publish(&self.source, TRANSFER_LENGTH)?;

        let driver = session.take_driver()?;
        let mut handle = AcceleratorHandle::open(
            session.directory(),
            driver,
            self.options.device_id,
            self.options.spin,
        )
        .inspect_err(|e| error!("AXI DMA Initialization failed: {e}"))?;

        let staging = session.staging_region()?;
        let output = session.output_region()?;
        TransferOrchestrator::run_pass(&mut handle, &self.source, &staging, &output, TRANSFER_LENGTH)
            .inspect_err(|e| match e {
                FftDmaError::Bounds(_) => error!("Phase 1 CPU Copy failed: {e}"),
                _ => error!("Phase 2 DMA Transfer failed: {e}"),
            })?;

        info!("Reading results from {:#010x}", output.bus_addr());
        let samples = ResultDecoder::decode(&output, FFT_N_POINTS)
            .inspect_err(|e| error!("Reading results failed: {e}"))?
            .collect();
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::simulated::SimulatedPlatform;
    use crate::platforms::simulated_components::sim_dma::SimulatedDmaOptions;
    use googletest::prelude::*;
    use std::any::Any;

    #[test]
    fn test_banner() {
        let banner = banner();
        assert!(banner.contains("Intermediate BRAM Addr: 0x40000000"));
        assert!(banner.contains("Output BRAM Addr:       0x42000000"));
        assert!(banner.contains("DDR Source Addr:        0x01000000"));
        assert!(banner.contains("Transfer Size:          4096 bytes (1024 samples)"));
    }

    #[gtest]
    fn test_session_cleans_up_on_drop() {
        let mut platform = SimulatedPlatform::new();
        {
            let session = PlatformSession::acquire(&mut platform).unwrap();
            expect_that!(session.staging_region().map(|_| ()), ok(anything()));
        }
        expect_that!(platform.init_calls(), eq(1));
        expect_that!(platform.cleanup_calls(), eq(1));
    }

    #[gtest]
    fn test_session_over_a_boxed_platform() {
        let mut platform: Box<dyn Platform> = Box::new(SimulatedPlatform::new());
        {
            let mut session = PlatformSession::acquire(platform.as_mut()).unwrap();
            expect_that!(session.take_driver().map(|_| ()), ok(anything()));
            expect_that!(session.name(), eq("simulated"));
        }
        let simulated = (platform.as_ref() as &dyn Any)
            .downcast_ref::<SimulatedPlatform>()
            .unwrap();
        expect_that!(simulated.init_calls(), eq(1));
        expect_that!(simulated.cleanup_calls(), eq(1));
    }

    #[gtest]
    fn test_failed_open_still_cleans_up() {
        let mut platform = SimulatedPlatform::with_options(SimulatedDmaOptions {
            reject_config: true,
            ..Default::default()
        });
        let mut pipeline = Pipeline::new(RunOptions {
            platform: "simulated".into(),
            ..Default::default()
        });

        expect_that!(
            pipeline.run(&mut platform),
            err(displays_as(contains_substring("FftDmaError::ConfigurationFailed")))
        );
        expect_that!(platform.cleanup_calls(), eq(1));
        // the source was already published
        expect_that!(platform.flushes().len(), eq(1));
    }

    #[gtest]
    fn test_default_options() {
        let options = RunOptions::default();
        expect_that!(options.platform.as_str(), eq("xlnx,axi-dma"));
        expect_that!(options.device_id, eq(0));
        expect_that!(options.spin, eq(SpinPolicy::Unbounded));
    }
}
