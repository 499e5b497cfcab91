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

//! One pass of data through the FFT core.
//!
//! A pass is strictly ordered:
//! 1. The source buffer is copied word by word into the staging BRAM by the CPU.
//! 2. The device-to-host transfer into the output BRAM is armed first, so that no FFT
//!    output is lost, then the host-to-device transfer out of staging is started.
//! 3. The host-to-device channel is polled to idle, then the device-to-host channel.
//!
//! Nothing is rolled back when a step fails.

use crate::accelerator::AcceleratorHandle;
use crate::buffer::SignalBuffer;
use crate::error::FftDmaError;
use crate::mmio::MmioRegion;
use crate::platforms::platform::{Direction, DmaDriver};
use log::{debug, info};
use std::sync::atomic::{Ordering, fence};

pub struct TransferOrchestrator;

impl TransferOrchestrator {
    fn validate<D: DmaDriver>(
        handle: &AcceleratorHandle<D>,
        source: &SignalBuffer,
        staging: &MmioRegion<'_>,
        output: &MmioRegion<'_>,
        byte_length: usize,
    ) -> Result<(), FftDmaError> {
        if byte_length == 0 || byte_length % size_of::<u32>() != 0 {
            return Err(FftDmaError::Bounds(format!(
                "transfer length {byte_length} is not a positive multiple of the word size"
            )));
        }
        for (what, capacity) in [
            ("source buffer", source.len_bytes()),
            ("staging region", staging.len_bytes()),
            ("output region", output.len_bytes()),
            ("DMA engine", handle.config().max_transfer_len),
        ] {
            if byte_length > capacity {
                return Err(FftDmaError::Bounds(format!(
                    "transfer length {byte_length} exceeds the {what} ({capacity} bytes)"
                )));
            }
        }
        if staging.overlaps(output) {
            return Err(FftDmaError::Bounds(format!(
                "staging {staging:?} and output {output:?} overlap"
            )));
        }
        Ok(())
    }

    /// Move `byte_length` bytes of `source` through the accelerator into `output`.
    ///
    /// # Returns: `Result<(), FftDmaError>`
    /// * `Ok(())` - Both directions completed; `output` holds the result
    /// * `Err(FftDmaError::Bounds)` - The length does not fit a buffer, a region or the
    ///   engine, or the regions overlap. Nothing has been touched.
    /// * `Err(FftDmaError::SubmitFailed)` - A submission was rejected. When the
    ///   device-to-host half fails, the host-to-device half is never issued.
    /// * `Err(FftDmaError::Timeout)` - A direction did not go idle under a bounded spin policy
    pub fn run_pass<D: DmaDriver>(
        handle: &mut AcceleratorHandle<D>,
        source: &SignalBuffer,
        staging: &MmioRegion<'_>,
        output: &MmioRegion<'_>,
        byte_length: usize,
    ) -> Result<(), FftDmaError> {
        Self::validate(handle, source, staging, output, byte_length)?;

        let words = byte_length / size_of::<u32>();
        info!(
            "Copying {words} words from {:#x} to staging at {:#010x}",
            source.addr(),
            staging.bus_addr()
        );
        for index in 0..words {
            let word = source.read_volatile(index).ok_or_else(|| {
                FftDmaError::Bounds(format!("word {index} is outside of the source buffer"))
            })?;
            staging.write(index, word)?;
        }
        // staging writes must land before the engine is started
        fence(Ordering::Release);

        info!("Starting DMA transfers of {byte_length} bytes");
        handle.submit(Direction::DeviceToHost, output.bus_addr(), byte_length)?;
        handle.submit(Direction::HostToDevice, staging.bus_addr(), byte_length)?;

        let h2d_polls = handle.wait_idle(Direction::HostToDevice)?;
        let d2h_polls = handle.wait_idle(Direction::DeviceToHost)?;
        fence(Ordering::Acquire);
        debug!("transfers done after {h2d_polls} host-to-device and {d2h_polls} device-to-host polls");
        Ok(())
    }
}
