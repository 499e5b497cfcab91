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

//! The built-in test waveform fed to the FFT core.

use crate::buffer::SignalBuffer;
use crate::error::FftDmaError;
use log::{debug, info};

/// Reference input: 50 samples of a 16-bit signal, one sample per word in the low half.
pub const REFERENCE_SIGNAL: [u32; 50] = [
    0x00000000, 0x00003426, 0x0000533B, 0x000052E7, 0x0000387E, 0x000015A3, 0x0000FE5C, 0x0000FE26,
    0x000011CC, 0x00002981, 0x000031EA, 0x00001F45, 0x0000F479, 0x0000C238, 0x00009E98, 0x0000999A,
    0x0000B4CD, 0x0000E297, 0x00000D77, 0x00002356, 0x00001ED9, 0x000009A4, 0x0000F669, 0x0000F614,
    0x00000DFD, 0x0000347C, 0x000055D8, 0x00005ED7, 0x0000474A, 0x000016CC, 0x0000E127, 0x0000BC3A,
    0x0000B4D6, 0x0000C87D, 0x0000E75E, 0x0000FD6E, 0x0000FD93, 0x0000E8DC, 0x0000CDD4, 0x0000C04B,
    0x0000CE16, 0x0000F6EF, 0x00002BE7, 0x000056C6, 0x00006578, 0x00005355, 0x00002B56, 0x00000205,
    0x0000EA78, 0x0000EC4A,
];

/// Source of the reference waveform.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalSource;

impl SignalSource {
    /// The samples this source provides.
    pub fn samples(&self) -> &'static [u32] {
        &REFERENCE_SIGNAL
    }

    /// Write the reference signal into `buffer[..requested_length]`, zero-padding after it.
    ///
    /// The buffer is not yet visible to the DMA engine afterwards; publish it with
    /// [`CoherentBuffer::publish`](crate::buffer::CoherentBuffer::publish).
    ///
    /// # Returns: `Result<(), FftDmaError>`
    /// * `Ok(())` - `buffer[..requested_length]` holds the signal followed by zeroes
    /// * `Err(FftDmaError::CapacityExceeded)` - the signal does not fit in
    ///   `requested_length` samples, or `requested_length` exceeds the buffer
    pub fn fill(&self, buffer: &mut SignalBuffer, requested_length: usize) -> Result<(), FftDmaError> {
        info!("Preparing input data in DDR...");
        let signal = self.samples();
        if signal.len() > requested_length {
            return Err(FftDmaError::CapacityExceeded {
                required: signal.len(),
                available: requested_length,
            });
        }
        if requested_length > buffer.capacity() {
            return Err(FftDmaError::CapacityExceeded {
                required: requested_length,
                available: buffer.capacity(),
            });
        }

        let words = &mut buffer.as_mut_slice()[..requested_length];
        let (head, tail) = words.split_at_mut(signal.len());
        head.copy_from_slice(signal);
        tail.fill(0);
        debug!(
            "Loaded {} reference samples, zero-padded to {requested_length}",
            signal.len()
        );
        Ok(())
    }
}
