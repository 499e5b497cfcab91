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

//! Decoding of the FFT core's output words.
//!
//! Each 32-bit output word packs one complex bin: the real part in bits 31..16 and the
//! imaginary part in bits 15..0, both as two's complement 16-bit values.

use crate::error::FftDmaError;
use crate::mmio::MmioRegion;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComplexSample {
    pub real: i16,
    pub imag: i16,
}

impl fmt::Display for ComplexSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Real: {:6}, Imag: {:6}", self.real, self.imag)
    }
}

/// Split one output word into its real and imaginary parts.
pub fn decode_word(word: u32) -> ComplexSample {
    ComplexSample {
        real: (word >> 16) as u16 as i16,
        imag: (word & 0xFFFF) as u16 as i16,
    }
}

pub struct ResultDecoder;

impl ResultDecoder {
    /// Lazily decode the first `sample_count` words of `output`.
    ///
    /// Nothing is read until the returned iterator is advanced. Each step issues one
    /// volatile read, so the output must only be decoded after the pass has completed.
    ///
    /// # Returns: `Result<Decode, FftDmaError>`
    /// * `Ok(Decode)` - Iterator over the decoded samples, in index order
    /// * `Err(FftDmaError::Bounds)` - `sample_count` exceeds the region
    pub fn decode<'a>(
        output: &MmioRegion<'a>,
        sample_count: usize,
    ) -> Result<Decode<'a>, FftDmaError> {
        if sample_count > output.len_words() {
            return Err(FftDmaError::Bounds(format!(
                "cannot decode {sample_count} samples from a region of {} words",
                output.len_words()
            )));
        }
        Ok(Decode {
            region: *output,
            next: 0,
            end: sample_count,
        })
    }
}

/// Iterator returned by [`ResultDecoder::decode`].
///
/// A clone continues from the same position and re-reads the hardware. Like the region it
/// reads from, it cannot outlive the memory behind it.
#[derive(Debug, Clone)]
pub struct Decode<'a> {
    region: MmioRegion<'a>,
    next: usize,
    end: usize,
}

impl Iterator for Decode<'_> {
    type Item = ComplexSample;

    fn next(&mut self) -> Option<ComplexSample> {
        if self.next >= self.end {
            return None;
        }
        let word = self.region.read(self.next).ok()?;
        self.next += 1;
        Some(decode_word(word))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Decode<'_> {}
