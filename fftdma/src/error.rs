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

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FftDmaError {
    #[error(
        "FftDmaError::CapacityExceeded: {required} samples required but only {available} available"
    )]
    CapacityExceeded { required: usize, available: usize },
    #[error("FftDmaError::DeviceNotFound: no DMA configuration found for device {0}")]
    DeviceNotFound(u16),
    #[error("FftDmaError::ConfigurationFailed: {0}")]
    ConfigurationFailed(String),
    #[error("FftDmaError::SubmitFailed: {0}")]
    SubmitFailed(String),
    #[error("FftDmaError::Timeout: {what} did not complete within {spins} polls")]
    Timeout { what: String, spins: u64 },
    #[error("FftDmaError::Bounds: {0}")]
    Bounds(String),
    #[error("FftDmaError::Argument: {0}")]
    Argument(String),
    #[error("FftDmaError::IORead: An IO error occurred when reading from {file:?}: {e}")]
    IORead { file: PathBuf, e: std::io::Error },
    #[error("FftDmaError::IOReadDir: An IO error occurred when reading directory {dir:?}: {e}")]
    IOReadDir { dir: PathBuf, e: std::io::Error },
    #[error("FftDmaError::IOMap: An IO error occurred when mapping {file:?}: {e}")]
    IOMap { file: PathBuf, e: std::io::Error },
    #[error("FftDmaError::Internal: An Internal error occurred: {0}")]
    Internal(String),
}
