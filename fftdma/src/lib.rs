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

//! fftdma drives a hardware FFT accelerator through a Xilinx AXI DMA engine and reports
//! what comes out.
//!
//! A run stages a known reference signal, publishes it to the hardware, copies it into
//! the BRAM in front of the DMA engine, starts the device-to-host and host-to-device
//! transfers as a pair, busy-polls both to completion, and decodes the complex FFT bins
//! written to the output BRAM.
//!
//! # Modules
//!
//! - [`signal`] - The reference waveform and [`signal::SignalSource`]
//! - [`buffer`] - The cache-line aligned source buffer and [`buffer::CoherentBuffer`]
//! - [`mmio`] - Volatile word access to memory-mapped regions
//! - [`accelerator`] - [`accelerator::AcceleratorHandle`], the DMA engine session
//! - [`orchestrator`] - [`orchestrator::TransferOrchestrator`], one pass through the core
//! - [`decoder`] - [`decoder::ResultDecoder`] and the output word format
//! - [`pipeline`] - The complete run inside a platform session
//! - [`platforms`] - Hardware access behind capability traits, and the platform registry
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level of the `fftdma` binary (`trace`, `debug`,
//!   `info`, `warn`, `error` or `off`). Defaults to `info`

pub mod accelerator;
pub mod buffer;
pub mod config;
pub mod decoder;
pub mod error;
pub mod mmio;
pub mod orchestrator;
pub mod pipeline;
pub mod platforms;
pub mod signal;
pub mod spin;
#[cfg(unix)]
pub mod system_io;
