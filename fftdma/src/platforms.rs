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

//! Platform implementations and their registration.
//!
//! See [`platform`] for the capability traits and the registry.

#[cfg(all(unix, feature = "axi-dma"))]
pub mod axi_dma;
#[cfg(all(unix, feature = "axi-dma"))]
pub mod axi_dma_components;
pub mod platform;
pub mod simulated;
pub mod simulated_components;

#[cfg(all(unix, feature = "axi-dma"))]
use crate::platforms::axi_dma::AxiDmaPlatform;
use crate::platforms::simulated::SimulatedPlatform;

/// Register all available platform implementations.
///
/// 1. Xilinx AXI DMA (if feature enabled) - Linux UIO and `/dev/mem` access
/// 2. Simulated - In-process model, always available
pub fn register_platforms() {
    #[cfg(all(unix, feature = "axi-dma"))]
    AxiDmaPlatform::register_platform();
    SimulatedPlatform::register_platform();
}
