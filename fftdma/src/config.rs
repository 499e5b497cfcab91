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

//! Build-time description of the hardware design under test.
//!
//! The addresses match the reference block design: an AXI DMA engine whose MM2S stream
//! feeds the FFT core and whose S2MM stream collects the FFT output, with one AXI BRAM
//! controller on each side.

/// Device id of the AXI DMA engine driving the FFT core.
pub const DMA_DEV_ID: u16 = 0;

/// Bus address of the BRAM the FFT input is staged in (`axi_bram_ctrl_0`).
pub const INTERMEDIATE_BRAM_BASE_ADDR: usize = 0x4000_0000;

/// Bus address of the BRAM the FFT output lands in (`axi_bram_ctrl_1`).
pub const OUTPUT_BRAM_BASE_ADDR: usize = 0x4200_0000;

/// Size of each BRAM window in bytes.
pub const BRAM_SIZE: usize = 0x2000;

/// DDR address reserved for the source buffer in the block design. The source buffer is
/// owned by the process, so this is only reported in the banner.
pub const DDR_SOURCE_ADDR: usize = 0x0100_0000;

/// Number of points of the FFT core.
pub const FFT_N_POINTS: usize = 1024;

/// Width of a single sample word.
pub const BYTES_PER_SAMPLE: usize = 4;

/// Length of one DMA transfer in bytes.
pub const TRANSFER_LENGTH: usize = FFT_N_POINTS * BYTES_PER_SAMPLE;

/// Data cache line size of the host CPU.
pub const CACHE_LINE_SIZE: usize = 32;

/// Width of the AXI DMA buffer length register when none is provided by the device.
pub const DEFAULT_BUFFER_LENGTH_WIDTH: u32 = 14;

/// Span of the AXI DMA register window.
pub const AXI_DMA_REGISTER_SPAN: usize = 0x1_0000;

/// Compatibility string used when no platform is requested.
pub const DEFAULT_PLATFORM: &str = "xlnx,axi-dma";

/// The kernel's location of UIO device objects. Typically `/sys/class/uio/`.
pub static UIO_CLASS_DIR: &str = "/sys/class/uio/";

/// Directory holding the UIO character devices.
pub static DEV_DIR: &str = "/dev/";

/// Physical memory device used to map the BRAM windows.
pub static DEV_MEM_PATH: &str = "/dev/mem";

/// Substring of the UIO `name` attribute that identifies an AXI DMA engine.
pub static AXI_DMA_UIO_NAME: &str = "dma";
