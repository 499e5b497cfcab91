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

//! Register-level driver for a Xilinx AXI DMA engine in simple (direct register) mode.
//!
//! Register layout and bit assignments follow the AXI DMA product guide (PG021). Each
//! channel has a control register (DMACR), a status register (DMASR), an address pair and
//! a length register; the S2MM block sits [`S2MM_OFFSET`] bytes after the MM2S block.
//! Writing the length register starts a transfer.

use crate::error::FftDmaError;
use crate::mmio::{MmioMemory, MmioRegion};
use crate::platforms::axi_dma_components::uio_directory::UioDirectory;
use crate::platforms::platform::{Direction, DmaConfig, DmaDriver};
use crate::system_io::{MappedMemory, map_device};
use log::{trace, warn};

pub const MM2S_OFFSET: usize = 0x00;
pub const S2MM_OFFSET: usize = 0x30;

pub const DMACR: usize = 0x00;
pub const DMASR: usize = 0x04;
pub const ADDR: usize = 0x18;
pub const ADDR_MSB: usize = 0x1C;
pub const LENGTH: usize = 0x28;

pub const DMACR_RUN_STOP: u32 = 1 << 0;
pub const DMACR_RESET: u32 = 1 << 2;
/// IOC, delay and error interrupt enables.
pub const DMACR_IRQ_ALL: u32 = 0b111 << 12;

pub const DMASR_HALTED: u32 = 1 << 0;
pub const DMASR_IDLE: u32 = 1 << 1;
pub const DMASR_SG_INCLUDED: u32 = 1 << 3;

/// Last register the driver touches, plus one word.
const REGISTER_WINDOW_END: usize = S2MM_OFFSET + LENGTH + size_of::<u32>();

fn channel_offset(direction: Direction) -> usize {
    match direction {
        Direction::HostToDevice => MM2S_OFFSET,
        Direction::DeviceToHost => S2MM_OFFSET,
    }
}

/// Register window mapped through a UIO device.
struct UioRegisters {
    mapping: MappedMemory,
    bus_addr: usize,
}

impl MmioMemory for UioRegisters {
    fn region(&self) -> MmioRegion<'_> {
        self.mapping.region(self.bus_addr)
    }
}

pub struct AxiDmaDriver {
    directory: Option<UioDirectory>,
    registers: Option<Box<dyn MmioMemory>>,
    config: Option<DmaConfig>,
}

impl AxiDmaDriver {
    /// A driver that maps the register window of the UIO device it is configured for.
    pub fn new(directory: UioDirectory) -> Self {
        AxiDmaDriver {
            directory: Some(directory),
            registers: None,
            config: None,
        }
    }

    /// A driver over an already accessible register window.
    pub fn with_registers(registers: impl MmioMemory + 'static) -> Self {
        AxiDmaDriver {
            directory: None,
            registers: Some(Box::new(registers)),
            config: None,
        }
    }

    fn registers(&self) -> Result<MmioRegion<'_>, FftDmaError> {
        self.registers
            .as_deref()
            .map(|memory| memory.region())
            .ok_or_else(|| FftDmaError::Internal("AXI DMA registers are not mapped".into()))
    }

    fn read(&self, offset: usize) -> Option<u32> {
        let value = self.registers().ok()?.read_reg(offset).ok()?;
        trace!("AXI DMA read  {offset:#04x} -> {value:#010x}");
        Some(value)
    }

    fn write(&self, offset: usize, value: u32) -> Result<(), FftDmaError> {
        let registers = self.registers()?;
        trace!("AXI DMA write {offset:#04x} <- {value:#010x}");
        registers.write_reg(offset, value)
    }

    fn modify(&self, offset: usize, f: impl FnOnce(u32) -> u32) -> Result<(), FftDmaError> {
        self.registers()?.modify_reg(offset, |value| {
            let value = f(value);
            trace!("AXI DMA write {offset:#04x} <- {value:#010x}");
            value
        })
    }

    fn map_registers(&mut self, config: &DmaConfig) -> Result<(), FftDmaError> {
        let Some(directory) = &self.directory else {
            return Err(FftDmaError::ConfigurationFailed(
                "no register window and no device directory to map one from".into(),
            ));
        };
        let device = directory.device_at(config.base_addr).ok_or_else(|| {
            FftDmaError::ConfigurationFailed(format!(
                "no UIO device maps the registers at {:#010x}",
                config.base_addr
            ))
        })?;
        let mapping = map_device(&device.dev_path, 0, config.register_span)?;
        self.registers = Some(Box::new(UioRegisters {
            mapping,
            bus_addr: config.base_addr,
        }));
        Ok(())
    }

    fn present_channels(&self) -> impl Iterator<Item = Direction> + '_ {
        Direction::BOTH.into_iter().filter(|d| {
            self.config
                .as_ref()
                .is_some_and(|config| config.has_channel(*d))
        })
    }
}

impl DmaDriver for AxiDmaDriver {
    fn configure(&mut self, config: &DmaConfig) -> Result<(), FftDmaError> {
        if self.registers.is_none() {
            self.map_registers(config)?;
        }
        let window = self.registers().map_or(0, |r| r.len_bytes());
        if window < REGISTER_WINDOW_END {
            return Err(FftDmaError::ConfigurationFailed(format!(
                "register window of {window:#x} bytes is smaller than the AXI DMA register map"
            )));
        }
        if config.addr_width != 32 && config.addr_width != 64 {
            return Err(FftDmaError::ConfigurationFailed(format!(
                "unsupported address width {}",
                config.addr_width
            )));
        }
        if !config.has_mm2s && !config.has_s2mm {
            return Err(FftDmaError::ConfigurationFailed(
                "the engine has neither an MM2S nor an S2MM channel".into(),
            ));
        }
        self.config = Some(config.clone());
        Ok(())
    }

    fn has_scatter_gather(&self) -> bool {
        self.present_channels()
            .filter_map(|d| self.read(channel_offset(d) + DMASR))
            .any(|sr| sr & DMASR_SG_INCLUDED != 0)
    }

    fn mask_interrupts(&mut self, direction: Direction) {
        if let Err(e) = self.modify(channel_offset(direction) + DMACR, |cr| cr & !DMACR_IRQ_ALL) {
            warn!("failed to mask {direction} interrupts: {e}");
        }
    }

    fn reset(&mut self) {
        // Resetting either channel resets the whole engine.
        let Some(direction) = [Direction::HostToDevice, Direction::DeviceToHost]
            .into_iter()
            .find(|d| self.config.as_ref().is_some_and(|c| c.has_channel(*d)))
        else {
            warn!("reset requested on an unconfigured AXI DMA");
            return;
        };
        if let Err(e) = self.write(channel_offset(direction) + DMACR, DMACR_RESET) {
            warn!("failed to reset the AXI DMA: {e}");
        }
    }

    fn reset_complete(&self) -> bool {
        self.present_channels().all(|d| {
            self.read(channel_offset(d) + DMACR)
                .is_some_and(|cr| cr & DMACR_RESET == 0)
        })
    }

    fn submit_simple(
        &mut self,
        direction: Direction,
        address: usize,
        length: usize,
    ) -> Result<(), FftDmaError> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| FftDmaError::SubmitFailed("the AXI DMA is not configured".into()))?;
        if length == 0 || length > config.max_transfer_len {
            return Err(FftDmaError::SubmitFailed(format!(
                "{direction} length {length} is outside 1..={}",
                config.max_transfer_len
            )));
        }
        let wide = config.addr_width > 32;
        let low = u32::try_from(address & 0xFFFF_FFFF).unwrap_or_default();
        let high = u32::try_from((address as u64) >> 32).unwrap_or_default();
        if high != 0 && !wide {
            return Err(FftDmaError::SubmitFailed(format!(
                "address {address:#x} does not fit the engine's 32 bit address space"
            )));
        }
        let length = u32::try_from(length).map_err(|_| {
            FftDmaError::SubmitFailed(format!("{direction} length {length} does not fit"))
        })?;

        let base = channel_offset(direction);
        let status = self.read(base + DMASR).unwrap_or_default();
        if status & (DMASR_HALTED | DMASR_IDLE) == 0 {
            return Err(FftDmaError::SubmitFailed(format!(
                "{direction} channel is running (DMASR {status:#010x})"
            )));
        }

        self.modify(base + DMACR, |cr| cr | DMACR_RUN_STOP)?;
        self.write(base + ADDR, low)?;
        if wide {
            self.write(base + ADDR_MSB, high)?;
        }
        self.write(base + LENGTH, length)
    }

    fn is_busy(&self, direction: Direction) -> bool {
        // A halted channel never finishes anything, so it only counts as busy while running.
        self.read(channel_offset(direction) + DMASR)
            .is_some_and(|sr| sr & (DMASR_HALTED | DMASR_IDLE) == 0)
    }
}
