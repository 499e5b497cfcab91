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

//! Behavioural model of an AXI DMA engine looped through an FFT core.
//!
//! The model follows the data path of the real design:
//! - A host-to-device (MM2S) transfer reads words from a BRAM and streams them into the
//!   FFT core. The core used here is the identity, so every word comes out unchanged.
//! - The core's output stream is accepted by a pending device-to-host (S2MM) transfer. If
//!   no S2MM transfer has been armed yet, the stream is dropped, just like on hardware.
//! - Results are committed to the destination BRAM when the S2MM channel goes idle, so
//!   reading the output before polling completion observes stale data.
//!
//! Latency and faults are configured through [`SimulatedDmaOptions`]. Everything the
//! driver was asked to do is recorded in a shared [`SimulatedDmaLog`].

use crate::error::FftDmaError;
use crate::platforms::platform::{Direction, DmaConfig, DmaDriver};
use crate::platforms::simulated_components::sim_memory::SimulatedBus;
use log::{trace, warn};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Knobs of the simulated engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulatedDmaOptions {
    /// `configure` fails.
    pub reject_config: bool,
    /// The engine reports scatter-gather support.
    pub scatter_gather: bool,
    /// Submissions in this direction fail.
    pub reject_submit: Option<Direction>,
    /// Number of `reset_complete` polls that report the reset as still running.
    pub reset_polls: u64,
    /// Number of `is_busy` polls a channel stays busy once it has its data.
    pub busy_polls: u64,
    /// Transfers never complete.
    pub stall: bool,
}

/// Record of the driver calls seen by the simulated engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulatedDmaLog {
    pub configured: Option<DmaConfig>,
    pub masked: Vec<Direction>,
    pub resets: u32,
    /// Accepted submissions, in order.
    pub submissions: Vec<(Direction, usize, usize)>,
    /// Stream words that reached the S2MM side with no transfer armed.
    pub dropped_words: usize,
}

#[derive(Default)]
struct Channel {
    active: Cell<bool>,
    /// The channel has all the data it is waiting for.
    fed: Cell<bool>,
    remaining_polls: Cell<u64>,
    destination: Cell<Option<(usize, usize)>>,
    received: RefCell<Vec<u32>>,
}

impl Channel {
    fn arm(&self, polls: u64) {
        self.active.set(true);
        self.fed.set(false);
        self.remaining_polls.set(polls);
        self.destination.set(None);
        self.received.borrow_mut().clear();
    }

    fn clear(&self) {
        self.active.set(false);
        self.fed.set(false);
        self.destination.set(None);
        self.received.borrow_mut().clear();
    }
}

pub struct SimulatedDma {
    bus: Rc<SimulatedBus>,
    options: SimulatedDmaOptions,
    config: Option<DmaConfig>,
    reset_remaining: Cell<u64>,
    mm2s: Channel,
    s2mm: Channel,
    log: Rc<RefCell<SimulatedDmaLog>>,
}

impl SimulatedDma {
    pub fn new(bus: Rc<SimulatedBus>, options: SimulatedDmaOptions) -> Self {
        Self::with_log(bus, options, Rc::new(RefCell::new(SimulatedDmaLog::default())))
    }

    pub fn with_log(
        bus: Rc<SimulatedBus>,
        options: SimulatedDmaOptions,
        log: Rc<RefCell<SimulatedDmaLog>>,
    ) -> Self {
        SimulatedDma {
            bus,
            options,
            config: None,
            reset_remaining: Cell::new(0),
            mm2s: Channel::default(),
            s2mm: Channel::default(),
            log,
        }
    }

    pub fn log(&self) -> Rc<RefCell<SimulatedDmaLog>> {
        Rc::clone(&self.log)
    }

    fn channel(&self, direction: Direction) -> &Channel {
        match direction {
            Direction::DeviceToHost => &self.s2mm,
            Direction::HostToDevice => &self.mm2s,
        }
    }

    fn validate(&self, direction: Direction, address: usize, length: usize) -> Result<(), FftDmaError> {
        let config = self.config.as_ref().ok_or_else(|| {
            FftDmaError::SubmitFailed("simulated engine is not configured".into())
        })?;
        if self.options.reject_submit == Some(direction) {
            return Err(FftDmaError::SubmitFailed(format!(
                "simulated engine rejected the {direction} transfer"
            )));
        }
        if length == 0 || length > config.max_transfer_len || length % size_of::<u32>() != 0 {
            return Err(FftDmaError::SubmitFailed(format!(
                "invalid {direction} transfer length {length}"
            )));
        }
        if self.channel(direction).active.get() {
            return Err(FftDmaError::SubmitFailed(format!(
                "{direction} channel is running"
            )));
        }
        if self.bus.bram_for(address, length).is_none() {
            return Err(FftDmaError::SubmitFailed(format!(
                "{length} bytes at {address:#010x} are not backed by memory"
            )));
        }
        Ok(())
    }

    /// Stream `length` bytes from `address` through the FFT core into the S2MM channel.
    fn stream_through_core(&self, address: usize, length: usize) {
        let words = (0..length / size_of::<u32>())
            .filter_map(|i| self.bus.read_word(address + i * size_of::<u32>()));

        if self.s2mm.active.get() && !self.s2mm.fed.get() {
            let capacity = self
                .s2mm
                .destination
                .get()
                .map_or(0, |(_, len)| len / size_of::<u32>());
            let mut received = self.s2mm.received.borrow_mut();
            received.extend(words.take(capacity));
            self.s2mm.fed.set(true);
        } else {
            let dropped = words.count();
            warn!("simulated FFT output dropped: {dropped} words with no S2MM transfer armed");
            self.log.borrow_mut().dropped_words += dropped;
        }
    }

    /// Write what the S2MM channel received to its destination.
    fn commit_s2mm(&self) {
        if let Some((address, _)) = self.s2mm.destination.get() {
            for (i, word) in self.s2mm.received.borrow().iter().enumerate() {
                self.bus.write_word(address + i * size_of::<u32>(), *word);
            }
        }
    }
}

impl SimulatedBus {
    fn read_word(&self, addr: usize) -> Option<u32> {
        self.bram_for(addr, size_of::<u32>())?.read(addr)
    }

    fn write_word(&self, addr: usize, value: u32) -> Option<()> {
        self.bram_for(addr, size_of::<u32>())?.write(addr, value)
    }
}

impl DmaDriver for SimulatedDma {
    fn configure(&mut self, config: &DmaConfig) -> Result<(), FftDmaError> {
        if self.options.reject_config {
            return Err(FftDmaError::ConfigurationFailed(format!(
                "simulated engine rejected the configuration of DMA {}",
                config.device_id
            )));
        }
        self.config = Some(config.clone());
        self.log.borrow_mut().configured = Some(config.clone());
        Ok(())
    }

    fn has_scatter_gather(&self) -> bool {
        self.options.scatter_gather
    }

    fn mask_interrupts(&mut self, direction: Direction) {
        self.log.borrow_mut().masked.push(direction);
    }

    fn reset(&mut self) {
        trace!("simulated reset");
        self.mm2s.clear();
        self.s2mm.clear();
        self.reset_remaining.set(self.options.reset_polls);
        self.log.borrow_mut().resets += 1;
    }

    fn reset_complete(&self) -> bool {
        match self.reset_remaining.get() {
            0 => true,
            n => {
                self.reset_remaining.set(n - 1);
                false
            }
        }
    }

    fn submit_simple(
        &mut self,
        direction: Direction,
        address: usize,
        length: usize,
    ) -> Result<(), FftDmaError> {
        self.validate(direction, address, length)?;
        self.log
            .borrow_mut()
            .submissions
            .push((direction, address, length));

        let channel = self.channel(direction);
        channel.arm(self.options.busy_polls);
        match direction {
            Direction::DeviceToHost => channel.destination.set(Some((address, length))),
            Direction::HostToDevice => {
                channel.fed.set(true);
                self.stream_through_core(address, length);
            }
        }
        Ok(())
    }

    fn is_busy(&self, direction: Direction) -> bool {
        let channel = self.channel(direction);
        if !channel.active.get() {
            return false;
        }
        if self.options.stall || !channel.fed.get() {
            return true;
        }
        match channel.remaining_polls.get() {
            0 => {
                if direction == Direction::DeviceToHost {
                    self.commit_s2mm();
                }
                channel.clear();
                false
            }
            n => {
                channel.remaining_polls.set(n - 1);
                true
            }
        }
    }
}
