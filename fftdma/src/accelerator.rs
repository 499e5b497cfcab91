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

//! Owned session with the DMA engine in front of the FFT core.
//!
//! An [`AcceleratorHandle`] walks through
//! `Uninitialized -> Configured -> Idle -> Busy(direction) -> Idle -> ... -> Closed`.
//! It is created by [`AcceleratorHandle::open`] and closed when dropped. Completion is
//! only ever observed by polling; every interrupt source is masked while opening.

use crate::error::FftDmaError;
use crate::platforms::platform::{DeviceDirectory, Direction, DmaConfig, DmaDriver};
use crate::spin::SpinPolicy;
use log::{debug, info, trace, warn};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceleratorState {
    Uninitialized,
    Configured,
    Idle,
    Busy(Direction),
    Closed,
}

impl fmt::Display for AcceleratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceleratorState::Uninitialized => write!(f, "uninitialized"),
            AcceleratorState::Configured => write!(f, "configured"),
            AcceleratorState::Idle => write!(f, "idle"),
            AcceleratorState::Busy(direction) => write!(f, "busy ({direction})"),
            AcceleratorState::Closed => write!(f, "closed"),
        }
    }
}

/// The single session with one DMA engine.
pub struct AcceleratorHandle<D: DmaDriver> {
    driver: D,
    config: DmaConfig,
    state: AcceleratorState,
    /// Submitted directions not yet seen idle by [`AcceleratorHandle::wait_idle`], oldest first.
    in_flight: Vec<Direction>,
    spin: SpinPolicy,
}

impl<D: DmaDriver> AcceleratorHandle<D> {
    /// Look up, configure, and reset DMA engine `device_id`.
    ///
    /// Interrupts are masked on both channels before the reset. The reset is awaited
    /// according to `spin`. An engine with scatter-gather support is only driven in simple
    /// mode; that is reported with a warning and is not an error.
    ///
    /// # Returns: `Result<AcceleratorHandle<D>, FftDmaError>`
    /// * `Ok(AcceleratorHandle)` - The engine is reset and idle
    /// * `Err(FftDmaError::DeviceNotFound)` - `directory` has no entry for `device_id`
    /// * `Err(FftDmaError::ConfigurationFailed)` - The driver rejected the configuration
    /// * `Err(FftDmaError::Timeout)` - The reset did not finish within a bounded `spin`
    pub fn open(
        directory: &dyn DeviceDirectory,
        mut driver: D,
        device_id: u16,
        spin: SpinPolicy,
    ) -> Result<Self, FftDmaError> {
        let config = directory
            .lookup(device_id)
            .ok_or(FftDmaError::DeviceNotFound(device_id))?;
        debug!("DMA {device_id} config: {config:?}");

        driver.configure(&config).map_err(|e| match e {
            FftDmaError::ConfigurationFailed(_) => e,
            other => FftDmaError::ConfigurationFailed(other.to_string()),
        })?;
        let mut handle = AcceleratorHandle {
            driver,
            config,
            state: AcceleratorState::Configured,
            in_flight: Vec::new(),
            spin,
        };

        if handle.driver.has_scatter_gather() {
            warn!("DMA configured for Scatter-Gather, but only Simple mode is used");
        }

        for direction in Direction::BOTH {
            trace!("masking {direction} interrupts");
            handle.driver.mask_interrupts(direction);
        }
        handle.driver.reset();
        let driver = &handle.driver;
        handle
            .spin
            .spin_until("DMA reset", || driver.reset_complete())?;

        handle.state = AcceleratorState::Idle;
        info!("DMA {device_id} ready at {:#010x}", handle.config.base_addr);
        Ok(handle)
    }

    pub fn config(&self) -> &DmaConfig {
        &self.config
    }

    pub fn spin_policy(&self) -> SpinPolicy {
        self.spin
    }

    /// Current state, as of the last submission or completed wait. Does not poll the engine.
    pub fn state(&self) -> AcceleratorState {
        self.state
    }

    /// Start one simple transfer of `byte_length` bytes at bus address `address`.
    ///
    /// # Returns: `Result<(), FftDmaError>`
    /// * `Ok(())` - The transfer is in flight
    /// * `Err(FftDmaError::SubmitFailed)` - `direction` is still busy, the engine lacks the
    ///   channel, or the driver rejected the request
    pub fn submit(
        &mut self,
        direction: Direction,
        address: usize,
        byte_length: usize,
    ) -> Result<(), FftDmaError> {
        if !self.config.has_channel(direction) {
            return Err(FftDmaError::SubmitFailed(format!(
                "DMA {} has no {direction} channel",
                self.config.device_id
            )));
        }
        if self.driver.is_busy(direction) {
            return Err(FftDmaError::SubmitFailed(format!(
                "{direction} channel is still busy"
            )));
        }
        trace!("submitting {direction}: {byte_length} bytes at {address:#010x}");
        self.driver
            .submit_simple(direction, address, byte_length)
            .map_err(|e| match e {
                FftDmaError::SubmitFailed(_) => e,
                other => FftDmaError::SubmitFailed(other.to_string()),
            })?;
        self.in_flight.push(direction);
        self.state = AcceleratorState::Busy(direction);
        Ok(())
    }

    pub fn is_busy(&self, direction: Direction) -> bool {
        self.driver.is_busy(direction)
    }

    /// Poll `direction` until it is idle, according to the handle's spin policy.
    ///
    /// The handle is idle again once every submitted direction has been waited for.
    ///
    /// # Returns: `Result<u64, FftDmaError>`
    /// * `Ok(u64)` - Number of polls that still reported busy
    /// * `Err(FftDmaError::Timeout)` - The bound of a bounded spin policy was reached
    pub fn wait_idle(&mut self, direction: Direction) -> Result<u64, FftDmaError> {
        let driver = &self.driver;
        let polls = self
            .spin
            .spin_until(&format!("{direction} transfer"), || !driver.is_busy(direction))?;
        self.in_flight.retain(|d| *d != direction);
        self.state = match self.in_flight.last() {
            Some(pending) => AcceleratorState::Busy(*pending),
            None => AcceleratorState::Idle,
        };
        Ok(polls)
    }
}

impl<D: DmaDriver> Drop for AcceleratorHandle<D> {
    fn drop(&mut self) {
        debug!(
            "closing DMA {} (was {})",
            self.config.device_id, self.state
        );
        self.state = AcceleratorState::Closed;
    }
}

impl<D: DmaDriver> fmt::Debug for AcceleratorHandle<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceleratorHandle")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("spin", &self.spin)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::simulated_components::sim_dma::{SimulatedDma, SimulatedDmaOptions};
    use crate::platforms::simulated_components::sim_memory::SimulatedBus;
    use googletest::prelude::*;
    use std::collections::HashMap;
    use std::rc::Rc;

    struct MapDirectory(HashMap<u16, DmaConfig>);

    impl DeviceDirectory for MapDirectory {
        fn lookup(&self, device_id: u16) -> Option<DmaConfig> {
            self.0.get(&device_id).cloned()
        }
    }

    fn directory() -> MapDirectory {
        MapDirectory(HashMap::from([(
            0,
            DmaConfig {
                device_id: 0,
                base_addr: 0x4040_0000,
                register_span: 0x1_0000,
                has_mm2s: true,
                has_s2mm: true,
                max_transfer_len: 0x3FFF,
                addr_width: 32,
            },
        )]))
    }

    fn sim(options: SimulatedDmaOptions) -> SimulatedDma {
        SimulatedDma::new(Rc::new(SimulatedBus::new()), options)
    }

    #[gtest]
    fn test_open_unknown_device() {
        let result = AcceleratorHandle::open(
            &directory(),
            sim(SimulatedDmaOptions::default()),
            7,
            SpinPolicy::Unbounded,
        );
        expect_that!(
            result.map(|_| ()),
            err(displays_as(contains_substring(
                "FftDmaError::DeviceNotFound: no DMA configuration found for device 7"
            )))
        );
    }

    #[gtest]
    fn test_open_rejected_configuration() {
        let options = SimulatedDmaOptions {
            reject_config: true,
            ..Default::default()
        };
        let result =
            AcceleratorHandle::open(&directory(), sim(options), 0, SpinPolicy::Unbounded);
        expect_that!(
            result.map(|_| ()),
            err(displays_as(contains_substring("FftDmaError::ConfigurationFailed")))
        );
    }

    #[gtest]
    fn test_open_masks_interrupts_and_waits_for_reset() {
        let options = SimulatedDmaOptions {
            reset_polls: 5,
            ..Default::default()
        };
        let dma = sim(options);
        let log = dma.log();
        let handle =
            AcceleratorHandle::open(&directory(), dma, 0, SpinPolicy::Bounded(100)).unwrap();

        expect_that!(handle.state(), eq(AcceleratorState::Idle));
        let log = log.borrow();
        expect_that!(log.masked.len(), eq(2));
        expect_that!(log.resets, eq(1));
    }

    #[gtest]
    fn test_open_times_out_on_stuck_reset() {
        let options = SimulatedDmaOptions {
            reset_polls: u64::MAX,
            ..Default::default()
        };
        let result =
            AcceleratorHandle::open(&directory(), sim(options), 0, SpinPolicy::Bounded(50));
        expect_that!(
            result.map(|_| ()),
            err(displays_as(contains_substring("DMA reset did not complete")))
        );
    }

    #[gtest]
    fn test_scatter_gather_is_not_fatal() {
        let options = SimulatedDmaOptions {
            scatter_gather: true,
            ..Default::default()
        };
        let result =
            AcceleratorHandle::open(&directory(), sim(options), 0, SpinPolicy::Unbounded);
        expect_that!(result.map(|_| ()), ok(anything()));
    }

    #[gtest]
    fn test_submit_refuses_busy_direction() {
        let options = SimulatedDmaOptions {
            busy_polls: 10,
            ..Default::default()
        };
        let mut handle =
            AcceleratorHandle::open(&directory(), sim(options), 0, SpinPolicy::Unbounded).unwrap();
        handle
            .submit(Direction::DeviceToHost, 0x4200_0000, 16)
            .unwrap();
        expect_that!(
            handle.state(),
            eq(AcceleratorState::Busy(Direction::DeviceToHost))
        );
        expect_that!(
            handle.submit(Direction::DeviceToHost, 0x4200_0000, 16),
            err(displays_as(contains_substring("still busy")))
        );
    }

    #[gtest]
    fn test_submit_requires_channel() {
        let mut dir = directory();
        dir.0.get_mut(&0).unwrap().has_s2mm = false;
        let mut handle = AcceleratorHandle::open(
            &dir,
            sim(SimulatedDmaOptions::default()),
            0,
            SpinPolicy::Unbounded,
        )
        .unwrap();
        expect_that!(
            handle.submit(Direction::DeviceToHost, 0x4200_0000, 16),
            err(displays_as(contains_substring("no device-to-host channel")))
        );
    }

    #[gtest]
    fn test_state_does_not_poll_the_engine() {
        let options = SimulatedDmaOptions {
            busy_polls: 5,
            ..Default::default()
        };
        let mut handle =
            AcceleratorHandle::open(&directory(), sim(options), 0, SpinPolicy::Bounded(100)).unwrap();
        handle
            .submit(Direction::HostToDevice, 0x4000_0000, 16)
            .unwrap();

        for _ in 0..20 {
            expect_that!(
                handle.state(),
                eq(AcceleratorState::Busy(Direction::HostToDevice))
            );
        }
        // all five busy polls are still ahead of the engine
        expect_that!(handle.wait_idle(Direction::HostToDevice), ok(eq(&5_u64)));
        expect_that!(handle.state(), eq(AcceleratorState::Idle));
    }

    #[gtest]
    fn test_handle_stays_busy_until_every_direction_is_waited_for() {
        let mut handle = AcceleratorHandle::open(
            &directory(),
            sim(SimulatedDmaOptions::default()),
            0,
            SpinPolicy::Bounded(100),
        )
        .unwrap();
        handle
            .submit(Direction::DeviceToHost, 0x4200_0000, 16)
            .unwrap();
        handle
            .submit(Direction::HostToDevice, 0x4000_0000, 16)
            .unwrap();

        handle.wait_idle(Direction::HostToDevice).unwrap();
        expect_that!(
            handle.state(),
            eq(AcceleratorState::Busy(Direction::DeviceToHost))
        );
        handle.wait_idle(Direction::DeviceToHost).unwrap();
        expect_that!(handle.state(), eq(AcceleratorState::Idle));
    }
}
