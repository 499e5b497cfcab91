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

use crate::simulated::platform;
use fftdma::accelerator::{AcceleratorHandle, AcceleratorState};
use fftdma::config::{DMA_DEV_ID, INTERMEDIATE_BRAM_BASE_ADDR, OUTPUT_BRAM_BASE_ADDR};
use fftdma::platforms::platform::{Direction, Platform};
use fftdma::platforms::simulated::SimulatedPlatform;
use fftdma::spin::SpinPolicy;
use googletest::prelude::*;
use rstest::*;

#[gtest]
#[rstest]
fn test_state_follows_a_pass(mut platform: SimulatedPlatform) {
    platform.init().unwrap();
    let driver = platform.take_driver().unwrap();
    let mut handle =
        AcceleratorHandle::open(platform.directory(), driver, DMA_DEV_ID, SpinPolicy::Bounded(100))
            .unwrap();
    expect_that!(handle.state(), eq(AcceleratorState::Idle));

    handle
        .submit(Direction::DeviceToHost, OUTPUT_BRAM_BASE_ADDR, 64)
        .unwrap();
    expect_that!(handle.state(), eq(AcceleratorState::Busy(Direction::DeviceToHost)));
    handle
        .submit(Direction::HostToDevice, INTERMEDIATE_BRAM_BASE_ADDR, 64)
        .unwrap();
    expect_that!(handle.is_busy(Direction::HostToDevice), eq(true));

    expect_that!(handle.wait_idle(Direction::HostToDevice), ok(anything()));
    expect_that!(handle.wait_idle(Direction::DeviceToHost), ok(anything()));
    expect_that!(handle.state(), eq(AcceleratorState::Idle));
    platform.cleanup();
}

#[gtest]
#[rstest]
fn test_only_one_session_per_platform(mut platform: SimulatedPlatform) {
    platform.init().unwrap();
    let driver = platform.take_driver().unwrap();
    let _handle =
        AcceleratorHandle::open(platform.directory(), driver, DMA_DEV_ID, SpinPolicy::Unbounded)
            .unwrap();
    expect_that!(
        platform.take_driver().map(|_| ()),
        err(displays_as(contains_substring("FftDmaError::Internal")))
    );
    platform.cleanup();
}
