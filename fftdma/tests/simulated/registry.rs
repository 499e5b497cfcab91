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

use crate::common::test_functions::{expect_error, loopback_samples};
use crate::simulated::PLATFORM_STRING;
use fftdma::pipeline::{Pipeline, RunOptions};
use fftdma::platforms::platform::{platform_for_known_platform, registered_platforms};
use fftdma::platforms::register_platforms;
use fftdma::spin::SpinPolicy;
use googletest::prelude::*;
use rstest::*;

#[gtest]
fn test_simulated_platform_is_registered() {
    register_platforms();
    expect_that!(registered_platforms().contains(&PLATFORM_STRING), eq(true));
    #[cfg(all(unix, feature = "axi-dma"))]
    expect_that!(registered_platforms().contains(&"xlnx,axi-dma"), eq(true));
    expect_that!(
        platform_for_known_platform(PLATFORM_STRING).map(|p| p.name().to_string()),
        ok(eq(&PLATFORM_STRING.to_string()))
    );
}

#[gtest]
fn test_run_registered_platform() {
    register_platforms();
    let mut pipeline = Pipeline::new(RunOptions {
        platform: PLATFORM_STRING.into(),
        spin: SpinPolicy::Bounded(100),
        ..Default::default()
    });
    expect_that!(pipeline.run_registered(), ok(eq(&loopback_samples())));
}

#[rstest]
#[case::unknown("foo", "FftDmaError::Argument")]
#[case::partial_component("simul", "FftDmaError::Argument")]
fn test_unknown_platform(#[case] platform: &str, #[case] expected: &str) {
    register_platforms();
    let mut pipeline = Pipeline::new(RunOptions {
        platform: platform.into(),
        ..Default::default()
    });
    expect_error(&pipeline.run_registered(), expected);
}
