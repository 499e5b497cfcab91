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

use crate::common::test_functions::{expect_error, loopback_samples, simulated_pipeline};
use crate::simulated::platform;
use fftdma::config::{INTERMEDIATE_BRAM_BASE_ADDR, OUTPUT_BRAM_BASE_ADDR, TRANSFER_LENGTH};
use fftdma::decoder::ComplexSample;
use fftdma::pipeline::{Pipeline, RunOptions};
use fftdma::platforms::platform::{Direction, Platform};
use fftdma::platforms::simulated::SimulatedPlatform;
use fftdma::platforms::simulated_components::sim_dma::SimulatedDmaOptions;
use googletest::prelude::*;
use rstest::*;

#[gtest]
#[rstest]
fn test_identity_core_returns_reference_signal(mut platform: SimulatedPlatform) {
    let mut pipeline = simulated_pipeline(100);
    let samples = pipeline.run(&mut platform).unwrap();

    expect_that!(samples.len(), eq(1024));
    expect_that!(samples[0], eq(ComplexSample { real: 0, imag: 0 }));
    expect_that!(&samples, eq(&loopback_samples()));
    expect_that!(platform.cleanup_calls(), eq(1));
}

#[gtest]
#[rstest]
fn test_transfers_are_armed_output_first(mut platform: SimulatedPlatform) {
    let mut pipeline = simulated_pipeline(100);
    pipeline.run(&mut platform).unwrap();

    let log = platform.dma_log();
    expect_that!(
        &log.submissions,
        eq(&vec![
            (Direction::DeviceToHost, OUTPUT_BRAM_BASE_ADDR, TRANSFER_LENGTH),
            (Direction::HostToDevice, INTERMEDIATE_BRAM_BASE_ADDR, TRANSFER_LENGTH),
        ])
    );
    expect_that!(log.dropped_words, eq(0));
    expect_that!(log.resets, eq(1));
}

#[gtest]
#[rstest]
fn test_source_is_published_once_before_transfer(mut platform: SimulatedPlatform) {
    let mut pipeline = simulated_pipeline(100);
    pipeline.run(&mut platform).unwrap();

    expect_that!(
        &platform.flushes(),
        eq(&vec![(pipeline.source().addr(), TRANSFER_LENGTH)])
    );
}

#[gtest]
fn test_source_buffer_is_reused_across_runs() {
    let mut pipeline = simulated_pipeline(100);
    let first = pipeline.run(&mut SimulatedPlatform::new()).unwrap();
    let addr = pipeline.source().addr();
    let second = pipeline.run(&mut SimulatedPlatform::new()).unwrap();

    expect_that!(pipeline.source().addr(), eq(addr));
    expect_that!(&first, eq(&second));
}

#[gtest]
#[rstest]
#[case::unknown_device(
    SimulatedDmaOptions::default(),
    7,
    "FftDmaError::DeviceNotFound: no DMA configuration found for device 7"
)]
#[case::rejected_config(
    SimulatedDmaOptions { reject_config: true, ..Default::default() },
    0,
    "FftDmaError::ConfigurationFailed"
)]
#[case::stuck_reset(
    SimulatedDmaOptions { reset_polls: u64::MAX, ..Default::default() },
    0,
    "DMA reset did not complete within 100 polls"
)]
#[case::rejected_d2h(
    SimulatedDmaOptions { reject_submit: Some(Direction::DeviceToHost), ..Default::default() },
    0,
    "FftDmaError::SubmitFailed"
)]
#[case::rejected_h2d(
    SimulatedDmaOptions { reject_submit: Some(Direction::HostToDevice), ..Default::default() },
    0,
    "FftDmaError::SubmitFailed"
)]
#[case::stalled(
    SimulatedDmaOptions { stall: true, ..Default::default() },
    0,
    "host-to-device transfer did not complete within 100 polls"
)]
fn test_failures_still_tear_down(
    #[case] options: SimulatedDmaOptions,
    #[case] device_id: u16,
    #[case] expected: &str,
) {
    let mut platform = SimulatedPlatform::with_options(options);
    let mut pipeline = Pipeline::new(RunOptions {
        device_id,
        ..simulated_pipeline(100).options().clone()
    });

    let result = pipeline.run(&mut platform);

    expect_error(&result, expected);
    expect_that!(platform.init_calls(), eq(1));
    expect_that!(platform.cleanup_calls(), eq(1));
}

#[gtest]
fn test_failed_d2h_submit_never_starts_h2d() {
    let mut platform = SimulatedPlatform::with_options(SimulatedDmaOptions {
        reject_submit: Some(Direction::DeviceToHost),
        ..Default::default()
    });
    let result = simulated_pipeline(100).run(&mut platform);

    expect_that!(result.is_err(), eq(true));
    expect_that!(platform.dma_log().submissions.is_empty(), eq(true));
}

#[gtest]
fn test_scatter_gather_engine_still_runs() {
    let mut platform = SimulatedPlatform::with_options(SimulatedDmaOptions {
        scatter_gather: true,
        ..Default::default()
    });
    let result = simulated_pipeline(100).run(&mut platform);

    expect_that!(result.map(|s| s.len()), ok(eq(&1024_usize)));
}

#[gtest]
fn test_regions_are_unmapped_after_run() {
    let mut platform = SimulatedPlatform::new();
    simulated_pipeline(100).run(&mut platform).unwrap();
    expect_that!(platform.staging_region().map(|_| ()), err(anything()));
}
