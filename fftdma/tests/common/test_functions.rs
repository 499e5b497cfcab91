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

use fftdma::decoder::{ComplexSample, decode_word};
use fftdma::error::FftDmaError;
use fftdma::pipeline::{Pipeline, RunOptions};
use fftdma::signal::REFERENCE_SIGNAL;
use fftdma::spin::SpinPolicy;
use googletest::prelude::*;

/// A pipeline for the simulated platform that gives up after `limit` polls per wait.
pub fn simulated_pipeline(limit: u64) -> Pipeline {
    Pipeline::new(RunOptions {
        platform: "simulated".into(),
        spin: SpinPolicy::Bounded(limit),
        ..Default::default()
    })
}

/// What an identity FFT core returns for the reference signal.
pub fn loopback_samples() -> Vec<ComplexSample> {
    let mut samples: Vec<ComplexSample> = REFERENCE_SIGNAL.iter().map(|w| decode_word(*w)).collect();
    samples.resize(1024, ComplexSample::default());
    samples
}

pub fn expect_error<T: std::fmt::Debug>(res: &Result<T, FftDmaError>, exp: &str) {
    match res {
        Ok(v) => panic!("expected an error containing {exp:?}, got Ok({v:?})"),
        Err(e) => {
            assert_that!(
                e.to_string(),
                contains_substring(exp),
                "Mismatched error signature"
            );
        }
    }
}
