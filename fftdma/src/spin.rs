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

//! Busy-polling with an optional bound.
//!
//! With [`SpinPolicy::Unbounded`] a device that never reports completion hangs the caller
//! forever. That is the behaviour of the bare-metal diagnostic this tool is modelled on, and
//! it stays the default. [`SpinPolicy::Bounded`] turns the hang into
//! [`FftDmaError::Timeout`].

use crate::error::FftDmaError;
use log::trace;
use std::hint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpinPolicy {
    /// Poll until the condition holds, however long it takes.
    #[default]
    Unbounded,
    /// Poll at most this many times.
    Bounded(u64),
}

impl SpinPolicy {
    /// `Bounded(limit)` for `Some(limit)`, otherwise `Unbounded`.
    pub fn from_limit(limit: Option<u64>) -> Self {
        limit.map_or(SpinPolicy::Unbounded, SpinPolicy::Bounded)
    }

    /// Poll `done` until it returns `true`.
    ///
    /// # Returns: `Result<u64, FftDmaError>`
    /// * `Ok(u64)` - Number of polls that returned `false` before completion
    /// * `Err(FftDmaError::Timeout)` - The bound was reached first
    pub fn spin_until(
        &self,
        what: &str,
        mut done: impl FnMut() -> bool,
    ) -> Result<u64, FftDmaError> {
        let mut spins: u64 = 0;
        while !done() {
            spins += 1;
            if let SpinPolicy::Bounded(limit) = *self {
                if spins >= limit {
                    return Err(FftDmaError::Timeout {
                        what: what.to_string(),
                        spins,
                    });
                }
            }
            hint::spin_loop();
        }
        trace!("{what} after {spins} polls");
        Ok(spins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;

    #[gtest]
    fn test_returns_number_of_failed_polls() {
        let mut remaining = 3;
        let spins = SpinPolicy::Unbounded.spin_until("countdown", || {
            if remaining == 0 {
                true
            } else {
                remaining -= 1;
                false
            }
        });
        expect_that!(spins.unwrap(), eq(3));
    }

    #[gtest]
    fn test_bounded_policy_times_out() {
        let mut polls = 0;
        let result = SpinPolicy::Bounded(10).spin_until("never", || {
            polls += 1;
            false
        });
        expect_that!(
            result,
            err(displays_as(contains_substring(
                "FftDmaError::Timeout: never did not complete within 10 polls"
            )))
        );
        expect_that!(polls, eq(10));
    }

    #[test]
    fn test_from_limit() {
        assert_eq!(SpinPolicy::from_limit(None), SpinPolicy::Unbounded);
        assert_eq!(SpinPolicy::from_limit(Some(5)), SpinPolicy::Bounded(5));
    }
}
