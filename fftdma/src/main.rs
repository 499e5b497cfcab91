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

//! `fftdma` - run the FFT accelerator DMA diagnostic from the command line.
//!
//! # Commands
//!
//! - `run` - Print the address summary, run one pass and print every decoded output bin
//! - `signal` - Print the zero padded input signal as hex words
//! - `decode <word>...` - Decode output words given in hex, without touching hardware
//! - `platforms` - List the registered platform compatibility strings
//!
//! # Examples
//!
//! ```bash
//! # Dry run against the in-process model
//! fftdma --platform simulated run
//!
//! # Real hardware, giving up after a million polls per wait
//! RUST_LOG=debug fftdma --spin-limit 1000000 run
//! ```

use clap::{Parser, Subcommand};
use fftdma::buffer::SignalBuffer;
use fftdma::config::{DEFAULT_PLATFORM, DMA_DEV_ID, FFT_N_POINTS};
use fftdma::decoder::{ComplexSample, decode_word};
use fftdma::error::FftDmaError;
use fftdma::pipeline::{Pipeline, RunOptions, banner};
use fftdma::platforms::platform::registered_platforms;
use fftdma::platforms::register_platforms;
use fftdma::signal::SignalSource;
use fftdma::spin::SpinPolicy;
use log::{debug, error};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "fftdma")]
#[command(bin_name = "fftdma")]
#[command(about = "Drive an FFT accelerator through an AXI DMA engine and decode its output")]
struct Cli {
    #[arg(
        long = "platform",
        default_value = DEFAULT_PLATFORM,
        help = "compatibility string of the platform to run on, e.g. `simulated`"
    )]
    platform: String,
    #[arg(long = "device-id", default_value_t = DMA_DEV_ID, help = "id of the DMA engine")]
    device_id: u16,
    #[arg(
        long = "spin-limit",
        help = r#"maximum number of polls per wait before giving up.
Waits are unbounded when this is not given.
        "#
    )]
    spin_limit: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one pass through the accelerator and print the decoded output
    Run,
    /// Print the input signal
    Signal,
    /// Decode output words given in hex
    Decode {
        #[arg(required = true)]
        words: Vec<String>,
    },
    /// List the registered platforms
    Platforms,
}

fn sample_line(index: usize, sample: &ComplexSample) -> String {
    format!("  [{index:3}] {sample}")
}

fn parse_word(word: &str) -> Result<u32, FftDmaError> {
    let digits = word
        .strip_prefix("0x")
        .or_else(|| word.strip_prefix("0X"))
        .unwrap_or(word);
    u32::from_str_radix(digits, 16)
        .map_err(|e| FftDmaError::Argument(format!("{word:?} is not a 32 bit hex word: {e}")))
}

fn run(options: RunOptions) -> Result<(), FftDmaError> {
    println!("{}", banner());
    let mut pipeline = Pipeline::new(options);
    let samples = pipeline.run_registered()?;
    println!("FFT Output Samples:");
    for (index, sample) in samples.iter().enumerate() {
        println!("{}", sample_line(index, sample));
    }
    println!("--- Exiting FFT DMA Test ---");
    Ok(())
}

fn signal() -> Result<(), FftDmaError> {
    let mut buffer = SignalBuffer::boxed();
    SignalSource.fill(&mut buffer, FFT_N_POINTS)?;
    for (index, word) in buffer.as_slice().iter().enumerate() {
        println!("  [{index:3}] {word:#010X}");
    }
    Ok(())
}

fn decode(words: &[String]) -> Result<(), FftDmaError> {
    let words = words
        .iter()
        .map(|w| parse_word(w))
        .collect::<Result<Vec<u32>, _>>()?;
    for (index, word) in words.into_iter().enumerate() {
        println!("{}", sample_line(index, &decode_word(word)));
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    register_platforms();
    let cli = Cli::parse();
    debug!("parsed cli command with {cli:?}");

    let result = match cli.command {
        Commands::Run => run(RunOptions {
            platform: cli.platform,
            device_id: cli.device_id,
            spin: SpinPolicy::from_limit(cli.spin_limit),
        }),
        Commands::Signal => signal(),
        Commands::Decode { words } => decode(&words),
        Commands::Platforms => {
            for platform in registered_platforms() {
                println!("{platform}");
            }
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use googletest::prelude::*;
    use rstest::*;

    #[gtest]
    #[rstest]
    #[case::prefixed("0x00011ABB", ok(eq(&0x0001_1ABB_u32)))]
    #[case::bare("ffff0000", ok(eq(&0xFFFF_0000_u32)))]
    #[case::too_wide("0x100000000", err(displays_as(contains_substring("FftDmaError::Argument"))))]
    #[case::not_hex("xyz", err(anything()))]
    fn test_parse_word<M: for<'a> Matcher<&'a std::result::Result<u32, FftDmaError>>>(
        #[case] word: &str,
        #[case] condition: M,
    ) {
        expect_that!(parse_word(word), condition);
    }

    #[test]
    fn test_sample_line_matches_console_format() {
        let line = sample_line(7, &decode_word(0x0001_1ABB));
        assert_eq!(line, "  [  7] Real:      1, Imag:   6843");
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["fftdma", "run"]).unwrap();
        assert_eq!(cli.platform, DEFAULT_PLATFORM);
        assert_eq!(cli.device_id, 0);
        assert_eq!(cli.spin_limit, None);
    }
}
