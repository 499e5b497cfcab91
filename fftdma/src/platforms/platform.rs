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

//! Platform abstraction layer for the diagnostic.
//!
//! This module defines the capability traits through which the transfer pipeline talks to
//! hardware, and a registry that maps platform compatibility strings to platform
//! implementations.
//!
//! # Architecture
//!
//! - [`DeviceDirectory`] - Looks up the static configuration of a DMA engine by device id
//! - [`DmaDriver`] - Register-level control of one DMA engine in simple (non scatter-gather) mode
//! - [`CacheMaintenance`] - Flushes CPU cache lines to memory
//! - [`Platform`] - Bundles the above with the two BRAM windows and platform init/teardown
//!
//! # Platform Registration
//!
//! Platforms register themselves at startup with [`register_platform`], normally through
//! the `register_platform()` function generated by the `#[platform]` macro. A compatibility
//! string may contain comma-separated components; a query matches a registered platform if
//! every component of the query is present in the registered string.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use fftdma::platforms::platform::platform_for_known_platform;
//! # fn example() -> Result<(), fftdma::error::FftDmaError> {
//! fftdma::platforms::register_platforms();
//! let mut platform = platform_for_known_platform("simulated")?;
//! let driver = platform.take_driver()?;
//! # Ok(())
//! # }
//! ```

use crate::error::FftDmaError;
use crate::mmio::MmioRegion;
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Mutex, OnceLock};

/// Type alias for platform constructor functions.
type PlatformConstructor = fn() -> Box<dyn Platform>;

/// Global registry of platform implementations, keyed by compatibility string.
pub static PLATFORM_REGISTRY: OnceLock<Mutex<BTreeMap<&'static str, PlatformConstructor>>> =
    OnceLock::new();

/// Direction of one half of a DMA pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Stream to memory (S2MM): the engine writes results into host-visible memory.
    DeviceToHost,
    /// Memory to stream (MM2S): the engine reads input from host-visible memory.
    HostToDevice,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::DeviceToHost, Direction::HostToDevice];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::DeviceToHost => write!(f, "device-to-host"),
            Direction::HostToDevice => write!(f, "host-to-device"),
        }
    }
}

/// Static description of one DMA engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmaConfig {
    pub device_id: u16,
    /// Bus address of the register window.
    pub base_addr: usize,
    /// Size of the register window in bytes.
    pub register_span: usize,
    /// The engine has a memory-to-stream (host-to-device) channel.
    pub has_mm2s: bool,
    /// The engine has a stream-to-memory (device-to-host) channel.
    pub has_s2mm: bool,
    /// Largest length a single simple transfer may carry, in bytes.
    pub max_transfer_len: usize,
    pub addr_width: u32,
}

impl DmaConfig {
    pub fn has_channel(&self, direction: Direction) -> bool {
        match direction {
            Direction::DeviceToHost => self.has_s2mm,
            Direction::HostToDevice => self.has_mm2s,
        }
    }
}

/// Lookup of DMA engine configurations.
pub trait DeviceDirectory {
    /// Get the configuration of the engine with id `device_id`, if there is one.
    fn lookup(&self, device_id: u16) -> Option<DmaConfig>;
}

/// Register-level control of a DMA engine in simple mode.
///
/// Implementations perform exactly the hardware access asked for; sequencing and
/// validation belong to [`AcceleratorHandle`](crate::accelerator::AcceleratorHandle).
pub trait DmaDriver {
    /// Bind the driver to the engine described by `config`.
    ///
    /// # Returns: `Result<(), FftDmaError>`
    /// * `Ok(())` - The driver accepted the configuration
    /// * `Err(FftDmaError::ConfigurationFailed)` - The engine cannot be driven with it
    fn configure(&mut self, config: &DmaConfig) -> Result<(), FftDmaError>;

    /// Whether the engine was built with scatter-gather support.
    fn has_scatter_gather(&self) -> bool;

    /// Disable every interrupt source of `direction`.
    fn mask_interrupts(&mut self, direction: Direction);

    /// Start a soft reset of the engine.
    fn reset(&mut self);

    /// Whether the reset started by [`DmaDriver::reset`] has finished.
    fn reset_complete(&self) -> bool;

    /// Start one transfer of `length` bytes at bus address `address`.
    ///
    /// # Returns: `Result<(), FftDmaError>`
    /// * `Ok(())` - The transfer has been started
    /// * `Err(FftDmaError::SubmitFailed)` - The engine rejected the request
    fn submit_simple(
        &mut self,
        direction: Direction,
        address: usize,
        length: usize,
    ) -> Result<(), FftDmaError>;

    /// Whether a transfer is in flight in `direction`.
    ///
    /// Every call is one status poll. Engines may advance on a poll; the simulated one
    /// moves an in-flight transfer one step closer to completion.
    fn is_busy(&self, direction: Direction) -> bool;
}

impl<T: DmaDriver + ?Sized> DmaDriver for Box<T> {
    fn configure(&mut self, config: &DmaConfig) -> Result<(), FftDmaError> {
        (**self).configure(config)
    }

    fn has_scatter_gather(&self) -> bool {
        (**self).has_scatter_gather()
    }

    fn mask_interrupts(&mut self, direction: Direction) {
        (**self).mask_interrupts(direction)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn reset_complete(&self) -> bool {
        (**self).reset_complete()
    }

    fn submit_simple(
        &mut self,
        direction: Direction,
        address: usize,
        length: usize,
    ) -> Result<(), FftDmaError> {
        (**self).submit_simple(direction, address, length)
    }

    fn is_busy(&self, direction: Direction) -> bool {
        (**self).is_busy(direction)
    }
}

/// Data cache maintenance.
pub trait CacheMaintenance {
    /// Write back every cache line overlapping `[addr, addr + len)` to memory.
    fn flush_range(&self, addr: usize, len: usize);
}

/// Trait representing a complete platform implementation.
///
/// The trait extends `Any` to allow for runtime type checking and downcasting, which the
/// tests use to reach simulator internals.
pub trait Platform: Any {
    /// Compatibility string of the platform.
    fn name(&self) -> &str;

    /// Acquire platform resources. Paired with [`Platform::cleanup`].
    fn init(&mut self) -> Result<(), FftDmaError>;

    /// Release platform resources. Must be safe to call after a failed or partial `init`.
    fn cleanup(&mut self);

    fn directory(&self) -> &dyn DeviceDirectory;

    /// Hand out the DMA driver.
    ///
    /// # Returns: `Result<Box<dyn DmaDriver>, FftDmaError>`
    /// * `Ok(Box<dyn DmaDriver>)` - The driver; only the first call succeeds
    /// * `Err(FftDmaError::Internal)` - The driver has already been taken
    fn take_driver(&mut self) -> Result<Box<dyn DmaDriver>, FftDmaError>;

    fn cache(&self) -> &dyn CacheMaintenance;

    /// Window onto the BRAM the FFT input is staged in.
    fn staging_region(&self) -> Result<MmioRegion<'_>, FftDmaError>;

    /// Window onto the BRAM the FFT output is written to.
    fn output_region(&self) -> Result<MmioRegion<'_>, FftDmaError>;
}

/// Match a platform compatibility string to a registered platform.
///
/// Both strings are split on commas, and ***all*** components of `platform_string` must be
/// present in the registered compatibility string.
///
/// # Returns: `Result<Box<dyn Platform>, FftDmaError>`
/// * `Ok(Box<dyn Platform>)` - Newly constructed platform instance
/// * `Err(FftDmaError::Internal)` - Registry not initialized or lock failure
/// * `Err(FftDmaError::Argument)` - No matching platform found
fn match_platform_string(platform_string: &str) -> Result<Box<dyn Platform>, FftDmaError> {
    let registry = PLATFORM_REGISTRY
        .get()
        .ok_or(FftDmaError::Internal(String::from(
            "couldn't get PLATFORM_REGISTRY",
        )))?
        .lock()
        .map_err(|_| FftDmaError::Internal(String::from("couldn't lock PLATFORM_REGISTRY")))?;

    for (compat_string, platform_constructor) in registry.iter() {
        let compat_set: HashSet<&str> = compat_string.split(',').collect();
        let compat_found = platform_string.split(',').all(|x| compat_set.contains(x));
        if compat_found {
            return Ok(platform_constructor());
        }
    }

    Err(FftDmaError::Argument(format!(
        "fftdma could not match {platform_string} to a known platform."
    )))
}

/// Get a platform instance for a known compatibility string.
pub fn platform_for_known_platform(platform_string: &str) -> Result<Box<dyn Platform>, FftDmaError> {
    match_platform_string(platform_string)
}

pub fn init_platform_registry() -> Mutex<BTreeMap<&'static str, PlatformConstructor>> {
    Mutex::new(BTreeMap::new())
}

/// Register a platform implementation in the global registry.
///
/// # Panics
///
/// Panics if the registry lock is poisoned.
pub fn register_platform(compatible: &'static str, constructor: PlatformConstructor) {
    let mut registry = PLATFORM_REGISTRY
        .get_or_init(init_platform_registry)
        .lock()
        .expect("couldnt get PLATFORM_REGISTRY");

    registry.insert(compatible, constructor);
}

/// Compatibility strings of every registered platform, in sorted order.
pub fn registered_platforms() -> Vec<&'static str> {
    PLATFORM_REGISTRY
        .get()
        .and_then(|registry| registry.lock().ok().map(|r| r.keys().copied().collect()))
        .unwrap_or_default()
}
