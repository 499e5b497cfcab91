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

//! Discovery of AXI DMA engines exposed through the Linux UIO framework.
//!
//! Every UIO device is listed under [`UIO_CLASS_DIR`] as `uioN`, with its device tree node
//! name in `name` and its first memory window in `maps/map0/{addr,size}`. Engines are the
//! devices whose name contains [`AXI_DMA_UIO_NAME`]; device id `n` is the `n`-th such
//! device in `uioN` order.

use crate::config::{AXI_DMA_UIO_NAME, DEFAULT_BUFFER_LENGTH_WIDTH, DEV_DIR, UIO_CLASS_DIR};
use crate::error::FftDmaError;
use crate::platforms::platform::{DeviceDirectory, DmaConfig};
use crate::system_io::{fs_read, fs_read_dir};
use log::{debug, trace};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UioDevice {
    pub name: String,
    /// Character device to map the registers through, e.g. `/dev/uio1`.
    pub dev_path: PathBuf,
    pub addr: usize,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct UioDirectory {
    class_dir: PathBuf,
    dev_dir: PathBuf,
}

impl Default for UioDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a sysfs number such as `0x40400000`.
fn parse_sysfs_hex(value: &str) -> Option<usize> {
    let value = value.trim();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    usize::from_str_radix(digits, 16).ok()
}

fn uio_index(entry: &str) -> Option<u32> {
    entry.strip_prefix("uio")?.parse().ok()
}

impl UioDirectory {
    pub fn new() -> Self {
        Self::with_paths(Path::new(UIO_CLASS_DIR), Path::new(DEV_DIR))
    }

    pub fn with_paths(class_dir: &Path, dev_dir: &Path) -> Self {
        UioDirectory {
            class_dir: class_dir.to_owned(),
            dev_dir: dev_dir.to_owned(),
        }
    }

    fn read_device(&self, entry: &str) -> Result<UioDevice, FftDmaError> {
        let dir = self.class_dir.join(entry);
        let name = fs_read(&dir.join("name"))?.trim().to_string();
        let map = dir.join("maps/map0");
        let read_hex = |attr: &str| -> Result<usize, FftDmaError> {
            let path = map.join(attr);
            let value = fs_read(&path)?;
            parse_sysfs_hex(&value).ok_or_else(|| {
                FftDmaError::Argument(format!("{path:?} does not hold a number: {value:?}"))
            })
        };
        Ok(UioDevice {
            name,
            dev_path: self.dev_dir.join(entry),
            addr: read_hex("addr")?,
            size: read_hex("size")?,
        })
    }

    /// Every AXI DMA engine, in `uioN` order.
    ///
    /// Devices whose attributes cannot be read are skipped.
    ///
    /// # Returns: `Result<Vec<UioDevice>, FftDmaError>`
    /// * `Ok(Vec<UioDevice>)` - The engines found, possibly none
    /// * `Err(FftDmaError::IOReadDir)` - The UIO class directory cannot be read
    pub fn dma_devices(&self) -> Result<Vec<UioDevice>, FftDmaError> {
        let mut entries: Vec<(u32, String)> = fs_read_dir(&self.class_dir)?
            .into_iter()
            .filter_map(|entry| uio_index(&entry).map(|index| (index, entry)))
            .collect();
        entries.sort();

        let mut devices = Vec::new();
        for (_, entry) in entries {
            match self.read_device(&entry) {
                Ok(device) if device.name.contains(AXI_DMA_UIO_NAME) => {
                    trace!("found AXI DMA {device:?}");
                    devices.push(device);
                }
                Ok(device) => trace!("skipping {entry} ({})", device.name),
                Err(e) => debug!("skipping {entry}: {e}"),
            }
        }
        Ok(devices)
    }

    /// The engine whose register window starts at `base_addr`.
    pub fn device_at(&self, base_addr: usize) -> Option<UioDevice> {
        self.dma_devices()
            .ok()?
            .into_iter()
            .find(|device| device.addr == base_addr)
    }
}

impl DeviceDirectory for UioDirectory {
    fn lookup(&self, device_id: u16) -> Option<DmaConfig> {
        let devices = match self.dma_devices() {
            Ok(devices) => devices,
            Err(e) => {
                debug!("cannot list UIO devices: {e}");
                return None;
            }
        };
        let device = devices.into_iter().nth(usize::from(device_id))?;
        Some(DmaConfig {
            device_id,
            base_addr: device.addr,
            register_span: device.size,
            has_mm2s: true,
            has_s2mm: true,
            max_transfer_len: (1 << DEFAULT_BUFFER_LENGTH_WIDTH) - 1,
            addr_width: 32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;
    use rstest::*;
    use std::fs;

    struct FakeSysfs {
        root: PathBuf,
    }

    impl FakeSysfs {
        fn new(test: &str) -> Self {
            let root = std::env::temp_dir().join(format!("fftdma-uio-{test}-{}", std::process::id()));
            let _ = fs::remove_dir_all(&root);
            fs::create_dir_all(root.join("class")).unwrap();
            FakeSysfs { root }
        }

        fn add(&self, entry: &str, name: &str, map: Option<(&str, &str)>) {
            let dir = self.root.join("class").join(entry);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("name"), format!("{name}\n")).unwrap();
            if let Some((addr, size)) = map {
                fs::create_dir_all(dir.join("maps/map0")).unwrap();
                fs::write(dir.join("maps/map0/addr"), format!("{addr}\n")).unwrap();
                fs::write(dir.join("maps/map0/size"), format!("{size}\n")).unwrap();
            }
        }

        fn directory(&self) -> UioDirectory {
            UioDirectory::with_paths(&self.root.join("class"), Path::new("/dev"))
        }
    }

    impl Drop for FakeSysfs {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.root);
        }
    }

    #[rstest]
    #[case::prefixed("0x40400000\n", Some(0x4040_0000))]
    #[case::bare("10000", Some(0x1_0000))]
    #[case::garbage("dma", None)]
    fn test_parse_sysfs_hex(#[case] value: &str, #[case] expected: Option<usize>) {
        assert_eq!(parse_sysfs_hex(value), expected);
    }

    #[gtest]
    fn test_lookup_counts_only_dma_devices_in_index_order() {
        let sysfs = FakeSysfs::new("order");
        sysfs.add("uio0", "gpio", Some(("0x41200000", "0x10000")));
        sysfs.add("uio10", "axi-dma-second", Some(("0x40410000", "0x10000")));
        sysfs.add("uio2", "dma", Some(("0x40400000", "0x10000")));
        sysfs.add("uio3", "dma-broken", None);
        let directory = sysfs.directory();

        let first = directory.lookup(0).unwrap();
        expect_that!(first.base_addr, eq(0x4040_0000));
        expect_that!(first.register_span, eq(0x1_0000));
        expect_that!(first.max_transfer_len, eq(16383));
        expect_that!(directory.lookup(1).unwrap().base_addr, eq(0x4041_0000));
        expect_that!(directory.lookup(2).is_none(), eq(true));
    }

    #[gtest]
    fn test_device_at_names_the_character_device() {
        let sysfs = FakeSysfs::new("device-at");
        sysfs.add("uio4", "dma", Some(("0x40400000", "0x10000")));
        let device = sysfs.directory().device_at(0x4040_0000).unwrap();
        expect_that!(device.dev_path, eq(&PathBuf::from("/dev/uio4")));
        expect_that!(sysfs.directory().device_at(0x4000_0000).is_none(), eq(true));
    }

    #[gtest]
    fn test_missing_class_dir_finds_nothing() {
        let directory = UioDirectory::with_paths(Path::new("/does/not/exist"), Path::new("/dev"));
        expect_that!(
            directory.dma_devices(),
            err(displays_as(contains_substring("FftDmaError::IOReadDir")))
        );
        expect_that!(directory.lookup(0).is_none(), eq(true));
    }
}
