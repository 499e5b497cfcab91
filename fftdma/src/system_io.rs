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

//! Error wrapping system access helpers.
//!
//! Thin wrappers around file system reads and `mmap`, with trace logging and conversion
//! to [`FftDmaError`] carrying the path that failed.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use fftdma::system_io::{fs_read, map_device};
//! # use std::path::Path;
//! # fn example() -> Result<(), fftdma::error::FftDmaError> {
//! let name = fs_read(Path::new("/sys/class/uio/uio0/name"))?;
//! let registers = map_device(Path::new("/dev/uio0"), 0, 0x1_0000)?;
//! # Ok(())
//! # }
//! ```

use crate::error::FftDmaError;
use crate::mmio::MmioRegion;
use log::trace;
use std::fs::OpenOptions;
use std::io::Read;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

/// Read the contents of a file to a String.
///
/// # Returns: `Result<String, FftDmaError>`
/// * `Ok(String)` - The complete contents of the file
/// * `Err(FftDmaError::IORead)` - If the file cannot be read (doesn't exist, permissions, etc.)
pub fn fs_read(file_path: &Path) -> Result<String, FftDmaError> {
    trace!("Attempting to read from {file_path:?}");
    let mut buf = String::new();
    let result = OpenOptions::new()
        .read(true)
        .open(file_path)
        .and_then(|mut f| f.read_to_string(&mut buf));

    match result {
        Ok(_) => {
            trace!("Reading done");
            Ok(buf)
        }
        Err(e) => Err(FftDmaError::IORead {
            file: file_path.into(),
            e,
        }),
    }
}

/// Read the names of the entries of a directory, sorted.
///
/// Entries that cannot be read are skipped.
///
/// # Returns: `Result<Vec<String>, FftDmaError>`
/// * `Ok(Vec<String>)` - Entry names (not full paths)
/// * `Err(FftDmaError::IOReadDir)` - If the directory cannot be read
pub fn fs_read_dir(dir: &Path) -> Result<Vec<String>, FftDmaError> {
    trace!("Attempting to read directory '{dir:?}'");
    std::fs::read_dir(dir).map_or_else(
        |e| {
            Err(FftDmaError::IOReadDir {
                dir: dir.to_owned(),
                e,
            })
        },
        |iter| {
            let mut ret: Vec<String> = iter
                .filter_map(Result::ok)
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect();
            ret.sort();
            trace!("Dir reading done.");
            Ok(ret)
        },
    )
}

/// A shared, uncached mapping of part of a device file.
///
/// The mapping is removed when this value is dropped. [`MmioRegion`]s created from it borrow
/// it and so cannot outlive it:
///
/// ```compile_fail
/// # use fftdma::system_io::map_device;
/// # use std::path::Path;
/// # fn main() -> Result<(), fftdma::error::FftDmaError> {
/// let region = {
///     let mapping = map_device(Path::new("/dev/mem"), 0x4000_0000, 0x2000)?;
///     mapping.region(0x4000_0000)
/// };
/// region.read(0)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MappedMemory {
    file: PathBuf,
    ptr: NonNull<libc::c_void>,
    len: usize,
}

impl MappedMemory {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Word view of the whole mapping, reporting `bus_addr` as its device address.
    pub fn region(&self, bus_addr: usize) -> MmioRegion<'_> {
        // SAFETY: the mapping is readable and writable for `len` bytes and page aligned,
        // and it stays mapped while the region borrows `self`.
        unsafe { MmioRegion::new(self.ptr.cast(), bus_addr, self.len / size_of::<u32>()) }
    }
}

impl Drop for MappedMemory {
    fn drop(&mut self) {
        trace!("Unmapping {} bytes of {:?}", self.len, self.file);
        // SAFETY: `ptr` and `len` describe a mapping created by `map_device` that has not
        // been unmapped yet.
        if unsafe { libc::munmap(self.ptr.as_ptr(), self.len) } != 0 {
            log::warn!(
                "Failed to unmap {:?}: {}",
                self.file,
                std::io::Error::last_os_error()
            );
        }
    }
}

/// Map `len` bytes of `file_path` starting at byte `offset`, read-write and shared.
///
/// The file is opened with `O_SYNC`, which makes `/dev/mem` mappings uncached.
///
/// # Returns: `Result<MappedMemory, FftDmaError>`
/// * `Ok(MappedMemory)` - The mapping
/// * `Err(FftDmaError::Argument)` - `len` is zero or `offset` is not page aligned
/// * `Err(FftDmaError::IOMap)` - The file cannot be opened or mapped
pub fn map_device(file_path: &Path, offset: usize, len: usize) -> Result<MappedMemory, FftDmaError> {
    trace!("Attempting to map {len:#x} bytes of {file_path:?} at offset {offset:#x}");
    // SAFETY: sysconf has no preconditions.
    let page_size = usize::try_from(unsafe { libc::sysconf(libc::_SC_PAGESIZE) }).unwrap_or(4096);
    if len == 0 || offset % page_size != 0 {
        return Err(FftDmaError::Argument(format!(
            "cannot map {len:#x} bytes of {file_path:?} at unaligned offset {offset:#x}"
        )));
    }
    let map_err = |e| FftDmaError::IOMap {
        file: file_path.into(),
        e,
    };
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_SYNC)
        .open(file_path)
        .map_err(map_err)?;
    let offset = libc::off_t::try_from(offset).map_err(|_| {
        FftDmaError::Argument(format!("offset {offset:#x} does not fit in off_t"))
    })?;

    // SAFETY: a fresh shared mapping chosen by the kernel; the file descriptor is valid
    // for the duration of the call and the mapping outlives it.
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            file.as_raw_fd(),
            offset,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(map_err(std::io::Error::last_os_error()));
    }
    let ptr = NonNull::new(ptr).ok_or_else(|| {
        FftDmaError::Internal(format!("mmap of {file_path:?} returned a null pointer"))
    })?;
    trace!("Mapping done.");
    Ok(MappedMemory {
        file: file_path.into(),
        ptr,
        len,
    })
}
