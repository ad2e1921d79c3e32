/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::{Context, Result};
use common_traits::UnsignedInt;
use core::fmt::Debug;
use mmap_rs::{Mmap, MmapFlags, MmapOptions};
use std::{mem::size_of, path::Path};

/// A read-only memory mapping viewed as a slice of words of type `W`.
///
/// The graph bit stream is read one `u32` at a time, so the mapping length is
/// rounded up to a multiple of the word size; on Linux the kernel zero-extends
/// the last page, which matches the zero-extension semantics the bit readers
/// expect past the end of the stream.
pub struct MmapHelper<W> {
    mmap: Mmap,
    /// The length of the mapping in `W`'s.
    len: usize,
    _marker: core::marker::PhantomData<W>,
}

impl<W: Debug> Debug for MmapHelper<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MmapHelper")
            .field("mmap", &self.mmap.as_ptr())
            .field("len", &self.len)
            .finish()
    }
}

impl<W> TryFrom<Mmap> for MmapHelper<W> {
    type Error = anyhow::Error;

    fn try_from(value: Mmap) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            len: value.len().div_ceil(size_of::<W>()),
            mmap: value,
            _marker: core::marker::PhantomData,
        })
    }
}

impl<W> MmapHelper<W> {
    /// Returns the length of the mapping in `W`'s.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maps a file into memory (read-only).
    pub fn mmap(path: impl AsRef<Path>, flags: MmapFlags) -> Result<Self> {
        let path = path.as_ref();
        let file_len: usize = path
            .metadata()
            .with_context(|| format!("Cannot stat {}", path.display()))?
            .len()
            .try_into()
            .context("Cannot convert file length to usize")?;
        let file = std::fs::File::open(path)
            .with_context(|| format!("Cannot open {}", path.display()))?;
        let mmap_len = file_len.align_to(size_of::<W>());

        let mmap = unsafe {
            // A zero-length mapping is not allowed.
            MmapOptions::new(mmap_len.max(size_of::<W>()))
                .with_context(|| format!("Cannot initialize mmap of size {}", mmap_len))?
                .with_flags(flags)
                .with_file(&file, 0)
                .map()
                .with_context(|| format!("Cannot mmap {} (size {})", path.display(), mmap_len))?
        };

        Ok(Self {
            len: mmap_len / size_of::<W>(),
            mmap,
            _marker: core::marker::PhantomData,
        })
    }
}

impl<W> AsRef<[W]> for MmapHelper<W> {
    fn as_ref(&self) -> &[W] {
        unsafe { std::slice::from_raw_parts(self.mmap.as_ptr() as *const W, self.len) }
    }
}
