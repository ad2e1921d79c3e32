/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

Factories for bit readers.

Implementations of [`BitReaderFactory`] create bit readers over the graph
data using different backings:

- [`FileFactory`] opens the file afresh for every reader (no random access
  state is shared, which makes this the backing of choice for offline,
  sequential-only use);
- [`MemoryFactory`] hands out readers over a slice of memory, either
  [allocated](MemoryFactory::new_mem) or [anonymously
  mapped](MemoryFactory::new_mmap);
- [`MmapHelper`] hands out readers over a memory-mapped file.

Any factory can be plugged into a
[`DynDecoderFactory`](super::DynDecoderFactory) or a
[`DynSeqDecoderFactory`](super::DynSeqDecoderFactory), decoupling the choice
of codes from the underlying support.

*/

use crate::utils::MmapHelper;
use anyhow::{ensure, Context};
use bitflags::bitflags;
use common_traits::UnsignedInt;
use dsi_bitstream::{
    impls::{BufBitReader, MemWordReader, WordAdapter},
    traits::BE,
};
use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

/// A factory of big-endian bit readers over some backing.
pub trait BitReaderFactory {
    type BitReader<'a>
    where
        Self: 'a;
    fn new_reader(&self) -> Self::BitReader<'_>;
}

/// A factory creating a buffered bit reader on a freshly opened file.
#[derive(Debug, Clone)]
pub struct FileFactory {
    path: Box<Path>,
}

impl FileFactory {
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path: Box<Path> = path.as_ref().into();
        let metadata = std::fs::metadata(&path)
            .with_context(|| format!("Could not stat {}", path.display()))?;
        ensure!(metadata.is_file(), "{} is not a file", path.display());
        Ok(Self { path })
    }
}

impl BitReaderFactory for FileFactory {
    type BitReader<'a>
        = BufBitReader<BE, WordAdapter<u32, BufReader<File>>>
    where
        Self: 'a;

    fn new_reader(&self) -> Self::BitReader<'_> {
        BufBitReader::<BE, _>::new(WordAdapter::<u32, _>::new(BufReader::new(
            File::open(&self.path).unwrap(),
        )))
    }
}

bitflags! {
    /// Flags for [`MemoryFactory`] and [`MmapHelper`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct MemoryFlags: u32 {
        /// Suggest to map a region using transparent huge pages.
        ///
        /// This flag is only a suggestion, and it is ignored if the kernel
        /// does not support transparent huge pages.
        const TRANSPARENT_HUGE_PAGES = 1 << 0;
        /// Suggest that the mapped region will be accessed sequentially.
        const SEQUENTIAL = 1 << 1;
        /// Suggest that the mapped region will be accessed randomly.
        const RANDOM_ACCESS = 1 << 2;
    }
}

/// Empty flags.
impl core::default::Default for MemoryFlags {
    fn default() -> Self {
        MemoryFlags::empty()
    }
}

impl From<MemoryFlags> for mmap_rs::MmapFlags {
    fn from(flags: MemoryFlags) -> Self {
        let mut mmap_flags = mmap_rs::MmapFlags::empty();
        if flags.contains(MemoryFlags::SEQUENTIAL) {
            mmap_flags |= mmap_rs::MmapFlags::SEQUENTIAL;
        }
        if flags.contains(MemoryFlags::RANDOM_ACCESS) {
            mmap_flags |= mmap_rs::MmapFlags::RANDOM_ACCESS;
        }
        if flags.contains(MemoryFlags::TRANSPARENT_HUGE_PAGES) {
            mmap_flags |= mmap_rs::MmapFlags::TRANSPARENT_HUGE_PAGES;
        }
        mmap_flags
    }
}

impl From<MemoryFlags> for epserde::deser::Flags {
    fn from(flags: MemoryFlags) -> Self {
        let mut deser_flags = epserde::deser::Flags::empty();
        if flags.contains(MemoryFlags::SEQUENTIAL) {
            deser_flags |= epserde::deser::Flags::SEQUENTIAL;
        }
        if flags.contains(MemoryFlags::RANDOM_ACCESS) {
            deser_flags |= epserde::deser::Flags::RANDOM_ACCESS;
        }
        if flags.contains(MemoryFlags::TRANSPARENT_HUGE_PAGES) {
            deser_flags |= epserde::deser::Flags::TRANSPARENT_HUGE_PAGES;
        }
        deser_flags
    }
}

/// A factory creating bit readers over a slice of `u32` words held in
/// memory.
#[derive(Debug, Clone)]
pub struct MemoryFactory<M: AsRef<[u32]>> {
    data: M,
}

impl<M: AsRef<[u32]>> MemoryFactory<M> {
    pub fn from_data(data: M) -> Self {
        Self { data }
    }
}

impl MemoryFactory<Box<[u32]>> {
    /// Copies a file into an allocated word buffer, zero-padding the tail.
    pub fn new_mem(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file_len = path
            .metadata()
            .with_context(|| format!("Could not stat {}", path.display()))?
            .len() as usize;
        let mut file = std::fs::File::open(path)
            .with_context(|| format!("Could not open {}", path.display()))?;
        // The bit reader consumes whole words: pad the tail with zeros.
        let mut bytes = vec![0_u8; file_len.align_to(16)];
        file.read_exact(&mut bytes[..file_len])
            .with_context(|| format!("Could not read {}", path.display()))?;
        Ok(Self {
            data: bytes
                .chunks_exact(4)
                .map(|chunk| u32::from_ne_bytes(chunk.try_into().unwrap()))
                .collect(),
        })
    }
}

impl MemoryFactory<MmapHelper<u32>> {
    /// Copies a file into an anonymous memory mapping created with the given
    /// flags, zero-padding the tail.
    pub fn new_mmap(path: impl AsRef<Path>, flags: MemoryFlags) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file_len = path
            .metadata()
            .with_context(|| format!("Could not stat {}", path.display()))?
            .len() as usize;
        let mut file = std::fs::File::open(path)
            .with_context(|| format!("Could not open {}", path.display()))?;
        let capacity = file_len.align_to(16);

        let mut mmap = mmap_rs::MmapOptions::new(capacity)?
            .with_flags(flags.into())
            .map_mut()
            .context("Could not create anonymous mmap")?;
        file.read_exact(&mut mmap[..file_len])
            .with_context(|| format!("Could not read {}", path.display()))?;
        mmap[file_len..].fill(0);

        Ok(Self {
            data: MmapHelper::try_from(
                mmap.make_read_only()
                    .map_err(|(_, err)| err)
                    .context("Could not make memory read-only")?,
            )
            .context("Could not create mmap backend")?,
        })
    }
}

impl<M: AsRef<[u32]>> BitReaderFactory for MemoryFactory<M> {
    type BitReader<'a>
        = BufBitReader<BE, MemWordReader<u32, &'a [u32]>>
    where
        Self: 'a;

    fn new_reader(&self) -> Self::BitReader<'_> {
        BufBitReader::<BE, _>::new(MemWordReader::new(self.data.as_ref()))
    }
}

impl BitReaderFactory for MmapHelper<u32> {
    type BitReader<'a> = BufBitReader<BE, MemWordReader<u32, &'a [u32]>>;

    fn new_reader(&self) -> Self::BitReader<'_> {
        BufBitReader::<BE, _>::new(MemWordReader::new(self.as_ref()))
    }
}
