/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Loading of stored graphs.
//!
//! [`BvGraph::with_basename`] and [`BvGraphSeq::with_basename`] return a
//! [`LoadConfig`] whose type parameters carry the access type
//! ([`Random`]/[`Sequential`]) and the [`LoadMode`] of the graph and of the
//! offsets index; [`load`](LoadConfig::load) validates the property file and
//! opens the reader.

use super::*;
use crate::utils::MmapHelper;
use anyhow::{ensure, Context, Result};
use epserde::prelude::*;
use dsi_bitstream::traits::BitSeek;
use sealed::sealed;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use sux::traits::IndexedSeq;

/// Sequential or random access.
#[doc(hidden)]
#[sealed]
pub trait Access: 'static {}

#[derive(Debug, Clone)]
pub struct Sequential {}
#[sealed]
impl Access for Sequential {}

#[derive(Debug, Clone)]
pub struct Random {}
#[sealed]
impl Access for Random {}

/// How a file is accessed: each load mode pairs a bit-reader factory for the
/// graph with a strategy to obtain the offsets index.
#[sealed]
pub trait LoadMode: 'static {
    type Factory: BitReaderFactory;
    fn new_factory(graph: &Path, flags: MemoryFlags) -> Result<Self::Factory>;

    type Offsets: IndexedSeq<Input = usize, Output = usize> + 'static;
    fn load_offsets(ef: &Path, flags: MemoryFlags) -> Result<MemCase<Self::Offsets>>;
}

/// The graph and the offsets index are memory-mapped.
///
/// This is the default mode. You can [set memory-mapping
/// flags](LoadConfig::flags).
#[derive(Debug, Clone)]
pub struct Mmap {}
#[sealed]
impl LoadMode for Mmap {
    type Factory = MmapHelper<u32>;
    type Offsets = DeserType<'static, EF>;

    fn new_factory(graph: &Path, flags: MemoryFlags) -> Result<Self::Factory> {
        MmapHelper::mmap(graph, flags.into())
    }

    fn load_offsets(ef: &Path, flags: MemoryFlags) -> Result<MemCase<Self::Offsets>> {
        EF::mmap(ef, flags.into())
            .with_context(|| format!("Cannot map the offsets index {}", ef.display()))
    }
}

/// The graph is copied into allocated memory; the offsets index is fully
/// deserialized.
#[derive(Debug, Clone)]
pub struct LoadMem {}
#[sealed]
impl LoadMode for LoadMem {
    type Factory = MemoryFactory<Box<[u32]>>;
    type Offsets = DeserType<'static, EF>;

    fn new_factory(graph: &Path, _flags: MemoryFlags) -> Result<Self::Factory> {
        MemoryFactory::new_mem(graph)
    }

    fn load_offsets(ef: &Path, _flags: MemoryFlags) -> Result<MemCase<Self::Offsets>> {
        EF::load_mem(ef)
            .with_context(|| format!("Cannot load the offsets index {}", ef.display()))
    }
}

/// The graph is copied into memory obtained through anonymous `mmap()`, so
/// [memory flags](LoadConfig::flags) apply.
#[derive(Debug, Clone)]
pub struct LoadMmap {}
#[sealed]
impl LoadMode for LoadMmap {
    type Factory = MemoryFactory<MmapHelper<u32>>;
    type Offsets = DeserType<'static, EF>;

    fn new_factory(graph: &Path, flags: MemoryFlags) -> Result<Self::Factory> {
        MemoryFactory::new_mmap(graph, flags)
    }

    fn load_offsets(ef: &Path, flags: MemoryFlags) -> Result<MemCase<Self::Offsets>> {
        EF::load_mmap(ef, flags.into())
            .with_context(|| format!("Cannot load the offsets index {}", ef.display()))
    }
}

/// The graph file is opened afresh by every decoder; nothing is kept in
/// memory except the fully deserialized offsets index.
///
/// This is the offline mode: with [`Sequential`] access no offsets are
/// touched at all, and each iterator reads the file front to back.
#[derive(Debug, Clone)]
pub struct File {}
#[sealed]
impl LoadMode for File {
    type Factory = FileFactory;
    type Offsets = EF;

    fn new_factory(graph: &Path, _flags: MemoryFlags) -> Result<Self::Factory> {
        FileFactory::new(graph)
    }

    fn load_offsets(ef: &Path, _flags: MemoryFlags) -> Result<MemCase<Self::Offsets>> {
        Ok(EF::load_full(ef)
            .with_context(|| format!("Cannot load the offsets index {}", ef.display()))?
            .into())
    }
}

/// A load configuration obtained from [`BvGraph::with_basename`] or
/// [`BvGraphSeq::with_basename`] and customized with the methods below.
#[derive(Debug, Clone)]
pub struct LoadConfig<A: Access, GLM: LoadMode, OLM: LoadMode> {
    pub(crate) basename: PathBuf,
    pub(crate) graph_load_flags: MemoryFlags,
    pub(crate) offsets_load_flags: MemoryFlags,
    pub(crate) _marker: std::marker::PhantomData<(A, GLM, OLM)>,
}

impl<A: Access, GLM: LoadMode, OLM: LoadMode> LoadConfig<A, GLM, OLM> {
    /// Chooses the [`LoadMode`] for both the graph and the offsets index.
    pub fn mode<LM: LoadMode>(self) -> LoadConfig<A, LM, LM> {
        LoadConfig {
            basename: self.basename,
            graph_load_flags: self.graph_load_flags,
            offsets_load_flags: self.offsets_load_flags,
            _marker: std::marker::PhantomData,
        }
    }

    /// Chooses the [`LoadMode`] for the graph only.
    pub fn graph_mode<NGLM: LoadMode>(self) -> LoadConfig<A, NGLM, OLM> {
        LoadConfig {
            basename: self.basename,
            graph_load_flags: self.graph_load_flags,
            offsets_load_flags: self.offsets_load_flags,
            _marker: std::marker::PhantomData,
        }
    }

    /// Sets the memory flags for both the graph and the offsets index.
    pub fn flags(mut self, flags: MemoryFlags) -> Self {
        self.graph_load_flags = flags;
        self.offsets_load_flags = flags;
        self
    }

    /// Sets the memory flags for the graph.
    pub fn graph_flags(mut self, flags: MemoryFlags) -> Self {
        self.graph_load_flags = flags;
        self
    }
}

impl<GLM: LoadMode, OLM: LoadMode> LoadConfig<Random, GLM, OLM> {
    /// Chooses the [`LoadMode`] for the offsets index only.
    pub fn offsets_mode<NOLM: LoadMode>(self) -> LoadConfig<Random, GLM, NOLM> {
        LoadConfig {
            basename: self.basename,
            graph_load_flags: self.graph_load_flags,
            offsets_load_flags: self.offsets_load_flags,
            _marker: std::marker::PhantomData,
        }
    }

    /// Sets the memory flags for the offsets index.
    pub fn offsets_flags(mut self, flags: MemoryFlags) -> Self {
        self.offsets_load_flags = flags;
        self
    }

    /// Loads a random-access graph.
    ///
    /// The property file is validated first; then the `.ef` offsets index is
    /// rebuilt if absent or older than the files it derives from.
    pub fn load(self) -> Result<BvGraph<DynDecoderFactory<GLM::Factory, OLM::Offsets>>>
    where
        for<'a> <GLM::Factory as BitReaderFactory>::BitReader<'a>: CodeRead + BitSeek,
    {
        let (num_nodes, num_arcs, comp_flags) =
            parse_properties(self.basename.with_extension(PROPERTIES_EXTENSION))?;
        ensure_offsets_index(&self.basename)?;
        let factory = GLM::new_factory(
            &self.basename.with_extension(GRAPH_EXTENSION),
            self.graph_load_flags,
        )?;
        let offsets = OLM::load_offsets(
            &self.basename.with_extension(EF_EXTENSION),
            self.offsets_load_flags,
        )?;

        Ok(BvGraph::new(
            DynDecoderFactory::new(factory, offsets, comp_flags)?,
            num_nodes,
            num_arcs,
            comp_flags.compression_window,
            comp_flags.min_interval_length,
        ))
    }
}

impl<GLM: LoadMode, OLM: LoadMode> LoadConfig<Sequential, GLM, OLM> {
    /// Loads a sequential graph. The offsets index is neither required nor
    /// touched.
    pub fn load(self) -> Result<BvGraphSeq<DynSeqDecoderFactory<GLM::Factory>>>
    where
        for<'a> <GLM::Factory as BitReaderFactory>::BitReader<'a>: CodeRead,
    {
        let (num_nodes, num_arcs, comp_flags) =
            parse_properties(self.basename.with_extension(PROPERTIES_EXTENSION))?;
        let factory = GLM::new_factory(
            &self.basename.with_extension(GRAPH_EXTENSION),
            self.graph_load_flags,
        )?;

        Ok(BvGraphSeq::new(
            DynSeqDecoderFactory::new(factory, comp_flags)?,
            num_nodes,
            Some(num_arcs),
            comp_flags.compression_window,
            comp_flags.min_interval_length,
        ))
    }
}

/// Reads a `.properties` file and returns the number of nodes, the number of
/// arcs, and the compression flags, after validating the format
/// identification keys.
pub fn parse_properties(path: impl AsRef<Path>) -> Result<(usize, u64, CompFlags)> {
    let path = path.as_ref();
    let f = std::fs::File::open(path)
        .with_context(|| format!("Cannot open property file {}", path.display()))?;
    let map = java_properties::read(BufReader::new(f))
        .with_context(|| format!("Cannot parse {} as a Java property file", path.display()))?;

    let num_nodes = map
        .get("nodes")
        .with_context(|| format!("Missing 'nodes' property in {}", path.display()))?
        .parse::<usize>()
        .with_context(|| format!("Cannot parse 'nodes' as usize in {}", path.display()))?;
    ensure!(
        num_nodes < (1 << 31),
        "This implementation supports at most 2^31 - 1 nodes, got {}",
        num_nodes
    );
    let num_arcs = map
        .get("arcs")
        .with_context(|| format!("Missing 'arcs' property in {}", path.display()))?
        .parse::<u64>()
        .with_context(|| format!("Cannot parse 'arcs' as u64 in {}", path.display()))?;

    let comp_flags = CompFlags::from_properties(&map)
        .with_context(|| format!("Cannot parse compression flags from {}", path.display()))?;
    Ok((num_nodes, num_arcs, comp_flags))
}
