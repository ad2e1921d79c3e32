/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! An implementation of the BV compressed graph format.
//!
//! The format has been described by Paolo Boldi and Sebastiano Vigna in
//! "[The WebGraph Framework I: Compression
//! Techniques](https://dl.acm.org/doi/10.1145/988672.988752)", *Proc. of the
//! Thirteenth World-Wide Web Conference*, pages 595-601, 2004, ACM Press.
//! Streams are written in the big-endian layout of the canonical
//! implementations, so graphs can be exchanged with them.
//!
//! The main access points are [`BvGraph::with_basename`] (reading) and
//! [`BvComp`] (compression).

pub const GRAPH_EXTENSION: &str = "graph";
pub const OFFSETS_EXTENSION: &str = "offsets";
pub const PROPERTIES_EXTENSION: &str = "properties";
pub const EF_EXTENSION: &str = "ef";

mod codecs;
pub use codecs::*;

mod comp;
pub use comp::*;

pub mod random_access;
pub use random_access::{BvGraph, Successors};

pub mod sequential;
pub use sequential::BvGraphSeq;

mod masked_iterator;
pub use masked_iterator::MaskedIterator;

mod offset_deg_iter;
pub use offset_deg_iter::OffsetDegIter;

mod offsets;
pub use offsets::*;

mod load;
pub use load::*;

/// The Elias-Fano offsets index: select-adapted high bits over the upper
/// halves, a bit-field vector for the lower halves.
pub type EF = sux::dict::EliasFano<
    sux::rank_sel::SelectAdaptConst<sux::bits::BitVec<Box<[usize]>>, Box<[usize]>, 12, 4>,
    sux::bits::BitFieldVec<usize, Box<[usize]>>,
>;
