/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::*;
use crate::traits::*;
use crate::utils::{nat2int, CircularBuffer};
use anyhow::Result;
use dsi_bitstream::traits::BitSeek;
use lender::*;
use std::path::PathBuf;

/// A BV-format graph that can only be scanned sequentially.
///
/// No offset index is needed: records are decoded one after the other, and
/// reference lists are resolved through the window of the last
/// `compression_window` decoded lists.
#[derive(Debug, Clone)]
pub struct BvGraphSeq<F> {
    factory: F,
    number_of_nodes: usize,
    number_of_arcs: Option<u64>,
    compression_window: usize,
    min_interval_length: usize,
}

impl BvGraphSeq<()> {
    /// Returns a [`LoadConfig`] loading the graph with basename `basename`
    /// for sequential access only.
    pub fn with_basename(
        basename: impl AsRef<std::path::Path>,
    ) -> LoadConfig<Sequential, Mmap, Mmap> {
        LoadConfig {
            basename: PathBuf::from(basename.as_ref()),
            graph_load_flags: MemoryFlags::empty(),
            offsets_load_flags: MemoryFlags::empty(),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<F: SequentialDecoderFactory> BvGraphSeq<F> {
    /// Creates a graph from its parts; normally you would use
    /// [`BvGraphSeq::with_basename`] instead.
    pub fn new(
        factory: F,
        number_of_nodes: usize,
        number_of_arcs: Option<u64>,
        compression_window: usize,
        min_interval_length: usize,
    ) -> Self {
        Self {
            factory,
            number_of_nodes,
            number_of_arcs,
            compression_window,
            min_interval_length,
        }
    }

    /// Consumes the graph and returns the decoder factory.
    #[inline(always)]
    pub fn into_inner(self) -> F {
        self.factory
    }

    /// Creates an iterator over (bit offset, outdegree) pairs that skips
    /// record bodies, without materializing successor lists.
    #[inline(always)]
    pub fn offset_deg_iter(&self) -> OffsetDegIter<F::Decoder<'_>> {
        OffsetDegIter::new(
            self.factory.new_decoder().expect("Cannot create decoder"),
            self.number_of_nodes,
            self.compression_window,
            self.min_interval_length,
        )
    }
}

impl<F: SequentialDecoderFactory> SequentialGraph for BvGraphSeq<F> {
    type Lender<'node>
        = Iter<F::Decoder<'node>>
    where
        Self: 'node;

    #[inline(always)]
    fn num_nodes(&self) -> usize {
        self.number_of_nodes
    }

    #[inline(always)]
    fn num_arcs_hint(&self) -> Option<u64> {
        self.number_of_arcs
    }

    #[inline(always)]
    fn iter_from(&self, from: usize) -> Self::Lender<'_> {
        let mut iter = Iter::new(
            self.factory.new_decoder().expect("Cannot create decoder"),
            self.number_of_nodes,
            self.compression_window,
            self.min_interval_length,
        );
        // No offsets: skip forward by decoding.
        for _ in 0..from {
            iter.next();
        }
        iter
    }
}

impl<F: SequentialDecoderFactory> SplitGraph for BvGraphSeq<F>
where
    for<'a> <F as SequentialDecoderFactory>::Decoder<'a>: Clone + Send + Sync,
{
    type SplitLender<'a>
        = split::seq::Lender<'a, BvGraphSeq<F>>
    where
        Self: 'a;
    type IntoIterator<'a>
        = split::seq::IntoIterator<'a, BvGraphSeq<F>>
    where
        Self: 'a;

    fn split_iter(&self, how_many: usize) -> Self::IntoIterator<'_> {
        split::seq::Iter::new(self.iter(), self.number_of_nodes, how_many)
    }
}

impl<'a, F: SequentialDecoderFactory> IntoLender for &'a BvGraphSeq<F> {
    type Lender = <BvGraphSeq<F> as SequentialGraph>::Lender<'a>;

    #[inline(always)]
    fn into_lender(self) -> Self::Lender {
        self.iter()
    }
}

/// A fast sequential lender over the nodes of the graph and their
/// successors.
///
/// Each record is decoded into the window slot of its node, so reference
/// lists are always available without recursion; the lender yields the
/// freshly decoded list as a borrowed slice.
#[derive(Debug, Clone)]
pub struct Iter<D: Decode> {
    pub(crate) decoder: D,
    pub(crate) window: CircularBuffer<Vec<usize>>,
    pub(crate) number_of_nodes: usize,
    pub(crate) compression_window: usize,
    pub(crate) min_interval_length: usize,
    pub(crate) current_node: usize,
}

impl<D: Decode + BitSeek> Iter<D> {
    /// Returns the current bit position in the graph stream.
    #[inline(always)]
    pub fn bit_pos(&mut self) -> Result<u64, <D as BitSeek>::Error> {
        self.decoder.bit_pos()
    }
}

impl<D: Decode> Iter<D> {
    /// Creates a lender decoding from the start of the stream.
    pub fn new(
        decoder: D,
        number_of_nodes: usize,
        compression_window: usize,
        min_interval_length: usize,
    ) -> Self {
        Self {
            decoder,
            window: CircularBuffer::new(compression_window + 1),
            number_of_nodes,
            compression_window,
            min_interval_length,
            current_node: 0,
        }
    }

    /// Creates a lender from a decoder already positioned at the record of
    /// `current_node`, with a pre-filled window.
    pub(crate) fn with_window(
        decoder: D,
        window: CircularBuffer<Vec<usize>>,
        number_of_nodes: usize,
        compression_window: usize,
        min_interval_length: usize,
        current_node: usize,
    ) -> Self {
        Self {
            decoder,
            window,
            number_of_nodes,
            compression_window,
            min_interval_length,
            current_node,
        }
    }

    /// Decodes the record of the next node and returns its successors as a
    /// borrowed slice.
    pub fn next_successors(&mut self) -> Result<&[usize]> {
        let mut successors = self.window.take(self.current_node);
        successors.clear();
        self.decode_node(self.current_node, &mut successors)?;
        let successors = self.window.replace(self.current_node, successors);
        self.current_node += 1;
        Ok(successors)
    }

    /// Decodes one record into `results`.
    fn decode_node(&mut self, node_id: usize, results: &mut Vec<usize>) -> Result<()> {
        let degree = self.decoder.read_outdegree() as usize;
        if degree == 0 {
            return Ok(());
        }
        results.reserve(degree.saturating_sub(results.capacity()));

        let ref_delta = if self.compression_window != 0 {
            self.decoder.read_reference_offset() as usize
        } else {
            0
        };
        if ref_delta != 0 {
            // Nodes are decoded in order, so the reference list is in the
            // window.
            let reference = &self.window[node_id - ref_delta];
            let number_of_blocks = self.decoder.read_block_count() as usize;
            if number_of_blocks == 0 {
                // no blocks: the whole reference list is copied
                results.extend_from_slice(reference);
            } else {
                // the first block length may be zero
                let mut idx = self.decoder.read_block() as usize;
                results.extend_from_slice(&reference[..idx]);
                for block_id in 1..number_of_blocks {
                    let block = self.decoder.read_block() as usize;
                    let end = idx + block + 1;
                    if block_id % 2 == 0 {
                        results.extend_from_slice(&reference[idx..end]);
                    }
                    idx = end;
                }
                if number_of_blocks % 2 == 0 {
                    results.extend_from_slice(&reference[idx..]);
                }
            }
        }

        let left_to_decode = degree - results.len();
        if left_to_decode != 0 && self.min_interval_length != 0 {
            let number_of_intervals = self.decoder.read_interval_count() as usize;
            if number_of_intervals != 0 {
                let offset = nat2int(self.decoder.read_interval_start());
                debug_assert!(node_id as i64 + offset >= 0);
                let mut start = (node_id as i64 + offset) as usize;
                let mut len = self.decoder.read_interval_len() as usize + self.min_interval_length;
                results.extend(start..start + len);
                start += len;
                for _ in 1..number_of_intervals {
                    start += self.decoder.read_interval_start() as usize + 1;
                    len = self.decoder.read_interval_len() as usize + self.min_interval_length;
                    results.extend(start..start + len);
                    start += len;
                }
            }
        }

        let left_to_decode = degree - results.len();
        if left_to_decode != 0 {
            let offset = nat2int(self.decoder.read_first_residual());
            debug_assert!(node_id as i64 + offset >= 0);
            let mut residual = (node_id as i64 + offset) as usize;
            results.push(residual);
            for _ in 1..left_to_decode {
                residual += self.decoder.read_residual() as usize + 1;
                results.push(residual);
            }
        }

        // The three components were appended out of order.
        results.sort_unstable();
        Ok(())
    }
}

impl<'succ, D: Decode> NodeLender<'succ> for Iter<D> {
    type IntoIterator = std::iter::Copied<std::slice::Iter<'succ, usize>>;
}

impl<'succ, D: Decode> Lending<'succ> for Iter<D> {
    type Lend = (usize, <Self as NodeLender<'succ>>::IntoIterator);
}

impl<D: Decode> Lender for Iter<D> {
    fn next(&mut self) -> Option<Lend<'_, Self>> {
        if self.current_node >= self.number_of_nodes {
            return None;
        }
        let mut successors = self.window.take(self.current_node);
        successors.clear();
        self.decode_node(self.current_node, &mut successors)
            .unwrap();
        let successors = self.window.replace(self.current_node, successors);
        let node_id = self.current_node;
        self.current_node += 1;
        Some((node_id, successors.iter().copied()))
    }
}

unsafe impl<D: Decode> SortedLender for Iter<D> {}

impl<D: Decode> ExactSizeLender for Iter<D> {
    fn len(&self) -> usize {
        self.number_of_nodes - self.current_node
    }
}
