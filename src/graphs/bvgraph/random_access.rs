/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::sequential::Iter;
use super::*;
use crate::traits::*;
use crate::utils::{nat2int, CircularBuffer};
use lender::IntoLender;
use std::path::PathBuf;

/// A BV-format graph supporting both random access and sequential scans.
///
/// Successor lists are decoded lazily from the compressed bit stream; random
/// access positions a fresh decoder through the offset index, while
/// sequential scans share the window of previously decoded lists and never
/// recurse.
///
/// An instance is immutable and can be shared across threads; cloning it
/// (when the underlying factory allows it) yields an independent reader.
#[derive(Debug, Clone)]
pub struct BvGraph<F> {
    factory: F,
    number_of_nodes: usize,
    number_of_arcs: u64,
    compression_window: usize,
    min_interval_length: usize,
}

impl BvGraph<()> {
    /// Returns a [`LoadConfig`] loading the graph with basename `basename`
    /// for random access.
    ///
    /// Unless customized, the graph is memory-mapped and the offset index is
    /// mapped from its serialized side file (built on first use).
    pub fn with_basename(basename: impl AsRef<std::path::Path>) -> LoadConfig<Random, Mmap, Mmap> {
        LoadConfig {
            basename: PathBuf::from(basename.as_ref()),
            graph_load_flags: MemoryFlags::empty(),
            offsets_load_flags: MemoryFlags::empty(),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<F: RandomAccessDecoderFactory> BvGraph<F> {
    /// Creates a graph from its parts; normally you would use
    /// [`BvGraph::with_basename`] instead.
    pub fn new(
        factory: F,
        number_of_nodes: usize,
        number_of_arcs: u64,
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
}

impl<F: RandomAccessDecoderFactory> SequentialGraph for BvGraph<F> {
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
        Some(self.number_of_arcs)
    }

    /// Returns a fast sequential lender starting at `from`.
    ///
    /// The decoder is positioned at the record of `from` through the offset
    /// index, and the window is pre-filled by random-accessing the up to
    /// `compression_window` preceding nodes, so that the lender never falls
    /// back to recursive decoding.
    fn iter_from(&self, from: usize) -> Self::Lender<'_> {
        let decoder = self
            .factory
            .new_decoder(from)
            .expect("Cannot create decoder");

        let mut window = CircularBuffer::new(self.compression_window + 1);
        for node_id in from.saturating_sub(self.compression_window)..from {
            window.replace(node_id, self.successors(node_id).collect());
        }

        Iter::with_window(
            decoder,
            window,
            self.number_of_nodes,
            self.compression_window,
            self.min_interval_length,
            from,
        )
    }
}

impl<F: RandomAccessDecoderFactory> RandomAccessGraph for BvGraph<F> {
    type Successors<'succ>
        = Successors<F::Decoder<'succ>>
    where
        Self: 'succ;

    #[inline(always)]
    fn num_arcs(&self) -> u64 {
        self.number_of_arcs
    }

    /// Returns the outdegree of `node_id` by decoding just the outdegree
    /// field of its record.
    fn outdegree(&self, node_id: usize) -> usize {
        assert!(
            node_id < self.number_of_nodes,
            "Node index out of range: {} >= {}",
            node_id,
            self.number_of_nodes
        );
        let mut reader = self
            .factory
            .new_decoder(node_id)
            .expect("Cannot create decoder");
        reader.read_outdegree() as usize
    }

    /// Returns a lazy iterator over the successors of `node_id`, in strictly
    /// increasing order.
    ///
    /// If the record copies from a reference list, the reference is decoded
    /// recursively with its own decoder (depth bounded by the maximum
    /// reference count used at compression time); residuals are decoded on
    /// demand while iterating.
    fn successors(&self, node_id: usize) -> Successors<F::Decoder<'_>> {
        assert!(
            node_id < self.number_of_nodes,
            "Node index out of range: {} >= {}",
            node_id,
            self.number_of_nodes
        );
        let reader = self
            .factory
            .new_decoder(node_id)
            .expect("Cannot create decoder");
        let mut result = Successors::new(reader);
        let degree = result.reader.read_outdegree() as usize;
        if degree == 0 {
            return result;
        }
        result.size = degree;
        let mut left_to_decode = degree;

        let ref_delta = if self.compression_window != 0 {
            result.reader.read_reference_offset() as usize
        } else {
            0
        };
        if ref_delta != 0 {
            // Decode the reference list with a fresh decoder, so the cursor
            // of this record is not perturbed.
            let reference = self.successors(node_id - ref_delta);
            debug_assert_ne!(reference.len(), 0);
            let number_of_blocks = result.reader.read_block_count() as usize;
            let mut blocks = Vec::with_capacity(number_of_blocks + 1);
            if number_of_blocks != 0 {
                // the first block length may be zero
                blocks.push(result.reader.read_block() as usize);
                for _ in 1..number_of_blocks {
                    blocks.push(result.reader.read_block() as usize + 1);
                }
            }
            let copied = MaskedIterator::new(reference, blocks);
            left_to_decode -= copied.len();
            result.copied = Some(copied);
        }

        if left_to_decode != 0 && self.min_interval_length != 0 {
            let number_of_intervals = result.reader.read_interval_count() as usize;
            if number_of_intervals != 0 {
                result.intervals = Vec::with_capacity(number_of_intervals);
                let offset = nat2int(result.reader.read_interval_start());
                debug_assert!(node_id as i64 + offset >= 0);
                let mut start = (node_id as i64 + offset) as usize;
                let mut len = result.reader.read_interval_len() as usize + self.min_interval_length;
                result.intervals.push((start, len));
                start += len;
                left_to_decode -= len;
                for _ in 1..number_of_intervals {
                    // intervals are disjoint, so the gap is off by two
                    start += result.reader.read_interval_start() as usize + 1;
                    len = result.reader.read_interval_len() as usize + self.min_interval_length;
                    result.intervals.push((start, len));
                    start += len;
                    left_to_decode -= len;
                }
                result.next_interval = result.intervals[0].0;
            }
        }

        if left_to_decode != 0 {
            let offset = nat2int(result.reader.read_first_residual());
            debug_assert!(node_id as i64 + offset >= 0);
            result.next_residual = (node_id as i64 + offset) as usize;
            result.residuals_left = left_to_decode - 1;
        }

        // Prime the first copied value, so `next` does not have to test
        // whether the masked iterator is present.
        result.next_copied = result
            .copied
            .as_mut()
            .and_then(|iter| iter.next())
            .unwrap_or(usize::MAX);

        result
    }
}

impl<F: RandomAccessDecoderFactory> SplitGraph for BvGraph<F>
where
    for<'a> <F as RandomAccessDecoderFactory>::Decoder<'a>: Send + Sync,
{
    type SplitLender<'a>
        = split::ra::Lender<'a, BvGraph<F>>
    where
        Self: 'a;
    type IntoIterator<'a>
        = split::ra::IntoIterator<'a, BvGraph<F>>
    where
        Self: 'a;

    fn split_iter(&self, how_many: usize) -> Self::IntoIterator<'_> {
        split::ra::Iter::new(self, how_many)
    }
}

impl<'a, F: RandomAccessDecoderFactory> IntoLender for &'a BvGraph<F> {
    type Lender = <BvGraph<F> as SequentialGraph>::Lender<'a>;

    #[inline(always)]
    fn into_lender(self) -> Self::Lender {
        self.iter()
    }
}

/// The lazy sorted iterator over the successors of a node returned by
/// [`BvGraph::successors`].
///
/// The iterator merges three strictly increasing, pairwise disjoint
/// sequences: the masked copy of the reference list, the intervals, and the
/// residuals; the next value of each sequence is kept at hand (`usize::MAX`
/// when exhausted) and the smallest one is yielded.
#[derive(Debug, Clone)]
pub struct Successors<D: Decode> {
    reader: D,
    /// The number of values still to be returned.
    size: usize,
    /// The masked copy of the reference list, if any.
    copied: Option<MaskedIterator<Successors<D>>>,
    /// The intervals still to be enumerated.
    intervals: Vec<(usize, usize)>,
    /// The interval currently being enumerated.
    interval_idx: usize,
    /// The number of residuals after `next_residual`.
    residuals_left: usize,
    next_copied: usize,
    next_interval: usize,
    next_residual: usize,
}

impl<D: Decode> Successors<D> {
    /// Creates an empty iterator.
    fn new(reader: D) -> Self {
        Self {
            reader,
            size: 0,
            copied: None,
            intervals: vec![],
            interval_idx: 0,
            residuals_left: 0,
            next_copied: usize::MAX,
            next_interval: usize::MAX,
            next_residual: usize::MAX,
        }
    }
}

impl<D: Decode> ExactSizeIterator for Successors<D> {
    #[inline(always)]
    fn len(&self) -> usize {
        self.size
    }
}

unsafe impl<D: Decode> SortedIterator for Successors<D> {}

impl<D: Decode> Iterator for Successors<D> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.size == 0 {
            return None;
        }
        self.size -= 1;
        debug_assert!(
            self.next_copied != usize::MAX
                || self.next_interval != usize::MAX
                || self.next_residual != usize::MAX,
            "the outdegree does not match the decoded components"
        );

        let min_extra = self.next_interval.min(self.next_residual);
        // The three sequences are disjoint, so strict comparisons suffice.
        if self.next_copied < min_extra {
            let result = self.next_copied;
            self.next_copied = self
                .copied
                .as_mut()
                .and_then(|iter| iter.next())
                .unwrap_or(usize::MAX);
            return Some(result);
        }

        if self.next_interval < self.next_residual {
            let result = self.next_interval;
            let (start, len) = &mut self.intervals[self.interval_idx];
            *start += 1;
            *len -= 1;
            if *len == 0 {
                self.interval_idx += 1;
            }
            self.next_interval = if self.interval_idx < self.intervals.len() {
                self.intervals[self.interval_idx].0
            } else {
                usize::MAX
            };
            return Some(result);
        }

        let result = self.next_residual;
        if self.residuals_left == 0 {
            self.next_residual = usize::MAX;
        } else {
            self.residuals_left -= 1;
            // NOTE: a decoding error here cannot be propagated
            self.next_residual += self.reader.read_residual() as usize + 1;
        }
        Some(result)
    }
}
