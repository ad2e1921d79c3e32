/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The [main iteration trait](NodeLender) and convenience types.

use lender::{Lender, Lending};

/// Iteration on nodes and their successors.
///
/// This trait is a [`Lender`] returning pairs given by a `usize` (a node of
/// the graph) and an [`IntoIterator`] over the successors of that node. The
/// successor iterator may borrow from the lender (typically, from the window
/// of the last decoded lists), which is why a lending iterator is needed: to
/// access the next pair, you must have finished using the previous one.
///
/// The definition propagates the implicit bound appearing in [`Lender`] to
/// the iterator returned by the associated type `IntoIterator`, so that
/// successor iterators can depend on the internal state of the lender.
pub trait NodeLender<'lend, __ImplBound: lender::ImplBound = lender::Ref<'lend, Self>>:
    Lender + Lending<'lend, __ImplBound, Lend = (usize, Self::IntoIterator)>
{
    type IntoIterator: IntoIterator<Item = usize>;
}

/// Convenience type alias for the successor [`IntoIterator`] of a [`NodeLender`].
pub type LenderIntoIterator<'lend, L> = <L as NodeLender<'lend>>::IntoIterator;

/// Convenience type alias for the iterator of the successor
/// [`IntoIterator`] of a [`NodeLender`].
pub type LenderIntoIter<'lend, L> =
    <<L as NodeLender<'lend>>::IntoIterator as IntoIterator>::IntoIter;

/// [`lender::Take`] forwards the lends of the underlying lender, so taking a
/// prefix of a [`NodeLender`] is again a [`NodeLender`]. This makes the
/// result of [`SplitGraph::split_iter`](crate::traits::SplitGraph::split_iter)
/// usable everywhere a lender over nodes is expected.
impl<'lend, L> NodeLender<'lend> for lender::Take<L>
where
    L: Lender + for<'next> NodeLender<'next>,
{
    type IntoIterator = <L as NodeLender<'lend>>::IntoIterator;
}

/// Marker trait for lenders yielding node ids in ascending order.
///
/// # Safety
///
/// The first component of the pairs returned by the lender must be strictly
/// increasing (and contiguous when the lender covers a node range).
pub unsafe trait SortedLender: Lender {}

unsafe impl<L: Lender + SortedLender> SortedLender for lender::Take<L> {}

/// Marker trait for iterators yielding successors in strictly increasing
/// order.
///
/// # Safety
///
/// The values returned by the iterator must be strictly increasing.
pub unsafe trait SortedIterator: Iterator {}
