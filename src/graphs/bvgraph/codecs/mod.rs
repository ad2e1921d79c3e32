/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Traits and implementations for the field-level codecs of the BV format.
//!
//! A graph record is a sequence of integers (outdegree, reference, blocks,
//! intervals, residuals), each written with a configurable instantaneous
//! code. [`Decode`] and [`Encode`] abstract over the per-field reads and
//! writes; [`DynDecoder`] and [`DynEncoder`] dispatch each field to the code
//! chosen by the [compression flags](crate::graphs::bvgraph::CompFlags).

pub mod codes;
pub use codes::*;

mod dec_dyn;
pub use dec_dyn::*;

mod enc_dyn;
pub use enc_dyn::*;

pub mod factories;
pub use factories::*;

use dsi_bitstream::{
    codes::{DeltaRead, DeltaWrite, GammaRead, GammaWrite, ZetaRead, ZetaWrite},
    traits::{BitRead, BitWrite, BE},
};
use std::error::Error;

/// A trait combining the code-reading traits needed by [`DynDecoder`].
///
/// The nibble, minimal-binary, and Golomb codes are available on any
/// [`BitRead`] through the blanket extension traits of [`codes`].
pub trait CodeRead: BitRead<BE> + GammaRead<BE> + DeltaRead<BE> + ZetaRead<BE> {}
impl<T> CodeRead for T where T: BitRead<BE> + GammaRead<BE> + DeltaRead<BE> + ZetaRead<BE> {}

/// A trait combining the code-writing traits needed by [`DynEncoder`].
pub trait CodeWrite: BitWrite<BE> + GammaWrite<BE> + DeltaWrite<BE> + ZetaWrite<BE> {}
impl<T> CodeWrite for T where T: BitWrite<BE> + GammaWrite<BE> + DeltaWrite<BE> + ZetaWrite<BE> {}

/// Methods to decode the fields of a graph record.
///
/// Reads are infallible: memory-backed streams cannot fail, and a corrupt
/// stream surfaces as a panic that is fatal for the read at hand only.
pub trait Decode {
    fn read_outdegree(&mut self) -> u64;
    fn read_reference_offset(&mut self) -> u64;
    fn read_block_count(&mut self) -> u64;
    fn read_block(&mut self) -> u64;
    fn read_interval_count(&mut self) -> u64;
    fn read_interval_start(&mut self) -> u64;
    fn read_interval_len(&mut self) -> u64;
    fn read_first_residual(&mut self) -> u64;
    fn read_residual(&mut self) -> u64;
}

/// Methods to encode the fields of a graph record.
///
/// Every write returns the number of bits emitted.
pub trait Encode {
    type Error: Error + Send + Sync + 'static;
    fn write_outdegree(&mut self, value: u64) -> Result<usize, Self::Error>;
    fn write_reference_offset(&mut self, value: u64) -> Result<usize, Self::Error>;
    fn write_block_count(&mut self, value: u64) -> Result<usize, Self::Error>;
    fn write_block(&mut self, value: u64) -> Result<usize, Self::Error>;
    fn write_interval_count(&mut self, value: u64) -> Result<usize, Self::Error>;
    fn write_interval_start(&mut self, value: u64) -> Result<usize, Self::Error>;
    fn write_interval_len(&mut self, value: u64) -> Result<usize, Self::Error>;
    fn write_first_residual(&mut self, value: u64) -> Result<usize, Self::Error>;
    fn write_residual(&mut self, value: u64) -> Result<usize, Self::Error>;
    fn flush(&mut self) -> Result<usize, Self::Error>;
}

impl<E: Encode + ?Sized> Encode for &mut E {
    type Error = E::Error;
    #[inline(always)]
    fn write_outdegree(&mut self, value: u64) -> Result<usize, Self::Error> {
        (**self).write_outdegree(value)
    }
    #[inline(always)]
    fn write_reference_offset(&mut self, value: u64) -> Result<usize, Self::Error> {
        (**self).write_reference_offset(value)
    }
    #[inline(always)]
    fn write_block_count(&mut self, value: u64) -> Result<usize, Self::Error> {
        (**self).write_block_count(value)
    }
    #[inline(always)]
    fn write_block(&mut self, value: u64) -> Result<usize, Self::Error> {
        (**self).write_block(value)
    }
    #[inline(always)]
    fn write_interval_count(&mut self, value: u64) -> Result<usize, Self::Error> {
        (**self).write_interval_count(value)
    }
    #[inline(always)]
    fn write_interval_start(&mut self, value: u64) -> Result<usize, Self::Error> {
        (**self).write_interval_start(value)
    }
    #[inline(always)]
    fn write_interval_len(&mut self, value: u64) -> Result<usize, Self::Error> {
        (**self).write_interval_len(value)
    }
    #[inline(always)]
    fn write_first_residual(&mut self, value: u64) -> Result<usize, Self::Error> {
        (**self).write_first_residual(value)
    }
    #[inline(always)]
    fn write_residual(&mut self, value: u64) -> Result<usize, Self::Error> {
        (**self).write_residual(value)
    }
    #[inline(always)]
    fn flush(&mut self) -> Result<usize, Self::Error> {
        (**self).flush()
    }
}

/// An [`Encode`] that can hand out an estimator: a (usually stateless)
/// encoder whose write methods return the number of bits each value *would*
/// take, without emitting anything.
///
/// The compressor runs each candidate reference through the estimator and
/// writes for real only the cheapest one.
pub trait EncodeAndEstimate: Encode {
    type Estimator<'a>: Encode
    where
        Self: 'a;
    fn estimator(&mut self) -> Self::Estimator<'_>;
}

/// A factory of decoders positioned at the start of the record of a given
/// node.
pub trait RandomAccessDecoderFactory {
    /// The type of decoder that this factory builds.
    type Decoder<'a>: Decode + 'a
    where
        Self: 'a;

    /// Creates a new decoder positioned at the record of `node`.
    fn new_decoder(&self, node: usize) -> anyhow::Result<Self::Decoder<'_>>;
}

/// A factory of decoders positioned at the start of the graph stream.
pub trait SequentialDecoderFactory {
    /// The type of decoder that this factory builds.
    type Decoder<'a>: Decode + 'a
    where
        Self: 'a;

    /// Creates a new decoder at the beginning of the stream.
    fn new_decoder(&self) -> anyhow::Result<Self::Decoder<'_>>;
}
