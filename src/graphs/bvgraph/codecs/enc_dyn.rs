/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::codes::{len_nibble, len_unary, NibbleWrite};
use super::{CodeWrite, Encode, EncodeAndEstimate};
use crate::graphs::bvgraph::{Code, CompFlags};
use dsi_bitstream::prelude::*;
use std::convert::Infallible;

type WriteResult<CW> = Result<usize, <CW as BitWrite<BE>>::Error>;

/// An [`Encode`] implementation dispatching each field to the code chosen by
/// the compression flags.
///
/// The encoder carries its own [`DynEstimator`], so candidate references can
/// be costed without touching the output stream.
#[derive(Debug, Clone)]
pub struct DynEncoder<CW: CodeWrite> {
    /// The code writer producing the graph stream.
    code_writer: CW,
    /// The stateless estimator mirroring this encoder's codes.
    estimator: DynEstimator,
    write_outdegree: fn(&mut CW, u64) -> WriteResult<CW>,
    write_reference_offset: fn(&mut CW, u64) -> WriteResult<CW>,
    write_block_count: fn(&mut CW, u64) -> WriteResult<CW>,
    write_block: fn(&mut CW, u64) -> WriteResult<CW>,
    write_interval_count: fn(&mut CW, u64) -> WriteResult<CW>,
    write_interval_start: fn(&mut CW, u64) -> WriteResult<CW>,
    write_interval_len: fn(&mut CW, u64) -> WriteResult<CW>,
    write_first_residual: fn(&mut CW, u64) -> WriteResult<CW>,
    write_residual: fn(&mut CW, u64) -> WriteResult<CW>,
}

fn write_zeta2<CW: CodeWrite>(cw: &mut CW, x: u64) -> WriteResult<CW> {
    CW::write_zeta(cw, x, 2)
}

fn write_zeta4<CW: CodeWrite>(cw: &mut CW, x: u64) -> WriteResult<CW> {
    CW::write_zeta(cw, x, 4)
}

fn write_zeta5<CW: CodeWrite>(cw: &mut CW, x: u64) -> WriteResult<CW> {
    CW::write_zeta(cw, x, 5)
}

fn write_zeta6<CW: CodeWrite>(cw: &mut CW, x: u64) -> WriteResult<CW> {
    CW::write_zeta(cw, x, 6)
}

fn write_zeta7<CW: CodeWrite>(cw: &mut CW, x: u64) -> WriteResult<CW> {
    CW::write_zeta(cw, x, 7)
}

impl<CW: CodeWrite> DynEncoder<CW> {
    /// Selects the write function for `code`.
    ///
    /// # Panics
    ///
    /// Unsupported codes are a programmer error on the encoding side (the
    /// caller chose the flags) and panic.
    fn select_code(code: Code) -> fn(&mut CW, u64) -> WriteResult<CW> {
        match code {
            Code::Unary => CW::write_unary,
            Code::Gamma => CW::write_gamma,
            Code::Delta => CW::write_delta,
            Code::Zeta { k: 1 } => CW::write_gamma,
            Code::Zeta { k: 2 } => write_zeta2,
            Code::Zeta { k: 3 } => CW::write_zeta3,
            Code::Zeta { k: 4 } => write_zeta4,
            Code::Zeta { k: 5 } => write_zeta5,
            Code::Zeta { k: 6 } => write_zeta6,
            Code::Zeta { k: 7 } => write_zeta7,
            Code::Nibble => CW::write_nibble,
            code => panic!(
                "Only unary, ɣ, δ, ζ₁-ζ₇, and nibble codes can encode record fields, {:?} is not supported",
                code
            ),
        }
    }

    pub fn new(code_writer: CW, cf: &CompFlags) -> Self {
        Self {
            code_writer,
            write_outdegree: Self::select_code(cf.outdegrees),
            write_reference_offset: Self::select_code(cf.references),
            write_block_count: Self::select_code(cf.blocks),
            write_block: Self::select_code(cf.blocks),
            write_interval_count: Self::select_code(cf.intervals),
            write_interval_start: Self::select_code(cf.intervals),
            write_interval_len: Self::select_code(cf.intervals),
            write_first_residual: Self::select_code(cf.residuals),
            write_residual: Self::select_code(cf.residuals),
            estimator: DynEstimator::new(cf),
        }
    }

    /// Consumes the encoder and returns the underlying code writer.
    pub fn into_inner(self) -> CW {
        self.code_writer
    }
}

impl<CW: CodeWrite> Encode for DynEncoder<CW>
where
    <CW as BitWrite<BE>>::Error: Send + Sync,
{
    type Error = <CW as BitWrite<BE>>::Error;

    #[inline(always)]
    fn write_outdegree(&mut self, value: u64) -> WriteResult<CW> {
        (self.write_outdegree)(&mut self.code_writer, value)
    }

    #[inline(always)]
    fn write_reference_offset(&mut self, value: u64) -> WriteResult<CW> {
        (self.write_reference_offset)(&mut self.code_writer, value)
    }

    #[inline(always)]
    fn write_block_count(&mut self, value: u64) -> WriteResult<CW> {
        (self.write_block_count)(&mut self.code_writer, value)
    }

    #[inline(always)]
    fn write_block(&mut self, value: u64) -> WriteResult<CW> {
        (self.write_block)(&mut self.code_writer, value)
    }

    #[inline(always)]
    fn write_interval_count(&mut self, value: u64) -> WriteResult<CW> {
        (self.write_interval_count)(&mut self.code_writer, value)
    }

    #[inline(always)]
    fn write_interval_start(&mut self, value: u64) -> WriteResult<CW> {
        (self.write_interval_start)(&mut self.code_writer, value)
    }

    #[inline(always)]
    fn write_interval_len(&mut self, value: u64) -> WriteResult<CW> {
        (self.write_interval_len)(&mut self.code_writer, value)
    }

    #[inline(always)]
    fn write_first_residual(&mut self, value: u64) -> WriteResult<CW> {
        (self.write_first_residual)(&mut self.code_writer, value)
    }

    #[inline(always)]
    fn write_residual(&mut self, value: u64) -> WriteResult<CW> {
        (self.write_residual)(&mut self.code_writer, value)
    }

    fn flush(&mut self) -> WriteResult<CW> {
        self.code_writer.flush()
    }
}

impl<CW: CodeWrite> EncodeAndEstimate for DynEncoder<CW>
where
    <CW as BitWrite<BE>>::Error: Send + Sync,
{
    type Estimator<'a>
        = &'a mut DynEstimator
    where
        Self: 'a;

    fn estimator(&mut self) -> Self::Estimator<'_> {
        &mut self.estimator
    }
}

/// An [`Encode`] that just returns code lengths, never writing a bit.
#[derive(Debug, Clone)]
pub struct DynEstimator {
    len_outdegree: fn(u64) -> usize,
    len_reference_offset: fn(u64) -> usize,
    len_block_count: fn(u64) -> usize,
    len_block: fn(u64) -> usize,
    len_interval_count: fn(u64) -> usize,
    len_interval_start: fn(u64) -> usize,
    len_interval_len: fn(u64) -> usize,
    len_first_residual: fn(u64) -> usize,
    len_residual: fn(u64) -> usize,
}

impl DynEstimator {
    /// Selects the length function for `code`.
    fn select_code(code: Code) -> fn(u64) -> usize {
        match code {
            Code::Unary => len_unary,
            Code::Gamma => len_gamma,
            Code::Delta => len_delta,
            Code::Zeta { k: 1 } => len_gamma,
            Code::Zeta { k: 2 } => |x| len_zeta(x, 2),
            Code::Zeta { k: 3 } => |x| len_zeta(x, 3),
            Code::Zeta { k: 4 } => |x| len_zeta(x, 4),
            Code::Zeta { k: 5 } => |x| len_zeta(x, 5),
            Code::Zeta { k: 6 } => |x| len_zeta(x, 6),
            Code::Zeta { k: 7 } => |x| len_zeta(x, 7),
            Code::Nibble => len_nibble,
            code => panic!(
                "Only unary, ɣ, δ, ζ₁-ζ₇, and nibble codes can encode record fields, {:?} is not supported",
                code
            ),
        }
    }

    pub fn new(cf: &CompFlags) -> Self {
        Self {
            len_outdegree: Self::select_code(cf.outdegrees),
            len_reference_offset: Self::select_code(cf.references),
            len_block_count: Self::select_code(cf.blocks),
            len_block: Self::select_code(cf.blocks),
            len_interval_count: Self::select_code(cf.intervals),
            len_interval_start: Self::select_code(cf.intervals),
            len_interval_len: Self::select_code(cf.intervals),
            len_first_residual: Self::select_code(cf.residuals),
            len_residual: Self::select_code(cf.residuals),
        }
    }
}

impl Encode for DynEstimator {
    type Error = Infallible;

    #[inline(always)]
    fn write_outdegree(&mut self, value: u64) -> Result<usize, Self::Error> {
        Ok((self.len_outdegree)(value))
    }

    #[inline(always)]
    fn write_reference_offset(&mut self, value: u64) -> Result<usize, Self::Error> {
        Ok((self.len_reference_offset)(value))
    }

    #[inline(always)]
    fn write_block_count(&mut self, value: u64) -> Result<usize, Self::Error> {
        Ok((self.len_block_count)(value))
    }

    #[inline(always)]
    fn write_block(&mut self, value: u64) -> Result<usize, Self::Error> {
        Ok((self.len_block)(value))
    }

    #[inline(always)]
    fn write_interval_count(&mut self, value: u64) -> Result<usize, Self::Error> {
        Ok((self.len_interval_count)(value))
    }

    #[inline(always)]
    fn write_interval_start(&mut self, value: u64) -> Result<usize, Self::Error> {
        Ok((self.len_interval_start)(value))
    }

    #[inline(always)]
    fn write_interval_len(&mut self, value: u64) -> Result<usize, Self::Error> {
        Ok((self.len_interval_len)(value))
    }

    #[inline(always)]
    fn write_first_residual(&mut self, value: u64) -> Result<usize, Self::Error> {
        Ok((self.len_first_residual)(value))
    }

    #[inline(always)]
    fn write_residual(&mut self, value: u64) -> Result<usize, Self::Error> {
        Ok((self.len_residual)(value))
    }

    fn flush(&mut self) -> Result<usize, Self::Error> {
        Ok(0)
    }
}
