/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{
    BitReaderFactory, CodeRead, Decode, NibbleRead, RandomAccessDecoderFactory,
    SequentialDecoderFactory,
};
use crate::graphs::bvgraph::{Code, CompFlags};
use anyhow::bail;
use dsi_bitstream::traits::BitSeek;
use epserde::deser::MemCase;
use sux::traits::IndexedSeq;

/// A [`Decode`] implementation dispatching each field to the code chosen by
/// the compression flags.
///
/// The dispatch functions are selected once, when the decoder is built, so
/// per-field reads cost one indirect call.
#[derive(Debug, Clone)]
pub struct DynDecoder<CR: CodeRead> {
    pub(crate) code_reader: CR,
    read_outdegree: fn(&mut CR) -> u64,
    read_reference_offset: fn(&mut CR) -> u64,
    read_block_count: fn(&mut CR) -> u64,
    read_block: fn(&mut CR) -> u64,
    read_interval_count: fn(&mut CR) -> u64,
    read_interval_start: fn(&mut CR) -> u64,
    read_interval_len: fn(&mut CR) -> u64,
    read_first_residual: fn(&mut CR) -> u64,
    read_residual: fn(&mut CR) -> u64,
}

impl<CR: CodeRead> DynDecoder<CR> {
    const READ_UNARY: fn(&mut CR) -> u64 = |cr| cr.read_unary().unwrap();
    const READ_GAMMA: fn(&mut CR) -> u64 = |cr| cr.read_gamma().unwrap();
    const READ_DELTA: fn(&mut CR) -> u64 = |cr| cr.read_delta().unwrap();
    const READ_ZETA1: fn(&mut CR) -> u64 = Self::READ_GAMMA;
    const READ_ZETA2: fn(&mut CR) -> u64 = |cr| cr.read_zeta(2).unwrap();
    const READ_ZETA3: fn(&mut CR) -> u64 = |cr| cr.read_zeta3().unwrap();
    const READ_ZETA4: fn(&mut CR) -> u64 = |cr| cr.read_zeta(4).unwrap();
    const READ_ZETA5: fn(&mut CR) -> u64 = |cr| cr.read_zeta(5).unwrap();
    const READ_ZETA6: fn(&mut CR) -> u64 = |cr| cr.read_zeta(6).unwrap();
    const READ_ZETA7: fn(&mut CR) -> u64 = |cr| cr.read_zeta(7).unwrap();
    const READ_NIBBLE: fn(&mut CR) -> u64 = |cr| cr.read_nibble().unwrap();

    /// Selects the dispatch function for `code`, or fails if the code cannot
    /// be used as a record-field code.
    pub(crate) fn select_code(code: Code) -> anyhow::Result<fn(&mut CR) -> u64> {
        Ok(match code {
            Code::Unary => Self::READ_UNARY,
            Code::Gamma => Self::READ_GAMMA,
            Code::Delta => Self::READ_DELTA,
            Code::Zeta { k: 1 } => Self::READ_ZETA1,
            Code::Zeta { k: 2 } => Self::READ_ZETA2,
            Code::Zeta { k: 3 } => Self::READ_ZETA3,
            Code::Zeta { k: 4 } => Self::READ_ZETA4,
            Code::Zeta { k: 5 } => Self::READ_ZETA5,
            Code::Zeta { k: 6 } => Self::READ_ZETA6,
            Code::Zeta { k: 7 } => Self::READ_ZETA7,
            Code::Nibble => Self::READ_NIBBLE,
            Code::Golomb { .. } => bail!(
                "The Golomb code cannot be used for record fields: the property file has no key carrying its modulus"
            ),
            code => bail!(
                "Only unary, ɣ, δ, ζ₁-ζ₇, and nibble codes can decode record fields, {:?} is not supported",
                code
            ),
        })
    }

    /// Creates a decoder reading from `code_reader` with the codes of `cf`.
    pub fn new(code_reader: CR, cf: &CompFlags) -> anyhow::Result<Self> {
        Ok(Self {
            code_reader,
            read_outdegree: Self::select_code(cf.outdegrees)?,
            read_reference_offset: Self::select_code(cf.references)?,
            read_block_count: Self::select_code(cf.blocks)?,
            read_block: Self::select_code(cf.blocks)?,
            read_interval_count: Self::select_code(cf.intervals)?,
            read_interval_start: Self::select_code(cf.intervals)?,
            read_interval_len: Self::select_code(cf.intervals)?,
            read_first_residual: Self::select_code(cf.residuals)?,
            read_residual: Self::select_code(cf.residuals)?,
        })
    }
}

impl<CR: CodeRead + BitSeek> BitSeek for DynDecoder<CR> {
    type Error = <CR as BitSeek>::Error;

    fn set_bit_pos(&mut self, bit_index: u64) -> Result<(), Self::Error> {
        self.code_reader.set_bit_pos(bit_index)
    }

    fn bit_pos(&mut self) -> Result<u64, Self::Error> {
        self.code_reader.bit_pos()
    }
}

impl<CR: CodeRead> Decode for DynDecoder<CR> {
    #[inline(always)]
    fn read_outdegree(&mut self) -> u64 {
        (self.read_outdegree)(&mut self.code_reader)
    }

    #[inline(always)]
    fn read_reference_offset(&mut self) -> u64 {
        (self.read_reference_offset)(&mut self.code_reader)
    }

    #[inline(always)]
    fn read_block_count(&mut self) -> u64 {
        (self.read_block_count)(&mut self.code_reader)
    }

    #[inline(always)]
    fn read_block(&mut self) -> u64 {
        (self.read_block)(&mut self.code_reader)
    }

    #[inline(always)]
    fn read_interval_count(&mut self) -> u64 {
        (self.read_interval_count)(&mut self.code_reader)
    }

    #[inline(always)]
    fn read_interval_start(&mut self) -> u64 {
        (self.read_interval_start)(&mut self.code_reader)
    }

    #[inline(always)]
    fn read_interval_len(&mut self) -> u64 {
        (self.read_interval_len)(&mut self.code_reader)
    }

    #[inline(always)]
    fn read_first_residual(&mut self) -> u64 {
        (self.read_first_residual)(&mut self.code_reader)
    }

    #[inline(always)]
    fn read_residual(&mut self) -> u64 {
        (self.read_residual)(&mut self.code_reader)
    }
}

/// A [`RandomAccessDecoderFactory`] pairing a bit-reader factory with the
/// offset index mapping each node to the bit position of its record.
pub struct DynDecoderFactory<F: BitReaderFactory, OFF: IndexedSeq<Input = usize, Output = usize>> {
    /// The backing from which bit readers are created.
    factory: F,
    /// The offset index (owned, loaded, or memory-mapped).
    offsets: MemCase<OFF>,
    /// The compression flags of the graph.
    flags: CompFlags,
}

impl<F: BitReaderFactory, OFF: IndexedSeq<Input = usize, Output = usize>>
    DynDecoderFactory<F, OFF>
where
    for<'a> <F as BitReaderFactory>::BitReader<'a>: CodeRead + BitSeek,
{
    /// Creates a factory, validating eagerly that every configured code is
    /// supported.
    pub fn new(factory: F, offsets: MemCase<OFF>, flags: CompFlags) -> anyhow::Result<Self> {
        flags.check_supported()?;
        Ok(Self {
            factory,
            offsets,
            flags,
        })
    }

    /// Returns a copy of the compression flags.
    #[inline(always)]
    pub fn flags(&self) -> CompFlags {
        self.flags
    }
}

impl<F: BitReaderFactory, OFF: IndexedSeq<Input = usize, Output = usize>> RandomAccessDecoderFactory
    for DynDecoderFactory<F, OFF>
where
    for<'a> <F as BitReaderFactory>::BitReader<'a>: CodeRead + BitSeek,
{
    type Decoder<'a>
        = DynDecoder<<F as BitReaderFactory>::BitReader<'a>>
    where
        Self: 'a;

    fn new_decoder(&self, node: usize) -> anyhow::Result<Self::Decoder<'_>> {
        let mut code_reader = self.factory.new_reader();
        code_reader.set_bit_pos(self.offsets.get(node) as u64)?;
        DynDecoder::new(code_reader, &self.flags)
    }
}

/// A [`SequentialDecoderFactory`]: like [`DynDecoderFactory`], but with no
/// offsets, as decoders always start at the beginning of the stream.
pub struct DynSeqDecoderFactory<F: BitReaderFactory> {
    factory: F,
    flags: CompFlags,
}

impl<F: BitReaderFactory> DynSeqDecoderFactory<F>
where
    for<'a> <F as BitReaderFactory>::BitReader<'a>: CodeRead,
{
    pub fn new(factory: F, flags: CompFlags) -> anyhow::Result<Self> {
        flags.check_supported()?;
        Ok(Self { factory, flags })
    }

    /// Returns a copy of the compression flags.
    #[inline(always)]
    pub fn flags(&self) -> CompFlags {
        self.flags
    }
}

impl<F: BitReaderFactory> SequentialDecoderFactory for DynSeqDecoderFactory<F>
where
    for<'a> <F as BitReaderFactory>::BitReader<'a>: CodeRead,
{
    type Decoder<'a>
        = DynDecoder<<F as BitReaderFactory>::BitReader<'a>>
    where
        Self: 'a;

    fn new_decoder(&self) -> anyhow::Result<Self::Decoder<'_>> {
        DynDecoder::new(self.factory.new_reader(), &self.flags)
    }
}
