//! A small facade over [`Decoder`] and [`EncoderBuilder`] for callers that
//! work with a ROM image of a known region.

use crate::{
    decode::Decoder,
    encode::{CompressorKind, EncoderBuilder},
    errors::CodecError,
    format::validated_super_command_size,
};

/// The region of a Super Mario Kart ROM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Japan,
    Us,
    Europe,
}

impl Region {
    /// Non-US versions of the game can't decompress super commands whose
    /// count is a multiple of 256
    #[inline]
    pub const fn has_quirks(self) -> bool {
        !matches!(self, Self::Us)
    }
}

/// Compression and decompression settings for one ROM
/// ```
/// # use smk_codec::{Codec, Region};
/// let codec = Codec::for_region(Region::Japan);
/// let compressed = codec.compress(&[0x42; 512], true).unwrap();
/// assert_eq!(codec.decompress(&compressed, 0).unwrap(), vec![0x42; 512]);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Codec {
    quirks: bool,
}

impl Codec {
    /// A codec for US ROMs, without region quirks
    #[inline]
    pub const fn new() -> Self {
        Self { quirks: false }
    }

    #[inline]
    pub const fn for_region(region: Region) -> Self {
        Self {
            quirks: region.has_quirks(),
        }
    }

    #[inline]
    pub fn set_region(&mut self, region: Region) {
        self.quirks = region.has_quirks();
    }

    #[inline]
    pub const fn quirks(&self) -> bool {
        self.quirks
    }

    /// See [`validated_super_command_size`]
    #[inline]
    pub const fn validated_super_command_size(&self, size: usize) -> usize {
        validated_super_command_size(size, self.quirks)
    }

    /// Decompress the chunk at `offset` up to its terminator
    pub fn decompress(&self, buf: &[u8], offset: usize) -> Result<Vec<u8>, CodecError> {
        Decoder::for_bytes(buf).offset(offset).decode()
    }

    /// Decompress exactly `length` bytes from the chunk at `offset`, up to
    /// `BUFFER_SIZE`. This never fails on bad data; see [`Decoder::length`].
    pub fn decompress_len(
        &self,
        buf: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Vec<u8>, CodecError> {
        Decoder::for_bytes(buf).offset(offset).length(length).decode()
    }

    /// Decompress the chunk at `offset`, then decompress the result
    pub fn decompress_twice(&self, buf: &[u8], offset: usize) -> Result<Vec<u8>, CodecError> {
        Decoder::for_bytes(buf).offset(offset).twice(true).decode()
    }

    /// Compress `buf` with the optimal compressor if `optimize` is set, or the fast one
    pub fn compress(&self, buf: &[u8], optimize: bool) -> Result<Vec<u8>, CodecError> {
        self.encoder(buf, optimize).encode_to_vec()
    }

    /// Compress `buf`, then compress the result again with the fast compressor
    pub fn compress_twice(&self, buf: &[u8], optimize: bool) -> Result<Vec<u8>, CodecError> {
        self.encoder(buf, optimize).twice(true).encode_to_vec()
    }

    /// Size of the chunk at `offset`, terminator included
    pub fn length(&self, buf: &[u8], offset: usize) -> Result<usize, CodecError> {
        Decoder::for_bytes(buf).offset(offset).compressed_len()
    }

    /// Copy of the bytes of the chunk at `offset`
    pub fn compressed_chunk(&self, buf: &[u8], offset: usize) -> Result<Vec<u8>, CodecError> {
        Decoder::for_bytes(buf).offset(offset).compressed_chunk()
    }

    fn encoder<'a>(&self, buf: &'a [u8], optimize: bool) -> EncoderBuilder<'a> {
        let compressor = if optimize {
            CompressorKind::Optimal
        } else {
            CompressorKind::Fast
        };

        let mut encoder = EncoderBuilder::for_bytes(buf);
        encoder.compressor(compressor).quirks(self.quirks);
        encoder
    }
}
