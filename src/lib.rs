//! Compression and decompression of the LZ-style command format that
//! Super Mario Kart uses for its graphics, track maps, and other assets.
//!
//! The wire format is described in [`format`].
//! ```
//! let original = b"QAZQAZQAZQAZ";
//! let compressed = smk_codec::compress(original, false).unwrap();
//! assert_eq!(compressed, [0x02, 0x51, 0x41, 0x5A, 0xC8, 0x03, 0xFF]);
//! assert_eq!(smk_codec::decompress(&compressed, 0).unwrap(), original);
//! ```

mod codec;
mod decode;
mod encode;
mod errors;
pub mod format;

pub use codec::{Codec, Region};
pub use decode::{chunk_info, decode, ChunkInfo, Decoder};
pub use encode::{encode, CompressorKind, EncoderBuilder};
pub use errors::CodecError;
pub use format::{validated_super_command_size, Command, CommandKind, Range};

/// Compress `buf`, with the optimal compressor if `optimize` is set
///
/// This is a convenience function for US ROM data; use a [`Codec`] or an
/// [`EncoderBuilder`] to compress for other regions.
pub fn compress(buf: &[u8], optimize: bool) -> Result<Vec<u8>, CodecError> {
    Codec::new().compress(buf, optimize)
}

/// Decompress the chunk at `offset` in `buf`
pub fn decompress(buf: &[u8], offset: usize) -> Result<Vec<u8>, CodecError> {
    Codec::new().decompress(buf, offset)
}
