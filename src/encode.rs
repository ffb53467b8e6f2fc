use crate::{
    codec::Region,
    errors::CodecError,
    format::{Command, TERMINATOR},
};
use bitstream_io::{BigEndian, BitWriter};
use std::io::Write;

mod chunk;
mod dictionary;
mod fast;
mod optimal;
mod pattern;

type LogWtr<'a> = &'a mut dyn Write;

/// The algorithm used to choose commands when compressing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressorKind {
    /// Single pass, greedy choice of command at each position
    Fast,
    /// Search for the smallest possible encoding. Much slower than `Fast`.
    Optimal,
}

/// Specify the encoding settings, such as compressor, region quirks, and logging
///
/// To create a new `EncoderBuilder`, use [`for_bytes()`]. Then, change any of
/// the encoding settings with `EncoderBuilder`'s helper methods. Finally, encode
/// the input data with [`encode_to_writer()`] or [`encode_to_vec()`].
/// ```
/// # use smk_codec::{EncoderBuilder, Region};
/// let input = b"ABBACABBCADFEGABA";
/// let compressed = EncoderBuilder::for_bytes(input)
///     .optimal()
///     .region(Region::Europe)
///     .with_logging(&mut ::std::io::stdout())
///     .encode_to_vec();
/// ```
///
/// The default encoding settings are as follows:
/// * [`Fast`] compressor
/// * Single pass
/// * No region quirks (US ROM)
/// * No logging
///
/// [`for_bytes()`]: EncoderBuilder::for_bytes
/// [`encode_to_writer()`]: EncoderBuilder::encode_to_writer
/// [`encode_to_vec()`]: EncoderBuilder::encode_to_vec
/// [`Fast`]: CompressorKind::Fast
pub struct EncoderBuilder<'a> {
    src: &'a [u8],
    compressor: CompressorKind,
    twice: bool,
    quirks: bool,
    log: Option<LogWtr<'a>>,
}

impl<'a> EncoderBuilder<'a> {
    /// Create a new `EncoderBuilder` for the data the `bytes` slice.
    #[inline]
    pub fn for_bytes(bytes: &'a [u8]) -> Self {
        Self {
            src: bytes,
            compressor: CompressorKind::Fast,
            twice: false,
            quirks: false,
            log: None,
        }
    }

    #[inline]
    pub fn compressor(&mut self, compressor: CompressorKind) -> &mut Self {
        self.compressor = compressor;
        self
    }

    /// Convenience method to use the fast compressor without importing [`CompressorKind`].
    #[inline]
    pub fn fast(&mut self) -> &mut Self {
        self.compressor = CompressorKind::Fast;
        self
    }

    /// Convenience method to use the optimal compressor without importing [`CompressorKind`].
    #[inline]
    pub fn optimal(&mut self) -> &mut Self {
        self.compressor = CompressorKind::Optimal;
        self
    }

    /// Compress the compressed output a second time.
    ///
    /// The second pass always uses the fast compressor, as searching for the
    /// optimal encoding of already compressed data gains next to nothing.
    #[inline]
    pub fn twice(&mut self, twice: bool) -> &mut Self {
        self.twice = twice;
        self
    }

    /// Avoid super command counts that are a multiple of 256, which the
    /// non-US versions of the game cannot decompress.
    #[inline]
    pub fn quirks(&mut self, quirks: bool) -> &mut Self {
        self.quirks = quirks;
        self
    }

    /// Set the region quirks to those of the ROM `region`
    #[inline]
    pub fn region(&mut self, region: Region) -> &mut Self {
        self.quirks = region.has_quirks();
        self
    }

    /// Write debugging and diagnostic information to `log` while the input is
    /// being encoded.
    #[inline]
    pub fn with_logging<L: Write>(&mut self, log: &'a mut L) -> &mut Self {
        self.log = Some(log as LogWtr);
        self
    }

    /// Start the encoding and write the compressed data out to `wtr`
    #[inline]
    pub fn encode_to_writer<W: Write>(&mut self, wtr: W) -> Result<(), CodecError> {
        do_encode(self, wtr)
    }

    /// Start the encoding and return the compressed data in a `Vec<u8>`.
    #[inline]
    pub fn encode_to_vec(&mut self) -> Result<Vec<u8>, CodecError> {
        let mut data = Vec::new();
        self.encode_to_writer(&mut data).map(|_| data)
    }
}

/// Compress `src` into a `Vec<u8>` with the fast compressor
///
/// This is a convenience function to encode data without having to
/// set up an [`EncoderBuilder`].
pub fn encode(src: &[u8]) -> Result<Vec<u8>, CodecError> {
    EncoderBuilder::for_bytes(src).encode_to_vec()
}

fn do_encode<W: Write>(opts: &mut EncoderBuilder<'_>, wtr: W) -> Result<(), CodecError> {
    let EncoderBuilder {
        src,
        compressor,
        twice,
        quirks,
        ref mut log,
    } = *opts;

    if !twice {
        let commands = run_compressor(src, compressor, quirks, log)?;
        return write_chunk(src, &commands, wtr);
    }

    let mut first = Vec::new();
    let commands = run_compressor(src, compressor, quirks, log)?;
    write_chunk(src, &commands, &mut first)?;

    let commands = run_compressor(&first, CompressorKind::Fast, quirks, log)?;
    write_chunk(&first, &commands, wtr)
}

fn run_compressor(
    src: &[u8],
    compressor: CompressorKind,
    quirks: bool,
    log: &mut Option<LogWtr>,
) -> Result<Vec<Command>, CodecError> {
    let commands = match compressor {
        CompressorKind::Fast => fast::compress(src, quirks),
        CompressorKind::Optimal => optimal::compress(src, quirks),
    };

    if let Some(wtr) = log.as_mut() {
        writeln!(wtr, "# {:?} compressor (quirks: {})", compressor, quirks)?;
        let mut position = 0;
        for command in &commands {
            writeln!(wtr, "{:04x} - {}", position, command)?;
            position += command.count();
        }
        let size = commands.iter().map(Command::encoded_len).sum::<usize>() + 1;
        writeln!(wtr, "Compressed {} bytes into {}", src.len(), size)?;
    }

    Ok(commands)
}

/// Write out `commands` followed by the terminator. `src` is the uncompressed
/// data the commands were built from.
fn write_chunk<W: Write>(src: &[u8], commands: &[Command], wtr: W) -> Result<(), CodecError> {
    let mut out = BitWriter::endian(wtr, BigEndian);

    for command in commands {
        command.write(src, &mut out)?;
    }
    out.write(8, TERMINATOR)?;
    out.byte_align()?;

    Ok(())
}
