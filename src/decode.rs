use crate::errors::CodecError;
use crate::format::{CommandKind, Header, BUFFER_SIZE, TERMINATOR};
use std::io::Write;

type LogWtr<'a> = &'a mut dyn Write;

/// Summary of a compressed chunk, gathered without decompressing it
///
/// You can get a `ChunkInfo` with [`chunk_info`] or [`Decoder::info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    /// size of the chunk, terminator included
    pub compressed_size: usize,
    /// size of the data the chunk decompresses to
    pub decompressed_size: usize,
    /// number of commands of each kind, indexed by [`CommandKind::tag`]
    pub commands: [usize; 7],
}

impl ChunkInfo {
    pub fn command_count(&self, kind: CommandKind) -> usize {
        self.commands[kind.tag() as usize]
    }
}

/// Specify the decoding settings, such as logging, input, and output.
///
/// To create a new `Decoder`, use [`for_bytes()`]. Then, change any of the
/// decoder settings. Finally, decode the input data with [`decode()`].
/// ```
/// # use smk_codec::{Decoder, EncoderBuilder};
/// let original = b"ABBACABBACD";
/// let compressed = EncoderBuilder::for_bytes(original)
///     .encode_to_vec()
///     .unwrap();
/// let decompressed = Decoder::for_bytes(&compressed)
///     .decode()
///     .unwrap();
/// assert_eq!(&original[..], decompressed);
/// ```
/// A chunk stored inside a larger buffer, such as a ROM image, can be
/// located with [`offset()`], and measured with [`compressed_len()`]:
/// ```
/// # use smk_codec::{Decoder, EncoderBuilder};
/// # let compressed = EncoderBuilder::for_bytes(b"ABBACABBACD").encode_to_vec().unwrap();
/// let mut rom = vec![0u8; 16];
/// rom.extend_from_slice(&compressed);
/// let size = Decoder::for_bytes(&rom).offset(16).compressed_len().unwrap();
/// assert_eq!(size, compressed.len());
/// ```
/// [`for_bytes()`]: Decoder::for_bytes
/// [`decode()`]: Decoder::decode
/// [`offset()`]: Decoder::offset
/// [`compressed_len()`]: Decoder::compressed_len
pub struct Decoder<'a> {
    src: &'a [u8],
    offset: usize,
    length: Option<usize>,
    twice: bool,
    log: Option<LogWtr<'a>>,
}

impl<'a> Decoder<'a> {
    #[inline]
    pub fn for_bytes(bytes: &'a [u8]) -> Self {
        Self {
            src: bytes,
            offset: 0,
            length: None,
            twice: false,
            log: None,
        }
    }

    /// Start reading the chunk at `offset` in the input
    #[inline]
    pub fn offset(&mut self, offset: usize) -> &mut Self {
        self.offset = offset;
        self
    }

    /// Decode exactly `length` bytes instead of stopping at the terminator.
    ///
    /// In this mode invalid commands are skipped and reading out of bounds
    /// stops the decode; the output is zero padded up to `length`. Like any
    /// decode, the output is never longer than [`BUFFER_SIZE`].
    ///
    /// [`BUFFER_SIZE`]: crate::format::BUFFER_SIZE
    #[inline]
    pub fn length(&mut self, length: usize) -> &mut Self {
        self.length = Some(length);
        self
    }

    /// Decompress the output of the first pass a second time
    #[inline]
    pub fn twice(&mut self, twice: bool) -> &mut Self {
        self.twice = twice;
        self
    }

    #[inline]
    pub fn with_logging<W: Write>(&mut self, wtr: &'a mut W) -> &mut Self {
        self.log = Some(wtr as LogWtr);
        self
    }

    #[inline]
    pub fn decode(&mut self) -> Result<Vec<u8>, CodecError> {
        do_decode(self)
    }

    /// Size of the chunk at the current offset, terminator included
    #[inline]
    pub fn compressed_len(&self) -> Result<usize, CodecError> {
        scan_chunk(self.src, self.offset).map(|info| info.compressed_size)
    }

    /// Copy of the bytes of the chunk at the current offset
    pub fn compressed_chunk(&self) -> Result<Vec<u8>, CodecError> {
        let size = self.compressed_len()?;
        Ok(self.src[self.offset..self.offset + size].to_vec())
    }

    #[inline]
    pub fn info(&self) -> Result<ChunkInfo, CodecError> {
        scan_chunk(self.src, self.offset)
    }
}

/// Decompress the chunk at the start of `src` into a `Vec<u8>`
///
/// This is a convenience function to decode a chunk without
/// having to set up a [`Decoder`]
pub fn decode(src: &[u8]) -> Result<Vec<u8>, CodecError> {
    Decoder::for_bytes(src).decode()
}

/// Extract the [`ChunkInfo`] of the chunk at `offset` in `src`
///
/// This is a convenience function to inspect a chunk without having
/// to set up a [`Decoder`]
pub fn chunk_info(src: &[u8], offset: usize) -> Result<ChunkInfo, CodecError> {
    scan_chunk(src, offset)
}

fn do_decode(opt: &mut Decoder) -> Result<Vec<u8>, CodecError> {
    let Decoder {
        src,
        offset,
        length,
        twice,
        log,
    } = opt;

    let first = match *length {
        Some(length) => decode_fixed(src, *offset, length, log)?,
        None => decode_stream(src, *offset, log)?,
    };

    if *twice {
        if let Some(wtr) = log.as_mut() {
            writeln!(wtr, "# Second pass")?;
        }
        decode_stream(&first, 0, log)
    } else {
        Ok(first)
    }
}

/// Tried to read outside of the source or destination buffer
#[derive(Debug, Clone, Copy)]
struct OutOfBounds;

/// Output side of a decode: a pre-zeroed buffer of a fixed capacity, of which
/// `out.len()` bytes have been written
struct Machine<'s> {
    src: &'s [u8],
    csr: usize,
    out: Vec<u8>,
    capacity: usize,
}

impl<'s> Machine<'s> {
    fn new(src: &'s [u8], offset: usize, capacity: usize) -> Self {
        Self {
            src,
            csr: offset,
            out: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn next_byte(&mut self) -> Result<u8, OutOfBounds> {
        let byte = *self.src.get(self.csr).ok_or(OutOfBounds)?;
        self.csr += 1;
        Ok(byte)
    }

    fn read_header(&mut self) -> Result<Header, OutOfBounds> {
        let rest = self.src.get(self.csr..).ok_or(OutOfBounds)?;
        let header = Header::read(rest).map_err(|_| OutOfBounds)?;
        self.csr += header.len;
        Ok(header)
    }

    /// Read back an already decoded byte; unwritten bytes are still zero
    fn peek_output(&self, addr: usize) -> Result<u8, OutOfBounds> {
        if addr >= self.capacity {
            return Err(OutOfBounds);
        }
        Ok(self.out.get(addr).copied().unwrap_or(0))
    }

    fn push(&mut self, byte: u8) -> Result<(), OutOfBounds> {
        if self.out.len() >= self.capacity {
            return Err(OutOfBounds);
        }
        self.out.push(byte);
        Ok(())
    }

    fn run(&mut self, kind: CommandKind, count: usize) -> Result<(), OutOfBounds> {
        match kind {
            CommandKind::Literal => {
                for _ in 0..count {
                    let byte = self.next_byte()?;
                    self.push(byte)?;
                }
            }
            CommandKind::RepeatByte => {
                let byte = self.next_byte()?;
                for _ in 0..count {
                    self.push(byte)?;
                }
            }
            CommandKind::RepeatWord => {
                let word = [self.next_byte()?, self.next_byte()?];
                for i in 0..count {
                    self.push(word[i % 2])?;
                }
            }
            CommandKind::IncByte => {
                let byte = self.next_byte()?;
                for i in 0..count {
                    self.push(byte.wrapping_add(i as u8))?;
                }
            }
            CommandKind::CopyAbsolute | CommandKind::CopyAbsoluteXor => {
                let addr = u16::from_le_bytes([self.next_byte()?, self.next_byte()?]) as usize;
                self.copy(addr, count, kind.xor_mask())?;
            }
            CommandKind::CopyRelative => {
                let distance = self.next_byte()? as usize;
                let start = self.out.len().checked_sub(distance).ok_or(OutOfBounds)?;
                self.copy(start, count, 0)?;
            }
        }

        Ok(())
    }

    fn copy(&mut self, start: usize, count: usize, mask: u8) -> Result<(), OutOfBounds> {
        for addr in start..start + count {
            let byte = self.peek_output(addr)?;
            self.push(byte ^ mask)?;
        }
        Ok(())
    }
}

/// Decode until the terminator. A read out of bounds in the middle of a command
/// fills the rest of that command with `0 ^ mask` and ends the decode.
fn decode_stream(
    src: &[u8],
    offset: usize,
    log: &mut Option<LogWtr>,
) -> Result<Vec<u8>, CodecError> {
    let mut m = Machine::new(src, offset, BUFFER_SIZE);

    loop {
        match m.src.get(m.csr) {
            Some(&TERMINATOR) => break,
            Some(_) => {}
            None => {
                if let Some(wtr) = log.as_mut() {
                    writeln!(wtr, "{:04x} - Missing terminator", m.out.len())?;
                }
                break;
            }
        }

        let header_csr = m.csr;
        let header = match m.read_header() {
            Ok(header) => header,
            Err(OutOfBounds) => break,
        };
        let kind = CommandKind::from_tag(header.tag).ok_or(CodecError::InvalidCommand {
            tag: header.tag,
            offset: header_csr,
        })?;

        let start = m.out.len();
        if let Some(wtr) = log.as_mut() {
            writeln!(wtr, "{:04x} - {} x{} @ {:04x}", start, kind, header.count, header_csr)?;
        }

        if m.run(kind, header.count).is_err() {
            let end = (start + header.count).min(m.capacity);
            let fill = kind.xor_mask();

            if let Some(wtr) = log.as_mut() {
                writeln!(
                    wtr,
                    "{:04x} - Out of bounds; filling to {:04x} with {:02x}",
                    m.out.len(),
                    end,
                    fill
                )?;
            }

            if end > m.out.len() {
                m.out.resize(end, fill);
            }
            break;
        }
    }

    Ok(m.out)
}

/// Decode exactly `length` bytes, or `BUFFER_SIZE` if that is smaller.
/// Invalid commands are skipped, and any read out of bounds ends the decode.
fn decode_fixed(
    src: &[u8],
    offset: usize,
    length: usize,
    log: &mut Option<LogWtr>,
) -> Result<Vec<u8>, CodecError> {
    let length = length.min(BUFFER_SIZE);
    let mut m = Machine::new(src, offset, length);

    while m.out.len() < length {
        let header_csr = m.csr;
        let header = match m.read_header() {
            Ok(header) => header,
            Err(OutOfBounds) => break,
        };

        let kind = match CommandKind::from_tag(header.tag) {
            Some(kind) => kind,
            None => {
                if let Some(wtr) = log.as_mut() {
                    writeln!(wtr, "Skipping invalid command {} @ {:04x}", header.tag, header_csr)?;
                }
                continue;
            }
        };

        if let Some(wtr) = log.as_mut() {
            writeln!(wtr, "{:04x} - {} x{} @ {:04x}", m.out.len(), kind, header.count, header_csr)?;
        }

        if m.run(kind, header.count).is_err() {
            break;
        }
    }

    let mut out = m.out;
    out.resize(length, 0);
    Ok(out)
}

/// Walk the chunk at `offset` without producing output. Unlike decoding,
/// this does not tolerate bad data.
fn scan_chunk(src: &[u8], offset: usize) -> Result<ChunkInfo, CodecError> {
    let mut csr = offset;
    let mut decompressed_size = 0;
    let mut commands = [0; 7];

    loop {
        match src.get(csr) {
            Some(&TERMINATOR) => break,
            Some(_) => {}
            None => return Err(CodecError::UnexpectedEnd { offset: csr }),
        }

        let header = Header::read(&src[csr..]).map_err(|_| CodecError::UnexpectedEnd { offset: csr })?;
        let kind = CommandKind::from_tag(header.tag).ok_or(CodecError::InvalidCommand {
            tag: header.tag,
            offset: csr,
        })?;

        csr += header.len + kind.operand_len(header.count);
        decompressed_size += header.count;
        commands[kind.tag() as usize] += 1;
    }

    Ok(ChunkInfo {
        compressed_size: csr + 1 - offset,
        decompressed_size,
        commands,
    })
}
