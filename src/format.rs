//! Information and structures for compressed chunks.
//!
//! A compressed chunk is a list of commands followed by a single `0xFF`
//! terminator byte. Every command starts with a header that packs the command
//! number and the number of bytes it writes to the output (its count).
//!
//! ## Command Headers
//! Counts are always stored as `count - 1`.
//!
//! A "normal" command writes 1 to 32 bytes and has a one byte header:
//! ```text
//! ┌ command
//! |   ┌ count - 1
//! 000 00000
//! ```
//! A "super" command writes 1 to 1024 bytes and has a two byte header.
//! The top three bits are all set, which escapes the normal header format:
//! ```text
//! ┌ escape
//! |   ┌ command
//! |   |   ┌ count - 1
//! 111 000 00 00000000
//! ```
//! A full `0xFF` header byte is never a command; it ends the chunk.
//!
//! ## Commands
//! After the header come the command's operand bytes, if it has any.
//!
//! | Num | Command            | Operand                   | Output |
//! | :-: | ------------------ | ------------------------- | ------ |
//! | 0   | Literal            | `count` raw bytes         | the raw bytes |
//! | 1   | Repeat Byte        | 1 byte                    | the byte, `count` times |
//! | 2   | Repeat Word        | 2 bytes                   | both bytes alternated for `count` bytes |
//! | 3   | Increment Byte     | 1 byte                    | the byte plus its position (mod 256) |
//! | 4   | Copy Absolute      | 2 byte little endian addr | `count` bytes from output address `addr` |
//! | 5   | Copy Absolute Xor  | 2 byte little endian addr | as 4, with each byte xor'd with `0xFF` |
//! | 6   | Copy Relative      | 1 byte distance           | `count` bytes from `distance` bytes back |
//!
//! Back reference commands (4, 5, 6) copy byte by byte, so a source range
//! may overlap the bytes being written.
//!
//! ## An Example
//! The string "QAZQAZQAZQAZ" can be compressed as:
//! ```text
//! 02 51 41 5A <- literal of 3 bytes: "QAZ"
//! C8 03       <- copy relative: 9 bytes starting 3 bytes back
//! FF          <- terminator
//! ```
//!
//! ## Region Quirks
//! The decompression routine of the non-US versions of the game fails on
//! super commands whose count is a multiple of 256. When encoding for those
//! ROMs, such counts are reduced by one. See [`validated_super_command_size`].

use bitstream_io::{BigEndian, BitReader, BitWriter, BE};
use std::fmt;
use std::io::{self, Write};

/// Maximum size of a single decompressed chunk
pub const BUFFER_SIZE: usize = 0x20000;
/// Maximum count of a command with a one byte header
pub const NORMAL_COMMAND_MAX: usize = 32;
/// Maximum count of a command with a two byte header
pub const SUPER_COMMAND_MAX: usize = 1024;
/// The byte that ends a compressed chunk
pub const TERMINATOR: u8 = 0xFF;

const ESCAPE_TAG: u8 = 0b111;

/// Adjust a super command `size` for the region quirks.
///
/// When `quirks` is set, sizes that are an exact multiple of 256 are decremented
/// by one; every other size is returned as is.
/// ```
/// # use smk_codec::validated_super_command_size;
/// assert_eq!(validated_super_command_size(256, false), 256);
/// assert_eq!(validated_super_command_size(256, true), 255);
/// assert_eq!(validated_super_command_size(300, true), 300);
/// ```
pub const fn validated_super_command_size(size: usize, quirks: bool) -> usize {
    if quirks && size % 256 == 0 {
        size - 1
    } else {
        size
    }
}

/// Clamp a candidate count `len` to something a single command can encode
pub(crate) fn command_size(len: usize, quirks: bool) -> usize {
    if len <= NORMAL_COMMAND_MAX {
        len
    } else {
        validated_super_command_size(len.min(SUPER_COMMAND_MAX), quirks)
    }
}

/// A half-open range of buffer offsets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Range {
    start: usize,
    end: usize,
}

impl Range {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[inline]
    pub const fn with_len(start: usize, len: usize) -> Self {
        Self {
            start,
            end: start + len,
        }
    }

    #[inline]
    pub const fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub const fn end(&self) -> usize {
        self.end
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Shorten the range so that it is at most `max` long
    #[inline]
    pub fn clamp_len(self, max: usize) -> Self {
        Self::with_len(self.start, self.len().min(max))
    }
}

/// The seven command types of the format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Literal = 0,
    RepeatByte = 1,
    RepeatWord = 2,
    IncByte = 3,
    CopyAbsolute = 4,
    CopyAbsoluteXor = 5,
    CopyRelative = 6,
}

impl CommandKind {
    pub const ALL: [CommandKind; 7] = [
        Self::Literal,
        Self::RepeatByte,
        Self::RepeatWord,
        Self::IncByte,
        Self::CopyAbsolute,
        Self::CopyAbsoluteXor,
        Self::CopyRelative,
    ];

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    #[inline]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Number of operand bytes that follow the header for a command writing `count` bytes
    pub const fn operand_len(self, count: usize) -> usize {
        match self {
            Self::Literal => count,
            Self::RepeatByte | Self::IncByte | Self::CopyRelative => 1,
            Self::RepeatWord | Self::CopyAbsolute | Self::CopyAbsoluteXor => 2,
        }
    }

    /// Value xor'd onto every byte this command copies
    pub(crate) const fn xor_mask(self) -> u8 {
        match self {
            Self::CopyAbsoluteXor => 0xFF,
            _ => 0x00,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Literal => "Literal",
            Self::RepeatByte => "Repeat Byte",
            Self::RepeatWord => "Repeat Word",
            Self::IncByte => "Increment Byte",
            Self::CopyAbsolute => "Copy Absolute",
            Self::CopyAbsoluteXor => "Copy Absolute Xor",
            Self::CopyRelative => "Copy Relative",
        };
        write!(f, "{}", name)
    }
}

/// Size of the header for a command writing `count` bytes
#[inline]
pub(crate) const fn header_len(count: usize) -> usize {
    if count <= NORMAL_COMMAND_MAX {
        1
    } else {
        2
    }
}

/// A decoded command header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    pub tag: u8,
    pub count: usize,
    /// bytes taken by the header in the stream
    pub len: usize,
}

impl Header {
    /// Parse the header at the start of `src`.
    ///
    /// Fails with `UnexpectedEof` if `src` is too short for the header.
    /// The terminator must be checked by the caller before this is called.
    pub(crate) fn read(src: &[u8]) -> io::Result<Self> {
        let mut bits = BitReader::endian(src, BigEndian);
        let tag: u8 = bits.read(3)?;

        if tag == ESCAPE_TAG {
            let tag: u8 = bits.read(3)?;
            let count: u16 = bits.read(10)?;
            Ok(Self {
                tag,
                count: count as usize + 1,
                len: 2,
            })
        } else {
            let count: u8 = bits.read(5)?;
            Ok(Self {
                tag,
                count: count as usize + 1,
                len: 1,
            })
        }
    }

    fn write<W: Write>(kind: CommandKind, count: usize, wtr: &mut BitWriter<W, BE>) -> io::Result<()> {
        let stored = count - 1;
        if count <= NORMAL_COMMAND_MAX {
            wtr.write(3, kind.tag())?;
            wtr.write(5, stored as u8)
        } else {
            wtr.write(3, ESCAPE_TAG)?;
            wtr.write(3, kind.tag())?;
            wtr.write(10, stored as u16)
        }
    }
}

/// One command of a compressed chunk, with its operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// copy the bytes of this range of the uncompressed input
    Literal(Range),
    RepeatByte { count: usize, value: u8 },
    RepeatWord { count: usize, values: [u8; 2] },
    IncByte { count: usize, value: u8 },
    CopyAbsolute { count: usize, address: u16 },
    CopyAbsoluteXor { count: usize, address: u16 },
    CopyRelative { count: usize, distance: u8 },
}

impl Command {
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::Literal(..) => CommandKind::Literal,
            Self::RepeatByte { .. } => CommandKind::RepeatByte,
            Self::RepeatWord { .. } => CommandKind::RepeatWord,
            Self::IncByte { .. } => CommandKind::IncByte,
            Self::CopyAbsolute { .. } => CommandKind::CopyAbsolute,
            Self::CopyAbsoluteXor { .. } => CommandKind::CopyAbsoluteXor,
            Self::CopyRelative { .. } => CommandKind::CopyRelative,
        }
    }

    /// Number of uncompressed bytes this command produces
    pub const fn count(&self) -> usize {
        match *self {
            Self::Literal(range) => range.len(),
            Self::RepeatByte { count, .. }
            | Self::RepeatWord { count, .. }
            | Self::IncByte { count, .. }
            | Self::CopyAbsolute { count, .. }
            | Self::CopyAbsoluteXor { count, .. }
            | Self::CopyRelative { count, .. } => count,
        }
    }

    /// Number of bytes this command takes in a compressed chunk
    pub const fn encoded_len(&self) -> usize {
        let count = self.count();
        header_len(count) + self.kind().operand_len(count)
    }

    /// Write the header and operands of `self`. A `Literal` takes its bytes from `src`.
    pub(crate) fn write<W: Write>(&self, src: &[u8], wtr: &mut BitWriter<W, BE>) -> io::Result<()> {
        Header::write(self.kind(), self.count(), wtr)?;

        match *self {
            Self::Literal(range) => wtr.write_bytes(&src[range.start()..range.end()]),
            Self::RepeatByte { value, .. } | Self::IncByte { value, .. } => wtr.write(8, value),
            Self::RepeatWord { values, .. } => wtr.write_bytes(&values),
            Self::CopyAbsolute { address, .. } | Self::CopyAbsoluteXor { address, .. } => {
                wtr.write_bytes(&address.to_le_bytes())
            }
            Self::CopyRelative { distance, .. } => wtr.write(8, distance),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} x{}", self.kind(), self.count())?;
        match self {
            Self::Literal(range) => write!(f, " [{:04x}..{:04x}]", range.start(), range.end()),
            Self::RepeatByte { value, .. } | Self::IncByte { value, .. } => {
                write!(f, " {:02x}", value)
            }
            Self::RepeatWord { values, .. } => write!(f, " {:02x?}", values),
            Self::CopyAbsolute { address, .. } | Self::CopyAbsoluteXor { address, .. } => {
                write!(f, " from {:04x}", address)
            }
            Self::CopyRelative { distance, .. } => write!(f, " from -{}", distance),
        }
    }
}
