//! Detection of the runs that the fill commands (1, 2, 3) can encode, and
//! of where a literal run should end. Both compressors share these rules.

use super::dictionary::{ByteDictionary, MAX_RELATIVE_DISTANCE};
use crate::format::{Command, Range, SUPER_COMMAND_MAX};

/// Which non-copy command fits the bytes at an offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pattern {
    RepeatByte,
    RepeatWord,
    IncByte,
    Literal,
}

impl Pattern {
    /// Classify the bytes at `i`, in priority order
    pub(crate) fn at(buf: &[u8], i: usize) -> Self {
        let next = buf.get(i + 1).copied();
        let cur = buf[i];

        if next == Some(cur) {
            Self::RepeatByte
        } else if buf.get(i + 2).copied() == Some(cur) {
            Self::RepeatWord
        } else if next == Some(cur.wrapping_add(1)) {
            Self::IncByte
        } else {
            Self::Literal
        }
    }

    /// How many bytes from `i` follow this pattern, up to `SUPER_COMMAND_MAX`.
    /// Always zero for `Literal`, as its end depends on the other patterns.
    pub(crate) fn run_len(self, buf: &[u8], i: usize) -> usize {
        let ahead = &buf[i..buf.len().min(i + SUPER_COMMAND_MAX)];
        let first = ahead[0];

        match self {
            Self::RepeatByte => ahead.iter().take_while(|&&b| b == first).count(),
            Self::RepeatWord => {
                let word = [first, ahead.get(1).copied().unwrap_or(first)];
                ahead
                    .iter()
                    .enumerate()
                    .take_while(|&(n, &b)| b == word[n % 2])
                    .count()
            }
            Self::IncByte => ahead
                .iter()
                .enumerate()
                .take_while(|&(n, &b)| b == first.wrapping_add(n as u8))
                .count(),
            Self::Literal => 0,
        }
    }

    /// Build the command that writes `count` bytes of this pattern from `i`
    pub(crate) fn command(self, buf: &[u8], i: usize, count: usize) -> Command {
        match self {
            Self::RepeatByte => Command::RepeatByte {
                count,
                value: buf[i],
            },
            Self::RepeatWord => Command::RepeatWord {
                count,
                values: [buf[i], buf[i + 1]],
            },
            Self::IncByte => Command::IncByte {
                count,
                value: buf[i],
            },
            Self::Literal => Command::Literal(Range::with_len(i, count)),
        }
    }
}

/// A back reference from `offset` to the earlier `range` of the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BackRef {
    pub offset: usize,
    pub range: Range,
}

impl BackRef {
    pub(crate) fn new(offset: usize, range: Range) -> Self {
        Self { offset, range }
    }

    #[inline]
    pub(crate) fn distance(&self) -> usize {
        self.offset - self.range.start()
    }

    #[inline]
    pub(crate) fn is_relative(&self) -> bool {
        self.distance() <= MAX_RELATIVE_DISTANCE
    }

    /// Long enough to be worth breaking a literal run for
    pub(crate) fn qualifies(&self) -> bool {
        if self.is_relative() {
            self.range.len() > 3
        } else {
            self.range.len() > 4
        }
    }

    /// Build the back reference command that copies `count` bytes
    pub(crate) fn command(&self, count: usize) -> Command {
        if self.is_relative() {
            Command::CopyRelative {
                count,
                distance: self.distance() as u8,
            }
        } else {
            Command::CopyAbsolute {
                count,
                address: self.range.start() as u16,
            }
        }
    }
}

/// Where literal runs have to stop, for every offset of a buffer.
///
/// A literal run stops before the first offset where a fill command or a long
/// enough back reference would start. Each offset is checked once, so both
/// compressors can look up the end of a literal run from any offset.
#[derive(Debug)]
pub(crate) struct LiteralBreaks {
    /// first breaking offset at or after each offset; the last entry is the buffer length
    next: Vec<usize>,
}

impl LiteralBreaks {
    pub(crate) fn new(buf: &[u8], dict: &ByteDictionary) -> Self {
        let mut next = vec![buf.len(); buf.len() + 1];
        for i in (0..buf.len()).rev() {
            next[i] = if breaks_literal(buf, dict, i) {
                i
            } else {
                next[i + 1]
            };
        }

        Self { next }
    }

    /// End of a literal run that starts at `start`, which is always at least
    /// one byte long and never longer than `SUPER_COMMAND_MAX`
    pub(crate) fn literal_end(&self, start: usize) -> usize {
        let len = self.next.len() - 1;
        self.next[start + 1].min(start + SUPER_COMMAND_MAX).min(len)
    }
}

fn breaks_literal(buf: &[u8], dict: &ByteDictionary, i: usize) -> bool {
    // no run needs more than 4 bytes to qualify
    let near = &buf[..buf.len().min(i + 4)];
    let pattern = Pattern::at(buf, i);
    let fill = match pattern {
        Pattern::RepeatByte | Pattern::IncByte => pattern.run_len(near, i) >= 3,
        Pattern::RepeatWord => pattern.run_len(near, i) >= 4,
        Pattern::Literal => false,
    };

    fill || BackRef::new(i, dict.max_back_range(i)).qualifies()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify() {
        assert_eq!(Pattern::at(b"aab", 0), Pattern::RepeatByte);
        assert_eq!(Pattern::at(b"aba", 0), Pattern::RepeatWord);
        assert_eq!(Pattern::at(b"abc", 0), Pattern::IncByte);
        assert_eq!(Pattern::at(b"acb", 0), Pattern::Literal);
        assert_eq!(Pattern::at(b"a", 0), Pattern::Literal);
    }

    #[test]
    fn run_lengths() {
        assert_eq!(Pattern::RepeatByte.run_len(b"xxxxy", 0), 4);
        assert_eq!(Pattern::RepeatWord.run_len(b"xyxyxz", 0), 5);
        assert_eq!(Pattern::IncByte.run_len(&[0xFE, 0xFF, 0x00, 0x01, 0x07], 0), 4);
        assert_eq!(Pattern::RepeatByte.run_len(&[0; 2000], 0), SUPER_COMMAND_MAX);
    }

    #[test]
    fn literal_stops_before_fill() {
        let buf = b"qwzrtttttp";
        let dict = ByteDictionary::new(buf);
        let breaks = LiteralBreaks::new(buf, &dict);
        assert_eq!(breaks.literal_end(0), 4);
        assert_eq!(breaks.literal_end(1), 4);
        assert_eq!(breaks.literal_end(9), 10);
    }

    #[test]
    fn literal_stops_before_back_ref() {
        let buf = b"qwertyuiop-qwert";
        let dict = ByteDictionary::new(buf);
        assert_eq!(LiteralBreaks::new(buf, &dict).literal_end(0), 11);
    }

    #[test]
    fn table_matches_scan() {
        let buf: Vec<u8> = (0..3000u32).map(|i| (i * 97 % 256) as u8).collect();
        let dict = ByteDictionary::new(&buf);
        let breaks = LiteralBreaks::new(&buf, &dict);

        let mut naive = 1;
        while naive < SUPER_COMMAND_MAX && !breaks_literal(&buf, &dict, naive) {
            naive += 1;
        }
        assert_eq!(breaks.literal_end(0), naive);
        assert!(breaks.literal_end(0) <= SUPER_COMMAND_MAX);
    }
}
