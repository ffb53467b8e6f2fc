use crate::format::{Range, NORMAL_COMMAND_MAX, SUPER_COMMAND_MAX};

/// Largest distance that fits in a `CopyRelative` operand
pub(crate) const MAX_RELATIVE_DISTANCE: usize = 0xFF;
/// Largest address that fits in a `CopyAbsolute` operand
const MAX_ABSOLUTE_ADDRESS: usize = 0xFFFF;

/// Index of every offset in a buffer, grouped by the byte at that offset.
///
/// Used to find back references: earlier runs of the buffer that are equal
/// to the bytes starting at some offset.
#[derive(Debug)]
pub(crate) struct ByteDictionary<'a> {
    buf: &'a [u8],
    /// offsets of each byte value, in ascending order
    offsets: Vec<Vec<usize>>,
}

/// The best back references from one offset, split by how they can be encoded.
/// An empty range means there is no useful candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct BackRanges {
    pub relative: Range,
    pub relative_super: Range,
    pub absolute: Range,
    pub absolute_super: Range,
}

impl<'a> ByteDictionary<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        let mut offsets = vec![Vec::new(); 256];
        for (i, &byte) in buf.iter().enumerate() {
            offsets[byte as usize].push(i);
        }

        Self { buf, offsets }
    }

    /// Earlier offsets that hold the same byte as `offset` and can be encoded
    /// as a back reference from it, split into those within relative range and
    /// those that need an absolute address. Both are in ascending order.
    fn candidates(&self, offset: usize) -> (&[usize], &[usize]) {
        let list = &self.offsets[self.buf[offset] as usize];
        let before = list.partition_point(|&back| back < offset);
        let near = offset.saturating_sub(MAX_RELATIVE_DISTANCE);
        let near = list[..before].partition_point(|&back| back < near);
        let addressable = list[..near].partition_point(|&back| back <= MAX_ABSOLUTE_ADDRESS);

        (&list[near..before], &list[..addressable])
    }

    /// Number of bytes equal between `back..` and `offset..`, up to `max`.
    /// The two runs can overlap.
    fn match_len(&self, back: usize, offset: usize, max: usize) -> usize {
        self.buf[back..]
            .iter()
            .zip(&self.buf[offset..])
            .take(max)
            .take_while(|(b, o)| b == o)
            .count()
    }

    /// The longest match among `backs` clamped to a normal command, and the
    /// longest overall. Ties go to the closest source.
    fn longest(&self, backs: &[usize], offset: usize) -> (Range, Range) {
        let max = SUPER_COMMAND_MAX.min(self.buf.len() - offset);
        let mut normal = Range::default();
        let mut sup = Range::default();

        for &back in backs.iter().rev() {
            let len = self.match_len(back, offset, max);
            if len.min(NORMAL_COMMAND_MAX) > normal.len() {
                normal = Range::with_len(back, len.min(NORMAL_COMMAND_MAX));
            }
            if len > sup.len() {
                sup = Range::with_len(back, len);
            }
            // nothing further back can be longer or closer
            if len == max {
                break;
            }
        }

        (normal, sup)
    }

    /// The longest back reference for `offset`, up to `SUPER_COMMAND_MAX` long.
    /// Ties go to the closest source.
    pub(crate) fn max_back_range(&self, offset: usize) -> Range {
        let (relative, absolute) = self.candidates(offset);
        let (_, relative) = self.longest(relative, offset);
        let (_, absolute) = self.longest(absolute, offset);

        if absolute.len() > relative.len() {
            absolute
        } else {
            relative
        }
    }

    /// The longest back references for `offset` in each of the four encodings:
    /// relative or absolute, normal or super sized. Ties go to the closest source.
    ///
    /// A super range that is no longer than a normal command is dropped.
    pub(crate) fn max_back_ranges(&self, offset: usize) -> BackRanges {
        let (relative, absolute) = self.candidates(offset);
        let (relative, relative_super) = self.longest(relative, offset);
        let (absolute, absolute_super) = self.longest(absolute, offset);

        let drop_short = |sup: Range| {
            if sup.len() <= NORMAL_COMMAND_MAX {
                Range::default()
            } else {
                sup
            }
        };

        BackRanges {
            relative,
            relative_super: drop_short(relative_super),
            absolute,
            absolute_super: drop_short(absolute_super),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_match_wins() {
        let buf = b"ABCDxABCyABCDEz-ABCDE";
        let dict = ByteDictionary::new(buf);

        let best = dict.max_back_range(16);
        assert_eq!(best, Range::with_len(9, 5));
    }

    #[test]
    fn ties_prefer_closest() {
        let buf = b"ABC-ABC-ABC";
        let dict = ByteDictionary::new(buf);

        assert_eq!(dict.max_back_range(8), Range::with_len(4, 3));
    }

    #[test]
    fn overlapping_match() {
        let buf = b"abababababab";
        let dict = ByteDictionary::new(buf);

        assert_eq!(dict.max_back_range(2), Range::with_len(0, 10));
    }

    #[test]
    fn no_match() {
        let dict = ByteDictionary::new(b"abc");
        assert!(dict.max_back_range(2).is_empty());
    }

    #[test]
    fn ranges_split_by_distance() {
        // a 40 byte pattern far back, and a 6 byte copy of it nearby
        let pattern: Vec<u8> = (0..40).collect();
        let mut buf = pattern.clone();
        buf.extend(std::iter::repeat(0xEE).take(300));
        buf.extend_from_slice(&pattern[..6]);
        buf.extend(std::iter::repeat(0xDD).take(10));
        let offset = buf.len();
        buf.extend_from_slice(&pattern);

        let dict = ByteDictionary::new(&buf);
        let ranges = dict.max_back_ranges(offset);

        assert_eq!(ranges.relative, Range::with_len(340, 6));
        assert!(ranges.relative_super.is_empty());
        assert_eq!(ranges.absolute, Range::with_len(0, 32));
        assert_eq!(ranges.absolute_super, Range::with_len(0, 40));
    }

    #[test]
    fn long_run_matches_closest() {
        let buf = vec![0u8; 0x4000];
        let dict = ByteDictionary::new(&buf);

        assert_eq!(dict.max_back_range(0x2000), Range::with_len(0x1FFF, SUPER_COMMAND_MAX));
        assert_eq!(dict.max_back_range(0x3FF0), Range::with_len(0x3FEF, 0x10));

        let ranges = dict.max_back_ranges(0x2000);
        assert_eq!(ranges.relative, Range::with_len(0x1FFF, NORMAL_COMMAND_MAX));
        assert_eq!(ranges.relative_super, Range::with_len(0x1FFF, SUPER_COMMAND_MAX));
        assert_eq!(ranges.absolute, Range::with_len(0x1F00, NORMAL_COMMAND_MAX));
        assert_eq!(ranges.absolute_super, Range::with_len(0x1F00, SUPER_COMMAND_MAX));
    }

    #[test]
    fn sources_past_absolute_range_are_skipped() {
        let filler = |n: u32| (0..n).map(|i| (i % 251) as u8 | 1);
        let mut buf = vec![0xAA; 4];
        buf.extend(filler(0x1000C));
        buf.extend_from_slice(&[0xAA; 4]);
        buf.extend(filler(0x200));
        let offset = buf.len();
        buf.extend_from_slice(&[0xAA; 4]);

        let dict = ByteDictionary::new(&buf);
        let ranges = dict.max_back_ranges(offset);
        assert_eq!(ranges.absolute, Range::with_len(0, 4));
        assert!(ranges.relative.is_empty());
        assert_eq!(dict.max_back_range(offset), Range::with_len(0, 4));
    }
}
