use super::{
    chunk::{ChunkNodeCollection, NodeId},
    dictionary::ByteDictionary,
    pattern::{BackRef, LiteralBreaks, Pattern},
};
use crate::format::{command_size, Command, NORMAL_COMMAND_MAX};
use smallvec::SmallVec;

/// Zero, one or two sizes of the same command
type Variants = SmallVec<[Command; 2]>;

/// Find the smallest encoding of `buf` that the modelled commands allow.
///
/// Every offset reachable from the start is expanded with all of its candidate
/// commands; the collection keeps only the cheapest path into each offset and
/// re-expands an offset whenever its path improves.
///
/// `CopyAbsoluteXor` is not part of the search.
pub(crate) fn compress(buf: &[u8], quirks: bool) -> Vec<Command> {
    let dict = ByteDictionary::new(buf);
    let breaks = LiteralBreaks::new(buf, &dict);
    let mut nodes = ChunkNodeCollection::new(buf.len());

    while nodes.has_pending() {
        if !nodes.is_next_node_optimal() {
            continue;
        }
        let (offset, id) = match nodes.next_node() {
            Some(next) => next,
            None => break,
        };
        if offset == buf.len() {
            continue;
        }

        expand(buf, &dict, &breaks, quirks, &mut nodes, offset, id);
    }

    nodes.commands_to(buf.len())
}

fn expand(
    buf: &[u8],
    dict: &ByteDictionary,
    breaks: &LiteralBreaks,
    quirks: bool,
    nodes: &mut ChunkNodeCollection,
    offset: usize,
    id: NodeId,
) {
    let ranges = dict.max_back_ranges(offset);
    let back_refs = [
        ranges.relative,
        ranges.relative_super,
        ranges.absolute,
        ranges.absolute_super,
    ];

    let candidates = back_refs
        .iter()
        .filter(|range| !range.is_empty())
        .map(|&range| {
            let back = BackRef::new(offset, range);
            back.command(command_size(range.len(), quirks))
        })
        .chain(pattern_variants(buf, breaks, quirks, offset));

    for command in candidates {
        nodes.add(offset + command.count(), id, command);
    }
}

/// The fill or literal command for `offset`, in its normal size and, when the
/// run is long enough, its super size.
fn pattern_variants(buf: &[u8], breaks: &LiteralBreaks, quirks: bool, offset: usize) -> Variants {
    let pattern = Pattern::at(buf, offset);
    let len = match pattern {
        Pattern::Literal => breaks.literal_end(offset) - offset,
        _ => pattern.run_len(buf, offset),
    };

    let mut variants = Variants::new();
    variants.push(pattern.command(buf, offset, len.min(NORMAL_COMMAND_MAX)));
    if len > NORMAL_COMMAND_MAX {
        variants.push(pattern.command(buf, offset, command_size(len, quirks)));
    }

    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Range;

    fn encoded_len(commands: &[Command]) -> usize {
        commands.iter().map(Command::encoded_len).sum::<usize>() + 1
    }

    #[test]
    fn empty_input() {
        assert!(compress(&[], false).is_empty());
    }

    #[test]
    fn covers_input() {
        let buf = b"ABCDEFGH-ABCD-ABCDEFGH-xxxxxxxx-ABAB";
        let commands = compress(buf, false);
        assert_eq!(commands.iter().map(Command::count).sum::<usize>(), buf.len());

        let mut offset = 0;
        for command in &commands {
            if let Command::Literal(range) = command {
                assert_eq!(range.start(), offset);
            }
            offset += command.count();
        }
    }

    #[test]
    fn no_worse_than_greedy() {
        let mut buf = vec![1, 1, 1];
        buf.extend_from_slice(&[1, 2, 3, 9, 8, 7, 6]);
        buf.extend_from_slice(&[1, 1, 2, 3, 9, 8, 7, 6]);

        let optimal = compress(&buf, false);
        let fast = super::super::fast::compress(&buf, false);
        assert!(encoded_len(&optimal) <= encoded_len(&fast));
    }

    #[test]
    fn literal_range_starts_at_offset() {
        let buf = b"qwertyuiop";
        assert_eq!(compress(buf, false), vec![Command::Literal(Range::new(0, 10))]);
    }
}
