use super::{
    dictionary::ByteDictionary,
    pattern::{BackRef, LiteralBreaks, Pattern},
};
use crate::format::{command_size, Command};

/// Greedily pick one command per position of `buf`.
///
/// At every offset, the fill command that matches the local bytes is weighed
/// against the longest back reference. Back references win ties.
pub(crate) fn compress(buf: &[u8], quirks: bool) -> Vec<Command> {
    let dict = ByteDictionary::new(buf);
    let breaks = LiteralBreaks::new(buf, &dict);
    let mut commands = Vec::new();
    let mut i = 0;

    while i < buf.len() {
        let back = BackRef::new(i, dict.max_back_range(i));
        let back_len = command_size(back.range.len(), quirks);

        let command = match Pattern::at(buf, i) {
            Pattern::Literal if back.qualifies() => back.command(back_len),
            Pattern::Literal => {
                let len = breaks.literal_end(i) - i;
                Pattern::Literal.command(buf, i, command_size(len, quirks))
            }
            pattern => {
                let run = command_size(pattern.run_len(buf, i), quirks);
                if back_beats_run(&back, back_len, run) {
                    back.command(back_len)
                } else {
                    pattern.command(buf, i, run)
                }
            }
        };

        i += command.count();
        commands.push(command);
    }

    commands
}

/// A relative copy costs no more than a fill command, while an absolute copy
/// costs one extra operand byte; shift the copy's length to account for that.
fn back_beats_run(back: &BackRef, back_len: usize, run: usize) -> bool {
    if back_len == 0 {
        return false;
    }

    let adjusted = if back.is_relative() {
        back_len + 1
    } else {
        back_len - 1
    };

    adjusted > run
}
