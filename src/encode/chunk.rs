use crate::format::Command;
use slice_deque::SliceDeque;
use smallvec::SmallVec;

/// Index of a `ChunkNode` in a `ChunkNodeCollection`
pub(crate) type NodeId = usize;

const ROOT: NodeId = 0;

/// One command applied on top of the path that leads to its parent.
#[derive(Debug)]
pub(crate) struct ChunkNode {
    parent: Option<NodeId>,
    /// `None` only for the root
    command: Option<Command>,
    /// compressed size of the whole path up to and including this node
    size: usize,
    /// cleared once a cheaper path replaces this node or one of its ancestors
    optimal: bool,
    processed: bool,
    children: SmallVec<[NodeId; 6]>,
}

impl ChunkNode {
    fn root() -> Self {
        Self {
            parent: None,
            command: None,
            size: 0,
            optimal: true,
            processed: false,
            children: SmallVec::new(),
        }
    }

    fn new(parent: NodeId, parent_size: usize, command: Command) -> Self {
        Self {
            parent: Some(parent),
            command: Some(command),
            size: parent_size + command.encoded_len(),
            optimal: true,
            processed: false,
            children: SmallVec::new(),
        }
    }
}

/// The cheapest known path to every offset of the input, and the queue of
/// offsets whose outgoing commands still need to be explored.
///
/// Nodes are never removed. Replacing a node marks it and everything built on
/// top of it as non-optimal, which keeps the stale subtree from being explored.
#[derive(Debug)]
pub(crate) struct ChunkNodeCollection {
    nodes: Vec<ChunkNode>,
    /// best node reaching each offset
    by_offset: Vec<Option<NodeId>>,
    queue: SliceDeque<usize>,
}

impl ChunkNodeCollection {
    /// Create a collection for an input of `len` bytes, with the root at offset 0
    pub(crate) fn new(len: usize) -> Self {
        let mut by_offset = vec![None; len + 1];
        by_offset[0] = Some(ROOT);
        let mut queue = SliceDeque::new();
        queue.push_back(0);

        Self {
            nodes: vec![ChunkNode::root()],
            by_offset,
            queue,
        }
    }

    #[inline]
    pub(crate) fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Offer the path `parent` + `command`, which ends at `offset`.
    ///
    /// It is kept only if it is strictly cheaper than the current best path
    /// to `offset`. Returns whether it was kept.
    pub(crate) fn add(&mut self, offset: usize, parent: NodeId, command: Command) -> bool {
        let node = ChunkNode::new(parent, self.nodes[parent].size, command);

        if let Some(old) = self.by_offset[offset] {
            if node.size >= self.nodes[old].size {
                return false;
            }
            self.set_as_non_optimal(old);
        }

        let id = self.nodes.len();
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        self.by_offset[offset] = Some(id);
        self.queue.push_back(offset);

        true
    }

    /// Flag `id` and all of its descendants as no longer on a best path
    fn set_as_non_optimal(&mut self, id: NodeId) {
        let mut stack: SmallVec<[NodeId; 32]> = SmallVec::new();
        stack.push(id);

        while let Some(id) = stack.pop() {
            let node = &mut self.nodes[id];
            if node.optimal {
                node.optimal = false;
                stack.extend(node.children.iter().copied());
            }
        }
    }

    /// Check if the head of the queue is worth exploring.
    /// If not, it is dropped from the queue.
    pub(crate) fn is_next_node_optimal(&mut self) -> bool {
        let worth = self
            .queue
            .front()
            .and_then(|&offset| self.by_offset[offset])
            .map(|id| {
                let node = &self.nodes[id];
                node.optimal && !node.processed
            })
            .unwrap_or(false);

        if !worth {
            self.queue.pop_front();
        }

        worth
    }

    /// Take the head of the queue and mark its node as processed
    pub(crate) fn next_node(&mut self) -> Option<(usize, NodeId)> {
        let offset = self.queue.pop_front()?;
        let id = self.by_offset[offset]?;
        self.nodes[id].processed = true;

        Some((offset, id))
    }

    /// The commands of the best path to `offset`, in stream order
    pub(crate) fn commands_to(&self, offset: usize) -> Vec<Command> {
        let mut commands = Vec::new();
        let mut csr = self.by_offset.get(offset).copied().flatten();

        while let Some(id) = csr {
            let node = &self.nodes[id];
            commands.extend(node.command);
            csr = node.parent;
        }

        commands.reverse();
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(count: usize) -> Command {
        Command::RepeatByte { count, value: 0 }
    }

    #[test]
    fn cheaper_path_replaces() {
        let mut nodes = ChunkNodeCollection::new(40);
        assert!(nodes.is_next_node_optimal());
        let (offset, root) = nodes.next_node().unwrap();
        assert_eq!(offset, 0);

        // 2 bytes per command; a 40 byte super command costs 3
        assert!(nodes.add(20, root, fill(20)));
        let mid = nodes.by_offset[20].unwrap();
        assert!(nodes.add(40, mid, fill(20)));
        assert_eq!(nodes.nodes[nodes.by_offset[40].unwrap()].size, 4);

        assert!(nodes.add(40, root, fill(40)));
        assert_eq!(nodes.nodes[nodes.by_offset[40].unwrap()].size, 3);

        // equal cost is dropped
        assert!(!nodes.add(40, root, fill(40)));

        assert_eq!(nodes.commands_to(40), vec![fill(40)]);
    }

    #[test]
    fn replaced_subtree_is_skipped() {
        let mut nodes = ChunkNodeCollection::new(10);
        let (_, root) = nodes.next_node().unwrap();

        let lit = Command::Literal(crate::format::Range::new(0, 2));
        assert!(nodes.add(2, root, lit));
        let (offset, first) = nodes.next_node().unwrap();
        assert_eq!(offset, 2);
        assert!(nodes.add(5, first, fill(3)));

        // a cheaper way to reach offset 2 invalidates the node at offset 5
        assert!(nodes.add(2, root, fill(2)));
        assert!(!nodes.is_next_node_optimal());
        assert!(nodes.is_next_node_optimal());
        let best = nodes.by_offset[2].unwrap();
        assert_eq!(nodes.next_node(), Some((2, best)));
        assert!(!nodes.has_pending());
    }
}
