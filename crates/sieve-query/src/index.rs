use std::collections::HashMap;

/// One segment in a [`PathIndex`].
///
/// `terminal` nodes end a listed path; nodes with children are prefixes of
/// longer ones. A node can be both.
#[derive(Debug, Clone)]
pub struct PathNode {
    id: usize,
    terminal: bool,
    path: String,
    children: HashMap<String, PathNode>,
}

impl PathNode {
    fn new(id: usize, path: String) -> Self {
        Self {
            id,
            terminal: false,
            path,
            children: HashMap::new(),
        }
    }

    /// Dense id in `0..index.len()`, for per-call bookkeeping.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Full normalized path from the root; empty for the root itself.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn child(&self, segment: &str) -> Option<&PathNode> {
        self.children.get(segment)
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Trie over normalized dotted paths.
#[derive(Debug, Clone)]
pub struct PathIndex {
    root: PathNode,
    len: usize,
}

impl PathIndex {
    /// Paths must already be normalized.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let mut index = Self {
            root: PathNode::new(0, String::new()),
            len: 1,
        };
        for path in paths {
            index.insert(path.as_ref());
        }
        index
    }

    fn insert(&mut self, path: &str) {
        let mut node = &mut self.root;
        let mut prefix_len = 0;
        for segment in path.split('.') {
            prefix_len += if prefix_len == 0 { segment.len() } else { segment.len() + 1 };
            let next_id = self.len;
            node = node.children.entry(segment.to_string()).or_insert_with(|| {
                PathNode::new(next_id, path[..prefix_len].to_string())
            });
            if node.id == next_id {
                self.len += 1;
            }
        }
        node.terminal = true;
    }

    pub fn root(&self) -> &PathNode {
        &self.root
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        !self.root.has_children()
    }

    /// Node for a normalized path, if it is in the trie.
    pub fn get(&self, path: &str) -> Option<&PathNode> {
        path.split('.')
            .try_fold(&self.root, |node, segment| node.child(segment))
    }
}
