//! In-memory Merkle Patricia Trie.
//!
//! Keys are arbitrary byte strings, values are RLP payloads supplied by the
//! caller. Inserting an empty value removes the key, matching the storage rule
//! that zero-valued slots are absent from the trie.

pub mod nibbles;
pub mod node;

use hearth_engine_types::account::EMPTY_ROOT;
use hearth_engine_types::{keccak256, H256};
use nibbles::{bytes_to_nibbles, common_prefix_len};
use node::Node;

#[derive(Debug, Clone, Default)]
pub struct Trie {
    root: Option<Node>,
}

impl Trie {
    #[must_use]
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn insert(&mut self, key: &[u8], value: Vec<u8>) {
        if value.is_empty() {
            self.remove(key);
            return;
        }
        let path = bytes_to_nibbles(key);
        let root = self.root.take().unwrap_or(Node::Empty);
        self.root = Some(insert_at(root, &path, value));
    }

    pub fn remove(&mut self, key: &[u8]) {
        let path = bytes_to_nibbles(key);
        if let Some(root) = self.root.take() {
            let updated = remove_at(root, &path);
            if !updated.is_empty() {
                self.root = Some(updated);
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let path = bytes_to_nibbles(key);
        get_at(self.root.as_ref()?, &path)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// The 32-byte commitment of the trie. The root node is always hashed,
    /// even when its RLP encoding is shorter than 32 bytes.
    #[must_use]
    pub fn root(&self) -> H256 {
        match &self.root {
            None => EMPTY_ROOT,
            Some(node) => keccak256(&node.encode()),
        }
    }
}

/// Root of the trie mapping `keccak(key)` to `value`, the commitment used for
/// the state and storage tries.
#[must_use]
pub fn sec_trie_root<K, V, I>(entries: I) -> H256
where
    K: AsRef<[u8]>,
    V: Into<Vec<u8>>,
    I: IntoIterator<Item = (K, V)>,
{
    let mut trie = Trie::new();
    for (key, value) in entries {
        trie.insert(keccak256(key.as_ref()).as_bytes(), value.into());
    }
    trie.root()
}

/// Root of the trie mapping `rlp(index)` to `value`, the commitment used for
/// transactions, receipts, and withdrawals.
#[must_use]
pub fn ordered_trie_root<V, I>(entries: I) -> H256
where
    V: Into<Vec<u8>>,
    I: IntoIterator<Item = V>,
{
    let mut trie = Trie::new();
    for (index, value) in entries.into_iter().enumerate() {
        trie.insert(&rlp::encode(&index), value.into());
    }
    trie.root()
}

fn insert_at(node: Node, path: &[u8], value: Vec<u8>) -> Node {
    match node {
        Node::Empty => Node::Leaf {
            path: path.to_vec(),
            value,
        },
        Node::Leaf {
            path: leaf_path,
            value: leaf_value,
        } => {
            let common = common_prefix_len(&leaf_path, path);
            if common == leaf_path.len() && common == path.len() {
                return Node::Leaf {
                    path: leaf_path,
                    value,
                };
            }

            let mut children = Node::empty_branch();
            let mut branch_value = None;

            if common == leaf_path.len() {
                branch_value = Some(leaf_value);
            } else {
                let nibble = leaf_path[common] as usize;
                children[nibble] = Node::Leaf {
                    path: leaf_path[common + 1..].to_vec(),
                    value: leaf_value,
                };
            }
            let branch = if common == path.len() {
                Node::Branch {
                    children,
                    value: Some(value),
                }
            } else {
                let nibble = path[common] as usize;
                children[nibble] = Node::Leaf {
                    path: path[common + 1..].to_vec(),
                    value,
                };
                Node::Branch {
                    children,
                    value: branch_value,
                }
            };
            wrap_extension(&path[..common], branch)
        }
        Node::Extension {
            path: ext_path,
            child,
        } => {
            let common = common_prefix_len(&ext_path, path);
            if common == ext_path.len() {
                return Node::Extension {
                    path: ext_path,
                    child: Box::new(insert_at(*child, &path[common..], value)),
                };
            }

            let mut children = Node::empty_branch();
            let nibble = ext_path[common] as usize;
            children[nibble] = reattach_extension(&ext_path[common + 1..], *child);

            let branch = if common == path.len() {
                Node::Branch {
                    children,
                    value: Some(value),
                }
            } else {
                let nibble = path[common] as usize;
                children[nibble] = Node::Leaf {
                    path: path[common + 1..].to_vec(),
                    value,
                };
                Node::Branch {
                    children,
                    value: None,
                }
            };
            wrap_extension(&path[..common], branch)
        }
        Node::Branch {
            mut children,
            value: branch_value,
        } => {
            if path.is_empty() {
                return Node::Branch {
                    children,
                    value: Some(value),
                };
            }
            let nibble = path[0] as usize;
            let child = core::mem::replace(&mut children[nibble], Node::Empty);
            children[nibble] = insert_at(child, &path[1..], value);
            Node::Branch {
                children,
                value: branch_value,
            }
        }
    }
}

fn get_at<'a>(node: &'a Node, path: &[u8]) -> Option<&'a [u8]> {
    match node {
        Node::Empty => None,
        Node::Leaf {
            path: leaf_path,
            value,
        } => (leaf_path.as_slice() == path).then_some(value.as_slice()),
        Node::Extension {
            path: ext_path,
            child,
        } => path
            .strip_prefix(ext_path.as_slice())
            .and_then(|rest| get_at(child, rest)),
        Node::Branch { children, value } => {
            if path.is_empty() {
                value.as_deref()
            } else {
                get_at(&children[path[0] as usize], &path[1..])
            }
        }
    }
}

fn remove_at(node: Node, path: &[u8]) -> Node {
    match node {
        Node::Empty => Node::Empty,
        Node::Leaf {
            path: leaf_path,
            value,
        } => {
            if leaf_path.as_slice() == path {
                Node::Empty
            } else {
                Node::Leaf {
                    path: leaf_path,
                    value,
                }
            }
        }
        Node::Extension {
            path: ext_path,
            child,
        } => match path.strip_prefix(ext_path.as_slice()) {
            None => Node::Extension {
                path: ext_path,
                child,
            },
            Some(rest) => {
                let updated = remove_at(*child, rest);
                if updated.is_empty() {
                    Node::Empty
                } else {
                    reattach_extension(&ext_path, updated)
                }
            }
        },
        Node::Branch {
            mut children,
            value,
        } => {
            let value = if path.is_empty() {
                None
            } else {
                let nibble = path[0] as usize;
                let child = core::mem::replace(&mut children[nibble], Node::Empty);
                children[nibble] = remove_at(child, &path[1..]);
                value
            };
            collapse_branch(children, value)
        }
    }
}

/// Collapses a branch left degenerate by a removal: a valueless branch with a
/// single child merges into that child, a childless branch with a value
/// becomes a leaf.
fn collapse_branch(children: Box<[Node; 16]>, value: Option<Vec<u8>>) -> Node {
    let occupied: Vec<usize> = children
        .iter()
        .enumerate()
        .filter(|(_, child)| !child.is_empty())
        .map(|(i, _)| i)
        .collect();

    match (occupied.len(), value) {
        (0, None) => Node::Empty,
        (0, Some(value)) => Node::Leaf {
            path: Vec::new(),
            value,
        },
        (1, None) => {
            let nibble = occupied[0];
            let mut children = children;
            let child = core::mem::replace(&mut children[nibble], Node::Empty);
            reattach_extension(&[nibble as u8], child)
        }
        (_, value) => Node::Branch { children, value },
    }
}

/// Prefixes `node` with `path`, merging into the node's own path where the
/// node is a leaf or an extension so no extension-extension chains survive.
fn reattach_extension(path: &[u8], node: Node) -> Node {
    if path.is_empty() {
        return node;
    }
    match node {
        Node::Empty => Node::Empty,
        Node::Leaf {
            path: leaf_path,
            value,
        } => {
            let mut joined = path.to_vec();
            joined.extend_from_slice(&leaf_path);
            Node::Leaf {
                path: joined,
                value,
            }
        }
        Node::Extension {
            path: ext_path,
            child,
        } => {
            let mut joined = path.to_vec();
            joined.extend_from_slice(&ext_path);
            Node::Extension {
                path: joined,
                child,
            }
        }
        branch @ Node::Branch { .. } => Node::Extension {
            path: path.to_vec(),
            child: Box::new(branch),
        },
    }
}

fn wrap_extension(prefix: &[u8], node: Node) -> Node {
    if prefix.is_empty() {
        node
    } else {
        Node::Extension {
            path: prefix.to_vec(),
            child: Box::new(node),
        }
    }
}
