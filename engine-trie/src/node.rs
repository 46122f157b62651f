use crate::nibbles::hex_prefix_encode;
use hearth_engine_types::keccak256;
use rlp::RlpStream;

/// One node of the in-memory patricia trie.
///
/// `Branch` children are indexed by the next nibble of the key; the optional
/// in-node value holds the entry whose key ends at the branch.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Node {
    Empty,
    Leaf {
        path: Vec<u8>,
        value: Vec<u8>,
    },
    Extension {
        path: Vec<u8>,
        child: Box<Node>,
    },
    Branch {
        children: Box<[Node; 16]>,
        value: Option<Vec<u8>>,
    },
}

impl Node {
    #[must_use]
    pub fn empty_branch() -> Box<[Node; 16]> {
        Box::new([
            Node::Empty,
            Node::Empty,
            Node::Empty,
            Node::Empty,
            Node::Empty,
            Node::Empty,
            Node::Empty,
            Node::Empty,
            Node::Empty,
            Node::Empty,
            Node::Empty,
            Node::Empty,
            Node::Empty,
            Node::Empty,
            Node::Empty,
            Node::Empty,
        ])
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// RLP encoding of the node itself.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut stream = RlpStream::new();
        self.append(&mut stream);
        stream.out().to_vec()
    }

    fn append(&self, stream: &mut RlpStream) {
        match self {
            Self::Empty => {
                stream.append_empty_data();
            }
            Self::Leaf { path, value } => {
                stream.begin_list(2);
                stream.append(&hex_prefix_encode(path, true));
                stream.append(value);
            }
            Self::Extension { path, child } => {
                stream.begin_list(2);
                stream.append(&hex_prefix_encode(path, false));
                child.append_ref(stream);
            }
            Self::Branch { children, value } => {
                stream.begin_list(17);
                for child in children.iter() {
                    child.append_ref(stream);
                }
                match value {
                    Some(value) => stream.append(value),
                    None => stream.append_empty_data(),
                };
            }
        }
    }

    /// Appends the node *reference*: nodes whose RLP is shorter than 32 bytes
    /// are inlined, everything else is replaced by its keccak digest.
    fn append_ref(&self, stream: &mut RlpStream) {
        if self.is_empty() {
            stream.append_empty_data();
            return;
        }
        let encoded = self.encode();
        if encoded.len() < 32 {
            stream.append_raw(&encoded, 1);
        } else {
            stream.append(&keccak256(&encoded));
        }
    }
}
