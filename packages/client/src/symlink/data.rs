use crate as ar;
use arbor_itertools::IteratorExt as _;
use bytes::Bytes;

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum Symlink {
	Reference(ar::graph::data::Reference),
	Node(Node),
}

pub type Node = ar::graph::data::Symlink;

impl Symlink {
	pub fn serialize(&self) -> ar::Result<Bytes> {
		serde_json::to_vec(self)
			.map(Into::into)
			.map_err(|source| ar::error!(!source, "failed to serialize the data"))
	}

	pub fn deserialize<'a>(bytes: impl Into<ar::bytes::Cow<'a>>) -> ar::Result<Self> {
		serde_json::from_slice(bytes.into().as_ref())
			.map_err(|source| ar::error!(!source, "failed to deserialize the data"))
	}

	pub fn children(&self) -> impl Iterator<Item = ar::object::Id> {
		match self {
			Self::Reference(reference) => reference.children().left_iterator(),
			Self::Node(node) => node.children().right_iterator(),
		}
	}
}
