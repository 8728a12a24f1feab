use crate::{self as ar, util::serde::is_false};
use arbor_itertools::IteratorExt as _;
use bytes::Bytes;
use std::{collections::BTreeMap, path::PathBuf};

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct Graph {
	pub nodes: Vec<ar::graph::data::Node>,
}

#[derive(
	Clone, Debug, serde::Deserialize, serde::Serialize, derive_more::TryUnwrap, derive_more::Unwrap,
)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[try_unwrap(ref)]
#[unwrap(ref)]
pub enum Node {
	Directory(Directory),
	File(File),
	Symlink(Symlink),
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct Directory {
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub entries: BTreeMap<String, ar::graph::data::Edge<ar::artifact::Id>>,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct File {
	pub contents: ar::blob::Id,

	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub dependencies:
		BTreeMap<ar::Reference, ar::Referent<ar::graph::data::Edge<ar::object::Id>>>,

	#[serde(default, skip_serializing_if = "is_false")]
	pub executable: bool,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct Symlink {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub artifact: Option<ar::graph::data::Edge<ar::artifact::Id>>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<PathBuf>,
}

#[derive(
	Clone, Debug, derive_more::TryUnwrap, derive_more::Unwrap, serde::Deserialize, serde::Serialize,
)]
#[serde(untagged)]
#[try_unwrap(ref)]
#[unwrap(ref)]
pub enum Edge<T> {
	Reference(Reference),
	Object(T),
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct Reference {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub graph: Option<ar::graph::Id>,

	pub node: usize,
}

impl Graph {
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
		self.nodes.iter().flat_map(|node| match node {
			ar::graph::data::Node::Directory(node) => node.children().boxed(),
			ar::graph::data::Node::File(node) => node.children().boxed(),
			ar::graph::data::Node::Symlink(node) => node.children().boxed(),
		})
	}

	/// Get a node, failing if the index is out of bounds.
	pub fn try_get_node(&self, index: usize) -> ar::Result<&ar::graph::data::Node> {
		self.nodes
			.get(index)
			.ok_or_else(|| ar::error!(%index, "the graph node index is out of bounds"))
	}
}

impl Node {
	#[must_use]
	pub fn kind(&self) -> ar::artifact::Kind {
		match self {
			Self::Directory(_) => ar::artifact::Kind::Directory,
			Self::File(_) => ar::artifact::Kind::File,
			Self::Symlink(_) => ar::artifact::Kind::Symlink,
		}
	}
}

impl Directory {
	pub fn children(&self) -> impl Iterator<Item = ar::object::Id> {
		self.entries.values().flat_map(Edge::children)
	}
}

impl File {
	pub fn children(&self) -> impl Iterator<Item = ar::object::Id> {
		self.dependencies
			.values()
			.flat_map(|referent| referent.item.children())
	}
}

impl Symlink {
	pub fn children(&self) -> impl Iterator<Item = ar::object::Id> {
		self.artifact.iter().flat_map(Edge::children)
	}
}

impl<T> Edge<T>
where
	T: Into<ar::object::Id> + Clone,
{
	pub fn children(&self) -> impl Iterator<Item = ar::object::Id> {
		match self {
			Self::Reference(reference) => reference.children().left_iterator(),
			Self::Object(object) => std::iter::once(object.clone().into()).right_iterator(),
		}
	}
}

impl Reference {
	pub fn children(&self) -> impl Iterator<Item = ar::object::Id> {
		self.graph.clone().into_iter().map(Into::into)
	}
}

impl<T> std::fmt::Display for Edge<T>
where
	T: std::fmt::Display,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Reference(reference) => write!(f, "{reference}"),
			Self::Object(object) => write!(f, "{object}"),
		}
	}
}

impl std::fmt::Display for Reference {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if let Some(graph) = &self.graph {
			write!(f, "graph={graph}&")?;
		}
		write!(f, "node={}", self.node)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use crate as ar;
	use std::collections::BTreeMap;

	#[test]
	fn canonical_serialization_is_deterministic() {
		let mut entries = BTreeMap::new();
		let file = ar::file::Id::new(b"file");
		entries.insert(
			"b".to_owned(),
			ar::graph::data::Edge::Object(ar::artifact::Id::File(file.clone())),
		);
		entries.insert(
			"a".to_owned(),
			ar::graph::data::Edge::Reference(ar::graph::data::Reference {
				graph: None,
				node: 1,
			}),
		);
		let graph = ar::graph::Data {
			nodes: vec![ar::graph::data::Node::Directory(
				ar::graph::data::Directory { entries },
			)],
		};
		let left = graph.serialize().unwrap();
		let right = graph.serialize().unwrap();
		assert_eq!(left, right);

		let deserialized = ar::graph::Data::deserialize(&left).unwrap();
		let reserialized = deserialized.serialize().unwrap();
		assert_eq!(left, reserialized);
	}

	#[test]
	fn defaults_are_omitted() {
		let node = ar::graph::data::Node::File(ar::graph::data::File {
			contents: ar::blob::Id::new(b""),
			dependencies: BTreeMap::new(),
			executable: false,
		});
		let graph = ar::graph::Data { nodes: vec![node] };
		let bytes = graph.serialize().unwrap();
		let string = std::str::from_utf8(&bytes).unwrap();
		assert!(!string.contains("executable"));
		assert!(!string.contains("dependencies"));
	}
}
