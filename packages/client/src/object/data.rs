use super::Kind;
use crate as ar;
use bytes::Bytes;
use std::collections::BTreeSet;

#[derive(Clone, Debug, derive_more::From, derive_more::TryInto, derive_more::TryUnwrap)]
#[try_unwrap(ref)]
pub enum Object {
	Blob(ar::blob::Data),
	Directory(ar::directory::Data),
	File(ar::file::Data),
	Symlink(ar::symlink::Data),
	Graph(ar::graph::Data),
	Command(ar::command::Data),
}

impl Object {
	#[must_use]
	pub fn kind(&self) -> Kind {
		match self {
			Self::Blob(_) => Kind::Blob,
			Self::Directory(_) => Kind::Directory,
			Self::File(_) => Kind::File,
			Self::Symlink(_) => Kind::Symlink,
			Self::Graph(_) => Kind::Graph,
			Self::Command(_) => Kind::Command,
		}
	}

	pub fn serialize(&self) -> ar::Result<Bytes> {
		match self {
			Self::Blob(data) => data.serialize(),
			Self::Directory(data) => data.serialize(),
			Self::File(data) => data.serialize(),
			Self::Symlink(data) => data.serialize(),
			Self::Graph(data) => data.serialize(),
			Self::Command(data) => data.serialize(),
		}
	}

	pub fn deserialize<'a>(kind: Kind, bytes: impl Into<ar::bytes::Cow<'a>>) -> ar::Result<Self> {
		match kind {
			Kind::Blob => Ok(Self::Blob(ar::blob::Data::deserialize(bytes)?)),
			Kind::Directory => Ok(Self::Directory(ar::directory::Data::deserialize(bytes)?)),
			Kind::File => Ok(Self::File(ar::file::Data::deserialize(bytes)?)),
			Kind::Symlink => Ok(Self::Symlink(ar::symlink::Data::deserialize(bytes)?)),
			Kind::Graph => Ok(Self::Graph(ar::graph::Data::deserialize(bytes)?)),
			Kind::Command => Ok(Self::Command(ar::command::Data::deserialize(bytes)?)),
		}
	}

	/// Compute the object's ID from its canonical form.
	pub fn id(&self) -> ar::Result<ar::object::Id> {
		let bytes = self.serialize()?;
		Ok(ar::object::Id::new(self.kind(), &bytes))
	}

	#[must_use]
	pub fn children(&self) -> BTreeSet<ar::object::Id> {
		match self {
			Self::Blob(blob) => blob.children().collect(),
			Self::Directory(directory) => directory.children().collect(),
			Self::File(file) => file.children().collect(),
			Self::Symlink(symlink) => symlink.children().collect(),
			Self::Graph(graph) => graph.children().collect(),
			Self::Command(command) => command.children().collect(),
		}
	}
}
