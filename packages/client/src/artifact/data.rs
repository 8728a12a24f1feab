use super::Kind;
use crate as ar;
use bytes::Bytes;
use std::collections::BTreeSet;

#[derive(Clone, Debug, derive_more::From, derive_more::TryUnwrap)]
#[try_unwrap(ref)]
pub enum Artifact {
	/// A directory.
	Directory(ar::directory::Data),

	/// A file.
	File(ar::file::Data),

	/// A symlink.
	Symlink(ar::symlink::Data),
}

impl Artifact {
	#[must_use]
	pub fn kind(&self) -> Kind {
		match self {
			Self::Directory(_) => Kind::Directory,
			Self::File(_) => Kind::File,
			Self::Symlink(_) => Kind::Symlink,
		}
	}

	pub fn serialize(&self) -> ar::Result<Bytes> {
		match self {
			Self::Directory(directory) => directory.serialize(),
			Self::File(file) => file.serialize(),
			Self::Symlink(symlink) => symlink.serialize(),
		}
	}

	pub fn deserialize<'a>(kind: Kind, bytes: impl Into<ar::bytes::Cow<'a>>) -> ar::Result<Self> {
		match kind {
			Kind::Directory => Ok(Self::Directory(ar::directory::Data::deserialize(bytes)?)),
			Kind::File => Ok(Self::File(ar::file::Data::deserialize(bytes)?)),
			Kind::Symlink => Ok(Self::Symlink(ar::symlink::Data::deserialize(bytes)?)),
		}
	}

	/// Compute the artifact's ID from its canonical form.
	pub fn id(&self) -> ar::Result<ar::artifact::Id> {
		let bytes = self.serialize()?;
		Ok(ar::artifact::Id::new(self.kind(), &bytes))
	}

	#[must_use]
	pub fn children(&self) -> BTreeSet<ar::object::Id> {
		match self {
			Self::Directory(directory) => directory.children().collect(),
			Self::File(file) => file.children().collect(),
			Self::Symlink(symlink) => symlink.children().collect(),
		}
	}
}

impl From<Artifact> for ar::object::Data {
	fn from(value: Artifact) -> Self {
		match value {
			Artifact::Directory(directory) => Self::Directory(directory),
			Artifact::File(file) => Self::File(file),
			Artifact::Symlink(symlink) => Self::Symlink(symlink),
		}
	}
}
