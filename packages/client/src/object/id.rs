use super::Kind;
use crate as ar;

#[derive(
	Clone,
	Debug,
	Eq,
	Hash,
	Ord,
	PartialEq,
	PartialOrd,
	derive_more::Display,
	derive_more::From,
	derive_more::IsVariant,
	derive_more::TryInto,
	derive_more::TryUnwrap,
	serde::Deserialize,
	serde::Serialize,
)]
#[serde(into = "crate::Id", try_from = "crate::Id")]
#[try_unwrap(ref)]
pub enum Id {
	Blob(ar::blob::Id),
	Directory(ar::directory::Id),
	File(ar::file::Id),
	Symlink(ar::symlink::Id),
	Graph(ar::graph::Id),
	Command(ar::command::Id),
}

impl Id {
	#[must_use]
	pub fn new(kind: Kind, bytes: &[u8]) -> Self {
		match kind {
			Kind::Blob => ar::blob::Id::new(bytes).into(),
			Kind::Directory => ar::directory::Id::new(bytes).into(),
			Kind::File => ar::file::Id::new(bytes).into(),
			Kind::Symlink => ar::symlink::Id::new(bytes).into(),
			Kind::Graph => ar::graph::Id::new(bytes).into(),
			Kind::Command => ar::command::Id::new(bytes).into(),
		}
	}

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
}

impl From<self::Id> for crate::Id {
	fn from(value: self::Id) -> Self {
		match value {
			self::Id::Blob(id) => id.into(),
			self::Id::Directory(id) => id.into(),
			self::Id::File(id) => id.into(),
			self::Id::Symlink(id) => id.into(),
			self::Id::Graph(id) => id.into(),
			self::Id::Command(id) => id.into(),
		}
	}
}

impl TryFrom<crate::Id> for self::Id {
	type Error = ar::Error;

	fn try_from(value: crate::Id) -> ar::Result<Self, Self::Error> {
		match value.kind() {
			ar::id::Kind::Blob => Ok(Self::Blob(value.try_into()?)),
			ar::id::Kind::Directory => Ok(Self::Directory(value.try_into()?)),
			ar::id::Kind::File => Ok(Self::File(value.try_into()?)),
			ar::id::Kind::Symlink => Ok(Self::Symlink(value.try_into()?)),
			ar::id::Kind::Graph => Ok(Self::Graph(value.try_into()?)),
			ar::id::Kind::Command => Ok(Self::Command(value.try_into()?)),
			kind => Err(ar::error!(%kind, "expected an object ID")),
		}
	}
}

impl From<ar::artifact::Id> for self::Id {
	fn from(value: ar::artifact::Id) -> Self {
		match value {
			ar::artifact::Id::Directory(id) => Self::Directory(id),
			ar::artifact::Id::File(id) => Self::File(id),
			ar::artifact::Id::Symlink(id) => Self::Symlink(id),
		}
	}
}

impl TryFrom<self::Id> for ar::artifact::Id {
	type Error = ar::Error;

	fn try_from(value: self::Id) -> ar::Result<Self, Self::Error> {
		match value {
			self::Id::Directory(id) => Ok(Self::Directory(id)),
			self::Id::File(id) => Ok(Self::File(id)),
			self::Id::Symlink(id) => Ok(Self::Symlink(id)),
			id => Err(ar::error!(%id, "expected an artifact ID")),
		}
	}
}

impl std::str::FromStr for Id {
	type Err = ar::Error;

	fn from_str(s: &str) -> ar::Result<Self, Self::Err> {
		s.parse::<crate::Id>()?.try_into()
	}
}
