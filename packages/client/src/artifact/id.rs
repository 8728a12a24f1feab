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
	Directory(ar::directory::Id),
	File(ar::file::Id),
	Symlink(ar::symlink::Id),
}

impl Id {
	#[must_use]
	pub fn new(kind: Kind, bytes: &[u8]) -> Self {
		match kind {
			Kind::Directory => ar::directory::Id::new(bytes).into(),
			Kind::File => ar::file::Id::new(bytes).into(),
			Kind::Symlink => ar::symlink::Id::new(bytes).into(),
		}
	}

	#[must_use]
	pub fn kind(&self) -> Kind {
		match self {
			Self::Directory(_) => Kind::Directory,
			Self::File(_) => Kind::File,
			Self::Symlink(_) => Kind::Symlink,
		}
	}
}

impl From<self::Id> for crate::Id {
	fn from(value: self::Id) -> Self {
		match value {
			self::Id::Directory(id) => id.into(),
			self::Id::File(id) => id.into(),
			self::Id::Symlink(id) => id.into(),
		}
	}
}

impl TryFrom<crate::Id> for self::Id {
	type Error = ar::Error;

	fn try_from(value: crate::Id) -> ar::Result<Self, Self::Error> {
		match value.kind() {
			ar::id::Kind::Directory => Ok(Self::Directory(value.try_into()?)),
			ar::id::Kind::File => Ok(Self::File(value.try_into()?)),
			ar::id::Kind::Symlink => Ok(Self::Symlink(value.try_into()?)),
			kind => Err(ar::error!(%kind, "expected an artifact ID")),
		}
	}
}

impl std::str::FromStr for Id {
	type Err = ar::Error;

	fn from_str(s: &str) -> ar::Result<Self, Self::Err> {
		s.parse::<crate::Id>()?.try_into()
	}
}
