use crate as ar;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
	Directory,
	File,
	Symlink,
}

impl std::fmt::Display for Kind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", ar::id::Kind::from(*self))
	}
}

impl std::str::FromStr for Kind {
	type Err = ar::Error;

	fn from_str(s: &str) -> ar::Result<Self, Self::Err> {
		s.parse::<ar::id::Kind>()?.try_into()
	}
}

impl From<Kind> for ar::id::Kind {
	fn from(value: Kind) -> Self {
		match value {
			Kind::Directory => Self::Directory,
			Kind::File => Self::File,
			Kind::Symlink => Self::Symlink,
		}
	}
}

impl TryFrom<ar::id::Kind> for Kind {
	type Error = ar::Error;

	fn try_from(value: ar::id::Kind) -> ar::Result<Self, Self::Error> {
		match value {
			ar::id::Kind::Directory => Ok(Self::Directory),
			ar::id::Kind::File => Ok(Self::File),
			ar::id::Kind::Symlink => Ok(Self::Symlink),
			kind => Err(ar::error!(%kind, "invalid kind")),
		}
	}
}
