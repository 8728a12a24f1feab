use crate as ar;

#[derive(
	Clone,
	Debug,
	Eq,
	Hash,
	Ord,
	PartialEq,
	PartialOrd,
	serde_with::DeserializeFromStr,
	serde_with::SerializeDisplay,
)]
pub struct Id(pub(crate) ar::Id);

impl Id {
	#[must_use]
	pub fn new(bytes: &[u8]) -> Self {
		Self(ar::Id::new_blake3(ar::id::Kind::Command, bytes))
	}
}

impl From<Id> for ar::Id {
	fn from(value: Id) -> Self {
		value.0
	}
}

impl TryFrom<ar::Id> for Id {
	type Error = ar::Error;

	fn try_from(value: ar::Id) -> ar::Result<Self, Self::Error> {
		if value.kind() != ar::id::Kind::Command {
			return Err(ar::error!(%id = value, "expected a command ID"));
		}
		Ok(Self(value))
	}
}

impl std::fmt::Display for Id {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for Id {
	type Err = ar::Error;

	fn from_str(s: &str) -> ar::Result<Self, Self::Err> {
		s.parse::<ar::Id>()?.try_into()
	}
}
