use crate as ar;

pub mod delete;
pub mod get;
pub mod list;
pub mod put;

/// A tag is a sequence of `/`-separated components.
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
pub struct Tag(String);

/// An item a tag can point to.
#[derive(
	Clone,
	Debug,
	Eq,
	Hash,
	Ord,
	PartialEq,
	PartialOrd,
	derive_more::From,
	derive_more::IsVariant,
	derive_more::TryUnwrap,
	serde::Deserialize,
	serde::Serialize,
)]
#[serde(untagged)]
#[try_unwrap(ref)]
pub enum Item {
	Object(ar::object::Id),
	Process(ar::process::Id),
}

impl Tag {
	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn components(&self) -> impl Iterator<Item = &str> {
		self.0.split('/')
	}
}

impl AsRef<str> for Tag {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Display for Tag {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for Tag {
	type Err = ar::Error;

	fn from_str(value: &str) -> ar::Result<Self, Self::Err> {
		if value.is_empty() {
			return Err(ar::error!("the tag must not be empty"));
		}
		let valid = value.split('/').all(|component| {
			!component.is_empty()
				&& component
					.chars()
					.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-'))
		});
		if !valid {
			return Err(ar::error!(%tag = value, "invalid tag"));
		}
		Ok(Self(value.to_owned()))
	}
}

impl std::fmt::Display for Item {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Object(object) => write!(f, "{object}"),
			Self::Process(process) => write!(f, "{process}"),
		}
	}
}

impl std::str::FromStr for Item {
	type Err = ar::Error;

	fn from_str(value: &str) -> ar::Result<Self, Self::Err> {
		let id = value.parse::<ar::Id>()?;
		if id.kind() == ar::id::Kind::Process {
			Ok(Self::Process(id.try_into()?))
		} else {
			Ok(Self::Object(id.try_into()?))
		}
	}
}

#[cfg(test)]
mod tests {
	use crate as ar;

	#[test]
	fn parse() {
		assert!("std".parse::<ar::Tag>().is_ok());
		assert!("std/1.0.0".parse::<ar::Tag>().is_ok());
		assert!("".parse::<ar::Tag>().is_err());
		assert!("a//b".parse::<ar::Tag>().is_err());
		assert!("a b".parse::<ar::Tag>().is_err());
	}
}
