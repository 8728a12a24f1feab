use crate as ar;
use bytes::Bytes;

/// A blob's data is its payload.
#[derive(Clone, Debug)]
pub struct Blob(pub Bytes);

impl Blob {
	pub fn serialize(&self) -> ar::Result<Bytes> {
		Ok(self.0.clone())
	}

	pub fn deserialize<'a>(bytes: impl Into<ar::bytes::Cow<'a>>) -> ar::Result<Self> {
		Ok(Self(bytes.into().into_owned()))
	}

	pub fn children(&self) -> impl Iterator<Item = ar::object::Id> {
		std::iter::empty()
	}

	#[must_use]
	pub fn len(&self) -> u64 {
		self.0.len().try_into().unwrap()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
