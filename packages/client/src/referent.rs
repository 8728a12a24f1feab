use crate as ar;
use std::path::PathBuf;

#[derive(
	Clone,
	Debug,
	Eq,
	Hash,
	Ord,
	PartialEq,
	PartialOrd,
	serde::Deserialize,
	serde::Serialize,
)]
pub struct Referent<T> {
	pub item: T,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<PathBuf>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tag: Option<ar::Tag>,
}

impl<T> Referent<T> {
	pub fn with_item(item: T) -> Self {
		Self {
			item,
			path: None,
			tag: None,
		}
	}

	pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ar::Referent<U> {
		ar::Referent {
			item: f(self.item),
			path: self.path,
			tag: self.tag,
		}
	}

	pub fn as_ref(&self) -> ar::Referent<&T> {
		ar::Referent {
			item: &self.item,
			path: self.path.clone(),
			tag: self.tag.clone(),
		}
	}
}
