use crate as ar;
use bytes::Bytes;
use serde_with::{DisplayFromStr, serde_as};
use std::collections::BTreeMap;

/// The name of the lockfile at a package root.
pub const LOCKFILE_FILE_NAME: &str = "arbor.lock";

#[serde_as]
#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct Lockfile {
	#[serde_as(as = "BTreeMap<DisplayFromStr, _>")]
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub dependencies: BTreeMap<ar::Reference, Entry>,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct Entry {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub item: Option<ar::object::Id>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tag: Option<ar::Tag>,
}

impl Lockfile {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.dependencies.is_empty()
	}

	pub fn serialize(&self) -> ar::Result<Bytes> {
		let mut bytes = serde_json::to_vec_pretty(self)
			.map_err(|source| ar::error!(!source, "failed to serialize the lockfile"))?;
		bytes.push(b'\n');
		Ok(bytes.into())
	}

	pub fn deserialize<'a>(bytes: impl Into<ar::bytes::Cow<'a>>) -> ar::Result<Self> {
		serde_json::from_slice(bytes.into().as_ref())
			.map_err(|source| ar::error!(!source, "failed to deserialize the lockfile"))
	}
}
