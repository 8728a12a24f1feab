use crate::{
	self as ar,
	util::serde::{is_false, is_true, return_true},
};
use std::path::PathBuf;

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct Arg {
	/// Whether to require fully pinned dependency resolution.
	#[serde(default, skip_serializing_if = "is_false")]
	pub deterministic: bool,

	#[serde(default = "return_true", skip_serializing_if = "is_true")]
	pub ignore: bool,

	#[serde(default = "return_true", skip_serializing_if = "is_true")]
	pub lock: bool,

	#[serde(default, skip_serializing_if = "is_false")]
	pub locked: bool,

	pub path: PathBuf,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct Output {
	pub referent: ar::Referent<ar::artifact::Id>,
}

impl Arg {
	#[must_use]
	pub fn with_path(path: PathBuf) -> Self {
		Self {
			deterministic: false,
			ignore: true,
			lock: true,
			locked: false,
			path,
		}
	}
}
