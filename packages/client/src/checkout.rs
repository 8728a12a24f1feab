use crate::{
	self as ar,
	util::serde::{is_false, is_true, return_true},
};
use std::path::PathBuf;

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct Arg {
	pub artifact: ar::artifact::Id,

	#[serde(default, skip_serializing_if = "is_false")]
	pub force: bool,

	#[serde(default = "return_true", skip_serializing_if = "is_true")]
	pub lock: bool,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<PathBuf>,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct Output {
	pub path: PathBuf,
}

impl Arg {
	#[must_use]
	pub fn with_artifact_and_path(artifact: ar::artifact::Id, path: PathBuf) -> Self {
		Self {
			artifact,
			force: false,
			lock: true,
			path: Some(path),
		}
	}
}
