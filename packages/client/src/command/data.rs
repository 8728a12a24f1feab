use crate as ar;
use arbor_itertools::IteratorExt as _;
use bytes::Bytes;
use std::{collections::BTreeMap, path::PathBuf};

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct Command {
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub args: Vec<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cwd: Option<PathBuf>,

	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub env: BTreeMap<String, String>,

	pub executable: Executable,

	pub host: String,

	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub mounts: Vec<Mount>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stdin: Option<ar::blob::Id>,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum Executable {
	Artifact(ArtifactExecutable),
	Path(PathExecutable),
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct ArtifactExecutable {
	pub artifact: ar::artifact::Id,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<PathBuf>,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct PathExecutable {
	pub path: PathBuf,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct Mount {
	pub source: ar::artifact::Id,
	pub target: PathBuf,
}

impl Command {
	pub fn serialize(&self) -> ar::Result<Bytes> {
		serde_json::to_vec(self)
			.map(Into::into)
			.map_err(|source| ar::error!(!source, "failed to serialize the data"))
	}

	pub fn deserialize<'a>(bytes: impl Into<ar::bytes::Cow<'a>>) -> ar::Result<Self> {
		serde_json::from_slice(bytes.into().as_ref())
			.map_err(|source| ar::error!(!source, "failed to deserialize the data"))
	}

	pub fn children(&self) -> impl Iterator<Item = ar::object::Id> {
		let executable = self.executable.children();
		let mounts = self
			.mounts
			.iter()
			.map(|mount| mount.source.clone().into());
		let stdin = self.stdin.clone().map(Into::into);
		std::iter::empty()
			.chain(executable)
			.chain(mounts)
			.chain(stdin)
	}
}

impl Executable {
	pub fn children(&self) -> impl Iterator<Item = ar::object::Id> {
		match self {
			Self::Artifact(executable) => {
				std::iter::once(executable.artifact.clone().into()).left_iterator()
			},
			Self::Path(_) => std::iter::empty().right_iterator(),
		}
	}
}
