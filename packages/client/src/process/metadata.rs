/// The metadata the index tracks for a process.
#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct Metadata {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub subtree_count: Option<u64>,

	pub subtree_stored: bool,

	pub command: Lane,

	pub log: Lane,

	pub output: Lane,
}

/// One rolled-up subtree lane (command, log, or output).
#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct Lane {
	pub stored: bool,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub count: Option<u64>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub depth: Option<u64>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub size: Option<u64>,
}
