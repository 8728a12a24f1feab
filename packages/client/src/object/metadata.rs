/// The metadata the index tracks for an object.
#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct Metadata {
	pub node_size: u64,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub subtree_count: Option<u64>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub subtree_depth: Option<u64>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub subtree_size: Option<u64>,

	pub subtree_stored: bool,
}
