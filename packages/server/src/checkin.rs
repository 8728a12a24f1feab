use crate::Server;
use arbor_client as ar;
use bytes::Bytes;
use std::{
	collections::BTreeMap,
	path::{Path, PathBuf},
};

mod input;
mod object;
mod output;

/// The state of one check-in.
pub(crate) struct State {
	pub arg: ar::checkin::Arg,

	/// The canonicalized root path.
	pub root: PathBuf,

	/// The discovery arena.
	pub nodes: Vec<Node>,

	/// The path of every discovered node.
	pub paths: fnv::FnvHashMap<PathBuf, usize>,

	/// The graphs created for strongly connected regions.
	pub graphs: Vec<(ar::graph::Id, ar::graph::Data)>,

	/// The lockfile found at the root, if any.
	pub lockfile: Option<ar::Lockfile>,

	/// The tag resolutions frozen by this check-in.
	pub dependencies: BTreeMap<ar::Reference, ar::lockfile::Entry>,
}

pub(crate) struct Node {
	pub path: PathBuf,
	pub variant: Variant,

	/// The node's artifact data and ID, filled in bottom-up.
	pub data: Option<ar::artifact::Data>,
	pub id: Option<ar::artifact::Id>,
}

pub(crate) enum Variant {
	Directory(Directory),
	File(File),
	Symlink(Symlink),
}

pub(crate) struct Directory {
	pub entries: BTreeMap<String, usize>,
}

pub(crate) struct File {
	pub contents: Bytes,
	pub executable: bool,
	pub imports: Vec<ar::module::Import>,
	pub dependencies: BTreeMap<ar::Reference, Dependency>,
}

pub(crate) enum Dependency {
	/// A path import that resolved to a node inside the root.
	Node(usize),

	/// A resolved tag or object reference.
	Item(ar::Referent<ar::object::Id>),
}

pub(crate) struct Symlink {
	/// The literal link text.
	pub target: PathBuf,

	/// The node the target resolves to, when it lies inside the root.
	pub node: Option<usize>,
}

impl Server {
	/// Check in the artifact at `arg.path`.
	pub async fn checkin(&self, arg: ar::checkin::Arg) -> ar::Result<ar::checkin::Output> {
		let root = tokio::fs::canonicalize(&arg.path)
			.await
			.map_err(|source| ar::error!(!source, %path = arg.path.display(), "failed to canonicalize the path"))?;

		// Read the lockfile at the root, if there is one.
		let lockfile = input::try_read_lockfile(&root).await?;

		let mut state = State {
			arg,
			root,
			nodes: Vec::new(),
			paths: fnv::FnvHashMap::default(),
			graphs: Vec::new(),
			lockfile,
			dependencies: BTreeMap::new(),
		};

		// Discover the filesystem tree.
		input::visit(&mut state).await?;

		// Resolve imports through the lockfile and the tag registry.
		self.resolve_dependencies(&mut state).await?;

		// Bundle cycles into graphs and compute the data and IDs bottom-up.
		object::create_objects(&mut state)?;

		// Write the blobs and objects and send the index messages.
		let output = self.write_output(&mut state).await?;

		// Write the lockfile at the root.
		if state.arg.lock {
			output::write_lockfile(&state).await?;
		}

		self.notify_indexer();

		Ok(output)
	}
}

pub(crate) fn diff_paths(base: &Path, target: &Path) -> PathBuf {
	let base = base.components().collect::<Vec<_>>();
	let target = target.components().collect::<Vec<_>>();
	let common = base
		.iter()
		.zip(target.iter())
		.take_while(|(a, b)| a == b)
		.count();
	let mut path = PathBuf::new();
	for _ in common..base.len() {
		path.push("..");
	}
	for component in &target[common..] {
		path.push(component);
	}
	if path.as_os_str().is_empty() {
		path.push(".");
	}
	path
}
