use crate::Server;
use arbor_client as ar;
use futures::{FutureExt as _, future::BoxFuture};
use std::{collections::BTreeMap, path::Path};

struct State {
	/// Loaded graphs, keyed by ID.
	graphs: BTreeMap<ar::graph::Id, ar::graph::Data>,

	/// The tag resolutions found in the tree, for the lockfile.
	dependencies: BTreeMap<ar::Reference, ar::lockfile::Entry>,
}

impl Server {
	/// Check out an artifact to a host path.
	///
	/// The round trip law holds for every stored artifact: checking the
	/// output back in yields the same ID.
	pub async fn checkout(&self, arg: ar::checkout::Arg) -> ar::Result<ar::checkout::Output> {
		let path = if let Some(path) = arg.path.clone() {
			path
		} else {
			let checkouts = self.inner.config.path.join("checkouts");
			tokio::fs::create_dir_all(&checkouts)
				.await
				.map_err(|source| ar::error!(!source, "failed to create the checkouts directory"))?;
			checkouts.join(arg.artifact.to_string())
		};

		let exists = tokio::fs::symlink_metadata(&path).await.is_ok();
		if exists {
			if !arg.force {
				return Err(ar::error!(%path = path.display(), "the target path already exists"));
			}
			remove_all(&path).await?;
		}
		if let Some(parent) = path.parent() {
			tokio::fs::create_dir_all(parent)
				.await
				.map_err(|source| ar::error!(!source, "failed to create the parent directory"))?;
		}

		let mut state = State {
			graphs: BTreeMap::new(),
			dependencies: BTreeMap::new(),
		};
		self.checkout_artifact(&mut state, &arg.artifact, &path)
			.await?;

		// Write the lockfile at the root when the artifact carries tag
		// dependencies.
		if arg.lock && !state.dependencies.is_empty() {
			let metadata = tokio::fs::symlink_metadata(&path)
				.await
				.map_err(|source| ar::error!(!source, "failed to get the metadata"))?;
			if metadata.is_dir() {
				let lockfile = ar::Lockfile {
					dependencies: state.dependencies.clone(),
				};
				let bytes = lockfile.serialize()?;
				tokio::fs::write(path.join(ar::lockfile::LOCKFILE_FILE_NAME), &bytes)
					.await
					.map_err(|source| ar::error!(!source, "failed to write the lockfile"))?;
			}
		}

		Ok(ar::checkout::Output { path })
	}

	fn checkout_artifact<'a>(
		&'a self,
		state: &'a mut State,
		id: &'a ar::artifact::Id,
		path: &'a Path,
	) -> BoxFuture<'a, ar::Result<()>> {
		async move {
			let data = self
				.try_get_object(&id.clone().into())
				.await?
				.ok_or_else(|| ar::error!(%id, "failed to find the artifact"))?;
			let data: ar::artifact::Data = match data {
				ar::object::Data::Directory(data) => data.into(),
				ar::object::Data::File(data) => data.into(),
				ar::object::Data::Symlink(data) => data.into(),
				_ => return Err(ar::error!(%id, "expected an artifact")),
			};
			match data {
				ar::artifact::Data::Directory(ar::directory::Data::Node(node)) => {
					self.checkout_node(state, ar::graph::data::Node::Directory(node), None, path)
						.await
				},
				ar::artifact::Data::File(ar::file::Data::Node(node)) => {
					self.checkout_node(state, ar::graph::data::Node::File(node), None, path)
						.await
				},
				ar::artifact::Data::Symlink(ar::symlink::Data::Node(node)) => {
					self.checkout_node(state, ar::graph::data::Node::Symlink(node), None, path)
						.await
				},
				ar::artifact::Data::Directory(ar::directory::Data::Reference(reference))
				| ar::artifact::Data::File(ar::file::Data::Reference(reference))
				| ar::artifact::Data::Symlink(ar::symlink::Data::Reference(reference)) => {
					self.checkout_reference(state, &reference, None, path).await
				},
			}
		}
		.boxed()
	}

	fn checkout_reference<'a>(
		&'a self,
		state: &'a mut State,
		reference: &'a ar::graph::data::Reference,
		current: Option<&'a ar::graph::Id>,
		path: &'a Path,
	) -> BoxFuture<'a, ar::Result<()>> {
		async move {
			let graph = match (&reference.graph, current) {
				(Some(graph), _) => graph.clone(),
				(None, Some(graph)) => graph.clone(),
				(None, None) => {
					return Err(ar::error!("the reference has no graph"));
				},
			};
			self.load_graph(state, &graph).await?;
			let data = state.graphs.get(&graph).unwrap();
			let node = data.try_get_node(reference.node)?.clone();
			self.checkout_node(state, node, Some(&graph), path).await
		}
		.boxed()
	}

	async fn load_graph(&self, state: &mut State, id: &ar::graph::Id) -> ar::Result<()> {
		if state.graphs.contains_key(id) {
			return Ok(());
		}
		let object: ar::object::Id = id.clone().into();
		let data = self
			.try_get_object(&object)
			.await?
			.ok_or_else(|| ar::error!(%id, "failed to find the graph"))?;
		let ar::object::Data::Graph(data) = data else {
			return Err(ar::error!(%id, "expected a graph"));
		};
		state.graphs.insert(id.clone(), data);
		Ok(())
	}

	fn checkout_node<'a>(
		&'a self,
		state: &'a mut State,
		node: ar::graph::data::Node,
		graph: Option<&'a ar::graph::Id>,
		path: &'a Path,
	) -> BoxFuture<'a, ar::Result<()>> {
		async move {
			match node {
				ar::graph::data::Node::Directory(directory) => {
					tokio::fs::create_dir_all(path)
						.await
						.map_err(|source| ar::error!(!source, "failed to create the directory"))?;
					for (name, edge) in directory.entries {
						let entry_path = path.join(&name);
						match edge {
							ar::graph::data::Edge::Object(id) => {
								self.checkout_artifact(state, &id, &entry_path).await?;
							},
							ar::graph::data::Edge::Reference(reference) => {
								self.checkout_reference(state, &reference, graph, &entry_path)
									.await?;
							},
						}
					}
				},
				ar::graph::data::Node::File(file) => {
					let contents = self
						.inner
						.store
						.try_get_cache_entry(&file.contents)
						.await?
						.ok_or_else(
							|| ar::error!(%id = file.contents, "failed to find the cache entry"),
						)?;
					tokio::fs::write(path, &contents)
						.await
						.map_err(|source| ar::error!(!source, "failed to write the file"))?;
					set_executable(path, file.executable).await?;
					for (reference, referent) in file.dependencies {
						if referent.tag.is_some() {
							if let ar::graph::data::Edge::Object(item) = &referent.item {
								state.dependencies.insert(
									reference,
									ar::lockfile::Entry {
										item: Some(item.clone()),
										tag: referent.tag.clone(),
									},
								);
							}
						}
					}
				},
				ar::graph::data::Node::Symlink(symlink) => {
					let target = symlink
						.path
						.ok_or_else(|| ar::error!("the symlink has no path"))?;
					#[cfg(unix)]
					tokio::fs::symlink(&target, path)
						.await
						.map_err(|source| ar::error!(!source, "failed to write the symlink"))?;
					#[cfg(not(unix))]
					{
						let _ = target;
						return Err(ar::error!("symlinks are not supported on this platform"));
					}
				},
			}
			Ok(())
		}
		.boxed()
	}
}

async fn remove_all(path: &Path) -> ar::Result<()> {
	let metadata = tokio::fs::symlink_metadata(path)
		.await
		.map_err(|source| ar::error!(!source, "failed to get the metadata"))?;
	if metadata.is_dir() {
		tokio::fs::remove_dir_all(path)
			.await
			.map_err(|source| ar::error!(!source, "failed to remove the directory"))?;
	} else {
		tokio::fs::remove_file(path)
			.await
			.map_err(|source| ar::error!(!source, "failed to remove the file"))?;
	}
	Ok(())
}

async fn set_executable(path: &Path, executable: bool) -> ar::Result<()> {
	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt as _;
		let mode = if executable { 0o755 } else { 0o644 };
		tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
			.await
			.map_err(|source| ar::error!(!source, "failed to set the permissions"))?;
	}
	#[cfg(not(unix))]
	{
		let _ = (path, executable);
	}
	Ok(())
}
