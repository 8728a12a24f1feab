use super::{Dependency, State, Variant, diff_paths, input::normalize};
use crate::Server;
use arbor_client as ar;
use std::collections::BTreeMap;

impl Server {
	/// Resolve every file's imports through the lockfile and the tag
	/// registry. Resolutions are frozen into the graph and recorded for the
	/// lockfile.
	pub(super) async fn resolve_dependencies(&self, state: &mut State) -> ar::Result<()> {
		for index in 0..state.nodes.len() {
			let Variant::File(file) = &state.nodes[index].variant else {
				continue;
			};
			let imports = file.imports.clone();
			let parent = state.nodes[index]
				.path
				.parent()
				.ok_or_else(|| ar::error!("the file has no parent"))?
				.to_owned();
			let mut dependencies = BTreeMap::new();
			for import in imports {
				let reference = import.reference.clone();
				let dependency = match reference.item() {
					ar::reference::Item::Path(path) => {
						let resolved = normalize(&parent.join(path));
						if !resolved.starts_with(&state.root) {
							return Err(
								ar::error!(%path = path.display(), "the import escapes the root"),
							);
						}
						let target = state.paths.get(&resolved).copied().ok_or_else(|| {
							ar::error!(%path = path.display(), "failed to resolve the import")
						})?;
						Dependency::Node(target)
					},
					ar::reference::Item::Object(object) => {
						Dependency::Item(ar::Referent::with_item(object.clone()))
					},
					ar::reference::Item::Tag(tag) => {
						let referent = self.resolve_tag(state, &reference, tag.clone()).await?;
						state.dependencies.insert(
							reference.clone(),
							ar::lockfile::Entry {
								item: Some(referent.item.clone()),
								tag: referent.tag.clone(),
							},
						);
						Dependency::Item(referent)
					},
				};
				dependencies.insert(reference, dependency);
			}
			let Variant::File(file) = &mut state.nodes[index].variant else {
				unreachable!();
			};
			file.dependencies = dependencies;
		}
		Ok(())
	}

	async fn resolve_tag(
		&self,
		state: &State,
		reference: &ar::Reference,
		tag: ar::Tag,
	) -> ar::Result<ar::Referent<ar::object::Id>> {
		// A lockfile entry pins the resolution.
		if let Some(entry) = state
			.lockfile
			.as_ref()
			.and_then(|lockfile| lockfile.dependencies.get(reference))
		{
			if let Some(item) = &entry.item {
				return Ok(ar::Referent {
					item: item.clone(),
					path: None,
					tag: entry.tag.clone(),
				});
			}
		}
		if state.arg.locked || state.arg.deterministic {
			return Err(ar::error!(%tag, "the lockfile is out of date"));
		}
		let item = self
			.inner
			.index
			.try_get_tag(tag.clone())
			.await?
			.ok_or_else(|| ar::error!(%tag, "failed to find the tag"))?;
		let ar::tag::Item::Object(item) = item else {
			return Err(ar::error!(%tag, "expected the tag to point to an object"));
		};
		Ok(ar::Referent {
			item,
			path: None,
			tag: Some(tag),
		})
	}
}

/// Bundle strongly connected regions into graphs and compute every node's
/// data and ID bottom-up.
pub(super) fn create_objects(state: &mut State) -> ar::Result<()> {
	let mut graph = petgraph::graph::DiGraph::<usize, ()>::new();
	for index in 0..state.nodes.len() {
		let node_index = graph.add_node(index);
		debug_assert_eq!(node_index.index(), index);
	}
	for (index, node) in state.nodes.iter().enumerate() {
		let source = petgraph::graph::NodeIndex::new(index);
		match &node.variant {
			Variant::Directory(directory) => {
				for target in directory.entries.values() {
					graph.add_edge(source, petgraph::graph::NodeIndex::new(*target), ());
				}
			},
			Variant::File(file) => {
				for dependency in file.dependencies.values() {
					if let Dependency::Node(target) = dependency {
						graph.add_edge(source, petgraph::graph::NodeIndex::new(*target), ());
					}
				}
			},
			Variant::Symlink(symlink) => {
				if let Some(target) = symlink.node {
					graph.add_edge(source, petgraph::graph::NodeIndex::new(target), ());
				}
			},
		}
	}

	// Tarjan returns the strongly connected components in reverse
	// topological order, so every edge that leaves a component points at a
	// node whose ID has already been computed.
	let components = petgraph::algo::tarjan_scc(&graph);
	for component in components {
		let mut members = component
			.into_iter()
			.map(petgraph::graph::NodeIndex::index)
			.collect::<Vec<_>>();
		members.sort_unstable();
		let cyclic = members.len() > 1
			|| graph
				.find_edge(
					petgraph::graph::NodeIndex::new(members[0]),
					petgraph::graph::NodeIndex::new(members[0]),
				)
				.is_some();
		if cyclic {
			create_graph_objects(state, &members)?;
		} else {
			create_normal_object(state, members[0])?;
		}
	}

	Ok(())
}

fn create_normal_object(state: &mut State, index: usize) -> ar::Result<()> {
	let local = |_: usize| -> Option<usize> { None };
	let node = build_node(state, index, &local)?;
	let data = match node {
		ar::graph::data::Node::Directory(node) => {
			ar::artifact::Data::Directory(ar::directory::Data::Node(node))
		},
		ar::graph::data::Node::File(node) => ar::artifact::Data::File(ar::file::Data::Node(node)),
		ar::graph::data::Node::Symlink(node) => {
			ar::artifact::Data::Symlink(ar::symlink::Data::Node(node))
		},
	};
	let id = data.id()?;
	state.nodes[index].data = Some(data);
	state.nodes[index].id = Some(id);
	Ok(())
}

fn create_graph_objects(state: &mut State, members: &[usize]) -> ar::Result<()> {
	let local = |index: usize| -> Option<usize> {
		members.iter().position(|member| *member == index)
	};
	let mut nodes = Vec::with_capacity(members.len());
	for member in members {
		nodes.push(build_node(state, *member, &local)?);
	}
	let data = ar::graph::Data { nodes };
	let bytes = data.serialize()?;
	let id = ar::graph::Id::new(&bytes);
	state.graphs.push((id.clone(), data));

	for (local_index, member) in members.iter().enumerate() {
		let reference = ar::graph::data::Reference {
			graph: Some(id.clone()),
			node: local_index,
		};
		let data = match &state.nodes[*member].variant {
			Variant::Directory(_) => {
				ar::artifact::Data::Directory(ar::directory::Data::Reference(reference))
			},
			Variant::File(_) => ar::artifact::Data::File(ar::file::Data::Reference(reference)),
			Variant::Symlink(_) => {
				ar::artifact::Data::Symlink(ar::symlink::Data::Reference(reference))
			},
		};
		let id = data.id()?;
		state.nodes[*member].data = Some(data);
		state.nodes[*member].id = Some(id);
	}

	Ok(())
}

/// Build one graph node, encoding edges as local references within the
/// component and as object IDs outside it.
fn build_node(
	state: &State,
	index: usize,
	local: &dyn Fn(usize) -> Option<usize>,
) -> ar::Result<ar::graph::data::Node> {
	let node = &state.nodes[index];
	let node = match &node.variant {
		Variant::Directory(directory) => {
			let entries = directory
				.entries
				.iter()
				.map(|(name, target)| {
					let edge = artifact_edge(state, *target, local)?;
					Ok((name.clone(), edge))
				})
				.collect::<ar::Result<BTreeMap<_, _>>>()?;
			ar::graph::data::Node::Directory(ar::graph::data::Directory { entries })
		},
		Variant::File(file) => {
			let contents = ar::blob::Id::new(&file.contents);
			let dependencies = file
				.dependencies
				.iter()
				.map(|(reference, dependency)| {
					let referent = match dependency {
						Dependency::Node(target) => {
							let edge = object_edge(state, *target, local)?;
							let path = diff_paths(
								state.nodes[index].path.parent().unwrap(),
								&state.nodes[*target].path,
							);
							ar::Referent {
								item: edge,
								path: Some(path),
								tag: None,
							}
						},
						Dependency::Item(referent) => ar::Referent {
							item: ar::graph::data::Edge::Object(referent.item.clone()),
							path: referent.path.clone(),
							tag: referent.tag.clone(),
						},
					};
					Ok((reference.clone(), referent))
				})
				.collect::<ar::Result<BTreeMap<_, _>>>()?;
			ar::graph::data::Node::File(ar::graph::data::File {
				contents,
				dependencies,
				executable: file.executable,
			})
		},
		Variant::Symlink(symlink) => {
			// A symlink carries an artifact edge only when its target lies in
			// the same strongly connected component. Acyclic symlinks
			// canonicalize as their path text alone.
			let artifact = symlink.node.and_then(|target| {
				local(target).map(|node| {
					ar::graph::data::Edge::Reference(ar::graph::data::Reference {
						graph: None,
						node,
					})
				})
			});
			ar::graph::data::Node::Symlink(ar::graph::data::Symlink {
				artifact,
				path: Some(symlink.target.clone()),
			})
		},
	};
	Ok(node)
}

fn artifact_edge(
	state: &State,
	target: usize,
	local: &dyn Fn(usize) -> Option<usize>,
) -> ar::Result<ar::graph::data::Edge<ar::artifact::Id>> {
	if let Some(node) = local(target) {
		return Ok(ar::graph::data::Edge::Reference(
			ar::graph::data::Reference { graph: None, node },
		));
	}
	let id = state.nodes[target]
		.id
		.clone()
		.ok_or_else(|| ar::error!("expected the target's ID to be computed"))?;
	Ok(ar::graph::data::Edge::Object(id))
}

fn object_edge(
	state: &State,
	target: usize,
	local: &dyn Fn(usize) -> Option<usize>,
) -> ar::Result<ar::graph::data::Edge<ar::object::Id>> {
	let edge = artifact_edge(state, target, local)?;
	let edge = match edge {
		ar::graph::data::Edge::Reference(reference) => {
			ar::graph::data::Edge::Reference(reference)
		},
		ar::graph::data::Edge::Object(id) => ar::graph::data::Edge::Object(id.into()),
	};
	Ok(edge)
}
