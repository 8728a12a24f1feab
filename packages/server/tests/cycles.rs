use arbor_client as ar;
use arbor_server::{Config, Server};
use arbor_temp::{self as temp, Temp};
use futures::FutureExt as _;
use std::panic::AssertUnwindSafe;

#[tokio::test]
async fn self_cycle_symlink() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let directory = Temp::new();
		temp::directory! {
			"link" => temp::symlink!("."),
		}
		.to_path(directory.path())
		.await
		.map_err(|source| ar::error!(!source, "failed to write the artifact"))?;

		let arg = ar::checkin::Arg::with_path(directory.path().to_owned());
		let output = server.checkin(arg).await?;
		let id = output.referent.item.clone();

		// The ID is stable across repeated check-ins.
		let arg = ar::checkin::Arg::with_path(directory.path().to_owned());
		let again = server.checkin(arg).await?;
		assert_eq!(again.referent.item, id);

		// The stored form is one graph carrying the cycle: the symlink node
		// points back to the directory node.
		let data = server.try_get_object(&id.clone().into()).await?.unwrap();
		let ar::object::Data::Directory(ar::directory::Data::Reference(reference)) = data
		else {
			return Err(ar::error!("expected a graph reference"));
		};
		let graph = reference.graph.clone().unwrap();
		let data = server.try_get_object(&graph.clone().into()).await?.unwrap();
		let ar::object::Data::Graph(data) = data else {
			return Err(ar::error!("expected a graph"));
		};
		assert_eq!(data.nodes.len(), 2);
		let directory_index = reference.node;
		let symlink_index = 1 - directory_index;
		let ar::graph::data::Node::Symlink(symlink) = &data.nodes[symlink_index] else {
			return Err(ar::error!("expected a symlink node"));
		};
		let Some(ar::graph::data::Edge::Reference(back)) = &symlink.artifact else {
			return Err(ar::error!("expected a back edge"));
		};
		assert!(back.graph.is_none());
		assert_eq!(back.node, directory_index);

		// The round trip preserves the ID.
		let checkout = Temp::new();
		let path = server
			.checkout(ar::checkout::Arg::with_artifact_and_path(
				id.clone(),
				checkout.path().to_owned(),
			))
			.await?
			.path;
		let second = server.checkin(ar::checkin::Arg::with_path(path)).await?;
		assert_eq!(second.referent.item, id);

		Ok::<_, ar::Error>(())
	})
	.catch_unwind()
	.await;
	server.stop();
	server.wait().await;
	temp.remove().await.ok();
	result.unwrap()
}

#[tokio::test]
async fn cyclic_module_imports() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let directory = Temp::new();
		temp::directory! {
			"arbor.ts" => r#"import * as dep from "./dependency.ar.ts";"#,
			"dependency.ar.ts" => r#"import * as root from "./arbor.ts";"#,
		}
		.to_path(directory.path())
		.await
		.map_err(|source| ar::error!(!source, "failed to write the artifact"))?;

		let arg = ar::checkin::Arg::with_path(directory.path().to_owned());
		let output = server.checkin(arg).await?;
		let id = output.referent.item.clone();

		// Both files live in one graph, and each file's dependency edge is a
		// pointer to the other node.
		let data = server.try_get_object(&id.clone().into()).await?.unwrap();
		let ar::object::Data::Directory(ar::directory::Data::Node(node)) = data else {
			return Err(ar::error!("expected a directory node"));
		};
		let mut graphs = Vec::new();
		for name in ["arbor.ts", "dependency.ar.ts"] {
			let ar::graph::data::Edge::Object(ar::artifact::Id::File(file)) =
				node.entries.get(name).unwrap()
			else {
				return Err(ar::error!("expected a file"));
			};
			let data = server.try_get_object(&file.clone().into()).await?.unwrap();
			let ar::object::Data::File(ar::file::Data::Reference(reference)) = data else {
				return Err(ar::error!("expected a graph reference"));
			};
			graphs.push((reference.graph.clone().unwrap(), reference.node));
		}
		assert_eq!(graphs[0].0, graphs[1].0);
		let graph = graphs[0].0.clone();
		let data = server.try_get_object(&graph.into()).await?.unwrap();
		let ar::object::Data::Graph(data) = data else {
			return Err(ar::error!("expected a graph"));
		};
		assert_eq!(data.nodes.len(), 2);
		for (index, other) in [(graphs[0].1, graphs[1].1), (graphs[1].1, graphs[0].1)] {
			let ar::graph::data::Node::File(file) = &data.nodes[index] else {
				return Err(ar::error!("expected a file node"));
			};
			assert_eq!(file.dependencies.len(), 1);
			let referent = file.dependencies.values().next().unwrap();
			let ar::graph::data::Edge::Reference(reference) = &referent.item else {
				return Err(ar::error!("expected a reference edge"));
			};
			assert!(reference.graph.is_none());
			assert_eq!(reference.node, other);
		}

		// The ID is deterministic across repeated check-ins.
		let arg = ar::checkin::Arg::with_path(directory.path().to_owned());
		let again = server.checkin(arg).await?;
		assert_eq!(again.referent.item, id);

		// The round trip preserves the ID.
		let checkout = Temp::new();
		let path = server
			.checkout(ar::checkout::Arg::with_artifact_and_path(
				id.clone(),
				checkout.path().to_owned(),
			))
			.await?
			.path;
		let second = server.checkin(ar::checkin::Arg::with_path(path)).await?;
		assert_eq!(second.referent.item, id);

		Ok::<_, ar::Error>(())
	})
	.catch_unwind()
	.await;
	server.stop();
	server.wait().await;
	temp.remove().await.ok();
	result.unwrap()
}
