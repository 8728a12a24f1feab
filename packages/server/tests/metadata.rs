use arbor_client as ar;
use arbor_server::{Config, Server};
use arbor_temp::{self as temp, Temp};
use futures::FutureExt as _;
use pretty_assertions::assert_eq;
use std::panic::AssertUnwindSafe;

#[tokio::test]
async fn subtree_rollups_are_consistent() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let directory = Temp::new();
		temp::directory! {
			"outer" => temp::directory! {
				"inner" => temp::directory! {
					"leaf.txt" => "leaf",
				},
			},
		}
		.to_path(directory.path())
		.await
		.map_err(|source| ar::error!(!source, "failed to write the artifact"))?;

		let output = server
			.checkin(ar::checkin::Arg::with_path(directory.path().to_owned()))
			.await?;
		let root: ar::object::Id = output.referent.item.clone().into();
		server.index().await?;

		let metadata = server.try_get_object_metadata(&root).await?.unwrap();
		assert!(metadata.subtree_stored);
		assert_eq!(metadata.subtree_count, Some(4));
		assert_eq!(metadata.subtree_depth, Some(4));

		// The size rollup is the sum of the node sizes along the chain.
		let data = server.try_get_object(&root).await?.unwrap();
		let mut expected = metadata.node_size;
		let mut children = data.children();
		while let Some(child) = children.pop_first() {
			let metadata = server.try_get_object_metadata(&child).await?.unwrap();
			expected += metadata.node_size;
			children.extend(server.try_get_object(&child).await?.unwrap().children());
		}
		assert_eq!(metadata.subtree_size, Some(expected));

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
async fn missing_object_has_no_metadata() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let id = ar::object::Id::new(ar::object::Kind::Directory, b"missing");
		assert!(server.try_get_object_metadata(&id).await?.is_none());
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
async fn incomplete_subtrees_report_unstored() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		// Put a file whose contents blob exists, referencing nothing, then a
		// directory whose child was never put.
		let blob = server.put_blob("contents".into()).await?;
		let file = ar::graph::data::File {
			contents: blob,
			dependencies: std::collections::BTreeMap::new(),
			executable: false,
		};
		let file = ar::object::Data::File(ar::file::Data::Node(file));
		let file_id = server.put_object(&file).await?;

		let missing = ar::directory::Id::new(b"never stored");
		let mut entries = std::collections::BTreeMap::new();
		entries.insert(
			"present".to_owned(),
			ar::graph::data::Edge::Object(file_id.clone().try_into().unwrap()),
		);
		entries.insert(
			"missing".to_owned(),
			ar::graph::data::Edge::Object(ar::artifact::Id::Directory(missing)),
		);
		let directory = ar::object::Data::Directory(ar::directory::Data::Node(
			ar::graph::data::Directory { entries },
		));
		let directory_id = server.put_object(&directory).await?;
		server.index().await?;

		let metadata = server.try_get_object_metadata(&file_id).await?.unwrap();
		assert!(metadata.subtree_stored);

		let metadata = server
			.try_get_object_metadata(&directory_id)
			.await?
			.unwrap();
		assert!(!metadata.subtree_stored);
		assert_eq!(metadata.subtree_count, None);

		Ok::<_, ar::Error>(())
	})
	.catch_unwind()
	.await;
	server.stop();
	server.wait().await;
	temp.remove().await.ok();
	result.unwrap()
}
