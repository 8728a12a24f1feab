use arbor_client as ar;
use arbor_server::{Config, Server};
use arbor_temp::{self as temp, Temp};
use futures::FutureExt as _;
use std::panic::AssertUnwindSafe;

#[tokio::test]
async fn tagged_subtrees_survive() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let directory = Temp::new();
		temp::directory! {
			"file.txt" => "contents",
		}
		.to_path(directory.path())
		.await
		.map_err(|source| ar::error!(!source, "failed to write the artifact"))?;
		let output = server
			.checkin(ar::checkin::Arg::with_path(directory.path().to_owned()))
			.await?;
		let root: ar::object::Id = output.referent.item.clone().into();

		let tag = "root".parse::<ar::Tag>().unwrap();
		server
			.put_tag(&tag, ar::tag::put::Arg { item: root.clone().into() })
			.await?;
		server.index().await?;

		// Nothing reachable from the tag is removed.
		let output = server.clean().await?;
		assert_eq!(output.objects, 0);
		assert_eq!(output.cache_entries, 0);
		assert!(server.try_get_object(&root).await?.is_some());

		// Once the tag is deleted and the queues quiesce, the collector
		// removes the tree and reports the reclaimed bytes.
		let metadata = server.try_get_object_metadata(&root).await?.unwrap();
		let subtree_size = metadata.subtree_size.unwrap();
		server.delete_tag(&tag).await?;
		server.index().await?;
		let output = server.clean().await?;
		assert_eq!(output.objects, 2);
		assert_eq!(output.cache_entries, 1);
		assert_eq!(output.bytes, subtree_size);
		assert!(server.try_get_object(&root).await?.is_none());

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
async fn retention_keeps_recent_items() -> ar::Result<()> {
	let temp = Temp::new();
	let mut options = Config::with_path(temp.path().to_owned());
	options.retention = std::time::Duration::from_secs(3600);
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let blob = server.put_blob("recent".into()).await?;
		let id: ar::object::Id = blob.into();
		server.index().await?;

		// The object is unreferenced but was touched within the retention
		// window.
		let output = server.clean().await?;
		assert_eq!(output.objects, 0);
		assert!(server.try_get_object(&id).await?.is_some());

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
async fn touch_keeps_an_item_alive() -> ar::Result<()> {
	let temp = Temp::new();
	let mut options = Config::with_path(temp.path().to_owned());
	options.retention = std::time::Duration::from_secs(3600);
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let blob = server.put_blob("touched".into()).await?;
		let id: ar::object::Id = blob.clone().into();
		server.index().await?;
		server.touch_object(&id).await?;

		let output = server.clean().await?;
		assert_eq!(output.objects, 0);
		assert!(server.try_get_object(&id).await?.is_some());
		assert!(server.try_get_blob(&blob).await?.is_some());

		Ok::<_, ar::Error>(())
	})
	.catch_unwind()
	.await;
	server.stop();
	server.wait().await;
	temp.remove().await.ok();
	result.unwrap()
}
