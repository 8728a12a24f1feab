use arbor_client as ar;
use arbor_server::{Config, Server};
use arbor_temp::{self as temp, Temp};
use futures::FutureExt as _;
use std::panic::AssertUnwindSafe;

#[tokio::test]
async fn directory_with_symlink_and_nested_back_link() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let directory = Temp::new();
		temp::directory! {
			"hello.txt" => "hello, world!",
			"link" => temp::symlink!("hello.txt"),
			"child" => temp::directory! {
				"link" => temp::symlink!("../link"),
			},
		}
		.to_path(directory.path())
		.await
		.map_err(|source| ar::error!(!source, "failed to write the artifact"))?;

		let arg = ar::checkin::Arg::with_path(directory.path().to_owned());
		let output = server.checkin(arg).await?;
		let id = output.referent.item.clone();

		// The root is a directory with three entries.
		let data = server.try_get_object(&id.clone().into()).await?.unwrap();
		let ar::object::Data::Directory(ar::directory::Data::Node(node)) = data else {
			return Err(ar::error!("expected a directory node"));
		};
		assert_eq!(node.entries.len(), 3);
		assert!(node.entries.contains_key("hello.txt"));
		assert!(node.entries.contains_key("link"));
		assert!(node.entries.contains_key("child"));

		// Once propagation completes, the subtree counts five nodes: the
		// root, hello.txt, link, child, and child/link.
		server.index().await?;
		let metadata = server
			.try_get_object_metadata(&id.clone().into())
			.await?
			.unwrap();
		assert!(metadata.subtree_stored);
		assert_eq!(metadata.subtree_count, Some(5));
		assert_eq!(metadata.subtree_depth, Some(3));

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
async fn file() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let directory = Temp::new();
		temp::directory! {
			"README.md" => "Hello, World!",
		}
		.to_path(directory.path())
		.await
		.map_err(|source| ar::error!(!source, "failed to write the artifact"))?;

		let arg = ar::checkin::Arg::with_path(directory.path().join("README.md"));
		let output = server.checkin(arg).await?;
		let id = output.referent.item.clone();
		assert!(matches!(id, ar::artifact::Id::File(_)));

		let data = server.try_get_object(&id.clone().into()).await?.unwrap();
		let ar::object::Data::File(ar::file::Data::Node(node)) = data else {
			return Err(ar::error!("expected a file node"));
		};
		assert!(!node.executable);
		let contents = server.try_get_blob(&node.contents).await?.unwrap();
		assert_eq!(contents.as_ref(), b"Hello, World!");

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
async fn executable_file() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let directory = Temp::new();
		temp::directory! {
			"executable" => temp::file!("", executable = true),
		}
		.to_path(directory.path())
		.await
		.map_err(|source| ar::error!(!source, "failed to write the artifact"))?;

		let arg = ar::checkin::Arg::with_path(directory.path().to_owned());
		let output = server.checkin(arg).await?;
		let id = output.referent.item.clone();

		// The canonical form carries the executable bit.
		let data = server.try_get_object(&id.clone().into()).await?.unwrap();
		let ar::object::Data::Directory(ar::directory::Data::Node(node)) = data else {
			return Err(ar::error!("expected a directory node"));
		};
		let ar::graph::data::Edge::Object(file) = node.entries.get("executable").unwrap() else {
			return Err(ar::error!("expected an object edge"));
		};
		let bytes = server
			.try_get_object(&file.clone().into())
			.await?
			.unwrap()
			.serialize()?;
		assert!(std::str::from_utf8(&bytes).unwrap().contains("executable"));

		// The bit survives the round trip.
		let checkout = Temp::new();
		let path = server
			.checkout(ar::checkout::Arg::with_artifact_and_path(
				id.clone(),
				checkout.path().to_owned(),
			))
			.await?
			.path;
		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt as _;
			let metadata = tokio::fs::symlink_metadata(path.join("executable"))
				.await
				.map_err(|source| ar::error!(!source, "failed to get the metadata"))?;
			assert_ne!(metadata.permissions().mode() & 0o111, 0);
		}
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
async fn hard_links_are_coalesced() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let directory = Temp::new();
		temp::directory! {
			"a" => "same contents",
		}
		.to_path(directory.path())
		.await
		.map_err(|source| ar::error!(!source, "failed to write the artifact"))?;
		std::fs::hard_link(directory.path().join("a"), directory.path().join("b"))
			.map_err(|source| ar::error!(!source, "failed to create the hard link"))?;

		let arg = ar::checkin::Arg::with_path(directory.path().to_owned());
		let output = server.checkin(arg).await?;
		let id = output.referent.item.clone();
		let data = server.try_get_object(&id.clone().into()).await?.unwrap();
		let ar::object::Data::Directory(ar::directory::Data::Node(node)) = data else {
			return Err(ar::error!("expected a directory node"));
		};
		let a = node.entries.get("a").unwrap().to_string();
		let b = node.entries.get("b").unwrap().to_string();
		assert_eq!(a, b);

		// Both entries count as one node plus the root.
		server.index().await?;
		let metadata = server
			.try_get_object_metadata(&id.clone().into())
			.await?
			.unwrap();
		assert_eq!(metadata.subtree_count, Some(2));

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
async fn absolute_symlink_is_external() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let directory = Temp::new();
		temp::directory! {
			"link" => temp::symlink!("/nonexistent/target"),
		}
		.to_path(directory.path())
		.await
		.map_err(|source| ar::error!(!source, "failed to write the artifact"))?;

		let arg = ar::checkin::Arg::with_path(directory.path().to_owned());
		let output = server.checkin(arg).await?;
		let id = output.referent.item.clone();
		let data = server.try_get_object(&id.clone().into()).await?.unwrap();
		let ar::object::Data::Directory(ar::directory::Data::Node(node)) = data else {
			return Err(ar::error!("expected a directory node"));
		};
		let ar::graph::data::Edge::Object(ar::artifact::Id::Symlink(link)) =
			node.entries.get("link").unwrap()
		else {
			return Err(ar::error!("expected a symlink"));
		};
		let data = server.try_get_object(&link.clone().into()).await?.unwrap();
		let ar::object::Data::Symlink(ar::symlink::Data::Node(node)) = data else {
			return Err(ar::error!("expected a symlink node"));
		};
		assert!(node.artifact.is_none());
		assert_eq!(node.path.as_deref(), Some("/nonexistent/target".as_ref()));

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
async fn escaping_symlink_is_an_error() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let directory = Temp::new();
		temp::directory! {
			"inner" => temp::directory! {
				"link" => temp::symlink!("../../outside"),
			},
		}
		.to_path(directory.path())
		.await
		.map_err(|source| ar::error!(!source, "failed to write the artifact"))?;

		let arg = ar::checkin::Arg::with_path(directory.path().join("inner"));
		let result = server.checkin(arg).await;
		assert!(result.is_err());

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
async fn canonical_determinism() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		// Two structurally equal trees produce the same ID.
		let first = Temp::new();
		let second = Temp::new();
		let artifact = temp::directory! {
			"a" => temp::directory! {
				"b.txt" => "b",
			},
			"c.txt" => "c",
		};
		artifact
			.to_path(first.path())
			.await
			.map_err(|source| ar::error!(!source, "failed to write the artifact"))?;
		artifact
			.to_path(second.path())
			.await
			.map_err(|source| ar::error!(!source, "failed to write the artifact"))?;

		let left = server
			.checkin(ar::checkin::Arg::with_path(first.path().to_owned()))
			.await?;
		let right = server
			.checkin(ar::checkin::Arg::with_path(second.path().to_owned()))
			.await?;
		assert_eq!(left.referent.item, right.referent.item);

		Ok::<_, ar::Error>(())
	})
	.catch_unwind()
	.await;
	server.stop();
	server.wait().await;
	temp.remove().await.ok();
	result.unwrap()
}
