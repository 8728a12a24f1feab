use arbor_client as ar;
use arbor_server::{Config, Server};
use arbor_temp::Temp;
use bytes::Bytes;
use futures::FutureExt as _;
use std::panic::AssertUnwindSafe;

#[tokio::test]
async fn put_get_delete() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let blob = server.put_blob(Bytes::from_static(b"hello")).await?;
		let item: ar::tag::Item = ar::object::Id::from(blob).into();
		let tag = "hello/1.0".parse::<ar::Tag>().unwrap();
		server
			.put_tag(&tag, ar::tag::put::Arg { item: item.clone() })
			.await?;

		let output = server.try_get_tag(&tag).await?.unwrap();
		assert_eq!(output.item, item);

		let output = server.delete_tag(&tag).await?;
		assert_eq!(output.item, Some(item));
		assert!(server.try_get_tag(&tag).await?.is_none());

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
async fn put_requires_a_stored_item() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let item: ar::tag::Item =
			ar::object::Id::new(ar::object::Kind::File, b"missing").into();
		let tag = "missing".parse::<ar::Tag>().unwrap();
		let result = server.put_tag(&tag, ar::tag::put::Arg { item }).await;
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
async fn overwrite_transfers_the_reference() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let o1 = ar::object::Id::from(server.put_blob(Bytes::from_static(b"one")).await?);
		let o2 = ar::object::Id::from(server.put_blob(Bytes::from_static(b"two")).await?);
		let tag = "a".parse::<ar::Tag>().unwrap();
		server
			.put_tag(&tag, ar::tag::put::Arg { item: o1.clone().into() })
			.await?;
		server
			.put_tag(&tag, ar::tag::put::Arg { item: o2.clone().into() })
			.await?;

		let output = server.try_get_tag(&tag).await?.unwrap();
		assert_eq!(output.item, o2.clone().into());

		// After quiescence, the displaced item is unreferenced and the
		// collector reclaims it, while the tagged item stays.
		server.index().await?;
		server.clean().await?;
		assert!(server.try_get_object(&o1).await?.is_none());
		assert!(server.try_get_object(&o2).await?.is_some());

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
async fn list_by_prefix() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let item: ar::tag::Item =
			ar::object::Id::from(server.put_blob(Bytes::from_static(b"payload")).await?).into();
		for tag in ["std/1.0", "std/1.1", "other/1.0"] {
			let tag = tag.parse::<ar::Tag>().unwrap();
			server
				.put_tag(&tag, ar::tag::put::Arg { item: item.clone() })
				.await?;
		}

		let output = server
			.list_tags(ar::tag::list::Arg {
				length: None,
				prefix: Some("std".parse().unwrap()),
			})
			.await?;
		let tags = output
			.data
			.iter()
			.map(|output| output.tag.to_string())
			.collect::<Vec<_>>();
		assert_eq!(tags, vec!["std/1.0", "std/1.1"]);

		let output = server.list_tags(ar::tag::list::Arg::default()).await?;
		assert_eq!(output.data.len(), 3);

		Ok::<_, ar::Error>(())
	})
	.catch_unwind()
	.await;
	server.stop();
	server.wait().await;
	temp.remove().await.ok();
	result.unwrap()
}
