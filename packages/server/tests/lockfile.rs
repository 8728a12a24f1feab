use arbor_client as ar;
use arbor_server::{Config, Server};
use arbor_temp::{self as temp, Temp};
use futures::FutureExt as _;
use std::panic::AssertUnwindSafe;

#[tokio::test]
async fn tag_resolutions_are_frozen_at_the_root() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		// Check in and tag the dependency package.
		let dependency = Temp::new();
		temp::directory! {
			"arbor.ts" => "export let name = \"dep\";",
		}
		.to_path(dependency.path())
		.await
		.map_err(|source| ar::error!(!source, "failed to write the artifact"))?;
		let output = server
			.checkin(ar::checkin::Arg::with_path(dependency.path().to_owned()))
			.await?;
		let dependency_id: ar::object::Id = output.referent.item.clone().into();
		let tag = "dep/1.0".parse::<ar::Tag>().unwrap();
		server
			.put_tag(
				&tag,
				ar::tag::put::Arg {
					item: dependency_id.clone().into(),
				},
			)
			.await?;

		// Check in a package that imports it by tag, with a nested
		// subpackage that only uses path imports.
		let package = Temp::new();
		temp::directory! {
			"arbor.ts" => r#"import * as dep from "dep/1.0";
import * as sub from "./sub/arbor.ts";"#,
			"sub" => temp::directory! {
				"arbor.ts" => "export let name = \"sub\";",
			},
		}
		.to_path(package.path())
		.await
		.map_err(|source| ar::error!(!source, "failed to write the artifact"))?;
		let output = server
			.checkin(ar::checkin::Arg::with_path(package.path().to_owned()))
			.await?;
		let id = output.referent.item.clone();

		// Exactly one lockfile exists, at the package root.
		let root_lockfile = package.path().join(ar::lockfile::LOCKFILE_FILE_NAME);
		assert!(tokio::fs::symlink_metadata(&root_lockfile).await.is_ok());
		assert!(
			tokio::fs::symlink_metadata(
				package.path().join("sub").join(ar::lockfile::LOCKFILE_FILE_NAME),
			)
			.await
			.is_err()
		);
		let lockfile = ar::Lockfile::deserialize(
			tokio::fs::read(&root_lockfile)
				.await
				.map_err(|source| ar::error!(!source, "failed to read the lockfile"))?,
		)?;
		assert_eq!(lockfile.dependencies.len(), 1);
		let entry = lockfile.dependencies.values().next().unwrap();
		assert_eq!(entry.item, Some(dependency_id.clone()));
		assert_eq!(entry.tag, Some(tag.clone()));

		// The lockfile is not part of the artifact.
		let data = server.try_get_object(&id.clone().into()).await?.unwrap();
		let ar::object::Data::Directory(ar::directory::Data::Node(node)) = data else {
			return Err(ar::error!("expected a directory node"));
		};
		assert!(!node.entries.contains_key(ar::lockfile::LOCKFILE_FILE_NAME));

		// After round-tripping, the resolution comes from the lockfile even
		// if the registry moved on, and exactly one lockfile is produced at
		// the root.
		server.delete_tag(&tag).await?;
		let checkout = Temp::new();
		let path = server
			.checkout(ar::checkout::Arg::with_artifact_and_path(
				id.clone(),
				checkout.path().to_owned(),
			))
			.await?
			.path;
		assert!(
			tokio::fs::symlink_metadata(path.join(ar::lockfile::LOCKFILE_FILE_NAME))
				.await
				.is_ok()
		);
		assert!(
			tokio::fs::symlink_metadata(
				path.join("sub").join(ar::lockfile::LOCKFILE_FILE_NAME),
			)
			.await
			.is_err()
		);
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
async fn locked_requires_a_lockfile() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let package = Temp::new();
		temp::directory! {
			"arbor.ts" => r#"import * as dep from "dep/1.0";"#,
		}
		.to_path(package.path())
		.await
		.map_err(|source| ar::error!(!source, "failed to write the artifact"))?;

		let mut arg = ar::checkin::Arg::with_path(package.path().to_owned());
		arg.locked = true;
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
