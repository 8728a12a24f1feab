use arbor_client as ar;
use arbor_server::{Config, Server};
use arbor_temp::Temp;
use futures::FutureExt as _;
use std::panic::AssertUnwindSafe;

fn command() -> ar::command::Data {
	ar::command::Data {
		args: vec!["echo".to_owned(), "hello".to_owned()],
		cwd: None,
		env: std::collections::BTreeMap::new(),
		executable: ar::command::data::Executable::Path(ar::command::data::PathExecutable {
			path: "/bin/sh".into(),
		}),
		host: "x86_64-linux".to_owned(),
		mounts: Vec::new(),
		stdin: None,
	}
}

#[tokio::test]
async fn put_get_and_metadata() -> ar::Result<()> {
	let temp = Temp::new();
	let options = Config::with_path(temp.path().to_owned());
	let server = Server::start(options).await?;
	let result = AssertUnwindSafe(async {
		let command_id = server
			.put_object(&ar::object::Data::Command(command()))
			.await?;
		let log = server.put_blob("the process log".into()).await?;

		let created_at = time::OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
		let child = ar::process::Data {
			children: Vec::new(),
			command: command_id.clone().try_unwrap_command().unwrap(),
			created_at,
			error: None,
			exit: Some(0),
			finished_at: None,
			log: Some(log.clone()),
			output: None,
			started_at: None,
		};
		let child_id = server.put_process(&child).await?;

		let parent = ar::process::Data {
			children: vec![child_id.clone()],
			command: command_id.clone().try_unwrap_command().unwrap(),
			created_at,
			error: None,
			exit: Some(0),
			finished_at: None,
			log: None,
			output: None,
			started_at: None,
		};
		let parent_id = server.put_process(&parent).await?;

		// The data round trips through the store.
		let data = server.try_get_process(&child_id).await?.unwrap();
		assert_eq!(data.id()?, child_id);
		assert_eq!(data.log, Some(log));

		// The rollups converge.
		server.index().await?;
		let metadata = server
			.try_get_process_metadata(&parent_id)
			.await?
			.unwrap();
		assert!(metadata.subtree_stored);
		assert_eq!(metadata.subtree_count, Some(2));
		assert!(metadata.command.stored);
		assert_eq!(metadata.command.count, Some(2));
		assert!(metadata.log.stored);
		assert_eq!(metadata.log.count, Some(1));
		assert!(metadata.output.stored);
		assert_eq!(metadata.output.count, Some(0));

		// Identity is a pure function of the canonical form.
		let same = server.put_process(&parent).await?;
		assert_eq!(same, parent_id);

		Ok::<_, ar::Error>(())
	})
	.catch_unwind()
	.await;
	server.stop();
	server.wait().await;
	temp.remove().await.ok();
	result.unwrap()
}
