use crate::{Index, Messages, ProcessObjectKind, PutObjectArg, PutProcessArg};
use arbor_client as ar;
use pretty_assertions::assert_eq;

fn object_id(bytes: &[u8]) -> ar::object::Id {
	ar::object::Id::new(ar::object::Kind::File, bytes)
}

fn directory_id(bytes: &[u8]) -> ar::object::Id {
	ar::object::Id::new(ar::object::Kind::Directory, bytes)
}

fn put_object_arg(id: ar::object::Id, children: Vec<ar::object::Id>) -> PutObjectArg {
	PutObjectArg {
		id,
		cache_entry: None,
		children,
		metadata: None,
		node_size: 10,
		touched_at: time::OffsetDateTime::now_utc(),
	}
}

async fn quiesce(index: &Index) -> u64 {
	let mut total = 0;
	loop {
		let processed = index.handle_queue(64).await.unwrap();
		if processed == 0 {
			break;
		}
		total += processed;
	}
	total
}

#[tokio::test]
async fn subtree_rollups_propagate() {
	let index = Index::open_in_memory().await.unwrap();
	let leaf = object_id(b"leaf");
	let root = directory_id(b"root");
	let mut messages = Messages::default();
	messages.put_object(put_object_arg(root.clone(), vec![leaf.clone()]));
	messages.put_object(put_object_arg(leaf.clone(), vec![]));
	index.handle_messages(messages).await.unwrap();

	quiesce(&index).await;

	let metadata = index
		.try_get_object_metadata(root.clone())
		.await
		.unwrap()
		.unwrap();
	assert!(metadata.subtree_stored);
	assert_eq!(metadata.subtree_count, Some(2));
	assert_eq!(metadata.subtree_depth, Some(2));
	assert_eq!(metadata.subtree_size, Some(20));

	let leaf_object = index.try_get_object(leaf).await.unwrap().unwrap();
	assert_eq!(leaf_object.reference_count, Some(1));
	let root_object = index.try_get_object(root).await.unwrap().unwrap();
	assert_eq!(root_object.reference_count, Some(0));
}

#[tokio::test]
async fn rollups_propagate_across_batches() {
	let index = Index::open_in_memory().await.unwrap();
	let leaf = object_id(b"leaf");
	let root = directory_id(b"root");

	// Put the parent first. Its subtree cannot complete yet.
	let mut messages = Messages::default();
	messages.put_object(put_object_arg(root.clone(), vec![leaf.clone()]));
	index.handle_messages(messages).await.unwrap();
	quiesce(&index).await;
	let metadata = index
		.try_get_object_metadata(root.clone())
		.await
		.unwrap()
		.unwrap();
	assert!(!metadata.subtree_stored);

	// The child's arrival completes the parent.
	let mut messages = Messages::default();
	messages.put_object(put_object_arg(leaf.clone(), vec![]));
	index.handle_messages(messages).await.unwrap();
	quiesce(&index).await;
	let metadata = index
		.try_get_object_metadata(root.clone())
		.await
		.unwrap()
		.unwrap();
	assert!(metadata.subtree_stored);
	assert_eq!(metadata.subtree_count, Some(2));

	// The child's reference count includes the edge that arrived after it.
	let leaf_object = index.try_get_object(leaf).await.unwrap().unwrap();
	assert_eq!(leaf_object.reference_count, Some(1));
}

#[tokio::test]
async fn queue_converges() {
	let index = Index::open_in_memory().await.unwrap();
	let mut messages = Messages::default();
	let mut previous = None;
	for i in 0..10u32 {
		let id = directory_id(&i.to_le_bytes());
		let children = previous.take().map(|child| vec![child]).unwrap_or_default();
		messages.put_object(put_object_arg(id.clone(), children));
		previous = Some(id);
	}
	index.handle_messages(messages).await.unwrap();

	quiesce(&index).await;
	assert_eq!(index.queue_depth().await.unwrap(), 0);
	for _ in 0..3 {
		assert_eq!(index.handle_queue(16).await.unwrap(), 0);
	}
}

#[tokio::test]
async fn tag_overwrite_transfers_reference_counts() {
	let index = Index::open_in_memory().await.unwrap();
	let o1 = object_id(b"o1");
	let o2 = object_id(b"o2");
	let tag = "a".parse::<ar::Tag>().unwrap();
	let mut messages = Messages::default();
	messages.put_object(put_object_arg(o1.clone(), vec![]));
	messages.put_object(put_object_arg(o2.clone(), vec![]));
	messages.put_tag(tag.clone(), o1.clone().into());
	index.handle_messages(messages).await.unwrap();
	quiesce(&index).await;

	let item = index.try_get_tag(tag.clone()).await.unwrap().unwrap();
	assert_eq!(item, o1.clone().into());
	assert_eq!(
		index
			.try_get_object(o1.clone())
			.await
			.unwrap()
			.unwrap()
			.reference_count,
		Some(1),
	);

	let mut messages = Messages::default();
	messages.put_tag(tag.clone(), o2.clone().into());
	index.handle_messages(messages).await.unwrap();
	quiesce(&index).await;

	let item = index.try_get_tag(tag.clone()).await.unwrap().unwrap();
	assert_eq!(item, o2.clone().into());
	assert_eq!(
		index
			.try_get_object(o1.clone())
			.await
			.unwrap()
			.unwrap()
			.reference_count,
		Some(0),
	);
	assert_eq!(
		index
			.try_get_object(o2.clone())
			.await
			.unwrap()
			.unwrap()
			.reference_count,
		Some(1),
	);
}

#[tokio::test]
async fn clean_preserves_tagged_subtrees() {
	let index = Index::open_in_memory().await.unwrap();
	let o1 = directory_id(b"o1");
	let o2 = object_id(b"o2");
	let tag = "root".parse::<ar::Tag>().unwrap();
	let mut messages = Messages::default();
	messages.put_object(put_object_arg(o1.clone(), vec![o2.clone()]));
	messages.put_object(put_object_arg(o2.clone(), vec![]));
	messages.put_tag(tag.clone(), o1.clone().into());
	index.handle_messages(messages).await.unwrap();
	quiesce(&index).await;

	let output = index
		.clean(time::OffsetDateTime::now_utc(), 100)
		.await
		.unwrap();
	assert!(output.objects.is_empty());
	assert!(index.try_get_object(o1.clone()).await.unwrap().is_some());
	assert!(index.try_get_object(o2.clone()).await.unwrap().is_some());

	let mut messages = Messages::default();
	messages.delete_tag(tag);
	index.handle_messages(messages).await.unwrap();
	quiesce(&index).await;

	let mut bytes = 0;
	let mut removed = Vec::new();
	loop {
		let output = index
			.clean(time::OffsetDateTime::now_utc(), 100)
			.await
			.unwrap();
		if output.objects.is_empty() {
			break;
		}
		bytes += output.bytes;
		removed.extend(output.objects);
	}
	assert_eq!(removed.len(), 2);
	assert_eq!(bytes, 20);
	assert!(index.try_get_object(o1).await.unwrap().is_none());
	assert!(index.try_get_object(o2).await.unwrap().is_none());
}

#[tokio::test]
async fn touch_keeps_items_out_of_the_clean_window() {
	let index = Index::open_in_memory().await.unwrap();
	let id = object_id(b"touched");
	let mut messages = Messages::default();
	messages.put_object(put_object_arg(id.clone(), vec![]));
	index.handle_messages(messages).await.unwrap();
	quiesce(&index).await;

	let mut messages = Messages::default();
	messages.touch_object(
		id.clone(),
		time::OffsetDateTime::now_utc() + time::Duration::hours(1),
	);
	index.handle_messages(messages).await.unwrap();

	let output = index
		.clean(time::OffsetDateTime::now_utc(), 100)
		.await
		.unwrap();
	assert!(output.objects.is_empty());
	assert!(index.try_get_object(id).await.unwrap().is_some());
}

#[tokio::test]
async fn cache_entry_reference_counts() {
	let index = Index::open_in_memory().await.unwrap();
	let blob = ar::blob::Id::new(b"contents");
	let file = object_id(b"file");
	let mut messages = Messages::default();
	messages.put_cache_entry(blob.clone(), time::OffsetDateTime::now_utc());
	messages.put_object(PutObjectArg {
		id: file.clone(),
		cache_entry: Some(blob.clone()),
		children: vec![],
		metadata: None,
		node_size: 10,
		touched_at: time::OffsetDateTime::now_utc(),
	});
	index.handle_messages(messages).await.unwrap();
	quiesce(&index).await;

	let cache_entry = index
		.try_get_cache_entry(blob.clone())
		.await
		.unwrap()
		.unwrap();
	assert_eq!(cache_entry.reference_count, Some(1));

	// The cache entry survives cleaning while the file references it.
	let output = index
		.clean(time::OffsetDateTime::now_utc(), 100)
		.await
		.unwrap();
	assert!(output.cache_entries.is_empty());
	assert_eq!(output.objects.len(), 1);

	// With the file gone, the next batch reclaims the cache entry.
	let output = index
		.clean(time::OffsetDateTime::now_utc(), 100)
		.await
		.unwrap();
	assert_eq!(output.cache_entries.len(), 1);
	assert!(index.try_get_cache_entry(blob).await.unwrap().is_none());
}

#[tokio::test]
async fn process_lanes_propagate() {
	let index = Index::open_in_memory().await.unwrap();
	let command = ar::object::Id::new(ar::object::Kind::Command, b"command");
	let log = ar::object::Id::new(ar::object::Kind::Blob, b"log");
	let child = ar::process::Id::new(b"child");
	let parent = ar::process::Id::new(b"parent");
	let mut messages = Messages::default();
	messages.put_object(put_object_arg(command.clone(), vec![]));
	messages.put_object(put_object_arg(log.clone(), vec![]));
	messages.put_process(PutProcessArg {
		id: child.clone(),
		children: vec![],
		objects: vec![
			(command.clone(), ProcessObjectKind::Command),
			(log.clone(), ProcessObjectKind::Log),
		],
		touched_at: time::OffsetDateTime::now_utc(),
	});
	messages.put_process(PutProcessArg {
		id: parent.clone(),
		children: vec![child.clone()],
		objects: vec![(command.clone(), ProcessObjectKind::Command)],
		touched_at: time::OffsetDateTime::now_utc(),
	});
	index.handle_messages(messages).await.unwrap();
	quiesce(&index).await;

	let metadata = index
		.try_get_process_metadata(parent.clone())
		.await
		.unwrap()
		.unwrap();
	assert!(metadata.subtree_stored);
	assert_eq!(metadata.subtree_count, Some(2));
	assert!(metadata.command.stored);
	assert_eq!(metadata.command.count, Some(2));
	assert_eq!(metadata.command.depth, Some(1));
	assert!(metadata.log.stored);
	assert_eq!(metadata.log.count, Some(1));
	assert!(metadata.output.stored);
	assert_eq!(metadata.output.count, Some(0));

	let child_metadata = index
		.try_get_process_metadata(child.clone())
		.await
		.unwrap()
		.unwrap();
	assert!(child_metadata.subtree_stored);
	assert_eq!(child_metadata.subtree_count, Some(1));

	// The command object is referenced by both processes.
	let command_object = index.try_get_object(command).await.unwrap().unwrap();
	assert_eq!(command_object.reference_count, Some(2));

	// The child process is referenced by the parent.
	let child_process = index.try_get_process(child).await.unwrap().unwrap();
	assert_eq!(child_process.reference_count, Some(1));
	let parent_process = index.try_get_process(parent).await.unwrap().unwrap();
	assert_eq!(parent_process.reference_count, Some(0));
}

#[tokio::test]
async fn clean_removes_unreferenced_processes() {
	let index = Index::open_in_memory().await.unwrap();
	let command = ar::object::Id::new(ar::object::Kind::Command, b"command");
	let process = ar::process::Id::new(b"process");
	let mut messages = Messages::default();
	messages.put_object(put_object_arg(command.clone(), vec![]));
	messages.put_process(PutProcessArg {
		id: process.clone(),
		children: vec![],
		objects: vec![(command.clone(), ProcessObjectKind::Command)],
		touched_at: time::OffsetDateTime::now_utc(),
	});
	index.handle_messages(messages).await.unwrap();
	quiesce(&index).await;

	// The command survives while the process references it.
	let output = index
		.clean(time::OffsetDateTime::now_utc(), 100)
		.await
		.unwrap();
	assert_eq!(output.processes.len(), 1);
	assert!(output.objects.is_empty());

	let output = index
		.clean(time::OffsetDateTime::now_utc(), 100)
		.await
		.unwrap();
	assert_eq!(output.objects.len(), 1);
	assert!(index.try_get_object(command).await.unwrap().is_none());
	assert!(index.try_get_process(process).await.unwrap().is_none());
}

#[tokio::test]
async fn malformed_rollups_go_to_the_dead_letter_queue() {
	let index = Index::open_in_memory().await.unwrap();
	let child = object_id(b"malformed");
	let root = directory_id(b"root");
	let mut messages = Messages::default();
	// A stored child without rollups is an integrity error for its parent.
	messages.put_object(PutObjectArg {
		id: child.clone(),
		cache_entry: None,
		children: vec![],
		metadata: Some(ar::object::Metadata {
			node_size: 10,
			subtree_count: None,
			subtree_depth: None,
			subtree_size: None,
			subtree_stored: true,
		}),
		node_size: 10,
		touched_at: time::OffsetDateTime::now_utc(),
	});
	messages.put_object(put_object_arg(root.clone(), vec![child.clone()]));
	index.handle_messages(messages).await.unwrap();

	// The queue still converges; the poisoned row does not block it.
	quiesce(&index).await;
	assert_eq!(index.queue_depth().await.unwrap(), 0);
	let metadata = index
		.try_get_object_metadata(root)
		.await
		.unwrap()
		.unwrap();
	assert!(!metadata.subtree_stored);
}
