use crate::Server;
use arbor_client as ar;
use arbor_index::{Messages, PutObjectArg};
use bytes::Bytes;

impl Server {
	/// Store a blob and index it as both a cache entry and a blob object.
	pub async fn put_blob(&self, bytes: Bytes) -> ar::Result<ar::blob::Id> {
		let id = ar::blob::Id::new(&bytes);
		let node_size = bytes.len().try_into().unwrap();
		self.inner.store.put_cache_entry(&id, bytes).await?;
		let now = self.now();
		let mut messages = Messages::default();
		messages.put_cache_entry(id.clone(), now);
		messages.put_object(PutObjectArg {
			id: id.clone().into(),
			cache_entry: Some(id.clone()),
			children: Vec::new(),
			metadata: None,
			node_size,
			touched_at: now,
		});
		self.inner.index.handle_messages(messages).await?;
		self.notify_indexer();
		Ok(id)
	}

	pub async fn try_get_blob(&self, id: &ar::blob::Id) -> ar::Result<Option<Bytes>> {
		self.inner.store.try_get_cache_entry(id).await
	}
}
