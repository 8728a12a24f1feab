use crate::Server;
use arbor_client as ar;
use arbor_index::{Messages, PutObjectArg};

impl Server {
	/// Store an object and index it.
	pub async fn put_object(&self, data: &ar::object::Data) -> ar::Result<ar::object::Id> {
		if let ar::object::Data::Blob(blob) = data {
			let id = self.put_blob(blob.0.clone()).await?;
			return Ok(id.into());
		}
		let bytes = data.serialize()?;
		let id = ar::object::Id::new(data.kind(), &bytes);
		let cache_entry = match data {
			ar::object::Data::File(file) => file.contents().cloned(),
			_ => None,
		};
		if let Some(cache_entry) = &cache_entry {
			let exists = self
				.inner
				.store
				.try_get_cache_entry(cache_entry)
				.await?
				.is_some();
			if !exists {
				return Err(ar::error!(%id = cache_entry, "failed to find the contents"));
			}
		}
		self.inner.store.put_object(&id, bytes.clone()).await?;
		let now = self.now();
		let mut messages = Messages::default();
		if let Some(cache_entry) = &cache_entry {
			messages.put_cache_entry(cache_entry.clone(), now);
		}
		messages.put_object(PutObjectArg {
			id: id.clone(),
			cache_entry,
			children: data.children().into_iter().collect(),
			metadata: None,
			node_size: bytes.len().try_into().unwrap(),
			touched_at: now,
		});
		self.inner.index.handle_messages(messages).await?;
		self.notify_indexer();
		Ok(id)
	}

	pub async fn try_get_object(
		&self,
		id: &ar::object::Id,
	) -> ar::Result<Option<ar::object::Data>> {
		if let ar::object::Id::Blob(blob) = id {
			let bytes = self.inner.store.try_get_cache_entry(blob).await?;
			return Ok(bytes.map(|bytes| ar::object::Data::Blob(ar::blob::Data(bytes))));
		}
		let Some(bytes) = self.inner.store.try_get_object(id).await? else {
			return Ok(None);
		};
		let data = ar::object::Data::deserialize(id.kind(), bytes)?;
		Ok(Some(data))
	}

	pub async fn try_get_object_metadata(
		&self,
		id: &ar::object::Id,
	) -> ar::Result<Option<ar::object::Metadata>> {
		self.inner.index.try_get_object_metadata(id.clone()).await
	}

	/// Move an object's `touched_at` forward to keep it out of the clean
	/// window.
	pub async fn touch_object(&self, id: &ar::object::Id) -> ar::Result<()> {
		let mut messages = Messages::default();
		messages.touch_object(id.clone(), self.now());
		self.inner.index.handle_messages(messages).await?;
		Ok(())
	}
}
