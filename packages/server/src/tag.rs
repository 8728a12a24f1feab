use crate::Server;
use arbor_client as ar;
use arbor_index::Messages;

impl Server {
	/// Bind a tag to an item. Putting an existing tag overwrites it and the
	/// reference counts of both items are adjusted atomically.
	pub async fn put_tag(&self, tag: &ar::Tag, arg: ar::tag::put::Arg) -> ar::Result<()> {
		// The item must be indexed.
		match &arg.item {
			ar::tag::Item::Object(id) => {
				if self.inner.index.try_get_object(id.clone()).await?.is_none() {
					return Err(ar::error!(%id, "failed to find the object"));
				}
			},
			ar::tag::Item::Process(id) => {
				if self
					.inner
					.index
					.try_get_process(id.clone())
					.await?
					.is_none()
				{
					return Err(ar::error!(%id, "failed to find the process"));
				}
			},
		}
		let mut messages = Messages::default();
		messages.put_tag(tag.clone(), arg.item);
		self.inner.index.handle_messages(messages).await?;
		self.notify_indexer();
		Ok(())
	}

	pub async fn delete_tag(&self, tag: &ar::Tag) -> ar::Result<ar::tag::delete::Output> {
		let item = self.inner.index.try_get_tag(tag.clone()).await?;
		if item.is_some() {
			let mut messages = Messages::default();
			messages.delete_tag(tag.clone());
			self.inner.index.handle_messages(messages).await?;
			self.notify_indexer();
		}
		Ok(ar::tag::delete::Output { item })
	}

	pub async fn try_get_tag(&self, tag: &ar::Tag) -> ar::Result<Option<ar::tag::get::Output>> {
		let item = self.inner.index.try_get_tag(tag.clone()).await?;
		Ok(item.map(|item| ar::tag::get::Output {
			tag: tag.clone(),
			item,
		}))
	}

	pub async fn list_tags(&self, arg: ar::tag::list::Arg) -> ar::Result<ar::tag::list::Output> {
		self.inner.index.list_tags(arg).await
	}
}
