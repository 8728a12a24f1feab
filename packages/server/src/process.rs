use crate::Server;
use arbor_client as ar;
use arbor_index::{Messages, ProcessObjectKind, PutProcessArg};

impl Server {
	/// Store a process and index its edges.
	pub async fn put_process(&self, data: &ar::process::Data) -> ar::Result<ar::process::Id> {
		let bytes = data.serialize()?;
		let id = ar::process::Id::new(&bytes);
		self.inner.store.put_process(&id, bytes).await?;
		let mut objects = vec![(data.command(), ProcessObjectKind::Command)];
		if let Some(log) = data.log() {
			objects.push((log, ProcessObjectKind::Log));
		}
		if let Some(output) = data.output() {
			objects.push((output, ProcessObjectKind::Output));
		}
		let mut messages = Messages::default();
		messages.put_process(PutProcessArg {
			id: id.clone(),
			children: data.children.clone(),
			objects,
			touched_at: self.now(),
		});
		self.inner.index.handle_messages(messages).await?;
		self.notify_indexer();
		Ok(id)
	}

	pub async fn try_get_process(
		&self,
		id: &ar::process::Id,
	) -> ar::Result<Option<ar::process::Data>> {
		let Some(bytes) = self.inner.store.try_get_process(id).await? else {
			return Ok(None);
		};
		let data = ar::process::Data::deserialize(bytes)?;
		Ok(Some(data))
	}

	pub async fn try_get_process_metadata(
		&self,
		id: &ar::process::Id,
	) -> ar::Result<Option<ar::process::Metadata>> {
		self.inner.index.try_get_process_metadata(id.clone()).await
	}

	/// Move a process's `touched_at` forward to keep it out of the clean
	/// window.
	pub async fn touch_process(&self, id: &ar::process::Id) -> ar::Result<()> {
		let mut messages = Messages::default();
		messages.touch_process(id.clone(), self.now());
		self.inner.index.handle_messages(messages).await?;
		Ok(())
	}
}
