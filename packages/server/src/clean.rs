use crate::Server;
use arbor_client as ar;

impl Server {
	/// Remove every unreferenced item outside the retention window, along
	/// with its stored bytes, looping until a batch makes no progress.
	pub async fn clean(&self) -> ar::Result<ar::clean::Output> {
		let max_touched_at = self.now() - self.inner.config.retention;
		let batch_size = self.inner.config.clean_batch_size;
		let mut output = ar::clean::Output::default();
		loop {
			let batch = self.inner.index.clean(max_touched_at, batch_size).await?;
			if batch.cache_entries.is_empty() && batch.objects.is_empty() && batch.processes.is_empty()
			{
				break;
			}
			for id in &batch.cache_entries {
				self.inner.store.delete_cache_entry(id).await?;
			}
			for id in &batch.objects {
				self.inner.store.delete_object(id).await?;
			}
			for id in &batch.processes {
				self.inner.store.delete_process(id).await?;
			}
			output.bytes += batch.bytes;
			output.cache_entries += u64::try_from(batch.cache_entries.len()).unwrap();
			output.objects += u64::try_from(batch.objects.len()).unwrap();
			output.processes += u64::try_from(batch.processes.len()).unwrap();
		}
		Ok(output)
	}
}
