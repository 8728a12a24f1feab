use crate::Server;
use arbor_client as ar;

impl Server {
	/// Drive the work queues to quiescence.
	pub async fn index(&self) -> ar::Result<()> {
		loop {
			let batch_size = self.inner.config.index_batch_size;
			let processed = self.inner.index.handle_queue(batch_size).await?;
			if processed == 0 {
				break;
			}
		}
		Ok(())
	}
}
