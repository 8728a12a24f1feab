use arbor_client as ar;
use arbor_index::Index;
use std::{path::PathBuf, sync::Arc};

pub use self::store::Store;

pub mod blob;
pub mod checkin;
pub mod checkout;
pub mod clean;
pub mod index;
pub mod object;
pub mod process;
pub mod store;
pub mod tag;

/// The server's configuration.
#[derive(Clone, Debug)]
pub struct Config {
	/// The directory that holds the index, the object store, and the cache.
	pub path: PathBuf,

	/// The queue budget for each background indexer batch.
	pub index_batch_size: u64,

	/// The candidate budget for each clean batch.
	pub clean_batch_size: u64,

	/// How long an unreferenced item is kept after it was last touched.
	pub retention: std::time::Duration,
}

impl Config {
	#[must_use]
	pub fn with_path(path: PathBuf) -> Self {
		Self {
			path,
			index_batch_size: 256,
			clean_batch_size: 256,
			retention: std::time::Duration::ZERO,
		}
	}
}

/// The server.
#[derive(Clone)]
pub struct Server {
	inner: Arc<Inner>,
}

struct Inner {
	config: Config,
	index: Index,
	store: Store,
	indexer: tokio::sync::Notify,
	stop: tokio::sync::watch::Sender<bool>,
	task: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Server {
	pub async fn start(config: Config) -> ar::Result<Self> {
		tokio::fs::create_dir_all(&config.path)
			.await
			.map_err(|source| ar::error!(!source, "failed to create the server directory"))?;
		let store = Store::new(&config.path).await?;
		let index = Index::open(&config.path.join("index")).await?;
		let (stop, _) = tokio::sync::watch::channel(false);
		let server = Self {
			inner: Arc::new(Inner {
				config,
				index,
				store,
				indexer: tokio::sync::Notify::new(),
				stop,
				task: std::sync::Mutex::new(None),
			}),
		};

		// Spawn the background indexer task.
		let task = tokio::spawn({
			let server = server.clone();
			async move {
				server.indexer_task().await;
			}
		});
		server.inner.task.lock().unwrap().replace(task);

		Ok(server)
	}

	pub fn stop(&self) {
		self.inner.stop.send_replace(true);
	}

	pub async fn wait(&self) {
		let task = self.inner.task.lock().unwrap().take();
		if let Some(task) = task {
			task.await.ok();
		}
	}

	#[must_use]
	pub fn config(&self) -> &Config {
		&self.inner.config
	}

	/// Nudge the background indexer.
	pub(crate) fn notify_indexer(&self) {
		self.inner.indexer.notify_one();
	}

	async fn indexer_task(&self) {
		let mut stop = self.inner.stop.subscribe();
		loop {
			tokio::select! {
				() = self.inner.indexer.notified() => (),
				() = tokio::time::sleep(std::time::Duration::from_millis(100)) => (),
				result = stop.changed() => {
					if result.is_err() || *stop.borrow() {
						break;
					}
				},
			}
			loop {
				let batch_size = self.inner.config.index_batch_size;
				match self.inner.index.handle_queue(batch_size).await {
					Ok(0) => break,
					Ok(_) => (),
					Err(error) => {
						tracing::error!(%error, "the indexer failed to handle the queue");
						break;
					},
				}
			}
		}
	}

	pub(crate) fn now(&self) -> time::OffsetDateTime {
		time::OffsetDateTime::now_utc()
	}
}
