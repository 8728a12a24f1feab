use arbor_client as ar;
use bytes::Bytes;
use std::path::{Path, PathBuf};

/// The on-disk store.
///
/// Object and process bytes live under `objects/` keyed by id; cache payloads
/// live under `cache/` keyed by cache entry id. The payloads are opaque.
#[derive(Clone, Debug)]
pub struct Store {
	objects: PathBuf,
	cache: PathBuf,
}

impl Store {
	pub async fn new(path: &Path) -> ar::Result<Self> {
		let objects = path.join("objects");
		let cache = path.join("cache");
		tokio::fs::create_dir_all(&objects)
			.await
			.map_err(|source| ar::error!(!source, "failed to create the objects directory"))?;
		tokio::fs::create_dir_all(&cache)
			.await
			.map_err(|source| ar::error!(!source, "failed to create the cache directory"))?;
		Ok(Self { objects, cache })
	}

	pub async fn put_object(&self, id: &ar::object::Id, bytes: Bytes) -> ar::Result<()> {
		self.write(&self.objects.join(id.to_string()), bytes).await
	}

	pub async fn try_get_object(&self, id: &ar::object::Id) -> ar::Result<Option<Bytes>> {
		self.read(&self.objects.join(id.to_string())).await
	}

	pub async fn delete_object(&self, id: &ar::object::Id) -> ar::Result<()> {
		self.delete(&self.objects.join(id.to_string())).await
	}

	pub async fn put_process(&self, id: &ar::process::Id, bytes: Bytes) -> ar::Result<()> {
		self.write(&self.objects.join(id.to_string()), bytes).await
	}

	pub async fn try_get_process(&self, id: &ar::process::Id) -> ar::Result<Option<Bytes>> {
		self.read(&self.objects.join(id.to_string())).await
	}

	pub async fn delete_process(&self, id: &ar::process::Id) -> ar::Result<()> {
		self.delete(&self.objects.join(id.to_string())).await
	}

	pub async fn put_cache_entry(&self, id: &ar::blob::Id, bytes: Bytes) -> ar::Result<()> {
		self.write(&self.cache.join(id.to_string()), bytes).await
	}

	pub async fn try_get_cache_entry(&self, id: &ar::blob::Id) -> ar::Result<Option<Bytes>> {
		self.read(&self.cache.join(id.to_string())).await
	}

	pub async fn delete_cache_entry(&self, id: &ar::blob::Id) -> ar::Result<()> {
		self.delete(&self.cache.join(id.to_string())).await
	}

	async fn write(&self, path: &Path, bytes: Bytes) -> ar::Result<()> {
		if tokio::fs::try_exists(path)
			.await
			.map_err(|source| ar::error!(!source, "failed to check for the file"))?
		{
			return Ok(());
		}
		tokio::fs::write(path, &bytes)
			.await
			.map_err(|source| ar::error!(!source, "failed to write the file"))?;
		Ok(())
	}

	async fn read(&self, path: &Path) -> ar::Result<Option<Bytes>> {
		match tokio::fs::read(path).await {
			Ok(bytes) => Ok(Some(bytes.into())),
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(source) => Err(ar::error!(!source, "failed to read the file")),
		}
	}

	async fn delete(&self, path: &Path) -> ar::Result<()> {
		match tokio::fs::remove_file(path).await {
			Ok(()) => Ok(()),
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(source) => Err(ar::error!(!source, "failed to remove the file")),
		}
	}
}
