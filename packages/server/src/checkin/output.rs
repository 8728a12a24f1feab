use super::{State, Variant};
use crate::Server;
use arbor_client as ar;
use arbor_index::{Messages, PutObjectArg};
use std::collections::BTreeSet;

impl Server {
	/// Write the blobs and objects to the store and send one ingest batch to
	/// the index.
	pub(super) async fn write_output(&self, state: &mut State) -> ar::Result<ar::checkin::Output> {
		let now = self.now();
		let mut messages = Messages::default();
		let mut cache_entries = BTreeSet::new();
		let mut objects = BTreeSet::new();

		// The file payloads become cache entries.
		for node in &state.nodes {
			let Variant::File(file) = &node.variant else {
				continue;
			};
			let id = ar::blob::Id::new(&file.contents);
			if !cache_entries.insert(id.clone()) {
				continue;
			}
			self.inner
				.store
				.put_cache_entry(&id, file.contents.clone())
				.await?;
			messages.put_cache_entry(id, now);
		}

		// The graphs.
		for (id, data) in &state.graphs {
			let bytes = data.serialize()?;
			let id: ar::object::Id = id.clone().into();
			if !objects.insert(id.clone()) {
				continue;
			}
			self.inner.store.put_object(&id, bytes.clone()).await?;
			messages.put_object(PutObjectArg {
				id,
				cache_entry: None,
				children: data.children().collect(),
				metadata: None,
				node_size: bytes.len().try_into().unwrap(),
				touched_at: now,
			});
		}

		// The artifacts.
		for node in &state.nodes {
			let data = node
				.data
				.as_ref()
				.ok_or_else(|| ar::error!("expected the data to be computed"))?;
			let id = node
				.id
				.clone()
				.ok_or_else(|| ar::error!("expected the ID to be computed"))?;
			let id: ar::object::Id = id.into();
			if !objects.insert(id.clone()) {
				continue;
			}
			let bytes = data.serialize()?;
			self.inner.store.put_object(&id, bytes.clone()).await?;
			let cache_entry = match &node.variant {
				Variant::File(file) => Some(ar::blob::Id::new(&file.contents)),
				_ => None,
			};
			messages.put_object(PutObjectArg {
				id,
				cache_entry,
				children: data.children().into_iter().collect(),
				metadata: None,
				node_size: bytes.len().try_into().unwrap(),
				touched_at: now,
			});
		}

		self.inner.index.handle_messages(messages).await?;

		let item = state.nodes[0]
			.id
			.clone()
			.ok_or_else(|| ar::error!("expected the root ID to be computed"))?;
		let output = ar::checkin::Output {
			referent: ar::Referent::with_item(item),
		};
		Ok(output)
	}
}

/// Write the frozen resolutions to the lockfile at the package root. There is
/// never a nested lockfile: subpackages are covered by the root's.
pub(super) async fn write_lockfile(state: &State) -> ar::Result<()> {
	if state.dependencies.is_empty() {
		return Ok(());
	}
	if !matches!(state.nodes[0].variant, Variant::Directory(_)) {
		return Ok(());
	}
	let lockfile = ar::Lockfile {
		dependencies: state.dependencies.clone(),
	};
	if let Some(existing) = &state.lockfile {
		if existing.serialize()? == lockfile.serialize()? {
			return Ok(());
		}
	}
	let path = state.root.join(ar::lockfile::LOCKFILE_FILE_NAME);
	let bytes = lockfile.serialize()?;
	tokio::fs::write(&path, &bytes)
		.await
		.map_err(|source| ar::error!(!source, "failed to write the lockfile"))?;
	Ok(())
}
