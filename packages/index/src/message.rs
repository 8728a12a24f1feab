use arbor_client as ar;

/// One ingest batch, shaped as parallel arrays.
#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct Messages {
	pub cache_entries: CacheEntries,
	pub objects: Objects,
	pub touch_objects: TouchObjects,
	pub processes: Processes,
	pub touch_processes: TouchProcesses,
	pub put_tags: PutTags,
	pub delete_tags: Vec<ar::Tag>,
}

#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct CacheEntries {
	pub ids: Vec<ar::blob::Id>,
	pub touched_ats: Vec<i64>,
}

#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct Objects {
	pub ids: Vec<ar::object::Id>,
	pub cache_entries: Vec<Option<ar::blob::Id>>,
	pub node_sizes: Vec<u64>,
	pub touched_ats: Vec<i64>,
	pub subtree_counts: Vec<Option<u64>>,
	pub subtree_depths: Vec<Option<u64>>,
	pub subtree_sizes: Vec<Option<u64>>,
	pub subtree_storeds: Vec<bool>,

	/// The flattened child edge list, parallel with `parent_indices`.
	pub children: Vec<ar::object::Id>,

	/// For each entry of `children`, the index into `ids` of its parent.
	pub parent_indices: Vec<usize>,
}

#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct TouchObjects {
	pub ids: Vec<ar::object::Id>,
	pub touched_ats: Vec<i64>,
}

#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct Processes {
	pub ids: Vec<ar::process::Id>,
	pub touched_ats: Vec<i64>,
	pub subtree_storeds: Vec<bool>,
	pub subtree_counts: Vec<Option<u64>>,
	pub subtree_commands: Lanes,
	pub subtree_logs: Lanes,
	pub subtree_outputs: Lanes,
	pub node_commands: Lanes,
	pub node_logs: Lanes,
	pub node_outputs: Lanes,

	/// The flattened child process list, parallel with `child_process_indices`
	/// and `child_positions`.
	pub children: Vec<ar::process::Id>,
	pub child_process_indices: Vec<usize>,
	pub child_positions: Vec<u64>,

	/// The flattened referenced object list, parallel with `object_kinds` and
	/// `object_process_indices`.
	pub objects: Vec<ar::object::Id>,
	pub object_kinds: Vec<crate::ProcessObjectKind>,
	pub object_process_indices: Vec<usize>,
}

/// Parallel columns for one rolled-up lane.
#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct Lanes {
	pub storeds: Vec<bool>,
	pub counts: Vec<Option<u64>>,
	pub depths: Vec<Option<u64>>,
	pub sizes: Vec<Option<u64>>,
}

#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct TouchProcesses {
	pub ids: Vec<ar::process::Id>,
	pub touched_ats: Vec<i64>,
}

#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct PutTags {
	pub tags: Vec<ar::Tag>,
	pub items: Vec<ar::tag::Item>,
}

/// The arguments to [`Messages::put_object`].
#[derive(Clone, Debug)]
pub struct PutObjectArg {
	pub id: ar::object::Id,
	pub cache_entry: Option<ar::blob::Id>,
	pub children: Vec<ar::object::Id>,
	pub metadata: Option<ar::object::Metadata>,
	pub node_size: u64,
	pub touched_at: time::OffsetDateTime,
}

/// The arguments to [`Messages::put_process`].
#[derive(Clone, Debug)]
pub struct PutProcessArg {
	pub id: ar::process::Id,
	pub children: Vec<ar::process::Id>,
	pub objects: Vec<(ar::object::Id, crate::ProcessObjectKind)>,
	pub touched_at: time::OffsetDateTime,
}

impl Messages {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.cache_entries.ids.is_empty()
			&& self.objects.ids.is_empty()
			&& self.touch_objects.ids.is_empty()
			&& self.processes.ids.is_empty()
			&& self.touch_processes.ids.is_empty()
			&& self.put_tags.tags.is_empty()
			&& self.delete_tags.is_empty()
	}

	pub fn put_cache_entry(&mut self, id: ar::blob::Id, touched_at: time::OffsetDateTime) {
		self.cache_entries.ids.push(id);
		self.cache_entries
			.touched_ats
			.push(touched_at.unix_timestamp());
	}

	pub fn put_object(&mut self, arg: PutObjectArg) {
		let index = self.objects.ids.len();
		self.objects.ids.push(arg.id);
		self.objects.cache_entries.push(arg.cache_entry);
		self.objects.node_sizes.push(arg.node_size);
		self.objects
			.touched_ats
			.push(arg.touched_at.unix_timestamp());
		let metadata = arg.metadata.unwrap_or_default();
		self.objects.subtree_counts.push(metadata.subtree_count);
		self.objects.subtree_depths.push(metadata.subtree_depth);
		self.objects.subtree_sizes.push(metadata.subtree_size);
		self.objects.subtree_storeds.push(metadata.subtree_stored);
		for child in arg.children {
			self.objects.children.push(child);
			self.objects.parent_indices.push(index);
		}
	}

	pub fn touch_object(&mut self, id: ar::object::Id, touched_at: time::OffsetDateTime) {
		self.touch_objects.ids.push(id);
		self.touch_objects
			.touched_ats
			.push(touched_at.unix_timestamp());
	}

	pub fn put_process(&mut self, arg: PutProcessArg) {
		let index = self.processes.ids.len();
		self.processes.ids.push(arg.id);
		self.processes
			.touched_ats
			.push(arg.touched_at.unix_timestamp());
		self.processes.subtree_storeds.push(false);
		self.processes.subtree_counts.push(None);
		for lanes in [
			&mut self.processes.subtree_commands,
			&mut self.processes.subtree_logs,
			&mut self.processes.subtree_outputs,
			&mut self.processes.node_commands,
			&mut self.processes.node_logs,
			&mut self.processes.node_outputs,
		] {
			lanes.storeds.push(false);
			lanes.counts.push(None);
			lanes.depths.push(None);
			lanes.sizes.push(None);
		}
		for (position, child) in arg.children.into_iter().enumerate() {
			self.processes.children.push(child);
			self.processes.child_process_indices.push(index);
			self.processes
				.child_positions
				.push(position.try_into().unwrap());
		}
		for (object, kind) in arg.objects {
			self.processes.objects.push(object);
			self.processes.object_kinds.push(kind);
			self.processes.object_process_indices.push(index);
		}
	}

	pub fn touch_process(&mut self, id: ar::process::Id, touched_at: time::OffsetDateTime) {
		self.touch_processes.ids.push(id);
		self.touch_processes
			.touched_ats
			.push(touched_at.unix_timestamp());
	}

	pub fn put_tag(&mut self, tag: ar::Tag, item: ar::tag::Item) {
		self.put_tags.tags.push(tag);
		self.put_tags.items.push(item);
	}

	pub fn delete_tag(&mut self, tag: ar::Tag) {
		self.delete_tags.push(tag);
	}
}
