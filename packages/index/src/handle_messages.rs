use crate::{
	Messages, ObjectQueueKind, ProcessQueueKind, get_transaction_id, message, set_transaction_id,
};
use arbor_client as ar;
use indoc::{formatdoc, indoc};
use itertools::Itertools as _;
use num_traits::ToPrimitive as _;
use rusqlite::OptionalExtension as _;

/// Atomically apply one batch of ingest messages.
///
/// Rows are locked in id order within each group, which is what makes the
/// interleaving with `handle_queue` and `clean` deadlock free.
pub fn handle_messages(
	connection: &mut rusqlite::Connection,
	messages: &Messages,
) -> ar::Result<()> {
	validate(messages)?;
	let transaction = connection
		.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
		.map_err(|source| ar::error!(!source, "failed to begin a transaction"))?;
	let transaction_id = get_transaction_id(&transaction)? + 1;
	let mut work = false;
	work |= put_cache_entries(&transaction, transaction_id, &messages.cache_entries)?;
	work |= put_objects(&transaction, transaction_id, &messages.objects)?;
	work |= touch_objects(&transaction, &messages.touch_objects)?;
	work |= put_processes(&transaction, transaction_id, &messages.processes)?;
	work |= touch_processes(&transaction, &messages.touch_processes)?;
	work |= put_tags(&transaction, &messages.put_tags)?;
	work |= delete_tags(&transaction, &messages.delete_tags)?;
	if work {
		set_transaction_id(&transaction, transaction_id)?;
	}
	transaction
		.commit()
		.map_err(|source| ar::error!(!source, "failed to commit the transaction"))?;
	tracing::trace!(%transaction_id, %work, "handled messages");
	Ok(())
}

fn validate(messages: &Messages) -> ar::Result<()> {
	let cache_entries = &messages.cache_entries;
	if cache_entries.ids.len() != cache_entries.touched_ats.len() {
		return Err(ar::error!("the cache entry arrays have mismatched lengths"));
	}
	let objects = &messages.objects;
	let n = objects.ids.len();
	if objects.cache_entries.len() != n
		|| objects.node_sizes.len() != n
		|| objects.touched_ats.len() != n
		|| objects.subtree_counts.len() != n
		|| objects.subtree_depths.len() != n
		|| objects.subtree_sizes.len() != n
		|| objects.subtree_storeds.len() != n
		|| objects.children.len() != objects.parent_indices.len()
	{
		return Err(ar::error!("the object arrays have mismatched lengths"));
	}
	if objects
		.parent_indices
		.iter()
		.any(|index| *index >= objects.ids.len())
	{
		return Err(ar::error!("an object parent index is out of bounds"));
	}
	let processes = &messages.processes;
	let n = processes.ids.len();
	let lanes_valid = [
		&processes.subtree_commands,
		&processes.subtree_logs,
		&processes.subtree_outputs,
		&processes.node_commands,
		&processes.node_logs,
		&processes.node_outputs,
	]
	.into_iter()
	.all(|lanes| {
		lanes.storeds.len() == n
			&& lanes.counts.len() == n
			&& lanes.depths.len() == n
			&& lanes.sizes.len() == n
	});
	if !lanes_valid
		|| processes.touched_ats.len() != n
		|| processes.subtree_storeds.len() != n
		|| processes.subtree_counts.len() != n
		|| processes.children.len() != processes.child_process_indices.len()
		|| processes.children.len() != processes.child_positions.len()
		|| processes.objects.len() != processes.object_kinds.len()
		|| processes.objects.len() != processes.object_process_indices.len()
	{
		return Err(ar::error!("the process arrays have mismatched lengths"));
	}
	if processes
		.child_process_indices
		.iter()
		.chain(processes.object_process_indices.iter())
		.any(|index| *index >= processes.ids.len())
	{
		return Err(ar::error!("a process parent index is out of bounds"));
	}
	let touch_objects = &messages.touch_objects;
	if touch_objects.ids.len() != touch_objects.touched_ats.len() {
		return Err(ar::error!(
			"the touch object arrays have mismatched lengths"
		));
	}
	let touch_processes = &messages.touch_processes;
	if touch_processes.ids.len() != touch_processes.touched_ats.len() {
		return Err(ar::error!(
			"the touch process arrays have mismatched lengths"
		));
	}
	if messages.put_tags.tags.len() != messages.put_tags.items.len() {
		return Err(ar::error!("the tag arrays have mismatched lengths"));
	}
	Ok(())
}

fn put_cache_entries(
	transaction: &rusqlite::Transaction<'_>,
	transaction_id: i64,
	cache_entries: &message::CacheEntries,
) -> ar::Result<bool> {
	let indices = (0..cache_entries.ids.len())
		.sorted_by_key(|index| cache_entries.ids[*index].to_string())
		.collect_vec();
	for index in indices {
		let id = cache_entries.ids[index].to_string();
		let touched_at = cache_entries.touched_ats[index];
		let exists = row_exists(transaction, "cache_entries", &id)?;
		if exists {
			transaction
				.execute(
					indoc!(
						"
							update cache_entries
							set touched_at = max(touched_at, ?1)
							where id = ?2;
						"
					),
					rusqlite::params![touched_at, id],
				)
				.map_err(|source| ar::error!(!source, "failed to update the cache entry"))?;
		} else {
			transaction
				.execute(
					indoc!(
						"
							insert into cache_entries (id, touched_at)
							values (?1, ?2);
						"
					),
					rusqlite::params![id, touched_at],
				)
				.map_err(|source| ar::error!(!source, "failed to insert the cache entry"))?;
			transaction
				.execute(
					indoc!(
						"
							insert into cache_entry_queue (cache_entry, transaction_id)
							values (?1, ?2);
						"
					),
					rusqlite::params![id, transaction_id],
				)
				.map_err(|source| ar::error!(!source, "failed to enqueue the cache entry"))?;
		}
	}
	Ok(!cache_entries.ids.is_empty())
}

fn put_objects(
	transaction: &rusqlite::Transaction<'_>,
	transaction_id: i64,
	objects: &message::Objects,
) -> ar::Result<bool> {
	let indices = (0..objects.ids.len())
		.sorted_by_key(|index| objects.ids[*index].to_string())
		.collect_vec();
	for index in indices {
		let id = objects.ids[index].to_string();
		let cache_entry = objects.cache_entries[index].as_ref().map(ToString::to_string);
		let node_size = objects.node_sizes[index];
		let touched_at = objects.touched_ats[index];
		let subtree_count = objects.subtree_counts[index];
		let subtree_depth = objects.subtree_depths[index];
		let subtree_size = objects.subtree_sizes[index];
		let subtree_stored = objects.subtree_storeds[index];
		let exists = row_exists(transaction, "objects", &id)?;
		if exists {
			transaction
				.execute(
					indoc!(
						"
							update objects
							set
								cache_entry = coalesce(cache_entry, ?1),
								node_size = ?2,
								subtree_count = coalesce(subtree_count, ?3),
								subtree_depth = coalesce(subtree_depth, ?4),
								subtree_size = coalesce(subtree_size, ?5),
								subtree_stored = max(subtree_stored, ?6),
								touched_at = max(touched_at, ?7),
								transaction_id = ?8
							where id = ?9;
						"
					),
					rusqlite::params![
						cache_entry,
						node_size,
						subtree_count,
						subtree_depth,
						subtree_size,
						subtree_stored,
						touched_at,
						transaction_id,
						id,
					],
				)
				.map_err(|source| ar::error!(!source, "failed to update the object"))?;
		} else {
			transaction
				.execute(
					indoc!(
						"
							insert into objects (
								id,
								cache_entry,
								node_size,
								subtree_count,
								subtree_depth,
								subtree_size,
								subtree_stored,
								touched_at,
								transaction_id
							)
							values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);
						"
					),
					rusqlite::params![
						id,
						cache_entry,
						node_size,
						subtree_count,
						subtree_depth,
						subtree_size,
						subtree_stored,
						touched_at,
						transaction_id,
					],
				)
				.map_err(|source| ar::error!(!source, "failed to insert the object"))?;
			enqueue_object(
				transaction,
				&id,
				ObjectQueueKind::ReferenceCount,
				transaction_id,
			)?;
		}

		// Enqueue storage propagation for every put so that completeness
		// cascades re-run when rollups arrive after the parents did.
		enqueue_object(transaction, &id, ObjectQueueKind::Stored, transaction_id)?;
	}

	let edges = (0..objects.children.len())
		.map(|index| {
			let parent = objects.ids[objects.parent_indices[index]].to_string();
			let child = objects.children[index].to_string();
			(parent, child)
		})
		.sorted()
		.collect_vec();
	for (parent, child) in edges {
		transaction
			.execute(
				indoc!(
					"
						insert into object_children (object, child)
						values (?1, ?2)
						on conflict (object, child) do nothing;
					"
				),
				rusqlite::params![parent, child],
			)
			.map_err(|source| ar::error!(!source, "failed to insert the object child"))?;
	}

	Ok(!objects.ids.is_empty())
}

fn touch_objects(
	transaction: &rusqlite::Transaction<'_>,
	touch_objects: &message::TouchObjects,
) -> ar::Result<bool> {
	let mut work = false;
	let indices = (0..touch_objects.ids.len())
		.sorted_by_key(|index| touch_objects.ids[*index].to_string())
		.collect_vec();
	for index in indices {
		let id = touch_objects.ids[index].to_string();
		let touched_at = touch_objects.touched_ats[index];
		let n = transaction
			.execute(
				indoc!(
					"
						update objects
						set touched_at = max(touched_at, ?1)
						where id = ?2;
					"
				),
				rusqlite::params![touched_at, id],
			)
			.map_err(|source| ar::error!(!source, "failed to touch the object"))?;
		work |= n > 0;
	}
	Ok(work)
}

fn put_processes(
	transaction: &rusqlite::Transaction<'_>,
	transaction_id: i64,
	processes: &message::Processes,
) -> ar::Result<bool> {
	let indices = (0..processes.ids.len())
		.sorted_by_key(|index| processes.ids[*index].to_string())
		.collect_vec();
	for index in indices {
		let id = processes.ids[index].to_string();
		let touched_at = processes.touched_ats[index];
		let lanes = [
			("node_command", &processes.node_commands),
			("node_log", &processes.node_logs),
			("node_output", &processes.node_outputs),
			("subtree_command", &processes.subtree_commands),
			("subtree_log", &processes.subtree_logs),
			("subtree_output", &processes.subtree_outputs),
		];
		let exists = row_exists(transaction, "processes", &id)?;
		if exists {
			for (prefix, columns) in lanes {
				transaction
					.execute(
						&formatdoc!(
								"
									update processes
									set
										{prefix}_stored = max({prefix}_stored, ?1),
										{prefix}_count = coalesce({prefix}_count, ?2),
										{prefix}_depth = coalesce({prefix}_depth, ?3),
										{prefix}_size = coalesce({prefix}_size, ?4)
									where id = ?5;
								"
						),
						rusqlite::params![
							columns.storeds[index],
							columns.counts[index],
							columns.depths[index],
							columns.sizes[index],
							id,
						],
					)
					.map_err(|source| ar::error!(!source, "failed to update the process"))?;
			}
			transaction
				.execute(
					indoc!(
						"
							update processes
							set
								subtree_count = coalesce(subtree_count, ?1),
								subtree_stored = max(subtree_stored, ?2),
								touched_at = max(touched_at, ?3),
								transaction_id = ?4
							where id = ?5;
						"
					),
					rusqlite::params![
						processes.subtree_counts[index],
						processes.subtree_storeds[index],
						touched_at,
						transaction_id,
						id,
					],
				)
				.map_err(|source| ar::error!(!source, "failed to update the process"))?;
		} else {
			transaction
				.execute(
					indoc!(
						"
							insert into processes (
								id,
								node_command_stored,
								node_command_count,
								node_command_depth,
								node_command_size,
								node_log_stored,
								node_log_count,
								node_log_depth,
								node_log_size,
								node_output_stored,
								node_output_count,
								node_output_depth,
								node_output_size,
								subtree_command_stored,
								subtree_command_count,
								subtree_command_depth,
								subtree_command_size,
								subtree_log_stored,
								subtree_log_count,
								subtree_log_depth,
								subtree_log_size,
								subtree_output_stored,
								subtree_output_count,
								subtree_output_depth,
								subtree_output_size,
								subtree_count,
								subtree_stored,
								touched_at,
								transaction_id
							)
							values (
								?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
								?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20,
								?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29
							);
						"
					),
					rusqlite::params![
						id,
						processes.node_commands.storeds[index],
						processes.node_commands.counts[index],
						processes.node_commands.depths[index],
						processes.node_commands.sizes[index],
						processes.node_logs.storeds[index],
						processes.node_logs.counts[index],
						processes.node_logs.depths[index],
						processes.node_logs.sizes[index],
						processes.node_outputs.storeds[index],
						processes.node_outputs.counts[index],
						processes.node_outputs.depths[index],
						processes.node_outputs.sizes[index],
						processes.subtree_commands.storeds[index],
						processes.subtree_commands.counts[index],
						processes.subtree_commands.depths[index],
						processes.subtree_commands.sizes[index],
						processes.subtree_logs.storeds[index],
						processes.subtree_logs.counts[index],
						processes.subtree_logs.depths[index],
						processes.subtree_logs.sizes[index],
						processes.subtree_outputs.storeds[index],
						processes.subtree_outputs.counts[index],
						processes.subtree_outputs.depths[index],
						processes.subtree_outputs.sizes[index],
						processes.subtree_counts[index],
						processes.subtree_storeds[index],
						touched_at,
						transaction_id,
					],
				)
				.map_err(|source| ar::error!(!source, "failed to insert the process"))?;
			enqueue_process(
				transaction,
				&id,
				ProcessQueueKind::ReferenceCount,
				transaction_id,
			)?;
		}
		for kind in [
			ProcessQueueKind::Children,
			ProcessQueueKind::Command,
			ProcessQueueKind::Output,
			ProcessQueueKind::Log,
		] {
			enqueue_process(transaction, &id, kind, transaction_id)?;
		}
	}

	let child_edges = (0..processes.children.len())
		.map(|index| {
			let process = processes.ids[processes.child_process_indices[index]].to_string();
			let child = processes.children[index].to_string();
			let position = processes.child_positions[index];
			(process, child, position)
		})
		.sorted()
		.collect_vec();
	for (process, child, position) in child_edges {
		transaction
			.execute(
				indoc!(
					"
						insert into process_children (process, child, position)
						values (?1, ?2, ?3)
						on conflict (process, child) do nothing;
					"
				),
				rusqlite::params![process, child, position],
			)
			.map_err(|source| ar::error!(!source, "failed to insert the process child"))?;
	}

	let object_edges = (0..processes.objects.len())
		.map(|index| {
			let process = processes.ids[processes.object_process_indices[index]].to_string();
			let object = processes.objects[index].to_string();
			let kind = processes.object_kinds[index].to_i64().unwrap();
			(process, object, kind)
		})
		.sorted()
		.collect_vec();
	for (process, object, kind) in object_edges {
		transaction
			.execute(
				indoc!(
					"
						insert into process_objects (process, object, kind)
						values (?1, ?2, ?3)
						on conflict (process, object, kind) do nothing;
					"
				),
				rusqlite::params![process, object, kind],
			)
			.map_err(|source| ar::error!(!source, "failed to insert the process object"))?;
	}

	Ok(!processes.ids.is_empty())
}

fn touch_processes(
	transaction: &rusqlite::Transaction<'_>,
	touch_processes: &message::TouchProcesses,
) -> ar::Result<bool> {
	let mut work = false;
	let indices = (0..touch_processes.ids.len())
		.sorted_by_key(|index| touch_processes.ids[*index].to_string())
		.collect_vec();
	for index in indices {
		let id = touch_processes.ids[index].to_string();
		let touched_at = touch_processes.touched_ats[index];
		let n = transaction
			.execute(
				indoc!(
					"
						update processes
						set touched_at = max(touched_at, ?1)
						where id = ?2;
					"
				),
				rusqlite::params![touched_at, id],
			)
			.map_err(|source| ar::error!(!source, "failed to touch the process"))?;
		work |= n > 0;
	}
	Ok(work)
}

fn put_tags(
	transaction: &rusqlite::Transaction<'_>,
	put_tags: &crate::message::PutTags,
) -> ar::Result<bool> {
	let indices = (0..put_tags.tags.len())
		.sorted_by_key(|index| put_tags.tags[*index].to_string())
		.collect_vec();
	let mut decrements = Vec::new();
	let mut increments = Vec::new();
	for index in indices {
		let tag = put_tags.tags[index].to_string();
		let item = put_tags.items[index].to_string();
		let displaced: Option<String> = transaction
			.query_row(
				"select item from tags where tag = ?1;",
				rusqlite::params![tag],
				|row| row.get(0),
			)
			.optional()
			.map_err(|source| ar::error!(!source, "failed to get the tag"))?;
		if displaced.as_ref() == Some(&item) {
			continue;
		}
		transaction
			.execute(
				indoc!(
					"
						insert into tags (tag, item)
						values (?1, ?2)
						on conflict (tag) do update set item = excluded.item;
					"
				),
				rusqlite::params![tag, item],
			)
			.map_err(|source| ar::error!(!source, "failed to put the tag"))?;
		if let Some(displaced) = displaced {
			decrements.push(displaced);
		}
		increments.push(item);
	}
	apply_reference_count_deltas(transaction, &decrements, -1)?;
	apply_reference_count_deltas(transaction, &increments, 1)?;
	Ok(!put_tags.tags.is_empty())
}

fn delete_tags(transaction: &rusqlite::Transaction<'_>, tags: &[ar::Tag]) -> ar::Result<bool> {
	let mut work = false;
	let mut decrements = Vec::new();
	for tag in tags.iter().sorted_by_key(|tag| tag.to_string()) {
		let tag = tag.to_string();
		let item: Option<String> = transaction
			.query_row(
				"select item from tags where tag = ?1;",
				rusqlite::params![tag],
				|row| row.get(0),
			)
			.optional()
			.map_err(|source| ar::error!(!source, "failed to get the tag"))?;
		let Some(item) = item else {
			continue;
		};
		transaction
			.execute("delete from tags where tag = ?1;", rusqlite::params![tag])
			.map_err(|source| ar::error!(!source, "failed to delete the tag"))?;
		decrements.push(item);
		work = true;
	}
	apply_reference_count_deltas(transaction, &decrements, -1)?;
	Ok(work)
}

/// Apply a reference count delta to every table that may hold the item. The
/// updates skip rows whose count has not been computed yet, because a null
/// count is recomputed from scratch by the queue.
fn apply_reference_count_deltas(
	transaction: &rusqlite::Transaction<'_>,
	ids: &[String],
	delta: i64,
) -> ar::Result<()> {
	for id in ids.iter().sorted() {
		for table in ["objects", "processes", "cache_entries"] {
			transaction
				.execute(
					&formatdoc!(
							"
								update {table}
								set reference_count = reference_count + ?1
								where id = ?2 and reference_count is not null;
							"
					),
					rusqlite::params![delta, id],
				)
				.map_err(|source| {
					ar::error!(!source, "failed to update the reference count")
				})?;
		}
	}
	Ok(())
}

fn row_exists(
	transaction: &rusqlite::Transaction<'_>,
	table: &str,
	id: &str,
) -> ar::Result<bool> {
	transaction
		.query_row(
			&format!("select count(*) from {table} where id = ?1;"),
			rusqlite::params![id],
			|row| row.get::<_, i64>(0),
		)
		.map(|count| count > 0)
		.map_err(|source| ar::error!(!source, "failed to query the table"))
}

pub(crate) fn enqueue_object(
	transaction: &rusqlite::Transaction<'_>,
	id: &str,
	kind: ObjectQueueKind,
	transaction_id: i64,
) -> ar::Result<()> {
	transaction
		.execute(
			indoc!(
				"
					insert into object_queue (object, kind, transaction_id)
					values (?1, ?2, ?3);
				"
			),
			rusqlite::params![id, kind.to_i64().unwrap(), transaction_id],
		)
		.map_err(|source| ar::error!(!source, "failed to enqueue the object"))?;
	Ok(())
}

pub(crate) fn enqueue_process(
	transaction: &rusqlite::Transaction<'_>,
	id: &str,
	kind: ProcessQueueKind,
	transaction_id: i64,
) -> ar::Result<()> {
	transaction
		.execute(
			indoc!(
				"
					insert into process_queue (process, kind, transaction_id)
					values (?1, ?2, ?3);
				"
			),
			rusqlite::params![id, kind.to_i64().unwrap(), transaction_id],
		)
		.map_err(|source| ar::error!(!source, "failed to enqueue the process"))?;
	Ok(())
}
