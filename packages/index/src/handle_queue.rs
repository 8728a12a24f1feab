use crate::{
	ObjectQueueKind, ProcessObjectKind, ProcessQueueKind, get_transaction_id,
	handle_messages::{enqueue_object, enqueue_process},
	set_transaction_id,
};
use arbor_client as ar;
use indoc::{formatdoc, indoc};
use num_traits::{FromPrimitive as _, ToPrimitive as _};
use rusqlite::OptionalExtension as _;

/// Run one batch of background work with budget `n`.
///
/// Dispatch order is storage propagation first (objects, then the process
/// lanes), then reference counts. Queue rows are dequeued in id order and
/// deleted; a row that fails validation is moved to the dead letter queue
/// instead of blocking the batch.
pub fn handle_queue(connection: &mut rusqlite::Connection, n: u64) -> ar::Result<u64> {
	let transaction = connection
		.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
		.map_err(|source| ar::error!(!source, "failed to begin a transaction"))?;
	let transaction_id = get_transaction_id(&transaction)? + 1;
	let mut remaining = n;
	let mut processed = 0;
	processed += handle_object_stored(&transaction, transaction_id, &mut remaining)?;
	processed += handle_process_stored(&transaction, transaction_id, &mut remaining)?;
	processed += handle_object_reference_count(&transaction, transaction_id, &mut remaining)?;
	processed += handle_process_reference_count(&transaction, transaction_id, &mut remaining)?;
	processed += handle_cache_entry_reference_count(&transaction, transaction_id, &mut remaining)?;
	if processed > 0 {
		set_transaction_id(&transaction, transaction_id)?;
	}
	transaction
		.commit()
		.map_err(|source| ar::error!(!source, "failed to commit the transaction"))?;
	tracing::trace!(%processed, "handled queue batch");
	Ok(processed)
}

struct QueueRow {
	id: i64,
	item: String,
	kind: i64,
}

fn dequeue(
	transaction: &rusqlite::Transaction<'_>,
	statement: &str,
	limit: u64,
	queue: &str,
) -> ar::Result<Vec<QueueRow>> {
	let mut statement = transaction
		.prepare_cached(statement)
		.map_err(|source| ar::error!(!source, "failed to prepare the statement"))?;
	let rows = statement
		.query_map(rusqlite::params![limit], |row| {
			Ok(QueueRow {
				id: row.get(0)?,
				item: row.get(1)?,
				kind: row.get(2)?,
			})
		})
		.map_err(|source| ar::error!(!source, "failed to query the queue"))?
		.collect::<Result<Vec<_>, _>>()
		.map_err(|source| ar::error!(!source, "failed to read the queue rows"))?;
	for row in &rows {
		transaction
			.execute(
				&format!("delete from {queue} where id = ?1;"),
				rusqlite::params![row.id],
			)
			.map_err(|source| ar::error!(!source, "failed to delete the queue row"))?;
	}
	Ok(rows)
}

fn dead_letter(
	transaction: &rusqlite::Transaction<'_>,
	queue: &str,
	row: &QueueRow,
	error: &ar::Error,
) -> ar::Result<()> {
	tracing::error!(%queue, item = %row.item, %error, "moving a queue row to the dead letter queue");
	transaction
		.execute(
			indoc!(
				"
					insert into dead_letter_queue (queue, item, kind, error)
					values (?1, ?2, ?3, ?4);
				"
			),
			rusqlite::params![queue, row.item, row.kind, error.to_string()],
		)
		.map_err(|source| ar::error!(!source, "failed to insert the dead letter row"))?;
	Ok(())
}

fn handle_object_stored(
	transaction: &rusqlite::Transaction<'_>,
	transaction_id: i64,
	remaining: &mut u64,
) -> ar::Result<u64> {
	if *remaining == 0 {
		return Ok(0);
	}
	let rows = dequeue(
		transaction,
		indoc!(
			"
				select id, object, kind from object_queue
				where kind = 1
				order by object
				limit ?1;
			"
		),
		*remaining,
		"object_queue",
	)?;
	let processed: u64 = rows.len().try_into().unwrap();
	*remaining -= processed;
	for row in &rows {
		if let Err(error) = object_stored(transaction, &row.item, transaction_id) {
			dead_letter(transaction, "object_queue", row, &error)?;
		}
	}
	Ok(processed)
}

/// Recompute one object's subtree rollups and, if the subtree is stored,
/// notify incomplete parents and processes.
fn object_stored(
	transaction: &rusqlite::Transaction<'_>,
	id: &str,
	transaction_id: i64,
) -> ar::Result<()> {
	let row: Option<(bool, u64)> = transaction
		.query_row(
			"select subtree_stored, node_size from objects where id = ?1;",
			rusqlite::params![id],
			|row| Ok((row.get(0)?, row.get(1)?)),
		)
		.optional()
		.map_err(|source| ar::error!(!source, "failed to get the object"))?;
	let Some((mut stored, node_size)) = row else {
		// The object was removed after the row was enqueued.
		return Ok(());
	};

	if !stored {
		let children = object_children(transaction, id)?;
		let mut count = 1u64;
		let mut depth = 0u64;
		let mut size = node_size;
		let mut complete = true;
		for child in &children {
			let child_row: Option<(bool, Option<u64>, Option<u64>, Option<u64>)> = transaction
				.query_row(
					indoc!(
						"
							select subtree_stored, subtree_count, subtree_depth, subtree_size
							from objects
							where id = ?1;
						"
					),
					rusqlite::params![child],
					|row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
				)
				.optional()
				.map_err(|source| ar::error!(!source, "failed to get the child"))?;
			let Some((child_stored, child_count, child_depth, child_size)) = child_row else {
				complete = false;
				break;
			};
			if !child_stored {
				complete = false;
				break;
			}
			let (Some(child_count), Some(child_depth), Some(child_size)) =
				(child_count, child_depth, child_size)
			else {
				return Err(ar::error!(%child, "the child is stored but has no rollups"));
			};
			count += child_count;
			depth = depth.max(child_depth);
			size += child_size;
		}
		if complete {
			transaction
				.execute(
					indoc!(
						"
							update objects
							set
								subtree_stored = 1,
								subtree_count = ?1,
								subtree_depth = ?2,
								subtree_size = ?3
							where id = ?4;
						"
					),
					rusqlite::params![count, 1 + depth, size, id],
				)
				.map_err(|source| ar::error!(!source, "failed to update the object"))?;
			stored = true;
		}
	}

	if stored {
		// Notify parents whose subtrees are still incomplete.
		let parents: Vec<String> = query_strings(
			transaction,
			indoc!(
				"
					select object_children.object
					from object_children
					join objects on objects.id = object_children.object
					where object_children.child = ?1 and objects.subtree_stored = 0
					order by object_children.object;
				"
			),
			id,
		)?;
		for parent in parents {
			enqueue_object(transaction, &parent, ObjectQueueKind::Stored, transaction_id)?;
		}

		// Notify processes whose matching lane is still incomplete.
		let references: Vec<(String, i64)> = {
			let mut statement = transaction
				.prepare_cached(indoc!(
					"
						select process_objects.process, process_objects.kind
						from process_objects
						where process_objects.object = ?1
						order by process_objects.process;
					"
				))
				.map_err(|source| ar::error!(!source, "failed to prepare the statement"))?;
			statement
				.query_map(rusqlite::params![id], |row| {
					Ok((row.get(0)?, row.get(1)?))
				})
				.map_err(|source| ar::error!(!source, "failed to query the process objects"))?
				.collect::<Result<Vec<_>, _>>()
				.map_err(|source| ar::error!(!source, "failed to read the process objects"))?
		};
		for (process, kind) in references {
			let kind = ProcessObjectKind::from_i64(kind)
				.ok_or_else(|| ar::error!(%kind, "invalid process object kind"))?;
			let queue_kind = match kind {
				ProcessObjectKind::Command => ProcessQueueKind::Command,
				ProcessObjectKind::Log => ProcessQueueKind::Log,
				ProcessObjectKind::Output => ProcessQueueKind::Output,
			};
			enqueue_process(transaction, &process, queue_kind, transaction_id)?;
		}
	}

	Ok(())
}

fn handle_process_stored(
	transaction: &rusqlite::Transaction<'_>,
	transaction_id: i64,
	remaining: &mut u64,
) -> ar::Result<u64> {
	if *remaining == 0 {
		return Ok(0);
	}
	let rows = dequeue(
		transaction,
		indoc!(
			"
				select id, process, kind from process_queue
				where kind != 0
				order by process, kind
				limit ?1;
			"
		),
		*remaining,
		"process_queue",
	)?;
	let processed: u64 = rows.len().try_into().unwrap();
	*remaining -= processed;
	for row in &rows {
		let result = match ProcessQueueKind::from_i64(row.kind) {
			Some(ProcessQueueKind::Children) => {
				process_children_stored(transaction, &row.item, transaction_id)
			},
			Some(ProcessQueueKind::Command) => {
				process_lane_stored(transaction, &row.item, ProcessQueueKind::Command, transaction_id)
			},
			Some(ProcessQueueKind::Output) => {
				process_lane_stored(transaction, &row.item, ProcessQueueKind::Output, transaction_id)
			},
			Some(ProcessQueueKind::Log) => {
				process_lane_stored(transaction, &row.item, ProcessQueueKind::Log, transaction_id)
			},
			_ => Err(ar::error!(%kind = row.kind, "invalid process queue kind")),
		};
		if let Err(error) = result {
			dead_letter(transaction, "process_queue", row, &error)?;
		}
	}
	Ok(processed)
}

/// Recompute a process's overall children rollup.
fn process_children_stored(
	transaction: &rusqlite::Transaction<'_>,
	id: &str,
	transaction_id: i64,
) -> ar::Result<()> {
	let row: Option<bool> = transaction
		.query_row(
			"select subtree_stored from processes where id = ?1;",
			rusqlite::params![id],
			|row| row.get(0),
		)
		.optional()
		.map_err(|source| ar::error!(!source, "failed to get the process"))?;
	let Some(mut stored) = row else {
		return Ok(());
	};

	if !stored {
		let children = query_strings(
			transaction,
			indoc!(
				"
					select child from process_children
					where process = ?1
					order by child;
				"
			),
			id,
		)?;
		let mut count = 1u64;
		let mut complete = true;
		for child in &children {
			let child_row: Option<(bool, Option<u64>)> = transaction
				.query_row(
					"select subtree_stored, subtree_count from processes where id = ?1;",
					rusqlite::params![child],
					|row| Ok((row.get(0)?, row.get(1)?)),
				)
				.optional()
				.map_err(|source| ar::error!(!source, "failed to get the child"))?;
			let Some((child_stored, child_count)) = child_row else {
				complete = false;
				break;
			};
			if !child_stored {
				complete = false;
				break;
			}
			let Some(child_count) = child_count else {
				return Err(ar::error!(%child, "the child is stored but has no rollups"));
			};
			count += child_count;
		}
		if complete {
			transaction
				.execute(
					indoc!(
						"
							update processes
							set subtree_stored = 1, subtree_count = ?1
							where id = ?2;
						"
					),
					rusqlite::params![count, id],
				)
				.map_err(|source| ar::error!(!source, "failed to update the process"))?;
			stored = true;
		}
	}

	if stored {
		let parents = query_strings(
			transaction,
			indoc!(
				"
					select process_children.process
					from process_children
					join processes on processes.id = process_children.process
					where process_children.child = ?1 and processes.subtree_stored = 0
					order by process_children.process;
				"
			),
			id,
		)?;
		for parent in parents {
			enqueue_process(transaction, &parent, ProcessQueueKind::Children, transaction_id)?;
		}
	}

	Ok(())
}

/// Recompute a process's command, log, or output lane.
///
/// The node rollup covers the objects this process references with the
/// matching kind; the subtree rollup combines it with the children's subtree
/// rollups of the same lane. Lane depth is the union depth of a forest, so it
/// combines with max rather than 1 + max.
fn process_lane_stored(
	transaction: &rusqlite::Transaction<'_>,
	id: &str,
	lane: ProcessQueueKind,
	transaction_id: i64,
) -> ar::Result<()> {
	let (prefix, object_kind) = match lane {
		ProcessQueueKind::Command => ("command", ProcessObjectKind::Command),
		ProcessQueueKind::Log => ("log", ProcessObjectKind::Log),
		ProcessQueueKind::Output => ("output", ProcessObjectKind::Output),
		_ => return Err(ar::error!("expected a lane kind")),
	};

	let row: Option<(bool, bool)> = transaction
		.query_row(
			&formatdoc!(
					"
						select node_{prefix}_stored, subtree_{prefix}_stored
						from processes
						where id = ?1;
					"
			),
			rusqlite::params![id],
			|row| Ok((row.get(0)?, row.get(1)?)),
		)
		.optional()
		.map_err(|source| ar::error!(!source, "failed to get the process"))?;
	let Some((mut node_stored, mut subtree_stored)) = row else {
		return Ok(());
	};

	if !node_stored {
		let objects = {
			let mut statement = transaction
				.prepare_cached(indoc!(
					"
						select object from process_objects
						where process = ?1 and kind = ?2
						order by object;
					"
				))
				.map_err(|source| ar::error!(!source, "failed to prepare the statement"))?;
			statement
				.query_map(
					rusqlite::params![id, object_kind.to_i64().unwrap()],
					|row| row.get::<_, String>(0),
				)
				.map_err(|source| ar::error!(!source, "failed to query the process objects"))?
				.collect::<Result<Vec<_>, _>>()
				.map_err(|source| ar::error!(!source, "failed to read the process objects"))?
		};
		let mut count = 0u64;
		let mut depth = 0u64;
		let mut size = 0u64;
		let mut complete = true;
		for object in &objects {
			let object_row: Option<(bool, Option<u64>, Option<u64>, Option<u64>)> = transaction
				.query_row(
					indoc!(
						"
							select subtree_stored, subtree_count, subtree_depth, subtree_size
							from objects
							where id = ?1;
						"
					),
					rusqlite::params![object],
					|row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
				)
				.optional()
				.map_err(|source| ar::error!(!source, "failed to get the object"))?;
			let Some((object_stored, object_count, object_depth, object_size)) = object_row
			else {
				complete = false;
				break;
			};
			if !object_stored {
				complete = false;
				break;
			}
			let (Some(object_count), Some(object_depth), Some(object_size)) =
				(object_count, object_depth, object_size)
			else {
				return Err(ar::error!(%object, "the object is stored but has no rollups"));
			};
			count += object_count;
			depth = depth.max(object_depth);
			size += object_size;
		}
		if complete {
			transaction
				.execute(
					&formatdoc!(
							"
								update processes
								set
									node_{prefix}_stored = 1,
									node_{prefix}_count = ?1,
									node_{prefix}_depth = ?2,
									node_{prefix}_size = ?3
								where id = ?4;
							"
					),
					rusqlite::params![count, depth, size, id],
				)
				.map_err(|source| ar::error!(!source, "failed to update the process"))?;
			node_stored = true;
		}
	}

	if node_stored && !subtree_stored {
		let node: (Option<u64>, Option<u64>, Option<u64>) = transaction
			.query_row(
				&formatdoc!(
						"
							select node_{prefix}_count, node_{prefix}_depth, node_{prefix}_size
							from processes
							where id = ?1;
						"
				),
				rusqlite::params![id],
				|row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
			)
			.map_err(|source| ar::error!(!source, "failed to get the process"))?;
		let (Some(mut count), Some(mut depth), Some(mut size)) = node else {
			return Err(ar::error!(%id, "the node lane is stored but has no rollups"));
		};
		let children = query_strings(
			transaction,
			indoc!(
				"
					select child from process_children
					where process = ?1
					order by child;
				"
			),
			id,
		)?;
		let mut complete = true;
		for child in &children {
			let child_row: Option<(bool, Option<u64>, Option<u64>, Option<u64>)> = transaction
				.query_row(
					&formatdoc!(
							"
								select
									subtree_{prefix}_stored,
									subtree_{prefix}_count,
									subtree_{prefix}_depth,
									subtree_{prefix}_size
								from processes
								where id = ?1;
							"
					),
					rusqlite::params![child],
					|row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
				)
				.optional()
				.map_err(|source| ar::error!(!source, "failed to get the child"))?;
			let Some((child_stored, child_count, child_depth, child_size)) = child_row else {
				complete = false;
				break;
			};
			if !child_stored {
				complete = false;
				break;
			}
			let (Some(child_count), Some(child_depth), Some(child_size)) =
				(child_count, child_depth, child_size)
			else {
				return Err(ar::error!(%child, "the child lane is stored but has no rollups"));
			};
			count += child_count;
			depth = depth.max(child_depth);
			size += child_size;
		}
		if complete {
			transaction
				.execute(
					&formatdoc!(
							"
								update processes
								set
									subtree_{prefix}_stored = 1,
									subtree_{prefix}_count = ?1,
									subtree_{prefix}_depth = ?2,
									subtree_{prefix}_size = ?3
								where id = ?4;
							"
					),
					rusqlite::params![count, depth, size, id],
				)
				.map_err(|source| ar::error!(!source, "failed to update the process"))?;
			subtree_stored = true;
		}
	}

	if subtree_stored {
		let parents = query_strings(
			transaction,
			&formatdoc!(
					"
						select process_children.process
						from process_children
						join processes on processes.id = process_children.process
						where process_children.child = ?1 and processes.subtree_{prefix}_stored = 0
						order by process_children.process;
					"
			),
			id,
		)?;
		for parent in parents {
			enqueue_process(transaction, &parent, lane, transaction_id)?;
		}
	}

	Ok(())
}

fn handle_object_reference_count(
	transaction: &rusqlite::Transaction<'_>,
	transaction_id: i64,
	remaining: &mut u64,
) -> ar::Result<u64> {
	if *remaining == 0 {
		return Ok(0);
	}
	let rows = dequeue(
		transaction,
		indoc!(
			"
				select id, object, kind from object_queue
				where kind = 0
				order by object
				limit ?1;
			"
		),
		*remaining,
		"object_queue",
	)?;
	let processed: u64 = rows.len().try_into().unwrap();
	*remaining -= processed;
	for row in &rows {
		if let Err(error) = object_reference_count(transaction, &row.item, transaction_id) {
			dead_letter(transaction, "object_queue", row, &error)?;
		}
	}
	Ok(processed)
}

/// Recount one object's references, then recount any child or cache entry
/// whose count predates this object's row. Recounting is idempotent, so late
/// arriving parents can never double count an edge.
fn object_reference_count(
	transaction: &rusqlite::Transaction<'_>,
	id: &str,
	transaction_id: i64,
) -> ar::Result<()> {
	let row: Option<i64> = transaction
		.query_row(
			"select transaction_id from objects where id = ?1;",
			rusqlite::params![id],
			|row| row.get(0),
		)
		.optional()
		.map_err(|source| ar::error!(!source, "failed to get the object"))?;
	let Some(row_transaction_id) = row else {
		return Ok(());
	};

	recount_object(transaction, id, transaction_id)?;

	let stale_children = query_strings_with_i64(
		transaction,
		indoc!(
			"
				select object_children.child
				from object_children
				join objects on objects.id = object_children.child
				where
					object_children.object = ?1
					and (
						objects.reference_count_transaction_id is null
						or objects.reference_count_transaction_id < ?2
					)
				order by object_children.child;
			"
		),
		id,
		row_transaction_id,
	)?;
	for child in stale_children {
		recount_object(transaction, &child, transaction_id)?;
	}

	let stale_cache_entries = query_strings_with_i64(
		transaction,
		indoc!(
			"
				select objects.cache_entry
				from objects
				join cache_entries on cache_entries.id = objects.cache_entry
				where
					objects.id = ?1
					and objects.cache_entry is not null
					and (
						cache_entries.reference_count_transaction_id is null
						or cache_entries.reference_count_transaction_id < ?2
					);
			"
		),
		id,
		row_transaction_id,
	)?;
	for cache_entry in stale_cache_entries {
		recount_cache_entry(transaction, &cache_entry, transaction_id)?;
	}

	Ok(())
}

fn handle_process_reference_count(
	transaction: &rusqlite::Transaction<'_>,
	transaction_id: i64,
	remaining: &mut u64,
) -> ar::Result<u64> {
	if *remaining == 0 {
		return Ok(0);
	}
	let rows = dequeue(
		transaction,
		indoc!(
			"
				select id, process, kind from process_queue
				where kind = 0
				order by process
				limit ?1;
			"
		),
		*remaining,
		"process_queue",
	)?;
	let processed: u64 = rows.len().try_into().unwrap();
	*remaining -= processed;
	for row in &rows {
		if let Err(error) = process_reference_count(transaction, &row.item, transaction_id) {
			dead_letter(transaction, "process_queue", row, &error)?;
		}
	}
	Ok(processed)
}

fn process_reference_count(
	transaction: &rusqlite::Transaction<'_>,
	id: &str,
	transaction_id: i64,
) -> ar::Result<()> {
	let row: Option<i64> = transaction
		.query_row(
			"select transaction_id from processes where id = ?1;",
			rusqlite::params![id],
			|row| row.get(0),
		)
		.optional()
		.map_err(|source| ar::error!(!source, "failed to get the process"))?;
	let Some(row_transaction_id) = row else {
		return Ok(());
	};

	recount_process(transaction, id, transaction_id)?;

	let stale_children = query_strings_with_i64(
		transaction,
		indoc!(
			"
				select process_children.child
				from process_children
				join processes on processes.id = process_children.child
				where
					process_children.process = ?1
					and (
						processes.reference_count_transaction_id is null
						or processes.reference_count_transaction_id < ?2
					)
				order by process_children.child;
			"
		),
		id,
		row_transaction_id,
	)?;
	for child in stale_children {
		recount_process(transaction, &child, transaction_id)?;
	}

	let stale_objects = query_strings_with_i64(
		transaction,
		indoc!(
			"
				select process_objects.object
				from process_objects
				join objects on objects.id = process_objects.object
				where
					process_objects.process = ?1
					and (
						objects.reference_count_transaction_id is null
						or objects.reference_count_transaction_id < ?2
					)
				order by process_objects.object;
			"
		),
		id,
		row_transaction_id,
	)?;
	for object in stale_objects {
		recount_object(transaction, &object, transaction_id)?;
	}

	Ok(())
}

fn handle_cache_entry_reference_count(
	transaction: &rusqlite::Transaction<'_>,
	transaction_id: i64,
	remaining: &mut u64,
) -> ar::Result<u64> {
	if *remaining == 0 {
		return Ok(0);
	}
	let rows = {
		let mut statement = transaction
			.prepare_cached(indoc!(
				"
					select id, cache_entry from cache_entry_queue
					order by cache_entry
					limit ?1;
				"
			))
			.map_err(|source| ar::error!(!source, "failed to prepare the statement"))?;
		statement
			.query_map(rusqlite::params![*remaining], |row| {
				Ok(QueueRow {
					id: row.get(0)?,
					item: row.get(1)?,
					kind: 0,
				})
			})
			.map_err(|source| ar::error!(!source, "failed to query the queue"))?
			.collect::<Result<Vec<_>, _>>()
			.map_err(|source| ar::error!(!source, "failed to read the queue rows"))?
	};
	for row in &rows {
		transaction
			.execute(
				"delete from cache_entry_queue where id = ?1;",
				rusqlite::params![row.id],
			)
			.map_err(|source| ar::error!(!source, "failed to delete the queue row"))?;
	}
	let processed: u64 = rows.len().try_into().unwrap();
	*remaining -= processed;
	for row in &rows {
		if let Err(error) = recount_cache_entry(transaction, &row.item, transaction_id) {
			dead_letter(transaction, "cache_entry_queue", row, &error)?;
		}
	}
	Ok(processed)
}

pub(crate) fn recount_object(
	transaction: &rusqlite::Transaction<'_>,
	id: &str,
	transaction_id: i64,
) -> ar::Result<i64> {
	let count: i64 = transaction
		.query_row(
			indoc!(
				"
					select
						(select count(*) from object_children where child = ?1)
						+ (select count(*) from process_objects where object = ?1)
						+ (select count(*) from tags where item = ?1);
				"
			),
			rusqlite::params![id],
			|row| row.get(0),
		)
		.map_err(|source| ar::error!(!source, "failed to count the references"))?;
	transaction
		.execute(
			indoc!(
				"
					update objects
					set reference_count = ?1, reference_count_transaction_id = ?2
					where id = ?3;
				"
			),
			rusqlite::params![count, transaction_id, id],
		)
		.map_err(|source| ar::error!(!source, "failed to update the reference count"))?;
	Ok(count)
}

pub(crate) fn recount_process(
	transaction: &rusqlite::Transaction<'_>,
	id: &str,
	transaction_id: i64,
) -> ar::Result<i64> {
	let count: i64 = transaction
		.query_row(
			indoc!(
				"
					select
						(select count(*) from process_children where child = ?1)
						+ (select count(*) from tags where item = ?1);
				"
			),
			rusqlite::params![id],
			|row| row.get(0),
		)
		.map_err(|source| ar::error!(!source, "failed to count the references"))?;
	transaction
		.execute(
			indoc!(
				"
					update processes
					set reference_count = ?1, reference_count_transaction_id = ?2
					where id = ?3;
				"
			),
			rusqlite::params![count, transaction_id, id],
		)
		.map_err(|source| ar::error!(!source, "failed to update the reference count"))?;
	Ok(count)
}

pub(crate) fn recount_cache_entry(
	transaction: &rusqlite::Transaction<'_>,
	id: &str,
	transaction_id: i64,
) -> ar::Result<i64> {
	let count: i64 = transaction
		.query_row(
			indoc!(
				"
					select
						(select count(*) from objects where cache_entry = ?1)
						+ (select count(*) from tags where item = ?1);
				"
			),
			rusqlite::params![id],
			|row| row.get(0),
		)
		.map_err(|source| ar::error!(!source, "failed to count the references"))?;
	transaction
		.execute(
			indoc!(
				"
					update cache_entries
					set reference_count = ?1, reference_count_transaction_id = ?2
					where id = ?3;
				"
			),
			rusqlite::params![count, transaction_id, id],
		)
		.map_err(|source| ar::error!(!source, "failed to update the reference count"))?;
	Ok(count)
}

fn object_children(
	transaction: &rusqlite::Transaction<'_>,
	id: &str,
) -> ar::Result<Vec<String>> {
	query_strings(
		transaction,
		indoc!(
			"
				select child from object_children
				where object = ?1
				order by child;
			"
		),
		id,
	)
}

fn query_strings(
	transaction: &rusqlite::Transaction<'_>,
	statement: &str,
	parameter: &str,
) -> ar::Result<Vec<String>> {
	let mut statement = transaction
		.prepare_cached(statement)
		.map_err(|source| ar::error!(!source, "failed to prepare the statement"))?;
	statement
		.query_map(rusqlite::params![parameter], |row| row.get::<_, String>(0))
		.map_err(|source| ar::error!(!source, "failed to query"))?
		.collect::<Result<Vec<_>, _>>()
		.map_err(|source| ar::error!(!source, "failed to read the rows"))
}

fn query_strings_with_i64(
	transaction: &rusqlite::Transaction<'_>,
	statement: &str,
	parameter: &str,
	value: i64,
) -> ar::Result<Vec<String>> {
	let mut statement = transaction
		.prepare_cached(statement)
		.map_err(|source| ar::error!(!source, "failed to prepare the statement"))?;
	statement
		.query_map(rusqlite::params![parameter, value], |row| {
			row.get::<_, String>(0)
		})
		.map_err(|source| ar::error!(!source, "failed to query"))?
		.collect::<Result<Vec<_>, _>>()
		.map_err(|source| ar::error!(!source, "failed to read the rows"))
}
