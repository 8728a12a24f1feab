use crate::{
	get_transaction_id,
	handle_queue::{recount_cache_entry, recount_object, recount_process},
	set_transaction_id,
};
use arbor_client as ar;
use indoc::{formatdoc, indoc};
use itertools::Itertools as _;

/// The items removed by one [`clean`](crate::Index::clean) batch.
#[derive(Clone, Debug, Default)]
pub struct Output {
	pub bytes: u64,
	pub cache_entries: Vec<ar::blob::Id>,
	pub objects: Vec<ar::object::Id>,
	pub processes: Vec<ar::process::Id>,
}

/// Remove unreferenced items whose `touched_at` is at or before
/// `max_touched_at`.
///
/// Candidates are selected and handled in id order, and their reference
/// counts are recomputed from scratch inside the transaction, which closes
/// the race with a concurrent tag put or edge insertion resurrecting them.
pub fn clean(
	connection: &mut rusqlite::Connection,
	max_touched_at: i64,
	batch_size: u64,
) -> ar::Result<Output> {
	let transaction = connection
		.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
		.map_err(|source| ar::error!(!source, "failed to begin a transaction"))?;
	let transaction_id = get_transaction_id(&transaction)? + 1;
	let mut output = Output::default();
	let mut remaining = batch_size;
	clean_cache_entries(
		&transaction,
		transaction_id,
		max_touched_at,
		&mut remaining,
		&mut output,
	)?;
	clean_objects(
		&transaction,
		transaction_id,
		max_touched_at,
		&mut remaining,
		&mut output,
	)?;
	clean_processes(
		&transaction,
		transaction_id,
		max_touched_at,
		&mut remaining,
		&mut output,
	)?;
	let work = !output.cache_entries.is_empty()
		|| !output.objects.is_empty()
		|| !output.processes.is_empty();
	if work {
		set_transaction_id(&transaction, transaction_id)?;
	}
	transaction
		.commit()
		.map_err(|source| ar::error!(!source, "failed to commit the transaction"))?;
	tracing::debug!(
		cache_entries = output.cache_entries.len(),
		objects = output.objects.len(),
		processes = output.processes.len(),
		bytes = output.bytes,
		"cleaned",
	);
	Ok(output)
}

fn candidates(
	transaction: &rusqlite::Transaction<'_>,
	table: &str,
	max_touched_at: i64,
	limit: u64,
) -> ar::Result<Vec<String>> {
	let mut statement = transaction
		.prepare_cached(&formatdoc!(
				"
					select id from {table}
					where reference_count = 0 and touched_at <= ?1
					order by id
					limit ?2;
				"
		))
		.map_err(|source| ar::error!(!source, "failed to prepare the statement"))?;
	statement
		.query_map(rusqlite::params![max_touched_at, limit], |row| {
			row.get::<_, String>(0)
		})
		.map_err(|source| ar::error!(!source, "failed to query the candidates"))?
		.collect::<Result<Vec<_>, _>>()
		.map_err(|source| ar::error!(!source, "failed to read the candidates"))
}

fn clean_cache_entries(
	transaction: &rusqlite::Transaction<'_>,
	transaction_id: i64,
	max_touched_at: i64,
	remaining: &mut u64,
	output: &mut Output,
) -> ar::Result<()> {
	if *remaining == 0 {
		return Ok(());
	}
	let candidates = candidates(transaction, "cache_entries", max_touched_at, *remaining)?;
	for id in candidates {
		let count = recount_cache_entry(transaction, &id, transaction_id)?;
		if count != 0 {
			continue;
		}
		transaction
			.execute(
				"delete from cache_entries where id = ?1;",
				rusqlite::params![id],
			)
			.map_err(|source| ar::error!(!source, "failed to delete the cache entry"))?;
		let id = id
			.parse()
			.map_err(|source| ar::error!(!source, "invalid cache entry id"))?;
		output.cache_entries.push(id);
		*remaining -= 1;
	}
	Ok(())
}

fn clean_objects(
	transaction: &rusqlite::Transaction<'_>,
	transaction_id: i64,
	max_touched_at: i64,
	remaining: &mut u64,
	output: &mut Output,
) -> ar::Result<()> {
	if *remaining == 0 {
		return Ok(());
	}
	let candidates = candidates(transaction, "objects", max_touched_at, *remaining)?;
	for id in candidates {
		let count = recount_object(transaction, &id, transaction_id)?;
		if count != 0 {
			continue;
		}

		let (node_size, cache_entry): (u64, Option<String>) = transaction
			.query_row(
				"select node_size, cache_entry from objects where id = ?1;",
				rusqlite::params![id],
				|row| Ok((row.get(0)?, row.get(1)?)),
			)
			.map_err(|source| ar::error!(!source, "failed to get the object"))?;
		let children: Vec<String> = {
			let mut statement = transaction
				.prepare_cached(
					"select child from object_children where object = ?1 order by child;",
				)
				.map_err(|source| ar::error!(!source, "failed to prepare the statement"))?;
			statement
				.query_map(rusqlite::params![id], |row| row.get(0))
				.map_err(|source| ar::error!(!source, "failed to query the children"))?
				.collect::<Result<Vec<_>, _>>()
				.map_err(|source| ar::error!(!source, "failed to read the children"))?
		};

		transaction
			.execute("delete from objects where id = ?1;", rusqlite::params![id])
			.map_err(|source| ar::error!(!source, "failed to delete the object"))?;
		transaction
			.execute(
				"delete from object_children where object = ?1;",
				rusqlite::params![id],
			)
			.map_err(|source| ar::error!(!source, "failed to delete the object children"))?;

		// Decrement the children's and cache entry's counts in id order.
		for child in children.iter().sorted() {
			transaction
				.execute(
					indoc!(
						"
							update objects
							set reference_count = reference_count - 1
							where id = ?1 and reference_count is not null;
						"
					),
					rusqlite::params![child],
				)
				.map_err(|source| {
					ar::error!(!source, "failed to update the child reference count")
				})?;
		}
		if let Some(cache_entry) = cache_entry {
			transaction
				.execute(
					indoc!(
						"
							update cache_entries
							set reference_count = reference_count - 1
							where id = ?1 and reference_count is not null;
						"
					),
					rusqlite::params![cache_entry],
				)
				.map_err(|source| {
					ar::error!(!source, "failed to update the cache entry reference count")
				})?;
		}

		output.bytes += node_size;
		let id = id
			.parse()
			.map_err(|source| ar::error!(!source, "invalid object id"))?;
		output.objects.push(id);
		*remaining -= 1;
	}
	Ok(())
}

fn clean_processes(
	transaction: &rusqlite::Transaction<'_>,
	transaction_id: i64,
	max_touched_at: i64,
	remaining: &mut u64,
	output: &mut Output,
) -> ar::Result<()> {
	if *remaining == 0 {
		return Ok(());
	}
	let candidates = candidates(transaction, "processes", max_touched_at, *remaining)?;
	for id in candidates {
		let count = recount_process(transaction, &id, transaction_id)?;
		if count != 0 {
			continue;
		}

		let children: Vec<String> = {
			let mut statement = transaction
				.prepare_cached(
					"select child from process_children where process = ?1 order by child;",
				)
				.map_err(|source| ar::error!(!source, "failed to prepare the statement"))?;
			statement
				.query_map(rusqlite::params![id], |row| row.get(0))
				.map_err(|source| ar::error!(!source, "failed to query the children"))?
				.collect::<Result<Vec<_>, _>>()
				.map_err(|source| ar::error!(!source, "failed to read the children"))?
		};
		// One decrement per edge row, because the counts count edges, not
		// distinct targets.
		let objects: Vec<String> = {
			let mut statement = transaction
				.prepare_cached(
					"select object from process_objects where process = ?1 order by object;",
				)
				.map_err(|source| ar::error!(!source, "failed to prepare the statement"))?;
			statement
				.query_map(rusqlite::params![id], |row| row.get(0))
				.map_err(|source| ar::error!(!source, "failed to query the objects"))?
				.collect::<Result<Vec<_>, _>>()
				.map_err(|source| ar::error!(!source, "failed to read the objects"))?
		};

		transaction
			.execute("delete from processes where id = ?1;", rusqlite::params![id])
			.map_err(|source| ar::error!(!source, "failed to delete the process"))?;
		transaction
			.execute(
				"delete from process_children where process = ?1;",
				rusqlite::params![id],
			)
			.map_err(|source| ar::error!(!source, "failed to delete the process children"))?;
		transaction
			.execute(
				"delete from process_objects where process = ?1;",
				rusqlite::params![id],
			)
			.map_err(|source| ar::error!(!source, "failed to delete the process objects"))?;

		for child in children.iter().sorted() {
			transaction
				.execute(
					indoc!(
						"
							update processes
							set reference_count = reference_count - 1
							where id = ?1 and reference_count is not null;
						"
					),
					rusqlite::params![child],
				)
				.map_err(|source| {
					ar::error!(!source, "failed to update the child reference count")
				})?;
		}
		for object in objects.iter().sorted() {
			transaction
				.execute(
					indoc!(
						"
							update objects
							set reference_count = reference_count - 1
							where id = ?1 and reference_count is not null;
						"
					),
					rusqlite::params![object],
				)
				.map_err(|source| {
					ar::error!(!source, "failed to update the object reference count")
				})?;
		}

		let id = id
			.parse()
			.map_err(|source| ar::error!(!source, "invalid process id"))?;
		output.processes.push(id);
		*remaining -= 1;
	}
	Ok(())
}
