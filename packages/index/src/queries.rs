use arbor_client as ar;
use indoc::indoc;
use rusqlite::OptionalExtension as _;

/// A cache entry row.
#[derive(Clone, Debug)]
pub struct CacheEntry {
	pub id: ar::blob::Id,
	pub reference_count: Option<u64>,
	pub touched_at: i64,
}

/// An object row.
#[derive(Clone, Debug)]
pub struct Object {
	pub id: ar::object::Id,
	pub cache_entry: Option<ar::blob::Id>,
	pub node_size: u64,
	pub reference_count: Option<u64>,
	pub subtree_count: Option<u64>,
	pub subtree_depth: Option<u64>,
	pub subtree_size: Option<u64>,
	pub subtree_stored: bool,
	pub touched_at: i64,
}

/// A process row.
#[derive(Clone, Debug)]
pub struct Process {
	pub id: ar::process::Id,
	pub reference_count: Option<u64>,
	pub subtree_count: Option<u64>,
	pub subtree_stored: bool,
	pub command: Lane,
	pub log: Lane,
	pub output: Lane,
	pub touched_at: i64,
}

#[derive(Clone, Debug)]
pub struct Lane {
	pub stored: bool,
	pub count: Option<u64>,
	pub depth: Option<u64>,
	pub size: Option<u64>,
}

pub fn try_get_object(
	connection: &rusqlite::Connection,
	id: &ar::object::Id,
) -> ar::Result<Option<Object>> {
	connection
		.query_row(
			indoc!(
				"
					select
						cache_entry,
						node_size,
						reference_count,
						subtree_count,
						subtree_depth,
						subtree_size,
						subtree_stored,
						touched_at
					from objects
					where id = ?1;
				"
			),
			rusqlite::params![id.to_string()],
			|row| {
				Ok((
					row.get::<_, Option<String>>(0)?,
					row.get::<_, u64>(1)?,
					row.get::<_, Option<u64>>(2)?,
					row.get::<_, Option<u64>>(3)?,
					row.get::<_, Option<u64>>(4)?,
					row.get::<_, Option<u64>>(5)?,
					row.get::<_, bool>(6)?,
					row.get::<_, i64>(7)?,
				))
			},
		)
		.optional()
		.map_err(|source| ar::error!(!source, "failed to get the object"))?
		.map(
			|(
				cache_entry,
				node_size,
				reference_count,
				subtree_count,
				subtree_depth,
				subtree_size,
				subtree_stored,
				touched_at,
			)| {
				let cache_entry = cache_entry
					.map(|id| {
						id.parse()
							.map_err(|source| ar::error!(!source, "invalid cache entry id"))
					})
					.transpose()?;
				Ok(Object {
					id: id.clone(),
					cache_entry,
					node_size,
					reference_count,
					subtree_count,
					subtree_depth,
					subtree_size,
					subtree_stored,
					touched_at,
				})
			},
		)
		.transpose()
}

pub fn try_get_object_metadata(
	connection: &rusqlite::Connection,
	id: &ar::object::Id,
) -> ar::Result<Option<ar::object::Metadata>> {
	let object = try_get_object(connection, id)?;
	Ok(object.map(|object| ar::object::Metadata {
		node_size: object.node_size,
		subtree_count: object.subtree_count,
		subtree_depth: object.subtree_depth,
		subtree_size: object.subtree_size,
		subtree_stored: object.subtree_stored,
	}))
}

pub fn try_get_process(
	connection: &rusqlite::Connection,
	id: &ar::process::Id,
) -> ar::Result<Option<Process>> {
	connection
		.query_row(
			indoc!(
				"
					select
						reference_count,
						subtree_count,
						subtree_stored,
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
						touched_at
					from processes
					where id = ?1;
				"
			),
			rusqlite::params![id.to_string()],
			|row| {
				Ok(Process {
					id: id.clone(),
					reference_count: row.get(0)?,
					subtree_count: row.get(1)?,
					subtree_stored: row.get(2)?,
					command: Lane {
						stored: row.get(3)?,
						count: row.get(4)?,
						depth: row.get(5)?,
						size: row.get(6)?,
					},
					log: Lane {
						stored: row.get(7)?,
						count: row.get(8)?,
						depth: row.get(9)?,
						size: row.get(10)?,
					},
					output: Lane {
						stored: row.get(11)?,
						count: row.get(12)?,
						depth: row.get(13)?,
						size: row.get(14)?,
					},
					touched_at: row.get(15)?,
				})
			},
		)
		.optional()
		.map_err(|source| ar::error!(!source, "failed to get the process"))
}

pub fn try_get_process_metadata(
	connection: &rusqlite::Connection,
	id: &ar::process::Id,
) -> ar::Result<Option<ar::process::Metadata>> {
	let process = try_get_process(connection, id)?;
	Ok(process.map(|process| ar::process::Metadata {
		subtree_count: process.subtree_count,
		subtree_stored: process.subtree_stored,
		command: lane_metadata(&process.command),
		log: lane_metadata(&process.log),
		output: lane_metadata(&process.output),
	}))
}

fn lane_metadata(lane: &Lane) -> ar::process::metadata::Lane {
	ar::process::metadata::Lane {
		stored: lane.stored,
		count: lane.count,
		depth: lane.depth,
		size: lane.size,
	}
}

pub fn try_get_cache_entry(
	connection: &rusqlite::Connection,
	id: &ar::blob::Id,
) -> ar::Result<Option<CacheEntry>> {
	connection
		.query_row(
			indoc!(
				"
					select reference_count, touched_at
					from cache_entries
					where id = ?1;
				"
			),
			rusqlite::params![id.to_string()],
			|row| {
				Ok(CacheEntry {
					id: id.clone(),
					reference_count: row.get(0)?,
					touched_at: row.get(1)?,
				})
			},
		)
		.optional()
		.map_err(|source| ar::error!(!source, "failed to get the cache entry"))
}

pub fn try_get_tag(
	connection: &rusqlite::Connection,
	tag: &ar::Tag,
) -> ar::Result<Option<ar::tag::Item>> {
	let item: Option<String> = connection
		.query_row(
			"select item from tags where tag = ?1;",
			rusqlite::params![tag.to_string()],
			|row| row.get(0),
		)
		.optional()
		.map_err(|source| ar::error!(!source, "failed to get the tag"))?;
	item.map(|item| {
		item.parse()
			.map_err(|source| ar::error!(!source, "invalid tag item"))
	})
	.transpose()
}

pub fn list_tags(
	connection: &rusqlite::Connection,
	arg: &ar::tag::list::Arg,
) -> ar::Result<ar::tag::list::Output> {
	let length = arg
		.length
		.map_or(i64::MAX, |length| length.try_into().unwrap_or(i64::MAX));
	let rows = if let Some(prefix) = &arg.prefix {
		let mut statement = connection
			.prepare_cached(indoc!(
				"
					select tag, item from tags
					where tag = ?1 or tag like ?1 || '/%'
					order by tag
					limit ?2;
				"
			))
			.map_err(|source| ar::error!(!source, "failed to prepare the statement"))?;
		let rows = statement
			.query_map(rusqlite::params![prefix.to_string(), length], |row| {
				Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
			})
			.map_err(|source| ar::error!(!source, "failed to query the tags"))?
			.collect::<Result<Vec<_>, _>>()
			.map_err(|source| ar::error!(!source, "failed to read the tags"))?;
		rows
	} else {
		let mut statement = connection
			.prepare_cached(indoc!(
				"
					select tag, item from tags
					order by tag
					limit ?1;
				"
			))
			.map_err(|source| ar::error!(!source, "failed to prepare the statement"))?;
		let rows = statement
			.query_map(rusqlite::params![length], |row| {
				Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
			})
			.map_err(|source| ar::error!(!source, "failed to query the tags"))?
			.collect::<Result<Vec<_>, _>>()
			.map_err(|source| ar::error!(!source, "failed to read the tags"))?;
		rows
	};
	let data = rows
		.into_iter()
		.map(|(tag, item)| {
			let tag = tag
				.parse()
				.map_err(|source| ar::error!(!source, "invalid tag"))?;
			let item = item
				.parse()
				.map_err(|source| ar::error!(!source, "invalid tag item"))?;
			Ok(ar::tag::get::Output { tag, item })
		})
		.collect::<ar::Result<Vec<_>>>()?;
	Ok(ar::tag::list::Output { data })
}

pub fn queue_depth(connection: &rusqlite::Connection) -> ar::Result<u64> {
	connection
		.query_row(
			indoc!(
				"
					select
						(select count(*) from object_queue)
						+ (select count(*) from process_queue)
						+ (select count(*) from cache_entry_queue);
				"
			),
			[],
			|row| row.get(0),
		)
		.map_err(|source| ar::error!(!source, "failed to count the queue rows"))
}
