use arbor_client as ar;
use indoc::indoc;
use std::{
	path::Path,
	sync::{Arc, Mutex},
};

pub use self::{
	clean::Output as CleanOutput,
	message::{Messages, PutObjectArg, PutProcessArg},
	queries::{CacheEntry, Object, Process},
};

pub mod clean;
pub mod handle_messages;
pub mod handle_queue;
pub mod message;
pub mod queries;

#[cfg(test)]
mod tests;

/// The index.
///
/// All mutation goes through [`Index::handle_messages`], [`Index::handle_queue`],
/// and [`Index::clean`]; each runs as one transaction on a single writer
/// connection.
#[derive(Clone)]
pub struct Index {
	inner: Arc<Inner>,
}

struct Inner {
	connection: Mutex<rusqlite::Connection>,
}

/// The kinds of object queue rows. The values are wire-level.
#[derive(
	Clone,
	Copy,
	Debug,
	Eq,
	PartialEq,
	num_derive::FromPrimitive,
	num_derive::ToPrimitive,
	serde_repr::Deserialize_repr,
	serde_repr::Serialize_repr,
)]
#[repr(i64)]
pub enum ObjectQueueKind {
	ReferenceCount = 0,
	Stored = 1,
}

/// The kinds of process queue rows. The values are wire-level.
#[derive(
	Clone,
	Copy,
	Debug,
	Eq,
	PartialEq,
	num_derive::FromPrimitive,
	num_derive::ToPrimitive,
	serde_repr::Deserialize_repr,
	serde_repr::Serialize_repr,
)]
#[repr(i64)]
pub enum ProcessQueueKind {
	ReferenceCount = 0,
	Children = 1,
	Command = 2,
	Output = 3,
	Log = 4,
}

/// The kinds of process object edges. The values are wire-level.
#[derive(
	Clone,
	Copy,
	Debug,
	Eq,
	PartialEq,
	num_derive::FromPrimitive,
	num_derive::ToPrimitive,
	serde_repr::Deserialize_repr,
	serde_repr::Serialize_repr,
)]
#[repr(i64)]
pub enum ProcessObjectKind {
	Command = 0,
	Log = 2,
	Output = 3,
}

impl Index {
	/// Open an index at `path`, creating the schema if necessary.
	pub async fn open(path: &Path) -> ar::Result<Self> {
		let path = path.to_owned();
		tokio::task::spawn_blocking(move || {
			let connection = rusqlite::Connection::open(&path)
				.map_err(|source| ar::error!(!source, "failed to open the database"))?;
			Self::initialize(connection)
		})
		.await
		.map_err(|source| ar::error!(!source, "the task panicked"))?
	}

	/// Open an in-memory index.
	pub async fn open_in_memory() -> ar::Result<Self> {
		tokio::task::spawn_blocking(|| {
			let connection = rusqlite::Connection::open_in_memory()
				.map_err(|source| ar::error!(!source, "failed to open the database"))?;
			Self::initialize(connection)
		})
		.await
		.map_err(|source| ar::error!(!source, "the task panicked"))?
	}

	fn initialize(connection: rusqlite::Connection) -> ar::Result<Self> {
		connection
			.pragma_update(None, "journal_mode", "wal")
			.map_err(|source| ar::error!(!source, "failed to set the journal mode"))?;
		connection
			.pragma_update(None, "synchronous", "normal")
			.map_err(|source| ar::error!(!source, "failed to set synchronous"))?;
		connection
			.busy_timeout(std::time::Duration::from_secs(60))
			.map_err(|source| ar::error!(!source, "failed to set the busy timeout"))?;
		connection
			.execute_batch(SCHEMA)
			.map_err(|source| ar::error!(!source, "failed to create the schema"))?;
		let inner = Inner {
			connection: Mutex::new(connection),
		};
		Ok(Self {
			inner: Arc::new(inner),
		})
	}

	/// Atomically apply one batch of ingest messages.
	pub async fn handle_messages(&self, messages: Messages) -> ar::Result<()> {
		let index = self.clone();
		tokio::task::spawn_blocking(move || {
			let mut connection = index.inner.connection.lock().unwrap();
			handle_messages::handle_messages(&mut connection, &messages)
		})
		.await
		.map_err(|source| ar::error!(!source, "the task panicked"))?
	}

	/// Run one batch of background work with budget `n`. Returns the number of
	/// queue rows processed; zero means the queues were quiescent.
	pub async fn handle_queue(&self, n: u64) -> ar::Result<u64> {
		let index = self.clone();
		tokio::task::spawn_blocking(move || {
			let mut connection = index.inner.connection.lock().unwrap();
			handle_queue::handle_queue(&mut connection, n)
		})
		.await
		.map_err(|source| ar::error!(!source, "the task panicked"))?
	}

	/// Remove unreferenced items whose `touched_at` is at or before
	/// `max_touched_at`, up to `batch_size` candidates per kind.
	pub async fn clean(
		&self,
		max_touched_at: time::OffsetDateTime,
		batch_size: u64,
	) -> ar::Result<clean::Output> {
		let index = self.clone();
		tokio::task::spawn_blocking(move || {
			let mut connection = index.inner.connection.lock().unwrap();
			clean::clean(&mut connection, max_touched_at.unix_timestamp(), batch_size)
		})
		.await
		.map_err(|source| ar::error!(!source, "the task panicked"))?
	}

	pub async fn try_get_object(&self, id: ar::object::Id) -> ar::Result<Option<Object>> {
		self.query(move |connection| queries::try_get_object(connection, &id))
			.await
	}

	pub async fn try_get_object_metadata(
		&self,
		id: ar::object::Id,
	) -> ar::Result<Option<ar::object::Metadata>> {
		self.query(move |connection| queries::try_get_object_metadata(connection, &id))
			.await
	}

	pub async fn try_get_process(&self, id: ar::process::Id) -> ar::Result<Option<Process>> {
		self.query(move |connection| queries::try_get_process(connection, &id))
			.await
	}

	pub async fn try_get_process_metadata(
		&self,
		id: ar::process::Id,
	) -> ar::Result<Option<ar::process::Metadata>> {
		self.query(move |connection| queries::try_get_process_metadata(connection, &id))
			.await
	}

	pub async fn try_get_cache_entry(&self, id: ar::blob::Id) -> ar::Result<Option<CacheEntry>> {
		self.query(move |connection| queries::try_get_cache_entry(connection, &id))
			.await
	}

	pub async fn try_get_tag(&self, tag: ar::Tag) -> ar::Result<Option<ar::tag::Item>> {
		self.query(move |connection| queries::try_get_tag(connection, &tag))
			.await
	}

	pub async fn list_tags(&self, arg: ar::tag::list::Arg) -> ar::Result<ar::tag::list::Output> {
		self.query(move |connection| queries::list_tags(connection, &arg))
			.await
	}

	/// The total number of rows across the work queues.
	pub async fn queue_depth(&self) -> ar::Result<u64> {
		self.query(queries::queue_depth).await
	}

	async fn query<T, F>(&self, f: F) -> ar::Result<T>
	where
		T: Send + 'static,
		F: FnOnce(&rusqlite::Connection) -> ar::Result<T> + Send + 'static,
	{
		let index = self.clone();
		tokio::task::spawn_blocking(move || {
			let connection = index.inner.connection.lock().unwrap();
			f(&connection)
		})
		.await
		.map_err(|source| ar::error!(!source, "the task panicked"))?
	}
}

pub(crate) fn get_transaction_id(connection: &rusqlite::Connection) -> ar::Result<i64> {
	connection
		.query_row("select id from transaction_id;", [], |row| row.get(0))
		.map_err(|source| ar::error!(!source, "failed to get the transaction id"))
}

pub(crate) fn set_transaction_id(connection: &rusqlite::Connection, id: i64) -> ar::Result<()> {
	connection
		.execute("update transaction_id set id = ?1;", rusqlite::params![id])
		.map_err(|source| ar::error!(!source, "failed to set the transaction id"))?;
	Ok(())
}

const SCHEMA: &str = indoc!(
	"
		create table if not exists transaction_id (
			id integer not null
		);

		insert into transaction_id (id)
		select 0
		where not exists (select 1 from transaction_id);

		create table if not exists cache_entries (
			id text primary key,
			reference_count integer,
			reference_count_transaction_id integer,
			touched_at integer not null
		);

		create table if not exists objects (
			id text primary key,
			cache_entry text,
			node_size integer not null,
			reference_count integer,
			reference_count_transaction_id integer,
			subtree_count integer,
			subtree_depth integer,
			subtree_size integer,
			subtree_stored integer not null default 0,
			touched_at integer not null,
			transaction_id integer not null
		);

		create index if not exists objects_cache_entry_index
		on objects (cache_entry)
		where cache_entry is not null;

		create table if not exists object_children (
			object text not null,
			child text not null
		);

		create unique index if not exists object_children_object_child_index
		on object_children (object, child);

		create index if not exists object_children_child_index
		on object_children (child);

		create table if not exists processes (
			id text primary key,
			node_command_stored integer not null default 0,
			node_command_count integer,
			node_command_depth integer,
			node_command_size integer,
			node_log_stored integer not null default 0,
			node_log_count integer,
			node_log_depth integer,
			node_log_size integer,
			node_output_stored integer not null default 0,
			node_output_count integer,
			node_output_depth integer,
			node_output_size integer,
			subtree_command_stored integer not null default 0,
			subtree_command_count integer,
			subtree_command_depth integer,
			subtree_command_size integer,
			subtree_log_stored integer not null default 0,
			subtree_log_count integer,
			subtree_log_depth integer,
			subtree_log_size integer,
			subtree_output_stored integer not null default 0,
			subtree_output_count integer,
			subtree_output_depth integer,
			subtree_output_size integer,
			subtree_count integer,
			subtree_stored integer not null default 0,
			reference_count integer,
			reference_count_transaction_id integer,
			touched_at integer not null,
			transaction_id integer not null
		);

		create table if not exists process_children (
			process text not null,
			child text not null,
			position integer not null
		);

		create unique index if not exists process_children_process_child_index
		on process_children (process, child);

		create unique index if not exists process_children_process_position_index
		on process_children (process, position);

		create index if not exists process_children_child_index
		on process_children (child);

		create table if not exists process_objects (
			process text not null,
			object text not null,
			kind integer not null
		);

		create unique index if not exists process_objects_process_object_kind_index
		on process_objects (process, object, kind);

		create index if not exists process_objects_object_index
		on process_objects (object);

		create table if not exists tags (
			tag text primary key,
			item text not null
		);

		create index if not exists tags_item_index
		on tags (item);

		create table if not exists object_queue (
			id integer primary key autoincrement,
			object text not null,
			kind integer not null,
			transaction_id integer not null
		);

		create table if not exists process_queue (
			id integer primary key autoincrement,
			process text not null,
			kind integer not null,
			transaction_id integer not null
		);

		create table if not exists cache_entry_queue (
			id integer primary key autoincrement,
			cache_entry text not null,
			transaction_id integer not null
		);

		create table if not exists dead_letter_queue (
			id integer primary key autoincrement,
			queue text not null,
			item text not null,
			kind integer,
			error text not null
		);
	"
);
