use crate as ar;
use bytes::Bytes;
use serde_with::serde_as;
use time::format_description::well_known::Rfc3339;

#[serde_as]
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct Process {
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub children: Vec<ar::process::Id>,

	pub command: ar::command::Id,

	#[serde_as(as = "Rfc3339")]
	pub created_at: time::OffsetDateTime,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<ar::Error>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub exit: Option<u8>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	#[serde_as(as = "Option<Rfc3339>")]
	pub finished_at: Option<time::OffsetDateTime>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub log: Option<ar::blob::Id>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub output: Option<ar::object::Id>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	#[serde_as(as = "Option<Rfc3339>")]
	pub started_at: Option<time::OffsetDateTime>,
}

impl Process {
	pub fn serialize(&self) -> ar::Result<Bytes> {
		serde_json::to_vec(self)
			.map(Into::into)
			.map_err(|source| ar::error!(!source, "failed to serialize the data"))
	}

	pub fn deserialize<'a>(bytes: impl Into<ar::bytes::Cow<'a>>) -> ar::Result<Self> {
		serde_json::from_slice(bytes.into().as_ref())
			.map_err(|source| ar::error!(!source, "failed to deserialize the data"))
	}

	/// Compute the process's ID from its canonical form.
	pub fn id(&self) -> ar::Result<ar::process::Id> {
		let bytes = self.serialize()?;
		Ok(ar::process::Id::new(&bytes))
	}

	/// The command object referenced by this process.
	#[must_use]
	pub fn command(&self) -> ar::object::Id {
		self.command.clone().into()
	}

	/// The log object referenced by this process, if any.
	#[must_use]
	pub fn log(&self) -> Option<ar::object::Id> {
		self.log.clone().map(Into::into)
	}

	/// The output object referenced by this process, if any.
	#[must_use]
	pub fn output(&self) -> Option<ar::object::Id> {
		self.output.clone()
	}

	/// Every object referenced by this process.
	#[must_use]
	pub fn objects(&self) -> Vec<ar::object::Id> {
		let command = std::iter::once(self.command());
		let log = self.log();
		let output = self.output();
		std::iter::empty()
			.chain(command)
			.chain(log)
			.chain(output)
			.collect()
	}
}
