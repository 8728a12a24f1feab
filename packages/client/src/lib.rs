pub use self::{
	error::{Error, Result},
	id::Id,
	lockfile::Lockfile,
	reference::Reference,
	referent::Referent,
	tag::Tag,
};

pub mod artifact;
pub mod blob;
pub mod bytes;
pub mod checkin;
pub mod checkout;
pub mod clean;
pub mod command;
pub mod directory;
pub mod error;
pub mod file;
pub mod graph;
pub mod id;
pub mod lockfile;
pub mod module;
pub mod object;
pub mod process;
pub mod reference;
pub mod referent;
pub mod symlink;
pub mod tag;
pub mod util;
