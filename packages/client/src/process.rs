pub use self::{data::Process as Data, id::Id, metadata::Metadata};

pub mod data;
pub mod id;
pub mod metadata;
