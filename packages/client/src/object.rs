pub use self::{data::Object as Data, id::Id, kind::Kind, metadata::Metadata};

pub mod data;
pub mod id;
pub mod kind;
pub mod metadata;
