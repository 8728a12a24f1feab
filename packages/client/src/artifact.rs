pub use self::{data::Artifact as Data, id::Id, kind::Kind};

pub mod data;
pub mod id;
pub mod kind;
