pub use self::{data::Blob as Data, id::Id};

pub mod data;
pub mod id;
