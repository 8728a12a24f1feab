pub use self::{data::Command as Data, id::Id};

pub mod data;
pub mod id;
