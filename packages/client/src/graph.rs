pub use self::{data::Graph as Data, id::Id};

pub mod data;
pub mod id;
