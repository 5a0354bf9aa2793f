mod item;
mod result_set;
pub mod wire;

pub use item::{ItemId, ResultItem};
pub use result_set::ResultSet;
pub use wire::{decode_results, DecodeError};
