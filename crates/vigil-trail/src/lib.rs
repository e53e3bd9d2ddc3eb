pub mod memory;
pub mod seq;
pub mod store;

pub use memory::*;
pub use seq::*;
pub use store::*;
