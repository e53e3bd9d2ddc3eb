pub mod freshness;
pub mod sweep;
pub mod verify;

pub use freshness::*;
pub use sweep::*;
pub use verify::*;
