pub mod error;
pub mod ids;
pub mod model;
pub mod trail;
pub mod types;

pub use error::*;
pub use ids::*;
pub use model::*;
pub use trail::*;
pub use types::*;
