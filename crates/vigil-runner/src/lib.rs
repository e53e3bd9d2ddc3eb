pub mod config;
pub mod runner;
pub mod util;

pub use config::*;
pub use runner::*;
pub use util::*;
