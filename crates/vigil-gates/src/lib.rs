pub mod coherence;
pub mod gate;
pub mod identity;
pub mod intent;
pub mod origin;
pub mod passage;
pub mod pipeline;
pub mod registry;

pub use coherence::*;
pub use gate::*;
pub use identity::*;
pub use intent::*;
pub use origin::*;
pub use passage::*;
pub use pipeline::*;
pub use registry::*;
