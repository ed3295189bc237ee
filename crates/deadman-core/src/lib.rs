pub mod backoff;
pub mod clock;
pub mod commands;
pub mod engine;
pub mod model;
pub mod outcomes;
pub mod snapshot;
pub mod types;
pub mod window;

pub use backoff::*;
pub use clock::*;
pub use commands::*;
pub use engine::*;
pub use model::*;
pub use outcomes::*;
pub use snapshot::*;
pub use types::*;
pub use window::*;
