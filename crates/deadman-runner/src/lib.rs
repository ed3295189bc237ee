//! Wiring for the switch: config, the run engine, payload release, and the
//! helpers behind the CLI's maintenance commands.

pub mod config;
pub mod doctor;
pub mod engine;
pub mod release;
pub mod runner;
pub mod seal;
pub mod util;

pub use config::*;
pub use doctor::*;
pub use engine::*;
pub use release::*;
pub use runner::*;
pub use seal::*;
pub use util::*;
