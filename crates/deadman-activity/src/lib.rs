//! Rate-limited fetcher for a handle's recent public activity.

pub mod client;
pub mod sleeper;
pub mod transport;

pub use client::*;
pub use sleeper::*;
pub use transport::*;
