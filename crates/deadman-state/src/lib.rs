pub mod json;
pub mod memory;
pub mod schema;
pub mod traits;

pub use json::*;
pub use memory::*;
pub use schema::*;
pub use traits::*;
