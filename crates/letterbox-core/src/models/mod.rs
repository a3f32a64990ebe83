pub mod letter;
pub mod service;

pub use letter::*;
pub use service::*;
