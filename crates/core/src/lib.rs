pub mod config;
pub mod document;
pub mod error;
pub mod result;

pub use config::Config;
pub use document::*;
pub use error::*;
pub use result::*;
