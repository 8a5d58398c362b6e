pub mod classifier;
pub mod dataset;
pub mod decoder;
pub mod error;
pub mod literal;
pub mod matrix;
pub mod metrics;
pub mod pipeline;
pub mod region;
pub mod report;
pub mod selector;
pub mod vocabulary;

pub use error::{Error, Result};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn get_version() -> &'static str {
    VERSION
}
