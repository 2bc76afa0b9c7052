pub mod config;
pub mod error;
pub mod introns;
pub mod source;
pub mod types;
pub mod viewport;

pub use config::Config;
pub use error::{Error, Result};
pub use introns::ShortenedIntronsViewport;
