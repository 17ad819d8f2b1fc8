pub mod config;
pub mod error;
pub mod states;
pub mod types;

pub use config::Config;
pub use error::EventSiftError;
pub use states::{normalize_state, state_name};
pub use types::*;
