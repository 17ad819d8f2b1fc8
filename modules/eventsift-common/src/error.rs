use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventSiftError {
    #[error("Invalid date literal: {0}")]
    InvalidDate(String),
}
