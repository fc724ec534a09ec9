// Utsushi Image Handler Library

pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod pipeline;
pub mod request;
pub mod security;
pub mod storage;
pub mod transform;

pub use error::HandlerError;
pub use handler::{handle, ApiResponse};
