pub mod client;
pub mod error;
pub mod models;

pub use client::{build_http_client, EsperClient};
pub use error::ApiError;
