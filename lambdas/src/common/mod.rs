pub mod config;
pub mod errors;
pub mod esper;
pub mod updater;
pub mod utils;
pub mod validation;
pub mod versions;

pub const REQUEST_SUCCEEDED: &str = "Request succeeded";
pub const REQUEST_FAILED: &str = "Request failed";
