pub mod cancellation;
pub mod config;
pub mod errors;
pub mod logging;
