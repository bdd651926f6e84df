pub mod config;
pub mod infer;
pub mod metrics;
pub mod payload;
pub mod worker;
