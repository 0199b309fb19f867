pub mod config;
pub mod errors;
pub mod extractor;
pub mod ingestor;
pub mod query;
pub mod repository;
pub mod rpc;
pub mod units;
pub mod validation;
