pub mod database;
pub mod models;
pub mod progress_repository;
pub mod transaction_repository;

pub use database::Database;
pub use models::{BlockVolume, TransactionRecord};
pub use progress_repository::ProgressRepository;
pub use transaction_repository::{RankingMetric, TimeWindow, TransactionRepository};
