pub mod aggregator;
pub mod config;
pub mod errors;
pub mod ingestor;
pub mod labeling;
pub mod liveness;
pub mod models;
pub mod playlist;
pub mod sources;
pub mod utils;
