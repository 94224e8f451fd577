pub mod config;
pub mod dashboard;
pub mod error;
pub mod fingerprint;
pub mod health;
pub mod storage;
pub mod types;
pub mod upstream;
