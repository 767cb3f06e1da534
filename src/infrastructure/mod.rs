pub mod config;
pub mod credential_store;
pub mod error;
pub mod export;
pub mod kv_store;
pub mod progress_repository;
pub mod storage;
