pub mod app;
pub mod clock;
pub mod config;
pub mod duration;
pub mod format;
pub mod holdings;
pub mod notify;
pub mod scheduler;
pub mod secrets;
pub mod sources;
pub mod storage;
pub mod valuation;
