// Library root: re-exports all modules so the binary and integration tests
// can reach the valuation pipeline.

pub mod config;
pub mod db;
pub mod inputs;
pub mod output;
pub mod valuation;
