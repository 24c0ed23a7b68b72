pub mod compare;
pub mod config;
pub mod edit;
pub mod engine;
pub mod errors;
pub mod matchers;
pub mod pbs;
pub mod perf;
pub mod plan;
pub mod storage;
