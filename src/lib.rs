pub mod ai_provider;
pub mod assistant;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod pdf;
pub mod render;
pub mod repl;
pub mod scanner;
pub mod session_log;
