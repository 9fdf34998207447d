// src/cli/mod.rs
pub mod check_environment;
pub mod cli;
pub mod run;
pub mod run_discovery;
pub mod run_export;
