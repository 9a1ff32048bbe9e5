//! Declarative scenario files
//!
//! Reads YAML scenarios describing requests and expectations and runs them
//! through the same harness as the built-in suites, so assertions are made
//! against structured response data.

mod config;
mod runner;

pub use config::*;
pub use runner::{compile, load_scenario, parse_scenario, resolve_path, run_scenario, Login};
