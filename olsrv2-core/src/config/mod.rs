//! Layered configuration (spec §10 ambient stack), one file per concern,
//! following the teacher's `config/` split: each leaf uses
//! `#[serde(default = "...")]` functions and doc comments describing units
//! and defaults, and a root `Config` aggregates them.

pub mod domains;
pub mod interfaces;
pub mod lan;
pub mod loader;
pub mod root;
pub mod timers;

pub use loader::{load_from_path, ConfigError};
pub use root::Config;
