//! Ambient helpers shared by the simulator: logging setup, the run-time parameter
//! registry and JSON loading of configuration files.
pub mod load_from_file;
pub mod logger;
pub mod parameters;
