// All core functionality is in redline-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod paths;

// Re-export core types for convenience
pub use redline_core::*;

// Re-export CLI utilities
pub use paths::{default_config_path, resolve_config_path};
