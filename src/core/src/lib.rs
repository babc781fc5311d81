//! vkcri core - declarations, configuration and error types shared by the
//! CRI adapter.

pub mod config;
pub mod error;
pub mod host;
pub mod pod;

// Re-export commonly used types
pub use config::{is_plain_name, AdapterConfig, PlatformPaths};
pub use error::{CriError, ErrorKind, Result};
pub use host::system_total_memory;
pub use pod::{ContainerDeclaration, PodDeclaration};

/// vkcri version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
