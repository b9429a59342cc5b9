//! Configuration module

pub mod settings;

pub use settings::{
    ClientConfig, GenerationConfig, HostingConfig, LoggingConfig, ServerConfig, Settings,
};
