//! zvm: install, switch between and run Zig toolchain versions.

pub mod activation;
pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod installer;
pub mod ops;
pub mod platform;
pub mod resolver;
pub mod store;
pub mod zls;

pub use error::{Result, ZvmError};
pub use ops::{Component, InstallReport, Zvm};
