//! Barrie Launcher - Minecraft launcher for vanilla, Fabric and Forge
//!
//! Library crate behind the `barrie` CLI. The `core` feature keeps settings,
//! paths and folders free of network dependencies; `installer` adds version
//! installation and launching; `full` adds skins and the binary.

#[macro_use]
pub mod paths;

pub mod assets;
pub mod config;
pub mod folders;
pub mod layout;
pub mod logging;
pub mod system;

#[cfg(feature = "installer")]
pub mod command;
#[cfg(feature = "installer")]
pub mod download;
#[cfg(feature = "installer")]
pub mod install;
#[cfg(feature = "installer")]
pub mod java;
#[cfg(feature = "installer")]
pub mod launch;
#[cfg(feature = "installer")]
pub mod loaders;
#[cfg(feature = "installer")]
pub mod manifest;
#[cfg(feature = "installer")]
pub mod rules;
#[cfg(feature = "installer")]
pub mod task;
#[cfg(feature = "installer")]
pub mod version;

#[cfg(feature = "full")]
pub mod skins;

/// Error type for operations whose failures cross worker threads
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
