use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::logging::log_warning;

pub const DEFAULT_RAM_MB: u32 = 2048;
pub const MIN_RAM_MB: u32 = 1024;
pub const RAM_STEP_MB: u32 = 256;
/// Memory left to the OS when computing the allocation ceiling
pub const RESERVED_SYSTEM_MB: u32 = 1024;

// ============================================================================
// Game Edition
// ============================================================================

/// Which flavour of the game client to install and launch
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
    #[default]
    Vanilla,
    Fabric,
    Forge,
}

impl Edition {
    pub fn display_name(&self) -> &'static str {
        match self {
            Edition::Vanilla => "Vanilla",
            Edition::Fabric => "Fabric",
            Edition::Forge => "Forge",
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Edition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vanilla" => Ok(Edition::Vanilla),
            "fabric" => Ok(Edition::Fabric),
            "forge" => Ok(Edition::Forge),
            other => Err(format!("Unknown edition '{}' (expected vanilla, fabric or forge)", other)),
        }
    }
}

// ============================================================================
// Launcher Settings
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LauncherSettings {
    pub username: String,
    pub version: Option<String>,
    pub edition: Edition,
    pub ram_mb: u32,
    pub java_path: Option<PathBuf>,
    pub active_skin: Option<String>,
    pub avatar: Option<PathBuf>,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            username: String::new(),
            version: None,
            edition: Edition::Vanilla,
            ram_mb: DEFAULT_RAM_MB,
            java_path: None,
            active_skin: None,
            avatar: None,
        }
    }
}

impl LauncherSettings {
    pub fn get_path() -> PathBuf {
        barrie_path!("settings.json")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::get_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                match serde_json::from_str(&content) {
                    Ok(settings) => return settings,
                    Err(e) => log_warning(&format!(
                        "Ignoring unreadable settings file {}: {}",
                        path.display(),
                        e
                    )),
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&Self::get_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }

    /// Apply a RAM allocation, clamped to what the machine can spare.
    ///
    /// Returns the value actually stored.
    pub fn set_ram(&mut self, requested_mb: u32, system_total_mb: Option<u32>) -> u32 {
        let ceiling = system_total_mb
            .map(|total| total.saturating_sub(RESERVED_SYSTEM_MB).max(MIN_RAM_MB))
            .unwrap_or(u32::MAX);

        let clamped = requested_mb.clamp(MIN_RAM_MB, ceiling);
        let stepped = (clamped / RAM_STEP_MB) * RAM_STEP_MB;
        self.ram_mb = stepped.max(MIN_RAM_MB);
        self.ram_mb
    }
}

/// Offline usernames follow the vanilla account rules
pub fn validate_username(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Username is required.".to_string());
    }
    if !(3..=16).contains(&name.chars().count()) {
        return Err(format!(
            "Username '{}' must be between 3 and 16 characters",
            name
        ));
    }
    if let Some(bad) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(format!(
            "Username '{}' contains invalid character '{}'",
            name, bad
        ));
    }
    Ok(())
}

// ============================================================================
// Version Cache
// ============================================================================

/// Flat text cache of known version identifiers, one per line
#[derive(Debug, Clone)]
pub struct VersionCache {
    path: PathBuf,
}

impl Default for VersionCache {
    fn default() -> Self {
        Self::new(barrie_path!("version_cache.txt"))
    }
}

impl VersionCache {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, ids: &[String]) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut content = ids.join("\n");
        content.push('\n');
        fs::write(&self.path, content)
    }

    pub fn read(&self) -> Option<Vec<String>> {
        let content = fs::read_to_string(&self.path).ok()?;
        Some(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}
