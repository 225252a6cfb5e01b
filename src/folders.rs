//! Shortcuts to the game's user folders

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use walkdir::WalkDir;

use crate::layout::GameDirs;
use crate::logging::log_action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameFolder {
    Mods,
    ResourcePacks,
    ShaderPacks,
    Saves,
    Screenshots,
    Root,
}

impl GameFolder {
    pub const ALL: [GameFolder; 6] = [
        GameFolder::Mods,
        GameFolder::ResourcePacks,
        GameFolder::ShaderPacks,
        GameFolder::Saves,
        GameFolder::Screenshots,
        GameFolder::Root,
    ];

    /// Directory name under the game root; empty for the root itself
    pub fn dir_name(&self) -> &'static str {
        match self {
            GameFolder::Mods => "mods",
            GameFolder::ResourcePacks => "resourcepacks",
            GameFolder::ShaderPacks => "shaderpacks",
            GameFolder::Saves => "saves",
            GameFolder::Screenshots => "screenshots",
            GameFolder::Root => "",
        }
    }

    pub fn path(&self, dirs: &GameDirs) -> PathBuf {
        match self {
            GameFolder::Root => dirs.root.clone(),
            other => dirs.root.join(other.dir_name()),
        }
    }

    pub fn ensure(&self, dirs: &GameDirs) -> io::Result<PathBuf> {
        let path = self.path(dirs);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Top-level entries of the folder, sorted by name
    pub fn list(&self, dirs: &GameDirs) -> Vec<PathBuf> {
        let path = self.path(dirs);
        if !path.is_dir() {
            return Vec::new();
        }
        WalkDir::new(&path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .collect()
    }
}

impl fmt::Display for GameFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameFolder::Root => f.write_str("game directory"),
            other => f.write_str(other.dir_name()),
        }
    }
}

impl FromStr for GameFolder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "mods" => Ok(GameFolder::Mods),
            "resourcepacks" | "resources" => Ok(GameFolder::ResourcePacks),
            "shaderpacks" | "shaders" => Ok(GameFolder::ShaderPacks),
            "saves" | "worlds" => Ok(GameFolder::Saves),
            "screenshots" => Ok(GameFolder::Screenshots),
            "root" | "game" | "minecraft" => Ok(GameFolder::Root),
            other => Err(format!("Unknown folder '{}'", other)),
        }
    }
}

/// Open a path in the platform file manager
pub fn open_path(path: &Path) -> io::Result<()> {
    let opener = if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };

    log_action(&format!("Opening {}", path.display()));
    std::process::Command::new(opener).arg(path).spawn()?;
    Ok(())
}
