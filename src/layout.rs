//! Directory layout of a game installation

use std::path::{Path, PathBuf};

/// Where versions, libraries, assets and per-game data live.
///
/// Everything hangs off a single root (normally `.minecraft`), which is also
/// the working directory the game runs in.
#[derive(Debug, Clone, PartialEq)]
pub struct GameDirs {
    pub root: PathBuf,
    pub versions_dir: PathBuf,
    pub libraries_dir: PathBuf,
    pub assets_dir: PathBuf,
}

impl Default for GameDirs {
    fn default() -> Self {
        Self::new(crate::paths::minecraft_directory())
    }
}

impl GameDirs {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            root: root.to_path_buf(),
            versions_dir: root.join("versions"),
            libraries_dir: root.join("libraries"),
            assets_dir: root.join("assets"),
        }
    }

    pub fn version_dir(&self, id: &str) -> PathBuf {
        self.versions_dir.join(id)
    }

    pub fn version_json(&self, id: &str) -> PathBuf {
        self.version_dir(id).join(format!("{}.json", id))
    }

    pub fn version_jar(&self, id: &str) -> PathBuf {
        self.version_dir(id).join(format!("{}.jar", id))
    }

    pub fn natives_dir(&self, id: &str) -> PathBuf {
        self.version_dir(id).join("natives")
    }

    pub fn asset_index(&self, index_id: &str) -> PathBuf {
        self.assets_dir.join("indexes").join(format!("{}.json", index_id))
    }

    pub fn asset_object(&self, hash: &str) -> PathBuf {
        let prefix = hash.get(..2).unwrap_or(hash);
        self.assets_dir.join("objects").join(prefix).join(hash)
    }

    pub fn virtual_assets_dir(&self, index_id: &str) -> PathBuf {
        self.assets_dir.join("virtual").join(index_id)
    }

    pub fn log_configs_dir(&self) -> PathBuf {
        self.assets_dir.join("log_configs")
    }

    pub fn launcher_profiles(&self) -> PathBuf {
        self.root.join("launcher_profiles.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let dirs = GameDirs::new("/games/mc");
        assert_eq!(dirs.version_json("1.20.4"), PathBuf::from("/games/mc/versions/1.20.4/1.20.4.json"));
        assert_eq!(dirs.version_jar("1.8.9"), PathBuf::from("/games/mc/versions/1.8.9/1.8.9.jar"));
        assert_eq!(
            dirs.asset_object("bdf48ef6b5d0d23bbb02e17d04865216179f510a"),
            PathBuf::from("/games/mc/assets/objects/bd/bdf48ef6b5d0d23bbb02e17d04865216179f510a")
        );
        assert_eq!(dirs.asset_index("17"), PathBuf::from("/games/mc/assets/indexes/17.json"));
    }
}
