use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::download::DownloadTask;
use crate::layout::GameDirs;
use crate::logging::log_install;
use crate::BoxError;

pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndexFile {
    pub objects: HashMap<String, AssetObject>,
    /// Pre-1.7 indexes want files laid out by name under `assets/virtual`
    #[serde(rename = "virtual", default)]
    pub is_virtual: bool,
    /// Pre-1.6 clients read assets from `<game dir>/resources`
    #[serde(default)]
    pub map_to_resources: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetIndexFile {
    pub fn load(path: &Path) -> Result<Self, BoxError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

pub fn asset_tasks(dirs: &GameDirs, index: &AssetIndexFile) -> Vec<DownloadTask> {
    index
        .objects
        .values()
        // Corrupt entries with non-hex hashes cannot be fetched
        .filter(|obj| obj.hash.len() > 2 && obj.hash.chars().all(|c| c.is_ascii_hexdigit()))
        .map(|obj| {
            let prefix = obj.hash.get(..2).unwrap_or_default();
            let url = format!("{}/{}/{}", RESOURCES_URL, prefix, obj.hash);
            DownloadTask::new(url, dirs.asset_object(&obj.hash))
                .with_sha1(Some(obj.hash.clone()))
                .with_size(Some(obj.size))
        })
        .collect()
}

/// Copy objects to the by-name layouts old clients expect
pub fn materialize_legacy_assets(
    dirs: &GameDirs,
    index_id: &str,
    index: &AssetIndexFile,
) -> Result<usize, BoxError> {
    let mut targets: Vec<PathBuf> = Vec::new();
    if index.is_virtual {
        targets.push(dirs.virtual_assets_dir(index_id));
    }
    if index.map_to_resources {
        targets.push(dirs.root.join("resources"));
    }
    if targets.is_empty() {
        return Ok(0);
    }

    let mut copied = 0;
    for target in &targets {
        for (name, obj) in &index.objects {
            let dest = target.join(name);
            if !dest.starts_with(target) || name.contains("..") {
                continue;
            }
            if fs::metadata(&dest).map(|m| m.len() == obj.size).unwrap_or(false) {
                continue;
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(dirs.asset_object(&obj.hash), &dest)?;
            copied += 1;
        }
    }

    if copied > 0 {
        log_install(&format!("Laid out {} legacy asset files for index {}", copied, index_id));
    }
    Ok(copied)
}
