use serde::Deserialize;
use std::fs;

use crate::download::{get_json, get_text};
use crate::install::InstallError;
use crate::layout::GameDirs;
use crate::logging::log_download;
use crate::BoxError;

pub const FABRIC_META_URL: &str = "https://meta.fabricmc.net/v2";

#[derive(Debug, Clone, Deserialize)]
pub struct LoaderEntry {
    pub loader: LoaderInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoaderInfo {
    pub version: String,
    #[serde(default)]
    pub stable: bool,
}

pub fn profile_id(loader_version: &str, game_version: &str) -> String {
    format!("fabric-loader-{}-{}", loader_version, game_version)
}

/// First stable loader in the list (the API orders newest first), falling
/// back to the newest build when none is marked stable
pub fn pick_loader(entries: &[LoaderEntry]) -> Option<&LoaderInfo> {
    entries
        .iter()
        .map(|e| &e.loader)
        .find(|l| l.stable)
        .or_else(|| entries.first().map(|e| &e.loader))
}

/// Install the Fabric profile for a game version, returning its version id
pub fn install_fabric(dirs: &GameDirs, game_version: &str) -> Result<String, BoxError> {
    let url = format!("{}/versions/loader/{}", FABRIC_META_URL, game_version);
    let entries: Vec<LoaderEntry> = get_json(&url)?;

    let Some(loader) = pick_loader(&entries) else {
        return Err(InstallError::LoaderUnavailable {
            loader: "Fabric".to_string(),
            game_version: game_version.to_string(),
        }
        .into());
    };

    let id = profile_id(&loader.version, game_version);
    let path = dirs.version_json(&id);
    if path.is_file() {
        return Ok(id);
    }

    log_download(&format!("Fetching Fabric loader {} profile", loader.version));
    let profile_url = format!(
        "{}/versions/loader/{}/{}/profile/json",
        FABRIC_META_URL, game_version, loader.version
    );
    let profile = get_text(&profile_url)?;
    write_profile(dirs, &id, &profile)?;
    Ok(id)
}

/// Store a loader profile under `versions/<id>/<id>.json`
pub fn write_profile(dirs: &GameDirs, id: &str, profile: &str) -> Result<(), BoxError> {
    // Reject garbage before it lands where version loading will trip on it
    let _: serde_json::Value = serde_json::from_str(profile)
        .map_err(|e| format!("Fabric profile for {} is not valid JSON: {}", id, e))?;

    let path = dirs.version_json(id);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, profile)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOADERS: &str = r#"[
        {"loader": {"separator": ".", "build": 3, "maven": "net.fabricmc:fabric-loader:0.16.0-beta.1", "version": "0.16.0-beta.1", "stable": false},
         "intermediary": {"version": "1.20.4", "stable": true}},
        {"loader": {"separator": ".", "build": 2, "maven": "net.fabricmc:fabric-loader:0.15.11", "version": "0.15.11", "stable": true},
         "intermediary": {"version": "1.20.4", "stable": true}},
        {"loader": {"version": "0.15.10", "stable": true}}
    ]"#;

    #[test]
    fn test_pick_first_stable_loader() {
        let entries: Vec<LoaderEntry> = serde_json::from_str(LOADERS).unwrap();
        assert_eq!(pick_loader(&entries).unwrap().version, "0.15.11");
    }

    #[test]
    fn test_pick_loader_without_stable() {
        let entries: Vec<LoaderEntry> =
            serde_json::from_str(r#"[{"loader": {"version": "0.1.0", "stable": false}}]"#).unwrap();
        assert_eq!(pick_loader(&entries).unwrap().version, "0.1.0");
        assert!(pick_loader(&[]).is_none());
    }

    #[test]
    fn test_write_profile() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = GameDirs::new(dir.path());
        let id = profile_id("0.15.11", "1.20.4");
        assert_eq!(id, "fabric-loader-0.15.11-1.20.4");

        assert!(write_profile(&dirs, &id, "<html>").is_err());
        assert!(!dirs.version_json(&id).exists());

        write_profile(&dirs, &id, r#"{"id": "fabric-loader-0.15.11-1.20.4", "inheritsFrom": "1.20.4"}"#).unwrap();
        let stored = crate::version::read_version_json(&dirs.version_json(&id)).unwrap();
        assert_eq!(stored.inherits_from.as_deref(), Some("1.20.4"));
    }
}
