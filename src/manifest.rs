//! Remote version manifest, with the local version cache as fallback

use serde::Deserialize;
use std::fmt;

use crate::config::VersionCache;
use crate::download::get_json;
use crate::logging::{log_info, log_warning};
use crate::BoxError;

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct VersionManifest {
    pub latest: LatestVersions,
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: VersionType,
    pub url: String,
    #[serde(default)]
    pub release_time: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VersionType {
    Release,
    Snapshot,
    OldBeta,
    OldAlpha,
    #[serde(other)]
    Other,
}

impl VersionType {
    /// Label shown next to the version id; `None` for types the list hides
    pub fn label(&self) -> Option<&'static str> {
        match self {
            VersionType::Release => Some("Release"),
            VersionType::Snapshot => Some("Snapshot"),
            VersionType::OldBeta => Some("Beta"),
            VersionType::OldAlpha => Some("Alpha"),
            VersionType::Other => None,
        }
    }
}

impl std::str::FromStr for VersionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "release" => Ok(VersionType::Release),
            "snapshot" => Ok(VersionType::Snapshot),
            "beta" | "old_beta" => Ok(VersionType::OldBeta),
            "alpha" | "old_alpha" => Ok(VersionType::OldAlpha),
            other => Err(format!("Unknown version type '{}'", other)),
        }
    }
}

/// Where a version listing came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    Remote,
    Cache,
}

impl fmt::Display for VersionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSource::Remote => write!(f, "version manifest"),
            VersionSource::Cache => write!(f, "local version cache"),
        }
    }
}

/// One selectable entry of the version list
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledVersion {
    pub label: String,
    pub id: String,
    pub version_type: Option<VersionType>,
}

#[derive(Debug, Clone)]
pub struct VersionListing {
    pub source: VersionSource,
    pub versions: Vec<LabeledVersion>,
}

impl VersionListing {
    pub fn find(&self, id: &str) -> Option<&LabeledVersion> {
        self.versions.iter().find(|v| v.id == id)
    }

    pub fn filter_type(&self, wanted: VersionType) -> Vec<&LabeledVersion> {
        self.versions
            .iter()
            .filter(|v| v.version_type == Some(wanted))
            .collect()
    }
}

// ============================================================================
// Fetching
// ============================================================================

pub fn fetch_manifest() -> Result<VersionManifest, BoxError> {
    get_json(VERSION_MANIFEST_URL)
}

impl VersionManifest {
    pub fn find(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }
}

/// `"Release - 1.20.4"` style labels for the four known version types
pub fn labeled_versions(entries: &[VersionEntry]) -> Vec<LabeledVersion> {
    entries
        .iter()
        .filter_map(|entry| {
            let label = entry.version_type.label()?;
            Some(LabeledVersion {
                label: format!("{} - {}", label, entry.id),
                id: entry.id.clone(),
                version_type: Some(entry.version_type),
            })
        })
        .collect()
}

/// Fetch the version list, falling back to the cache when offline
pub fn available_versions(cache: &VersionCache) -> Result<VersionListing, BoxError> {
    available_versions_with(|| fetch_manifest().map(|m| m.versions), cache)
}

pub fn available_versions_with<F>(fetch: F, cache: &VersionCache) -> Result<VersionListing, BoxError>
where
    F: FnOnce() -> Result<Vec<VersionEntry>, BoxError>,
{
    match fetch() {
        Ok(entries) => {
            let ids: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();
            if let Err(e) = cache.write(&ids) {
                log_warning(&format!(
                    "Failed to write version cache {}: {}",
                    cache.path().display(),
                    e
                ));
            }
            log_info(&format!("Fetched {} versions from the manifest", ids.len()));
            Ok(VersionListing {
                source: VersionSource::Remote,
                versions: labeled_versions(&entries),
            })
        }
        Err(fetch_error) => {
            log_warning(&format!("Version manifest unavailable: {}", fetch_error));
            match cache.read() {
                Some(ids) => {
                    log_info(&format!("Using {} cached versions", ids.len()));
                    Ok(VersionListing {
                        source: VersionSource::Cache,
                        versions: ids
                            .into_iter()
                            .map(|id| LabeledVersion {
                                label: format!("Cached - {}", id),
                                id,
                                version_type: None,
                            })
                            .collect(),
                    })
                }
                None => Err(format!(
                    "Could not fetch the version list and no cache exists: {}",
                    fetch_error
                )
                .into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "latest": {"release": "1.20.4", "snapshot": "24w14a"},
        "versions": [
            {"id": "24w14a", "type": "snapshot", "url": "https://example.invalid/24w14a.json", "releaseTime": "2024-04-03T12:00:00+00:00", "sha1": "aa"},
            {"id": "1.20.4", "type": "release", "url": "https://example.invalid/1.20.4.json", "releaseTime": "2023-12-07T12:00:00+00:00", "sha1": "bb"},
            {"id": "b1.7.3", "type": "old_beta", "url": "https://example.invalid/b1.7.3.json", "releaseTime": "2011-07-08T00:00:00+00:00"},
            {"id": "rd-132211", "type": "old_alpha", "url": "https://example.invalid/rd.json", "releaseTime": "2009-05-13T20:11:00+00:00"},
            {"id": "weird", "type": "experiment", "url": "https://example.invalid/weird.json"}
        ]
    }"#;

    fn entries() -> Vec<VersionEntry> {
        serde_json::from_str::<VersionManifest>(MANIFEST).unwrap().versions
    }

    #[test]
    fn test_parse_manifest() {
        let manifest: VersionManifest = serde_json::from_str(MANIFEST).unwrap();
        assert_eq!(manifest.latest.release, "1.20.4");
        assert_eq!(manifest.find("b1.7.3").unwrap().version_type, VersionType::OldBeta);
        assert_eq!(manifest.find("weird").unwrap().version_type, VersionType::Other);
    }

    #[test]
    fn test_labels() {
        let labels: Vec<String> = labeled_versions(&entries()).into_iter().map(|v| v.label).collect();
        assert_eq!(
            labels,
            vec![
                "Snapshot - 24w14a",
                "Release - 1.20.4",
                "Beta - b1.7.3",
                "Alpha - rd-132211",
            ]
        );
    }

    #[test]
    fn test_remote_listing_writes_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VersionCache::new(dir.path().join("version_cache.txt"));

        let listing = available_versions_with(|| Ok(entries()), &cache).unwrap();
        assert_eq!(listing.source, VersionSource::Remote);
        assert_eq!(listing.versions.len(), 4);
        assert_eq!(listing.filter_type(VersionType::Release).len(), 1);
        assert_eq!(cache.read().unwrap().len(), 5);
    }

    #[test]
    fn test_falls_back_to_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VersionCache::new(dir.path().join("version_cache.txt"));
        cache.write(&["1.20.4".to_string(), "1.19.2".to_string()]).unwrap();

        let listing = available_versions_with(|| Err("offline".into()), &cache).unwrap();
        assert_eq!(listing.source, VersionSource::Cache);
        assert_eq!(listing.versions[0].label, "Cached - 1.20.4");
        assert_eq!(listing.find("1.19.2").unwrap().version_type, None);
    }

    #[test]
    fn test_no_network_no_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VersionCache::new(dir.path().join("missing.txt"));
        let err = available_versions_with(|| Err("offline".into()), &cache).unwrap_err();
        assert!(err.to_string().contains("offline"));
    }
}
