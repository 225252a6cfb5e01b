//! Version metadata (`versions/<id>/<id>.json`) and inheritance resolution

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::layout::GameDirs;
use crate::rules::{rules_allow, Environment, Rule};
use crate::BoxError;

pub const DEFAULT_LIBRARY_REPO: &str = "https://libraries.minecraft.net/";

// ============================================================================
// Serde Model
// ============================================================================

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    pub id: String,
    #[serde(rename = "type", default)]
    pub version_type: Option<String>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub inherits_from: Option<String>,
    #[serde(default)]
    pub jar: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexRef>,
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(default)]
    pub logging: Option<Logging>,
    #[serde(default)]
    pub java_version: Option<JavaVersion>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<ArgumentEntry>,
    #[serde(default)]
    pub jvm: Vec<ArgumentEntry>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ArgumentEntry {
    Plain(String),
    Conditional { rules: Vec<Rule>, value: ArgumentValue },
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ArgumentValue {
    Single(String),
    Many(Vec<String>),
}

impl ArgumentEntry {
    /// The argument strings this entry contributes in the given environment
    pub fn resolve(&self, env: &Environment) -> Vec<String> {
        match self {
            ArgumentEntry::Plain(s) => vec![s.clone()],
            ArgumentEntry::Conditional { rules, value } => {
                if !rules_allow(rules, env) {
                    return Vec::new();
                }
                match value {
                    ArgumentValue::Single(s) => vec![s.clone()],
                    ArgumentValue::Many(v) => v.clone(),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexRef {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionDownloads {
    #[serde(default)]
    pub client: Option<Download>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Download {
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Library {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub natives: Option<HashMap<String, String>>,
    #[serde(default)]
    pub extract: Option<ExtractRules>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Maven repository base, used by loader profiles that omit `downloads`
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<Artifact>,
    #[serde(default)]
    pub classifiers: Option<HashMap<String, Artifact>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExtractRules {
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logging {
    #[serde(default)]
    pub client: Option<LoggingClient>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingClient {
    pub argument: String,
    pub file: LoggingFile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingFile {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersion {
    #[serde(default)]
    pub component: Option<String>,
    pub major_version: u32,
}

// ============================================================================
// Maven Coordinates
// ============================================================================

/// Convert `group:artifact:version[:classifier][@ext]` into a repository path
pub fn maven_path(name: &str) -> Option<String> {
    let (coords, ext) = match name.split_once('@') {
        Some((c, e)) => (c, e),
        None => (name, "jar"),
    };

    let parts: Vec<&str> = coords.split(':').collect();
    if parts.len() < 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }

    let group = parts[0].replace('.', "/");
    let artifact = parts[1];
    let version = parts[2];
    let file = match parts.get(3) {
        Some(classifier) => format!("{}-{}-{}.{}", artifact, version, classifier, ext),
        None => format!("{}-{}.{}", artifact, version, ext),
    };

    Some(format!("{}/{}/{}/{}", group, artifact, version, file))
}

impl Library {
    /// Identity without the version, used to let a child profile override a
    /// parent's copy of the same library
    pub fn key(&self) -> String {
        let base = self.name.split('@').next().unwrap_or(&self.name);
        let parts: Vec<&str> = base.split(':').collect();
        match parts.as_slice() {
            [group, artifact, _version, classifier, ..] => {
                format!("{}:{}:{}", group, artifact, classifier)
            }
            [group, artifact, ..] => format!("{}:{}", group, artifact),
            _ => base.to_string(),
        }
    }

    /// Old native entries carry classifiers but no main artifact
    pub fn is_native_only(&self) -> bool {
        self.natives.is_some()
            && self
                .downloads
                .as_ref()
                .is_some_and(|d| d.artifact.is_none())
    }

    pub fn is_allowed(&self, env: &Environment) -> bool {
        rules_allow(&self.rules, env)
    }

    /// Classifier holding native binaries for this OS, if the library has one
    pub fn native_classifier(&self, os_name: &str, arch_bits: &str) -> Option<String> {
        self.natives
            .as_ref()?
            .get(os_name)
            .map(|c| c.replace("${arch}", arch_bits))
    }

    /// Relative path of the main artifact inside `libraries/`
    pub fn artifact_path(&self) -> Option<String> {
        self.downloads
            .as_ref()
            .and_then(|d| d.artifact.as_ref())
            .and_then(|a| a.path.clone())
            .or_else(|| maven_path(&self.name))
    }

    /// Where the main artifact can be downloaded from; `None` when it is
    /// produced locally (e.g. by the Forge installer)
    pub fn artifact_url(&self) -> Option<String> {
        if let Some(artifact) = self.downloads.as_ref().and_then(|d| d.artifact.as_ref()) {
            return (!artifact.url.is_empty()).then(|| artifact.url.clone());
        }
        if self.is_native_only() {
            return None;
        }
        let base = self.url.as_deref().unwrap_or(DEFAULT_LIBRARY_REPO);
        let path = maven_path(&self.name)?;
        if base.ends_with('/') {
            Some(format!("{}{}", base, path))
        } else {
            Some(format!("{}/{}", base, path))
        }
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.downloads.as_ref()?.artifact.as_ref()
    }

    pub fn classifier(&self, classifier: &str) -> Option<&Artifact> {
        self.downloads.as_ref()?.classifiers.as_ref()?.get(classifier)
    }

    /// Path of the native classifier jar inside `libraries/`
    pub fn classifier_path(&self, classifier: &str) -> Option<String> {
        self.classifier(classifier)
            .and_then(|a| a.path.clone())
            .or_else(|| maven_path(&format!("{}:{}", self.name, classifier)))
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// A version with its `inheritsFrom` chain folded in
#[derive(Debug, Clone)]
pub struct ResolvedVersion {
    pub json: VersionJson,
    /// Version whose client jar goes on the classpath
    pub jar_id: String,
    /// Ancestors, nearest first
    pub parents: Vec<String>,
}

impl ResolvedVersion {
    pub fn id(&self) -> &str {
        &self.json.id
    }

    pub fn asset_index_id(&self) -> Option<&str> {
        self.json
            .asset_index
            .as_ref()
            .map(|a| a.id.as_str())
            .or(self.json.assets.as_deref())
    }

    pub fn java_major(&self) -> u32 {
        self.json
            .java_version
            .as_ref()
            .map(|j| j.major_version)
            .unwrap_or(8)
    }
}

pub fn read_version_json(path: &Path) -> Result<VersionJson, BoxError> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let json: VersionJson = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
    Ok(json)
}

/// Load a version and everything it inherits from
pub fn load_version(dirs: &GameDirs, id: &str) -> Result<ResolvedVersion, BoxError> {
    let mut seen = HashSet::new();
    load_version_inner(dirs, id, &mut seen)
}

fn load_version_inner(
    dirs: &GameDirs,
    id: &str,
    seen: &mut HashSet<String>,
) -> Result<ResolvedVersion, BoxError> {
    if !seen.insert(id.to_string()) {
        return Err(format!("Version inheritance cycle detected at '{}'", id).into());
    }

    let mut json = read_version_json(&dirs.version_json(id))?;
    if json.id.is_empty() {
        json.id = id.to_string();
    }

    match json.inherits_from.clone() {
        Some(parent_id) => {
            let parent = load_version_inner(dirs, &parent_id, seen)?;
            Ok(merge_versions(json, parent))
        }
        None => {
            let jar_id = json.jar.clone().unwrap_or_else(|| json.id.clone());
            Ok(ResolvedVersion {
                json,
                jar_id,
                parents: Vec::new(),
            })
        }
    }
}

pub fn merge_versions(child: VersionJson, parent: ResolvedVersion) -> ResolvedVersion {
    let ResolvedVersion {
        json: base,
        jar_id: parent_jar,
        parents: mut ancestors,
    } = parent;

    let has_client = child
        .downloads
        .as_ref()
        .and_then(|d| d.client.as_ref())
        .is_some();
    let jar_id = child
        .jar
        .clone()
        .or_else(|| has_client.then(|| child.id.clone()))
        .unwrap_or(parent_jar);

    let child_keys: HashSet<String> = child.libraries.iter().map(Library::key).collect();
    let mut libraries = child.libraries;
    libraries.extend(
        base.libraries
            .into_iter()
            .filter(|lib| !child_keys.contains(&lib.key())),
    );

    let arguments = match (base.arguments, child.arguments) {
        (Some(mut p), Some(c)) => {
            p.game.extend(c.game);
            p.jvm.extend(c.jvm);
            Some(p)
        }
        (p, c) => c.or(p),
    };

    ancestors.insert(0, base.id.clone());

    ResolvedVersion {
        json: VersionJson {
            id: child.id,
            version_type: child.version_type.or(base.version_type),
            main_class: child.main_class.or(base.main_class),
            inherits_from: child.inherits_from,
            jar: child.jar.or(base.jar),
            arguments,
            minecraft_arguments: child.minecraft_arguments.or(base.minecraft_arguments),
            asset_index: child.asset_index.or(base.asset_index),
            assets: child.assets.or(base.assets),
            downloads: child.downloads.or(base.downloads),
            libraries,
            logging: child.logging.or(base.logging),
            java_version: child.java_version.or(base.java_version),
        },
        jar_id,
        parents: ancestors,
    }
}

/// Ids of versions present on disk, sorted
pub fn installed_versions(dirs: &GameDirs) -> Vec<String> {
    let mut ids = Vec::new();
    if let Ok(entries) = fs::read_dir(&dirs.versions_dir) {
        for entry in entries.flatten() {
            let id = entry.file_name().to_string_lossy().to_string();
            if dirs.version_json(&id).is_file() {
                ids.push(id);
            }
        }
    }
    ids.sort();
    ids
}

pub fn library_file(dirs: &GameDirs, relative: &str) -> PathBuf {
    dirs.libraries_dir.join(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VANILLA: &str = r#"{
        "id": "1.20.1",
        "type": "release",
        "mainClass": "net.minecraft.client.main.Main",
        "assetIndex": {"id": "5", "url": "https://example.invalid/5.json", "sha1": "abc", "size": 1},
        "downloads": {"client": {"url": "https://example.invalid/client.jar", "sha1": "def", "size": 2}},
        "javaVersion": {"component": "java-runtime-gamma", "majorVersion": 17},
        "arguments": {
            "game": ["--username", "${auth_player_name}"],
            "jvm": ["-cp", "${classpath}"]
        },
        "libraries": [
            {"name": "org.ow2.asm:asm:9.3", "downloads": {"artifact": {"path": "org/ow2/asm/asm/9.3/asm-9.3.jar", "url": "https://example.invalid/asm-9.3.jar", "sha1": "1", "size": 3}}},
            {"name": "com.mojang:brigadier:1.1.8", "downloads": {"artifact": {"path": "com/mojang/brigadier/1.1.8/brigadier-1.1.8.jar", "url": "https://example.invalid/b.jar", "sha1": "2", "size": 4}}}
        ]
    }"#;

    const FABRIC: &str = r#"{
        "id": "fabric-loader-0.15.0-1.20.1",
        "inheritsFrom": "1.20.1",
        "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
        "arguments": {"game": [], "jvm": ["-DFabricMcEmu= net.minecraft.client.main.Main "]},
        "libraries": [
            {"name": "org.ow2.asm:asm:9.6", "url": "https://maven.fabricmc.net/"},
            {"name": "net.fabricmc:fabric-loader:0.15.0", "url": "https://maven.fabricmc.net/"}
        ]
    }"#;

    fn write_version(dirs: &GameDirs, id: &str, json: &str) {
        let path = dirs.version_json(id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, json).unwrap();
    }

    #[test]
    fn test_maven_path() {
        assert_eq!(
            maven_path("net.fabricmc:fabric-loader:0.15.0").unwrap(),
            "net/fabricmc/fabric-loader/0.15.0/fabric-loader-0.15.0.jar"
        );
        assert_eq!(
            maven_path("org.lwjgl:lwjgl:3.3.1:natives-linux").unwrap(),
            "org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1-natives-linux.jar"
        );
        assert_eq!(
            maven_path("de.oceanlabs.mcp:mcp_config:1.20.1@zip").unwrap(),
            "de/oceanlabs/mcp/mcp_config/1.20.1/mcp_config-1.20.1.zip"
        );
        assert!(maven_path("broken:name").is_none());
    }

    #[test]
    fn test_library_urls() {
        let fabric: VersionJson = serde_json::from_str(FABRIC).unwrap();
        let loader = &fabric.libraries[1];
        assert_eq!(
            loader.artifact_url().unwrap(),
            "https://maven.fabricmc.net/net/fabricmc/fabric-loader/0.15.0/fabric-loader-0.15.0.jar"
        );
        assert_eq!(loader.key(), "net.fabricmc:fabric-loader");

        let bare: Library = serde_json::from_str(r#"{"name": "a.b:c:1.0"}"#).unwrap();
        assert_eq!(bare.artifact_url().unwrap(), "https://libraries.minecraft.net/a/b/c/1.0/c-1.0.jar");

        let local: Library = serde_json::from_str(
            r#"{"name": "net.minecraftforge:forge:1.20.1-47.2.0:client",
                "downloads": {"artifact": {"path": "net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-client.jar", "url": ""}}}"#,
        )
        .unwrap();
        assert!(local.artifact_url().is_none());
        assert_eq!(local.key(), "net.minecraftforge:forge:client");
    }

    #[test]
    fn test_native_classifier() {
        let lib: Library = serde_json::from_str(
            r#"{"name": "tv.twitch:twitch-platform:5.16",
                "natives": {"linux": "natives-linux", "windows": "natives-windows-${arch}"}}"#,
        )
        .unwrap();
        assert_eq!(lib.native_classifier("windows", "64").unwrap(), "natives-windows-64");
        assert_eq!(lib.native_classifier("linux", "64").unwrap(), "natives-linux");
        assert!(lib.native_classifier("osx", "64").is_none());
    }

    #[test]
    fn test_inheritance_merge() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = GameDirs::new(dir.path());
        write_version(&dirs, "1.20.1", VANILLA);
        write_version(&dirs, "fabric-loader-0.15.0-1.20.1", FABRIC);

        let resolved = load_version(&dirs, "fabric-loader-0.15.0-1.20.1").unwrap();
        assert_eq!(resolved.id(), "fabric-loader-0.15.0-1.20.1");
        assert_eq!(resolved.jar_id, "1.20.1");
        assert_eq!(resolved.parents, vec!["1.20.1".to_string()]);
        assert_eq!(
            resolved.json.main_class.as_deref(),
            Some("net.fabricmc.loader.impl.launch.knot.KnotClient")
        );
        assert_eq!(resolved.asset_index_id(), Some("5"));
        assert_eq!(resolved.java_major(), 17);

        // Child asm 9.6 replaces the parent's 9.3
        let names: Vec<&str> = resolved.json.libraries.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["org.ow2.asm:asm:9.6", "net.fabricmc:fabric-loader:0.15.0", "com.mojang:brigadier:1.1.8"]
        );

        let args = resolved.json.arguments.unwrap();
        assert_eq!(args.jvm.len(), 3);
        assert_eq!(args.game.len(), 2);
    }

    #[test]
    fn test_inheritance_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = GameDirs::new(dir.path());
        write_version(&dirs, "a", r#"{"id": "a", "inheritsFrom": "b"}"#);
        write_version(&dirs, "b", r#"{"id": "b", "inheritsFrom": "a"}"#);
        assert!(load_version(&dirs, "a").is_err());
    }

    #[test]
    fn test_installed_versions() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = GameDirs::new(dir.path());
        write_version(&dirs, "1.20.1", VANILLA);
        write_version(&dirs, "fabric-loader-0.15.0-1.20.1", FABRIC);
        fs::create_dir_all(dirs.version_dir("empty")).unwrap();

        assert_eq!(
            installed_versions(&dirs),
            vec!["1.20.1".to_string(), "fabric-loader-0.15.0-1.20.1".to_string()]
        );
    }
}
