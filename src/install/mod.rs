//! Game version installation
//!
//! Brings a version directory to a launchable state: version metadata, client
//! jar, libraries, extracted natives, logging config and assets.

mod assets;
mod natives;

pub use assets::{asset_tasks, materialize_legacy_assets, AssetIndexFile, AssetObject};
pub use natives::extract_natives;

use std::collections::HashSet;
use std::fs;

use crate::download::{download_all, download_file, DownloadTask};
use crate::layout::GameDirs;
use crate::logging::{log_error, log_install};
use crate::manifest::fetch_manifest;
use crate::rules::Environment;
use crate::system;
use crate::task::TaskContext;
use crate::version::{library_file, load_version, ResolvedVersion};
use crate::BoxError;

// ============================================================================
// Errors
// ============================================================================

/// Install failures the caller may want to tell apart
#[derive(Debug)]
pub enum InstallError {
    /// User cancelled the operation
    Cancelled,
    /// Version id is neither installed nor in the manifest
    UnknownVersion { id: String },
    /// Mod loader has no build for the requested game version
    LoaderUnavailable { loader: String, game_version: String },
    /// Generic error with context
    Other { context: String, reason: String },
}

impl std::fmt::Display for InstallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallError::Cancelled => write!(f, "Installation cancelled by user"),
            InstallError::UnknownVersion { id } => {
                write!(f, "Version '{}' is not installed and not in the version manifest", id)
            }
            InstallError::LoaderUnavailable { loader, game_version } => {
                write!(f, "{} is not available for Minecraft {}", loader, game_version)
            }
            InstallError::Other { context, reason } => write!(f, "{}: {}", context, reason),
        }
    }
}

impl std::error::Error for InstallError {}

fn check_cancelled(ctx: &TaskContext) -> Result<(), InstallError> {
    if ctx.is_cancelled() {
        return Err(InstallError::Cancelled);
    }
    Ok(())
}

/// A download failure, or `Cancelled` when the user stopped the queue
fn download_error(ctx: &TaskContext, context: String, e: BoxError) -> InstallError {
    if ctx.is_cancelled() {
        return InstallError::Cancelled;
    }
    InstallError::Other {
        context,
        reason: e.to_string(),
    }
}

// ============================================================================
// Install Pipeline
// ============================================================================

/// Make sure `versions/<id>/<id>.json` exists, downloading it from the manifest
pub fn ensure_version_json(dirs: &GameDirs, id: &str) -> Result<(), BoxError> {
    let path = dirs.version_json(id);
    if path.is_file() {
        return Ok(());
    }

    let manifest = fetch_manifest()?;
    let Some(entry) = manifest.find(id) else {
        return Err(InstallError::UnknownVersion { id: id.to_string() }.into());
    };

    log_install(&format!("Downloading metadata for {}", id));
    let task = DownloadTask::new(&entry.url, &path).with_sha1(entry.sha1.clone());
    download_file(&task)?;
    Ok(())
}

/// Install a version (and its parents) so it can be launched
pub fn install_version(dirs: &GameDirs, id: &str, ctx: &TaskContext) -> Result<ResolvedVersion, BoxError> {
    let mut seen = HashSet::new();
    install_version_inner(dirs, id, ctx, &mut seen)
}

fn install_version_inner(
    dirs: &GameDirs,
    id: &str,
    ctx: &TaskContext,
    seen: &mut HashSet<String>,
) -> Result<ResolvedVersion, BoxError> {
    check_cancelled(ctx)?;
    if !seen.insert(id.to_string()) {
        return Err(format!("Version inheritance cycle detected at '{}'", id).into());
    }
    ensure_version_json(dirs, id)?;

    // Parents first, so their metadata is on disk before resolving
    let own = crate::version::read_version_json(&dirs.version_json(id))?;
    if let Some(parent) = own.inherits_from.as_deref() {
        install_version_inner(dirs, parent, ctx, seen)?;
    }

    let resolved = load_version(dirs, id)?;
    let env = Environment::current();

    ctx.set_status(format!("Installing {}...", id));
    log_install(&format!("Installing version {}", id));

    let mut tasks = Vec::new();
    tasks.extend(client_task(dirs, &resolved));
    tasks.extend(library_tasks(dirs, &resolved, &env));
    tasks.extend(logging_task(dirs, &resolved));

    check_cancelled(ctx)?;
    ctx.set_status(format!("Downloading libraries for {}...", id));
    download_all(tasks, ctx).map_err(|e| {
        log_error(&format!("Library download failed for {}: {}", id, e));
        download_error(ctx, format!("Downloading libraries for {}", id), e)
    })?;

    check_cancelled(ctx)?;
    ctx.set_status("Extracting natives...".to_string());
    extract_natives(dirs, &resolved, &env)?;

    check_cancelled(ctx)?;
    if let Some(index_ref) = resolved.json.asset_index.clone() {
        ctx.set_status(format!("Downloading assets ({})...", index_ref.id));
        let index_task = DownloadTask::new(&index_ref.url, dirs.asset_index(&index_ref.id))
            .with_sha1(index_ref.sha1.clone())
            .with_size(index_ref.size);
        download_file(&index_task)?;

        let index = AssetIndexFile::load(&dirs.asset_index(&index_ref.id))?;
        download_all(asset_tasks(dirs, &index), ctx)
            .map_err(|e| download_error(ctx, format!("Downloading assets for {}", id), e))?;
        materialize_legacy_assets(dirs, &index_ref.id, &index)?;
    }

    ctx.set_progress(1.0);
    log_install(&format!("Version {} is ready", id));
    Ok(resolved)
}

fn client_task(dirs: &GameDirs, version: &ResolvedVersion) -> Option<DownloadTask> {
    // Inherited versions reuse the parent's jar, which the parent install fetched
    if version.jar_id != version.id() {
        return None;
    }
    let client = version.json.downloads.as_ref()?.client.as_ref()?;
    Some(
        DownloadTask::new(&client.url, dirs.version_jar(version.id()))
            .with_sha1(client.sha1.clone())
            .with_size(client.size),
    )
}

fn logging_task(dirs: &GameDirs, version: &ResolvedVersion) -> Option<DownloadTask> {
    let file = &version.json.logging.as_ref()?.client.as_ref()?.file;
    Some(
        DownloadTask::new(&file.url, dirs.log_configs_dir().join(&file.id))
            .with_sha1(file.sha1.clone())
            .with_size(file.size),
    )
}

/// Library artifacts plus native classifier jars allowed on this platform
pub fn library_tasks(dirs: &GameDirs, version: &ResolvedVersion, env: &Environment) -> Vec<DownloadTask> {
    let mut tasks = Vec::new();

    for lib in version.json.libraries.iter().filter(|l| l.is_allowed(env)) {
        if let (Some(url), Some(path)) = (lib.artifact_url(), lib.artifact_path()) {
            let artifact = lib.artifact();
            tasks.push(
                DownloadTask::new(url, library_file(dirs, &path))
                    .with_sha1(artifact.and_then(|a| a.sha1.clone()))
                    .with_size(artifact.and_then(|a| a.size)),
            );
        }

        if let Some(classifier) = lib.native_classifier(&env.os_name, system::arch_bits()) {
            if let (Some(native), Some(path)) = (lib.classifier(&classifier), lib.classifier_path(&classifier)) {
                tasks.push(
                    DownloadTask::new(&native.url, library_file(dirs, &path))
                        .with_sha1(native.sha1.clone())
                        .with_size(native.size),
                );
            }
        }
    }

    tasks
}

/// Create `launcher_profiles.json` if absent; some installers refuse to run without it
pub fn ensure_launcher_profiles(dirs: &GameDirs) -> Result<(), std::io::Error> {
    let path = dirs.launcher_profiles();
    if path.exists() {
        return Ok(());
    }
    fs::create_dir_all(&dirs.root)?;
    fs::write(path, "{\n  \"profiles\": {}\n}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionJson;
    use std::collections::HashMap;

    fn linux() -> Environment {
        Environment {
            os_name: "linux".to_string(),
            os_arch: "x86_64".to_string(),
            os_version: "6.1".to_string(),
            features: HashMap::new(),
        }
    }

    fn resolved(json: &str) -> ResolvedVersion {
        let json: VersionJson = serde_json::from_str(json).unwrap();
        ResolvedVersion {
            jar_id: json.id.clone(),
            json,
            parents: Vec::new(),
        }
    }

    #[test]
    fn test_library_tasks_filter_rules_and_natives() {
        let version = resolved(
            r#"{
                "id": "1.12.2",
                "libraries": [
                    {"name": "com.mojang:patchy:1.1",
                     "downloads": {"artifact": {"path": "com/mojang/patchy/1.1/patchy-1.1.jar", "url": "https://example.invalid/patchy.jar", "sha1": "11", "size": 1}}},
                    {"name": "ca.weblite:java-objc-bridge:1.0.0",
                     "rules": [{"action": "allow", "os": {"name": "osx"}}],
                     "downloads": {"artifact": {"path": "ca/weblite/objc.jar", "url": "https://example.invalid/objc.jar"}}},
                    {"name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
                     "natives": {"linux": "natives-linux", "windows": "natives-windows"},
                     "downloads": {"classifiers": {
                        "natives-linux": {"path": "org/lwjgl/lwjgl-platform-natives-linux.jar", "url": "https://example.invalid/linux.jar", "sha1": "22"},
                        "natives-windows": {"path": "org/lwjgl/lwjgl-platform-natives-windows.jar", "url": "https://example.invalid/windows.jar"}
                     }}}
                ]
            }"#,
        );

        let dir = tempfile::tempdir().unwrap();
        let dirs = GameDirs::new(dir.path());
        let tasks = library_tasks(&dirs, &version, &linux());
        let urls: Vec<&str> = tasks.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.invalid/patchy.jar", "https://example.invalid/linux.jar"]);
        assert_eq!(tasks[1].sha1.as_deref(), Some("22"));
        assert!(tasks[0].path.ends_with("com/mojang/patchy/1.1/patchy-1.1.jar"));
    }

    #[test]
    fn test_client_task_only_for_own_jar() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = GameDirs::new(dir.path());

        let mut version = resolved(
            r#"{"id": "1.20.1", "downloads": {"client": {"url": "https://example.invalid/c.jar", "sha1": "33", "size": 9}}}"#,
        );
        let task = client_task(&dirs, &version).unwrap();
        assert_eq!(task.path, dirs.version_jar("1.20.1"));

        version.json.id = "fabric-loader-0.15.0-1.20.1".to_string();
        assert!(client_task(&dirs, &version).is_none());
    }

    #[test]
    fn test_install_rejects_inheritance_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = GameDirs::new(dir.path());
        for (id, parent) in [("a", "b"), ("b", "a")] {
            let path = dirs.version_json(id);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, format!(r#"{{"id": "{}", "inheritsFrom": "{}"}}"#, id, parent)).unwrap();
        }

        let err = install_version(&dirs, "a", &TaskContext::silent()).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_cancelled_download_reports_cancel() {
        let ctx = TaskContext::silent();
        let err = download_error(&ctx, "Downloading".to_string(), "boom".into());
        assert!(matches!(err, InstallError::Other { .. }));

        ctx.cancel();
        let err = download_error(&ctx, "Downloading".to_string(), "Cancelled".into());
        assert!(matches!(err, InstallError::Cancelled));
    }

    #[test]
    fn test_launcher_profiles_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = GameDirs::new(dir.path().join("mc"));
        ensure_launcher_profiles(&dirs).unwrap();
        let first = fs::read_to_string(dirs.launcher_profiles()).unwrap();
        assert!(first.contains("profiles"));

        fs::write(dirs.launcher_profiles(), "{\"profiles\": {\"x\": {}}}").unwrap();
        ensure_launcher_profiles(&dirs).unwrap();
        assert!(fs::read_to_string(dirs.launcher_profiles()).unwrap().contains("\"x\""));
    }
}
