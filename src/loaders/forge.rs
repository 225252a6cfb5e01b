use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

use crate::download::{download_file, get_json, DownloadTask};
use crate::install::{ensure_launcher_profiles, InstallError};
use crate::layout::GameDirs;
use crate::logging::{log_error, log_install, log_warning};
use crate::task::TaskContext;
use crate::version::installed_versions;
use crate::BoxError;

pub const PROMOTIONS_URL: &str =
    "https://files.minecraftforge.net/net/minecraftforge/forge/promotions_slim.json";
pub const FORGE_MAVEN_URL: &str = "https://maven.minecraftforge.net/net/minecraftforge/forge";
/// Oldest game version whose installer supports `--installClient`
pub const MIN_FORGE_GAME_VERSION: &str = "1.12.2";
const INSTALLER_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, Deserialize)]
pub struct Promotions {
    pub promos: HashMap<String, String>,
}

impl Promotions {
    /// Recommended build for a game version, else the latest one
    pub fn build_for(&self, game_version: &str) -> Option<&str> {
        self.promos
            .get(&format!("{}-recommended", game_version))
            .or_else(|| self.promos.get(&format!("{}-latest", game_version)))
            .map(String::as_str)
    }
}

pub fn is_supported(game_version: &str) -> bool {
    version_compare::compare_to(game_version, MIN_FORGE_GAME_VERSION, version_compare::Cmp::Ge)
        .unwrap_or(false)
}

pub fn installer_url(game_version: &str, build: &str) -> String {
    format!(
        "{base}/{mc}-{build}/forge-{mc}-{build}-installer.jar",
        base = FORGE_MAVEN_URL,
        mc = game_version,
        build = build
    )
}

/// Find the version directory the installer created for this build
pub fn find_installed_forge(dirs: &GameDirs, game_version: &str, build: &str) -> Option<String> {
    let candidates = [
        format!("{}-forge-{}", game_version, build),
        format!("{}-forge{}-{}", game_version, game_version, build),
    ];
    if let Some(id) = candidates.iter().find(|id| dirs.version_json(id).is_file()) {
        return Some(id.clone());
    }

    installed_versions(dirs).into_iter().find(|id| {
        id.to_ascii_lowercase().contains("forge") && id.contains(game_version) && id.contains(build)
    })
}

/// Install Forge for a game version and return the installed version id
pub fn install_forge(
    dirs: &GameDirs,
    game_version: &str,
    java: &Path,
    ctx: &TaskContext,
) -> Result<String, BoxError> {
    let unavailable = || InstallError::LoaderUnavailable {
        loader: "Forge".to_string(),
        game_version: game_version.to_string(),
    };

    if !is_supported(game_version) {
        log_warning(&format!(
            "Forge install requested for {} (minimum is {})",
            game_version, MIN_FORGE_GAME_VERSION
        ));
        return Err(unavailable().into());
    }

    let promotions: Promotions = get_json(PROMOTIONS_URL)?;
    let Some(build) = promotions.build_for(game_version).map(str::to_string) else {
        return Err(unavailable().into());
    };

    if let Some(id) = find_installed_forge(dirs, game_version, &build) {
        return Ok(id);
    }

    // Installer scratch space lives with the launcher data, not the game dir
    let installer = barrie_path!("tmp", format!("forge-{}-{}-installer.jar", game_version, build));
    ctx.set_status(format!("Downloading Forge {}...", build));
    download_file(&DownloadTask::new(installer_url(game_version, &build), &installer))?;

    let log_path = barrie_path!("logs", "forge-installer.log");
    install_from_jar(java, &installer, dirs, &log_path, ctx)?;

    find_installed_forge(dirs, game_version, &build).ok_or_else(|| {
        InstallError::Other {
            context: "Forge installer".to_string(),
            reason: format!("no version directory for {}-{} after install", game_version, build),
        }
        .into()
    })
}

/// Run a downloaded installer jar, removing it afterwards whatever the outcome
fn install_from_jar(
    java: &Path,
    installer: &Path,
    dirs: &GameDirs,
    log_path: &Path,
    ctx: &TaskContext,
) -> Result<(), BoxError> {
    let result = ensure_launcher_profiles(dirs)
        .map_err(BoxError::from)
        .and_then(|_| run_installer(java, installer, dirs, log_path, ctx));
    let _ = fs::remove_file(installer);
    result
}

fn run_installer(
    java: &Path,
    installer: &Path,
    dirs: &GameDirs,
    log_path: &Path,
    ctx: &TaskContext,
) -> Result<(), BoxError> {
    ctx.set_status("Running Forge installer...".to_string());
    log_install(&format!("Running {} --installClient {}", installer.display(), dirs.root.display()));

    // Output goes to a file so a chatty installer cannot fill a pipe and stall
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let out = fs::File::create(log_path)?;
    let err = out.try_clone()?;

    let mut child = Command::new(java)
        .arg("-jar")
        .arg(installer)
        .arg("--installClient")
        .arg(&dirs.root)
        .current_dir(&dirs.root)
        .stdout(Stdio::from(out))
        .stderr(Stdio::from(err))
        .spawn()?;

    let timeout = Duration::from_secs(INSTALLER_TIMEOUT_SECS);
    match child.wait_timeout(timeout)? {
        Some(status) => {
            if !status.success() {
                log_error(&format!(
                    "Forge installer failed with exit code {:?}, see {}",
                    status.code(),
                    log_path.display()
                ));
                return Err(InstallError::Other {
                    context: "Forge installer".to_string(),
                    reason: format!("Failed with exit code: {:?}", status.code()),
                }
                .into());
            }
        }
        None => {
            let _ = child.kill();
            log_error(&format!("Forge installer timed out after {} seconds", INSTALLER_TIMEOUT_SECS));
            return Err(InstallError::Other {
                context: "Forge installer".to_string(),
                reason: format!("Timed out after {} seconds", INSTALLER_TIMEOUT_SECS),
            }
            .into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROMOS: &str = r#"{
        "homepage": "https://files.minecraftforge.net/net/minecraftforge/forge/",
        "promos": {
            "1.12.2-latest": "14.23.5.2860",
            "1.12.2-recommended": "14.23.5.2859",
            "1.20.4-latest": "49.0.49"
        }
    }"#;

    #[test]
    fn test_build_selection() {
        let promotions: Promotions = serde_json::from_str(PROMOS).unwrap();
        assert_eq!(promotions.build_for("1.12.2"), Some("14.23.5.2859"));
        assert_eq!(promotions.build_for("1.20.4"), Some("49.0.49"));
        assert_eq!(promotions.build_for("1.7.10"), None);
    }

    #[test]
    fn test_minimum_version() {
        assert!(is_supported("1.12.2"));
        assert!(is_supported("1.20.4"));
        assert!(is_supported("1.21"));
        assert!(!is_supported("1.8.9"));
        assert!(!is_supported("1.12.1"));
    }

    #[test]
    fn test_installer_url() {
        assert_eq!(
            installer_url("1.20.1", "47.2.0"),
            "https://maven.minecraftforge.net/net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-installer.jar"
        );
    }

    #[test]
    fn test_installer_removed_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = GameDirs::new(dir.path().join("mc"));
        let installer = dir.path().join("forge-installer.jar");
        fs::write(&installer, "jar").unwrap();

        let result = install_from_jar(
            &dir.path().join("no-such-java"),
            &installer,
            &dirs,
            &dir.path().join("logs").join("forge-installer.log"),
            &TaskContext::silent(),
        );
        assert!(result.is_err());
        assert!(!installer.exists());
        assert!(dirs.launcher_profiles().exists());
    }

    #[test]
    fn test_find_installed_forge() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = GameDirs::new(dir.path());
        assert!(find_installed_forge(&dirs, "1.20.1", "47.2.0").is_none());

        let write = |id: &str| {
            let path = dirs.version_json(id);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, format!(r#"{{"id": "{}"}}"#, id)).unwrap();
        };

        write("1.12.2-forge-14.23.5.2859");
        assert_eq!(
            find_installed_forge(&dirs, "1.12.2", "14.23.5.2859").as_deref(),
            Some("1.12.2-forge-14.23.5.2859")
        );

        write("forge-47.2.0-custom-1.20.1");
        assert_eq!(
            find_installed_forge(&dirs, "1.20.1", "47.2.0").as_deref(),
            Some("forge-47.2.0-custom-1.20.1")
        );
    }
}
