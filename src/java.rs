//! Java runtime discovery and managed JRE downloads

use flate2::read::GzDecoder;
use std::env;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tar::Archive;
use walkdir::WalkDir;

use crate::config::LauncherSettings;
use crate::download::USER_AGENT;
use crate::install::InstallError;
use crate::logging::{log_download, log_info, log_warning};
use crate::task::TaskContext;
use crate::version::ResolvedVersion;
use crate::BoxError;

pub const ADOPTIUM_API_URL: &str = "https://api.adoptium.net/v3/binary/latest";

#[cfg(windows)]
const JAVA_BINARY: &str = "java.exe";
#[cfg(not(windows))]
const JAVA_BINARY: &str = "java";

pub fn required_major(version: &ResolvedVersion) -> u32 {
    version.java_major()
}

/// Major version from `java -version` output.
///
/// Pre-9 runtimes report `1.<major>`, later ones report the major directly.
pub fn parse_java_version(output: &str) -> Option<u32> {
    let line = output.lines().find(|l| l.contains("version"))?;
    let start = line.find('"')? + 1;
    let end = start + line[start..].find('"')?;
    let version = &line[start..end];

    let mut parts = version.split(|c: char| c == '.' || c == '_' || c == '-' || c == '+');
    let first: u32 = parts.next()?.parse().ok()?;
    if first == 1 {
        parts.next()?.parse().ok()
    } else {
        Some(first)
    }
}

/// Run `<java> -version` and parse the major version
pub fn java_major_of(java: &Path) -> Option<u32> {
    let output = Command::new(java).arg("-version").output().ok()?;
    // java -version prints to stderr
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stderr),
        String::from_utf8_lossy(&output.stdout)
    );
    parse_java_version(&text)
}

/// Locate `bin/java` anywhere below an extracted runtime
pub fn find_java_binary(root: &Path) -> Option<PathBuf> {
    WalkDir::new(root)
        .max_depth(5)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == JAVA_BINARY)
        .map(|e| e.into_path())
        .find(|p| p.parent().and_then(|d| d.file_name()).is_some_and(|n| n == "bin"))
}

fn find_in_path(binary: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|entry| entry.join(binary))
        .find(|candidate| candidate.is_file())
}

/// Pick a Java executable for the given major version, downloading one if needed
pub fn find_java(major: u32, settings: &LauncherSettings, ctx: &TaskContext) -> Result<PathBuf, BoxError> {
    find_java_in(major, settings, &barrie_path!("runtime"), ctx)
}

fn find_java_in(
    major: u32,
    settings: &LauncherSettings,
    runtime_root: &Path,
    ctx: &TaskContext,
) -> Result<PathBuf, BoxError> {
    if let Some(configured) = &settings.java_path {
        if configured.is_file() {
            return Ok(configured.clone());
        }
        log_warning(&format!("Configured Java {} does not exist, ignoring", configured.display()));
    }

    let managed = runtime_root.join(format!("java-{}", major));
    if let Some(java) = find_java_binary(&managed) {
        return Ok(java);
    }

    let system_candidates = env::var_os("JAVA_HOME")
        .map(|home| PathBuf::from(home).join("bin").join(JAVA_BINARY))
        .filter(|p| p.is_file())
        .into_iter()
        .chain(find_in_path(JAVA_BINARY));
    for candidate in system_candidates {
        if java_major_of(&candidate) == Some(major) {
            log_info(&format!("Using system Java {} at {}", major, candidate.display()));
            return Ok(candidate);
        }
    }

    download_runtime(major, &managed, ctx)
}

fn adoptium_os() -> &'static str {
    match crate::system::os_name() {
        "windows" => "windows",
        "osx" => "mac",
        _ => "linux",
    }
}

fn adoptium_arch() -> &'static str {
    match crate::system::os_arch() {
        "x86" => "x86",
        "arm64" => "aarch64",
        "arm32" => "arm",
        _ => "x64",
    }
}

pub fn runtime_url(major: u32, os: &str, arch: &str) -> String {
    format!(
        "{}/{}/ga/{}/{}/jre/hotspot/normal/eclipse",
        ADOPTIUM_API_URL, major, os, arch
    )
}

/// Download a Temurin JRE into `install_root` and return its java binary
pub fn download_runtime(major: u32, install_root: &Path, ctx: &TaskContext) -> Result<PathBuf, BoxError> {
    let url = runtime_url(major, adoptium_os(), adoptium_arch());
    ctx.set_status(format!("Downloading Java {} runtime...", major));
    log_download(&format!("Downloading Java {} from {}", major, url));

    let temp_dir = barrie_path!("tmp");
    fs::create_dir_all(&temp_dir)?;
    let is_zip = adoptium_os() == "windows";
    let archive_path = temp_dir.join(if is_zip {
        format!("java-{}.zip", major)
    } else {
        format!("java-{}.tar.gz", major)
    });
    let staging = temp_dir.join(format!("java-{}-staging", major));

    let result = fetch_archive(&url, &archive_path, ctx).and_then(|_| {
        ctx.set_status(format!("Extracting Java {} runtime...", major));
        install_runtime_archive(&archive_path, is_zip, &staging, install_root)
    });
    let _ = fs::remove_file(&archive_path);
    result
}

fn fetch_archive(url: &str, dest: &Path, ctx: &TaskContext) -> Result<(), BoxError> {
    let response = ureq::get(url)
        .set("User-Agent", USER_AGENT)
        .timeout(Duration::from_secs(600))
        .call()?;

    let total_size = response
        .header("Content-Length")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let mut file = fs::File::create(dest)?;
    let mut buffer = [0; 65536];
    let mut downloaded: u64 = 0;
    let mut reader = response.into_reader();
    loop {
        if ctx.is_cancelled() {
            return Err(InstallError::Cancelled.into());
        }
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        file.write_all(&buffer[..bytes_read])?;
        downloaded += bytes_read as u64;
        if total_size > 0 {
            ctx.set_progress(downloaded as f32 / total_size as f32);
        }
    }
    Ok(())
}

/// Unpack a runtime archive into `staging` and move it to `install_root`.
///
/// `install_root` is only touched once the archive is known to contain a
/// java binary, and `staging` never outlives a failure.
fn install_runtime_archive(
    archive: &Path,
    is_zip: bool,
    staging: &Path,
    install_root: &Path,
) -> Result<PathBuf, BoxError> {
    let _ = fs::remove_dir_all(staging);
    let result = unpack_and_swap(archive, is_zip, staging, install_root);
    if result.is_err() {
        let _ = fs::remove_dir_all(staging);
    }
    result
}

fn unpack_and_swap(
    archive: &Path,
    is_zip: bool,
    staging: &Path,
    install_root: &Path,
) -> Result<PathBuf, BoxError> {
    fs::create_dir_all(staging)?;
    if is_zip {
        let mut zip = zip::ZipArchive::new(fs::File::open(archive)?)?;
        zip.extract(staging)?;
    } else {
        let tar_gz = fs::File::open(archive)?;
        Archive::new(GzDecoder::new(tar_gz)).unpack(staging)?;
    }

    let java = find_java_binary(staging)
        .ok_or_else(|| format!("Downloaded Java runtime has no bin/{}", JAVA_BINARY))?;
    let relative = java.strip_prefix(staging)?.to_path_buf();

    if install_root.exists() {
        fs::remove_dir_all(install_root)?;
    }
    if let Some(parent) = install_root.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(staging, install_root)?;
    Ok(install_root.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_java_version() {
        let legacy = "java version \"1.8.0_382\"\nJava(TM) SE Runtime Environment (build 1.8.0_382-b05)";
        assert_eq!(parse_java_version(legacy), Some(8));

        let modern = "openjdk version \"17.0.9\" 2023-10-17\nOpenJDK Runtime Environment Temurin-17.0.9+9";
        assert_eq!(parse_java_version(modern), Some(17));

        assert_eq!(parse_java_version("openjdk version \"21\" 2023-09-19"), Some(21));
        assert_eq!(parse_java_version("openjdk version \"22-ea\" 2024-03-19"), Some(22));
        assert_eq!(parse_java_version("command not found"), None);
    }

    #[test]
    fn test_runtime_url() {
        assert_eq!(
            runtime_url(17, "linux", "x64"),
            "https://api.adoptium.net/v3/binary/latest/17/ga/linux/x64/jre/hotspot/normal/eclipse"
        );
    }

    #[test]
    fn test_find_java_binary() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_java_binary(dir.path()).is_none());

        let bin = dir.path().join("jdk-17.0.9+9-jre").join("bin");
        fs::create_dir_all(&bin).unwrap();
        // A file named like the binary outside bin/ is ignored
        fs::write(dir.path().join(JAVA_BINARY), "").unwrap();
        fs::write(bin.join(JAVA_BINARY), "").unwrap();

        assert_eq!(find_java_binary(dir.path()).unwrap(), bin.join(JAVA_BINARY));
    }

    #[test]
    fn test_configured_java_wins() {
        let dir = tempfile::tempdir().unwrap();
        let java = dir.path().join("my-java");
        fs::write(&java, "").unwrap();

        let settings = LauncherSettings {
            java_path: Some(java.clone()),
            ..Default::default()
        };
        assert_eq!(find_java(17, &settings, &TaskContext::silent()).unwrap(), java);
    }

    #[test]
    fn test_managed_runtime_found() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("java-17").join("jdk-17.0.9+9-jre").join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join(JAVA_BINARY), "").unwrap();

        let java = find_java_in(17, &LauncherSettings::default(), dir.path(), &TaskContext::silent()).unwrap();
        assert_eq!(java, bin.join(JAVA_BINARY));
    }

    fn write_tar_gz(path: &Path, entries: &[(String, &[u8])]) {
        let file = fs::File::create(path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_runtime_replaces_old_install() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("java-17.tar.gz");
        write_tar_gz(
            &archive,
            &[
                (format!("jdk-17/bin/{}", JAVA_BINARY), &b"#!/bin/sh"[..]),
                ("jdk-17/release".to_string(), &b"JAVA_VERSION=17"[..]),
            ],
        );
        let staging = dir.path().join("tmp").join("java-17-staging");
        let install_root = dir.path().join("runtime").join("java-17");
        fs::create_dir_all(&install_root).unwrap();
        fs::write(install_root.join("stale"), "").unwrap();

        let java = install_runtime_archive(&archive, false, &staging, &install_root).unwrap();
        assert_eq!(java, install_root.join("jdk-17").join("bin").join(JAVA_BINARY));
        assert!(java.is_file());
        assert!(!install_root.join("stale").exists());
        assert!(!staging.exists());
    }

    #[test]
    fn test_bad_runtime_archive_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("tmp").join("java-17-staging");
        let install_root = dir.path().join("runtime").join("java-17");

        let corrupt = dir.path().join("corrupt.tar.gz");
        fs::write(&corrupt, "not a gzip stream").unwrap();
        assert!(install_runtime_archive(&corrupt, false, &staging, &install_root).is_err());
        assert!(!staging.exists());
        assert!(!install_root.exists());

        // Valid archive without a java binary
        let empty = dir.path().join("empty.tar.gz");
        write_tar_gz(&empty, &[("jdk-17/release".to_string(), &b"JAVA_VERSION=17"[..])]);
        assert!(install_runtime_archive(&empty, false, &staging, &install_root).is_err());
        assert!(!staging.exists());
        assert!(!install_root.exists());
    }
}
