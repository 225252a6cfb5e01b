//! Launch command construction
//!
//! Turns a resolved version plus player options into the full `java ...`
//! command line: memory flags, JVM arguments, classpath, main class and game
//! arguments with every `${placeholder}` filled in.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use uuid::Uuid;

use crate::install::AssetIndexFile;
use crate::layout::GameDirs;
use crate::rules::Environment;
use crate::system;
use crate::version::{library_file, ResolvedVersion};
use crate::BoxError;

pub const LAUNCHER_NAME: &str = "barrie-launcher";
/// Initial heap never exceeds this
const INITIAL_HEAP_CAP_MB: u32 = 512;

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOptions {
    pub username: String,
    pub uuid: String,
    pub access_token: String,
    pub user_type: String,
    pub java: PathBuf,
    pub ram_mb: u32,
    pub resolution: Option<(u32, u32)>,
}

impl LaunchOptions {
    /// Options for an offline account
    pub fn offline(username: &str, java: impl Into<PathBuf>, ram_mb: u32) -> Self {
        Self {
            username: username.to_string(),
            uuid: offline_uuid(username),
            access_token: "0".to_string(),
            user_type: "legacy".to_string(),
            java: java.into(),
            ram_mb,
            resolution: None,
        }
    }

    pub fn with_resolution(mut self, resolution: Option<(u32, u32)>) -> Self {
        self.resolution = resolution;
        self
    }
}

/// Stable per-name UUID for offline play, without dashes
pub fn offline_uuid(username: &str) -> String {
    let name = format!("OfflinePlayer:{}", username);
    Uuid::new_v3(&Uuid::NAMESPACE_OID, name.as_bytes())
        .simple()
        .to_string()
}

// ============================================================================
// Placeholders
// ============================================================================

/// Replace `${name}` tokens; unknown names are kept verbatim
pub fn substitute(arg: &str, vars: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };

        let key = &after[..end];
        match vars.get(key) {
            Some(value) => out.push_str(value),
            None => {
                out.push_str("${");
                out.push_str(key);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

/// Jars for `-cp`: allowed libraries in merged order, then the client jar
pub fn classpath(version: &ResolvedVersion, dirs: &GameDirs, env: &Environment) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for lib in version.json.libraries.iter().filter(|l| l.is_allowed(env)) {
        if lib.is_native_only() {
            continue;
        }
        let Some(path) = lib.artifact_path() else {
            continue;
        };
        let file = library_file(dirs, &path);
        if seen.insert(file.clone()) {
            entries.push(file);
        }
    }

    entries.push(dirs.version_jar(&version.jar_id));
    entries
}

/// Directory pre-1.7 clients read assets from
fn game_assets_dir(dirs: &GameDirs, index_id: &str) -> PathBuf {
    match AssetIndexFile::load(&dirs.asset_index(index_id)) {
        Ok(index) if index.map_to_resources => dirs.root.join("resources"),
        _ => dirs.virtual_assets_dir(index_id),
    }
}

fn placeholder_values(
    version: &ResolvedVersion,
    dirs: &GameDirs,
    options: &LaunchOptions,
    env: &Environment,
) -> HashMap<&'static str, String> {
    let separator = system::classpath_separator();
    let cp = classpath(version, dirs, env)
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(separator);
    let index_id = version.asset_index_id().unwrap_or("legacy").to_string();
    let (width, height) = options.resolution.unwrap_or((854, 480));
    let path_str = |p: PathBuf| p.to_string_lossy().to_string();

    HashMap::from([
        ("auth_player_name", options.username.clone()),
        ("version_name", version.id().to_string()),
        ("game_directory", path_str(dirs.root.clone())),
        ("assets_root", path_str(dirs.assets_dir.clone())),
        ("assets_index_name", index_id.clone()),
        ("game_assets", path_str(game_assets_dir(dirs, &index_id))),
        ("auth_uuid", options.uuid.clone()),
        ("auth_access_token", options.access_token.clone()),
        ("auth_session", options.access_token.clone()),
        ("clientid", String::new()),
        ("auth_xuid", String::new()),
        ("user_type", options.user_type.clone()),
        (
            "version_type",
            version.json.version_type.clone().unwrap_or_else(|| "release".to_string()),
        ),
        ("user_properties", "{}".to_string()),
        ("natives_directory", path_str(dirs.natives_dir(version.id()))),
        ("launcher_name", LAUNCHER_NAME.to_string()),
        ("launcher_version", env!("CARGO_PKG_VERSION").to_string()),
        ("classpath", cp),
        ("classpath_separator", separator.to_string()),
        ("library_directory", path_str(dirs.libraries_dir.clone())),
        ("resolution_width", width.to_string()),
        ("resolution_height", height.to_string()),
    ])
}

// ============================================================================
// Command
// ============================================================================

/// Full command line, java executable first
pub fn build_command(
    version: &ResolvedVersion,
    dirs: &GameDirs,
    options: &LaunchOptions,
    env: &Environment,
) -> Result<Vec<String>, BoxError> {
    let main_class = version
        .json
        .main_class
        .as_deref()
        .ok_or_else(|| format!("Version {} has no main class", version.id()))?;

    let env = env
        .clone()
        .with_feature("has_custom_resolution", options.resolution.is_some());
    let vars = placeholder_values(version, dirs, options, &env);

    let mut command = vec![options.java.to_string_lossy().to_string()];
    command.push(format!("-Xmx{}m", options.ram_mb));
    command.push(format!("-Xms{}m", options.ram_mb.min(INITIAL_HEAP_CAP_MB)));

    // JVM arguments
    match &version.json.arguments {
        Some(arguments) if !arguments.jvm.is_empty() => {
            for entry in &arguments.jvm {
                command.extend(entry.resolve(&env).iter().map(|a| substitute(a, &vars)));
            }
        }
        _ => {
            if env.os_name == "osx" {
                command.push("-XstartOnFirstThread".to_string());
            }
            command.push(substitute("-Djava.library.path=${natives_directory}", &vars));
            command.push("-cp".to_string());
            command.push(substitute("${classpath}", &vars));
        }
    }

    if let Some(client) = version.json.logging.as_ref().and_then(|l| l.client.as_ref()) {
        let config = dirs.log_configs_dir().join(&client.file.id);
        if config.is_file() {
            command.push(client.argument.replace("${path}", &config.to_string_lossy()));
        }
    }

    command.push(main_class.to_string());

    // Game arguments
    let mut game_args = Vec::new();
    if let Some(arguments) = &version.json.arguments {
        for entry in &arguments.game {
            game_args.extend(entry.resolve(&env).iter().map(|a| substitute(a, &vars)));
        }
    }
    if game_args.is_empty() {
        if let Some(legacy) = &version.json.minecraft_arguments {
            game_args.extend(legacy.split_whitespace().map(|a| substitute(a, &vars)));
        }
    }
    if let Some((width, height)) = options.resolution {
        if !game_args.iter().any(|a| a == "--width") {
            game_args.extend([
                "--width".to_string(),
                width.to_string(),
                "--height".to_string(),
                height.to_string(),
            ]);
        }
    }
    command.extend(game_args);

    Ok(command)
}
