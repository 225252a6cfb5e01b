//! Game launch: prepare, spawn, and watch the client process
//!
//! The launcher "hides" while the game runs. A single watcher thread waits on
//! the child process and reports the launcher as restored once it exits,
//! however it exits.

use std::path::PathBuf;
use std::process::{Child, Command};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

use crate::command::{build_command, LaunchOptions};
use crate::config::{validate_username, Edition, LauncherSettings};
use crate::install::install_version;
use crate::java::{find_java, required_major};
use crate::layout::GameDirs;
use crate::loaders::prepare_edition;
use crate::logging::{log_error, log_launch, log_warning};
use crate::rules::Environment;
use crate::task::TaskContext;
use crate::version::ResolvedVersion;
use crate::BoxError;

const WATCH_POLL: Duration = Duration::from_millis(250);

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum LaunchError {
    /// Username missing or malformed
    InvalidUsername(String),
    /// No version was selected
    NoVersion,
    /// Installing the version, loader or Java failed
    Prepare { stage: String, reason: String },
    /// The game process could not be started
    Spawn(String),
    /// The watcher thread went away without reporting
    Watcher,
}

impl std::fmt::Display for LaunchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaunchError::InvalidUsername(msg) => write!(f, "{}", msg),
            LaunchError::NoVersion => write!(f, "Please select a version."),
            LaunchError::Prepare { stage, reason } => write!(f, "{} failed: {}", stage, reason),
            LaunchError::Spawn(reason) => write!(f, "Failed to start the game: {}", reason),
            LaunchError::Watcher => write!(f, "Lost track of the game process"),
        }
    }
}

impl std::error::Error for LaunchError {}

fn prepare_error(stage: &str) -> impl FnOnce(BoxError) -> LaunchError + '_ {
    move |e| LaunchError::Prepare {
        stage: stage.to_string(),
        reason: e.to_string(),
    }
}

// ============================================================================
// Preparation
// ============================================================================

/// Launcher window state while a game session is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Hidden,
    Restored,
}

#[derive(Clone)]
pub struct LaunchRequest {
    pub settings: LauncherSettings,
    pub dirs: GameDirs,
    pub resolution: Option<(u32, u32)>,
    pub on_visibility: Arc<dyn Fn(Visibility) + Send + Sync>,
}

impl LaunchRequest {
    pub fn new(settings: LauncherSettings, dirs: GameDirs) -> Self {
        Self {
            settings,
            dirs,
            resolution: None,
            on_visibility: Arc::new(|_| {}),
        }
    }
}

/// An installed version together with the Java that runs it
#[derive(Debug, Clone)]
pub struct PreparedGame {
    pub version: ResolvedVersion,
    pub java: PathBuf,
}

/// Install a game version in the requested edition and pick its Java runtime
pub fn prepare_game(
    dirs: &GameDirs,
    edition: Edition,
    game_version: &str,
    settings: &LauncherSettings,
    ctx: &TaskContext,
) -> Result<PreparedGame, BoxError> {
    let vanilla = install_version(dirs, game_version, ctx)?;
    let mut java = find_java(required_major(&vanilla), settings, ctx)?;

    let id = prepare_edition(edition, game_version, dirs, &java, ctx)?;
    if id == vanilla.id() {
        return Ok(PreparedGame { version: vanilla, java });
    }

    let version = install_version(dirs, &id, ctx)?;
    if required_major(&version) != required_major(&vanilla) {
        java = find_java(required_major(&version), settings, ctx)?;
    }
    Ok(PreparedGame { version, java })
}

// ============================================================================
// Launch
// ============================================================================

/// How the game session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameExit {
    pub code: Option<i32>,
    /// The session was cancelled and the game killed
    pub killed: bool,
}

impl GameExit {
    pub fn success(&self) -> bool {
        !self.killed && self.code == Some(0)
    }
}

pub struct GameSession {
    watcher: JoinHandle<Result<GameExit, String>>,
}

impl GameSession {
    pub fn is_running(&self) -> bool {
        !self.watcher.is_finished()
    }

    /// Block until the game exits
    pub fn wait(self) -> Result<GameExit, LaunchError> {
        match self.watcher.join() {
            Ok(Ok(exit)) => Ok(exit),
            Ok(Err(reason)) => Err(LaunchError::Spawn(reason)),
            Err(_) => Err(LaunchError::Watcher),
        }
    }
}

/// Validate, install and start the game; returns once the process is running
pub fn launch_game(request: LaunchRequest, ctx: &TaskContext) -> Result<GameSession, LaunchError> {
    let settings = &request.settings;
    validate_username(&settings.username).map_err(LaunchError::InvalidUsername)?;
    let game_version = settings
        .version
        .clone()
        .filter(|v| !v.trim().is_empty())
        .ok_or(LaunchError::NoVersion)?;

    log_launch(&format!(
        "Launching {} {} as {} with {} MB",
        settings.edition, game_version, settings.username, settings.ram_mb
    ));

    let prepared = prepare_game(&request.dirs, settings.edition, &game_version, settings, ctx)
        .map_err(prepare_error("Installation"))?;

    let options = LaunchOptions::offline(&settings.username, &prepared.java, settings.ram_mb)
        .with_resolution(request.resolution);
    let command = build_command(&prepared.version, &request.dirs, &options, &Environment::current())
        .map_err(prepare_error("Building the launch command"))?;

    let (program, args) = command.split_first().ok_or(LaunchError::Spawn("empty command".to_string()))?;
    ctx.set_status(format!("Starting {}...", prepared.version.id()));
    log_launch(&format!("Command: {} {}", program, args.join(" ")));

    let child = Command::new(program)
        .args(args)
        .current_dir(&request.dirs.root)
        .spawn()
        .map_err(|e| {
            log_error(&format!("Failed to spawn game: {}", e));
            LaunchError::Spawn(e.to_string())
        })?;

    Ok(watch_game(child, ctx.clone(), request.on_visibility.clone()))
}

/// Wait on a running game from a background thread.
///
/// Cancelling the context kills the game. The launcher is reported hidden
/// now and restored when the watcher finishes.
pub fn watch_game(
    mut child: Child,
    ctx: TaskContext,
    on_visibility: Arc<dyn Fn(Visibility) + Send + Sync>,
) -> GameSession {
    log_launch(&format!("Game started (pid {}), launcher hidden", child.id()));
    on_visibility(Visibility::Hidden);

    let watcher = thread::spawn(move || {
        let result = loop {
            if ctx.is_cancelled() {
                log_warning("Launch cancelled, stopping the game");
                let _ = child.kill();
                break child
                    .wait()
                    .map(|status| GameExit { code: status.code(), killed: true })
                    .map_err(|e| e.to_string());
            }

            match child.wait_timeout(WATCH_POLL) {
                Ok(Some(status)) => break Ok(GameExit { code: status.code(), killed: false }),
                Ok(None) => continue,
                Err(e) => break Err(e.to_string()),
            }
        };

        match &result {
            Ok(exit) if exit.success() => log_launch("Game exited normally"),
            Ok(exit) => log_warning(&format!("Game exited with code {:?}", exit.code)),
            Err(e) => log_error(&format!("Lost the game process: {}", e)),
        }
        log_launch("Launcher restored");
        on_visibility(Visibility::Restored);
        ctx.set_status("Ready".to_string());
        result
    });

    GameSession { watcher }
}
