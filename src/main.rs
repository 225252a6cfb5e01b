//! Barrie Launcher - command line front-end
//!
//! Every action of the launcher window is a subcommand here.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;

use barrie_launcher::assets::{default_bundle_dir, BannerRotation, BrandingDirs};
use barrie_launcher::barrie_path;
use barrie_launcher::config::{validate_username, Edition, LauncherSettings, VersionCache};
use barrie_launcher::folders::{open_path, GameFolder};
use barrie_launcher::launch::{launch_game, prepare_game, LaunchRequest, Visibility};
use barrie_launcher::layout::GameDirs;
use barrie_launcher::logging::{init_logger, log_action, log_error, log_info, log_warning, set_console_echo};
use barrie_launcher::manifest::{available_versions, LabeledVersion, VersionType};
use barrie_launcher::skins::{crop_avatar, SkinLibrary};
use barrie_launcher::system;
use barrie_launcher::task::TaskContext;
use barrie_launcher::version::installed_versions;
use barrie_launcher::BoxError;

#[derive(Parser, Debug)]
#[command(name = "barrie", author, version, about = "Barrie Launcher - Minecraft for vanilla, Fabric and Forge", long_about = None)]
struct Cli {
    /// Echo log lines to the console
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List game versions (falls back to the local cache when offline)
    Versions {
        /// Only refresh the version cache
        #[arg(long)]
        refresh_only: bool,
        /// List versions installed in the game directory instead
        #[arg(long)]
        installed: bool,
        /// release, snapshot, beta or alpha
        #[arg(long = "type", value_name = "TYPE")]
        version_type: Option<VersionType>,
    },
    /// Install if needed, then start the game
    Launch {
        #[arg(short, long)]
        username: Option<String>,
        #[arg(short, long, value_name = "VERSION")]
        version: Option<String>,
        /// vanilla, fabric or forge
        #[arg(short, long)]
        edition: Option<Edition>,
        /// RAM in MB
        #[arg(long)]
        ram: Option<u32>,
        #[arg(long, requires = "height")]
        width: Option<u32>,
        #[arg(long, requires = "width")]
        height: Option<u32>,
    },
    /// Download a version without starting it
    Install {
        version: String,
        #[arg(short, long)]
        edition: Option<Edition>,
    },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
    /// Set the RAM allocation in MB
    Ram { mb: u32 },
    /// Open (or list) a game folder: mods, resourcepacks, shaderpacks, saves, screenshots, root
    Folder {
        kind: GameFolder,
        #[arg(long)]
        list: bool,
        #[arg(long)]
        no_open: bool,
    },
    /// Manage local skins
    Skin {
        #[command(subcommand)]
        action: SkinAction,
    },
    /// Crop an image into the profile avatar
    Avatar { image: PathBuf },
    /// List banner images, or cycle through them
    Banners {
        #[arg(long)]
        rotate: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    Set {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        version: Option<String>,
        #[arg(long)]
        edition: Option<Edition>,
        /// Java executable to use instead of the managed runtime
        #[arg(long)]
        java: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum SkinAction {
    Import { file: PathBuf },
    List,
    Use { name: String },
}

// ============================================================================
// Console Plumbing
// ============================================================================

fn cli_context(cancel: Arc<AtomicBool>) -> TaskContext {
    let last_percent = Arc::new(AtomicU32::new(u32::MAX));
    TaskContext::new(
        |status| println!("{}", status),
        |line| log_info(&line),
        move |progress| {
            let percent = (progress * 100.0) as u32;
            if last_percent.swap(percent, Ordering::Relaxed) != percent {
                eprint!("\r  {:>3}%", percent);
                if percent >= 100 {
                    eprintln!();
                }
            }
        },
        cancel,
    )
}

fn print_versions(versions: &[&LabeledVersion]) {
    for v in versions {
        println!("{}", v.label);
    }
}

// ============================================================================
// Commands
// ============================================================================

fn run(command: Commands, ctx: &TaskContext) -> Result<(), BoxError> {
    let dirs = GameDirs::default();

    match command {
        Commands::Versions { refresh_only, installed, version_type } => {
            if installed {
                for id in installed_versions(&dirs) {
                    println!("{}", id);
                }
                return Ok(());
            }

            let listing = available_versions(&VersionCache::default())?;
            if refresh_only {
                println!("{} versions from the {}", listing.versions.len(), listing.source);
                return Ok(());
            }
            let versions: Vec<&LabeledVersion> = match version_type {
                Some(wanted) => listing.filter_type(wanted),
                None => listing.versions.iter().collect(),
            };
            println!("Versions from the {}:", listing.source);
            print_versions(&versions);
        }

        Commands::Launch { username, version, edition, ram, width, height } => {
            let mut settings = LauncherSettings::load();
            if let Some(username) = username {
                settings.username = username;
            }
            if let Some(version) = version {
                settings.version = Some(version);
            }
            if let Some(edition) = edition {
                settings.edition = edition;
            }
            if let Some(mb) = ram {
                settings.set_ram(mb, system::total_memory_mb());
            }
            settings.save()?;

            let mut request = LaunchRequest::new(settings, dirs);
            request.resolution = width.zip(height);
            request.on_visibility = Arc::new(|visibility| match visibility {
                Visibility::Hidden => println!("Game running. Press Ctrl-C to stop it."),
                Visibility::Restored => println!("Game closed."),
            });

            let session = launch_game(request, ctx)?;
            let exit = session.wait()?;
            if exit.killed {
                println!("Game stopped.");
            } else if !exit.success() {
                println!("Game exited with code {:?}", exit.code);
            }
        }

        Commands::Install { version, edition } => {
            let settings = LauncherSettings::load();
            let edition = edition.unwrap_or(settings.edition);
            log_action(&format!("Install {} {}", edition, version));
            let prepared = prepare_game(&dirs, edition, &version, &settings, ctx)?;
            println!(
                "Installed {} (Java: {})",
                prepared.version.id(),
                prepared.java.display()
            );
        }

        Commands::Settings { action: None } => {
            let settings = LauncherSettings::load();
            println!("Settings file: {}", LauncherSettings::get_path().display());
            println!("Game directory: {}", dirs.root.display());
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }

        Commands::Settings { action: Some(SettingsAction::Set { username, version, edition, java }) } => {
            let mut settings = LauncherSettings::load();
            if let Some(username) = username {
                validate_username(&username)?;
                settings.username = username;
            }
            if let Some(version) = version {
                settings.version = Some(version);
            }
            if let Some(edition) = edition {
                settings.edition = edition;
            }
            if let Some(java) = java {
                if !java.is_file() {
                    return Err(format!("{} is not a file", java.display()).into());
                }
                settings.java_path = Some(java);
            }
            settings.save()?;
            log_action("Settings updated");
            println!("Settings saved.");
        }

        Commands::Ram { mb } => {
            let mut settings = LauncherSettings::load();
            let applied = settings.set_ram(mb, system::total_memory_mb());
            settings.save()?;
            log_action(&format!("RAM set to {} MB", applied));
            if applied != mb {
                println!("RAM allocation set to {} MB (requested {} MB)", applied, mb);
            } else {
                println!("RAM allocation set to {} MB", applied);
            }
        }

        Commands::Folder { kind, list, no_open } => {
            let path = kind.ensure(&dirs)?;
            println!("{}: {}", kind, path.display());
            if list {
                for entry in kind.list(&dirs) {
                    if let Some(name) = entry.file_name() {
                        println!("  {}", name.to_string_lossy());
                    }
                }
            }
            if !no_open {
                open_path(&path)?;
            }
        }

        Commands::Skin { action } => {
            let library = SkinLibrary::default();
            match action {
                SkinAction::Import { file } => {
                    let name = library.import_skin(&file)?;
                    println!("Imported skin '{}'", name);
                }
                SkinAction::List => {
                    let active = LauncherSettings::load().active_skin;
                    let skins = library.list_skins();
                    if skins.is_empty() {
                        println!("No skins in {}", library.dir().display());
                    }
                    for name in skins {
                        let marker = if active.as_deref() == Some(name.as_str()) { "*" } else { " " };
                        println!("{} {}", marker, name);
                    }
                }
                SkinAction::Use { name } => {
                    let mut settings = LauncherSettings::load();
                    library.set_active_skin(&mut settings, &name)?;
                    settings.save()?;
                    println!("Active skin: {}", name);
                }
            }
        }

        Commands::Avatar { image } => {
            let dest = barrie_path!("avatar.png");
            crop_avatar(&image, &dest)?;
            let mut settings = LauncherSettings::load();
            settings.avatar = Some(dest.clone());
            settings.save()?;
            log_action(&format!("Avatar updated from {}", image.display()));
            println!("Avatar saved to {}", dest.display());
        }

        Commands::Banners { rotate } => {
            let mut rotation = BannerRotation::new(BrandingDirs::default().banners());
            if rotation.is_empty() {
                println!("No banners found.");
                return Ok(());
            }
            if !rotate {
                for _ in 0..rotation.len() {
                    if let Some(banner) = rotation.advance() {
                        println!("{}", banner.display());
                    }
                }
                return Ok(());
            }
            while !ctx.is_cancelled() {
                if let Some(banner) = rotation.advance() {
                    println!("{}", banner.display());
                }
                thread::sleep(rotation.interval());
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    set_console_echo(cli.verbose);
    init_logger();
    log_info("Barrie Launcher starting up...");

    if let Err(e) = BrandingDirs::default().ensure_assets_exist(&default_bundle_dir()) {
        log_warning(&format!("Could not prepare launcher images: {}", e));
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
        log_warning(&format!("Failed to install Ctrl-C handler: {}", e));
    }
    let ctx = cli_context(cancel);

    match run(cli.command, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_error(&e.to_string());
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
