//! Mod loader support
//!
//! Each edition turns a plain game version into the version id that is
//! actually launched. Vanilla is the identity; Fabric drops a profile JSON
//! next to the vanilla version; Forge runs the official installer.

pub mod fabric;
pub mod forge;

use std::path::Path;

pub use crate::config::Edition;

use crate::layout::GameDirs;
use crate::logging::log_install;
use crate::task::TaskContext;
use crate::BoxError;

/// Make the requested edition available and return the version id to launch.
///
/// `java` is only used by editions that run an installer (Forge).
pub fn prepare_edition(
    edition: Edition,
    game_version: &str,
    dirs: &GameDirs,
    java: &Path,
    ctx: &TaskContext,
) -> Result<String, BoxError> {
    match edition {
        Edition::Vanilla => Ok(game_version.to_string()),
        Edition::Fabric => {
            ctx.set_status(format!("Preparing Fabric for {}...", game_version));
            let id = fabric::install_fabric(dirs, game_version)?;
            log_install(&format!("Fabric profile ready: {}", id));
            Ok(id)
        }
        Edition::Forge => {
            ctx.set_status(format!("Preparing Forge for {}...", game_version));
            let id = forge::install_forge(dirs, game_version, java, ctx)?;
            log_install(&format!("Forge profile ready: {}", id));
            Ok(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vanilla_is_identity() {
        let dirs = GameDirs::new("/nonexistent");
        let id = prepare_edition(
            Edition::Vanilla,
            "1.20.4",
            &dirs,
            Path::new("java"),
            &TaskContext::silent(),
        )
        .unwrap();
        assert_eq!(id, "1.20.4");
    }
}
