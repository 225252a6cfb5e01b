use std::{path::PathBuf, sync::LazyLock};

pub static BARRIE_PATH: LazyLock<PathBuf> = LazyLock::new(|| {
    if let Some(home) = std::env::var_os("BARRIE_HOME") {
        return PathBuf::from(home);
    }

    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_default();
    path.push("BarrieLauncher");
    path
});

/// Computes the path from the launcher data directory based on the arguments.
///
/// Returns a `&Path` referencing the data directory itself if no arguments are passed in, or a
/// `PathBuf` created by joining all of the arguments to the base data directory if at least
/// one argument is passed in.
///
/// # Examples
///
/// ```ignore
/// // Assuming `BARRIE_HOME` is not set, the data directory is <data dir>/BarrieLauncher
/// assert!(barrie_path!().ends_with("BarrieLauncher"));
/// assert!(barrie_path!("logs").ends_with("BarrieLauncher/logs"));
/// ```
#[macro_export]
macro_rules! barrie_path {
    () => {
        $crate::paths::BARRIE_PATH.as_path()
    };

    ( $( $path:expr ),+ $(,)? ) => {
        [
            $crate::paths::BARRIE_PATH.as_path(),
            $( std::path::Path::new(&$path) ),+
        ].into_iter().collect::<std::path::PathBuf>()
    };
}

/// Default `.minecraft` directory for the current platform.
///
/// `BARRIE_MINECRAFT_DIR` overrides the platform default.
pub fn minecraft_directory() -> PathBuf {
    if let Some(dir) = std::env::var_os("BARRIE_MINECRAFT_DIR") {
        return PathBuf::from(dir);
    }

    let home = dirs::home_dir().unwrap_or_default();
    if cfg!(target_os = "windows") {
        dirs::config_dir()
            .unwrap_or_else(|| home.join("AppData").join("Roaming"))
            .join(".minecraft")
    } else if cfg!(target_os = "macos") {
        home.join("Library")
            .join("Application Support")
            .join("minecraft")
    } else {
        home.join(".minecraft")
    }
}
