//! Launcher branding: logo files and the rotating banner images

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

use crate::logging::log_info;

pub const BANNER_INTERVAL: Duration = Duration::from_secs(3);
const LOGO_FILES: [&str; 2] = ["logo.png", "logo.ico"];
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Where logo and banner images live in the data directory
#[derive(Debug, Clone, PartialEq)]
pub struct BrandingDirs {
    pub assets_dir: PathBuf,
    pub images_dir: PathBuf,
}

impl Default for BrandingDirs {
    fn default() -> Self {
        Self {
            assets_dir: barrie_path!("assets"),
            images_dir: barrie_path!("images"),
        }
    }
}

/// Directory shipped alongside the executable with the stock images.
///
/// `BARRIE_BUNDLE_DIR` overrides it.
pub fn default_bundle_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("BARRIE_BUNDLE_DIR") {
        return PathBuf::from(dir);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default()
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Image files directly inside `dir`, sorted by name
pub fn list_banners(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_image(e.path()))
        .map(|e| e.into_path())
        .collect()
}

impl BrandingDirs {
    /// Create the directories and seed them from the bundle.
    ///
    /// Logos are copied when missing. Banners are copied only when the user
    /// has no images at all, so deleting the stock ones sticks.
    pub fn ensure_assets_exist(&self, bundle_dir: &Path) -> io::Result<usize> {
        fs::create_dir_all(&self.assets_dir)?;
        fs::create_dir_all(&self.images_dir)?;
        let mut copied = 0;

        for logo in LOGO_FILES {
            let dest = self.assets_dir.join(logo);
            let src = bundle_dir.join("assets").join(logo);
            if !dest.exists() && src.is_file() {
                fs::copy(&src, &dest)?;
                copied += 1;
            }
        }

        if list_banners(&self.images_dir).is_empty() {
            for src in list_banners(&bundle_dir.join("images")) {
                if let Some(name) = src.file_name() {
                    fs::copy(&src, self.images_dir.join(name))?;
                    copied += 1;
                }
            }
        }

        if copied > 0 {
            log_info(&format!("Copied {} bundled image files", copied));
        }
        Ok(copied)
    }

    pub fn banners(&self) -> Vec<PathBuf> {
        list_banners(&self.images_dir)
    }
}

/// Cycles through banner images, wrapping at the end
#[derive(Debug, Clone)]
pub struct BannerRotation {
    banners: Vec<PathBuf>,
    index: usize,
}

impl BannerRotation {
    pub fn new(banners: Vec<PathBuf>) -> Self {
        Self { banners, index: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.banners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.banners.len()
    }

    pub fn interval(&self) -> Duration {
        BANNER_INTERVAL
    }

    /// Banner to show now, then move on to the next one
    pub fn advance(&mut self) -> Option<&Path> {
        if self.banners.is_empty() {
            return None;
        }
        let current = self.index;
        self.index = (self.index + 1) % self.banners.len();
        Some(&self.banners[current])
    }
}
