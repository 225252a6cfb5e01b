//! Local skin library and profile avatars

use image::imageops::FilterType;
use image::{GenericImageView, ImageFormat};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::LauncherSettings;
use crate::logging::log_action;

pub const AVATAR_SIZE: u32 = 128;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum SkinError {
    Io(std::io::Error),
    Image(image::ImageError),
    /// File is not a PNG
    NotPng,
    /// Skins must be 64x64, or 64x32 for the classic layout
    InvalidSize { width: u32, height: u32 },
    NotFound(String),
    /// Names are limited to letters, digits, `-` and `_`
    InvalidName(String),
}

impl std::fmt::Display for SkinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkinError::Io(e) => write!(f, "File error: {}", e),
            SkinError::Image(e) => write!(f, "Image error: {}", e),
            SkinError::NotPng => write!(f, "Skins must be PNG files"),
            SkinError::InvalidSize { width, height } => {
                write!(f, "Skin is {}x{}, expected 64x64 or 64x32", width, height)
            }
            SkinError::NotFound(name) => write!(f, "No skin named '{}'", name),
            SkinError::InvalidName(name) => write!(f, "'{}' is not a valid skin name", name),
        }
    }
}

impl std::error::Error for SkinError {}

impl From<std::io::Error> for SkinError {
    fn from(e: std::io::Error) -> Self {
        SkinError::Io(e)
    }
}

impl From<image::ImageError> for SkinError {
    fn from(e: image::ImageError) -> Self {
        SkinError::Image(e)
    }
}

// ============================================================================
// Skin Library
// ============================================================================

#[derive(Debug, Clone)]
pub struct SkinLibrary {
    dir: PathBuf,
}

impl Default for SkinLibrary {
    fn default() -> Self {
        Self::new(barrie_path!("skins"))
    }
}

/// Keep file names portable: letters, digits, `-` and `_`
fn sanitize_name(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.trim_matches('_').is_empty() {
        "skin".to_string()
    } else {
        cleaned
    }
}

impl SkinLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn skin_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.png", name))
    }

    /// Validate and copy a skin into the library, returning its name
    pub fn import_skin(&self, src: &Path) -> Result<String, SkinError> {
        let bytes = fs::read(src)?;
        if image::guess_format(&bytes).ok() != Some(ImageFormat::Png) {
            return Err(SkinError::NotPng);
        }
        let img = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?;
        let (width, height) = img.dimensions();
        if !(width == 64 && (height == 64 || height == 32)) {
            return Err(SkinError::InvalidSize { width, height });
        }

        let stem = src.file_stem().and_then(|s| s.to_str()).unwrap_or("skin");
        let name = sanitize_name(stem);
        fs::create_dir_all(&self.dir)?;
        fs::write(self.skin_path(&name), &bytes)?;
        log_action(&format!("Imported skin '{}' from {}", name, src.display()));
        Ok(name)
    }

    /// Names of the skins in the library, sorted
    pub fn list_skins(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case("png")))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
            .collect();
        names.sort();
        names
    }

    pub fn set_active_skin(&self, settings: &mut LauncherSettings, name: &str) -> Result<(), SkinError> {
        // Only names import_skin could have produced, so the path stays in the library
        if name.is_empty() || sanitize_name(name) != name {
            return Err(SkinError::InvalidName(name.to_string()));
        }
        if !self.skin_path(name).is_file() {
            return Err(SkinError::NotFound(name.to_string()));
        }
        settings.active_skin = Some(name.to_string());
        log_action(&format!("Active skin set to '{}'", name));
        Ok(())
    }
}

// ============================================================================
// Avatars
// ============================================================================

/// Crop the largest centred square of an image and save it as a 128x128 PNG
pub fn crop_avatar(src: &Path, dest: &Path) -> Result<(), SkinError> {
    let img = image::open(src)?;
    let (width, height) = img.dimensions();
    let side = width.min(height);
    let x = (width - side) / 2;
    let y = (height - side) / 2;

    let avatar = img
        .crop_imm(x, y, side, side)
        .resize_exact(AVATAR_SIZE, AVATAR_SIZE, FilterType::Lanczos3);

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    avatar.save_with_format(dest, ImageFormat::Png)?;
    Ok(())
}
