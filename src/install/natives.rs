use std::fs;
use std::io;
use std::path::Path;

use crate::layout::GameDirs;
use crate::logging::log_warning;
use crate::rules::Environment;
use crate::system;
use crate::version::{library_file, ResolvedVersion};
use crate::BoxError;

/// Unpack the native classifier jars of a version into its natives directory
pub fn extract_natives(dirs: &GameDirs, version: &ResolvedVersion, env: &Environment) -> Result<usize, BoxError> {
    let natives_dir = dirs.natives_dir(version.id());
    let mut extracted = 0;

    for lib in version.json.libraries.iter().filter(|l| l.is_allowed(env)) {
        let Some(classifier) = lib.native_classifier(&env.os_name, system::arch_bits()) else {
            continue;
        };
        let Some(relative) = lib.classifier_path(&classifier) else {
            continue;
        };
        let jar = library_file(dirs, &relative);
        if !jar.is_file() {
            log_warning(&format!("Native library missing: {}", jar.display()));
            continue;
        }

        let mut exclude = vec!["META-INF/".to_string()];
        if let Some(rules) = &lib.extract {
            exclude.extend(rules.exclude.iter().cloned());
        }
        extracted += extract_jar(&jar, &natives_dir, &exclude)?;
    }

    Ok(extracted)
}

/// Extract every file of `jar` not under an excluded prefix
pub fn extract_jar(jar: &Path, dest: &Path, exclude: &[String]) -> Result<usize, BoxError> {
    fs::create_dir_all(dest)?;
    let file = fs::File::open(jar)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut count = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if exclude.iter().any(|prefix| name.starts_with(prefix.as_str())) {
            continue;
        }
        // Entries that would land outside `dest` are skipped
        let Some(relative) = entry.enclosed_name() else {
            log_warning(&format!("Skipping unsafe entry '{}' in {}", name, jar.display()));
            continue;
        };

        let out_path = dest.join(relative);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        count += 1;
    }

    Ok(count)
}
