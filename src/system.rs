//! Host platform probing
//!
//! Names follow the keys used by Mojang version metadata (`windows`, `osx`,
//! `linux`), so the results can be compared against library rules directly.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::process::Command;

/// OS name as it appears in library rules and native classifiers
pub fn os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

pub fn os_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "x86",
        "aarch64" => "arm64",
        "arm" => "arm32",
        _ => "x86_64",
    }
}

/// Value substituted for `${arch}` in native classifiers
pub fn arch_bits() -> &'static str {
    if cfg!(target_pointer_width = "64") {
        "64"
    } else {
        "32"
    }
}

pub fn classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

pub fn os_version() -> String {
    let output = if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "ver"]).output()
    } else if cfg!(target_os = "macos") {
        Command::new("sw_vers").arg("-productVersion").output()
    } else {
        Command::new("uname").arg("-r").output()
    };

    match output {
        Ok(out) if out.status.success() => {
            let text = String::from_utf8_lossy(&out.stdout).trim().to_string();
            // "Microsoft Windows [Version 10.0.22631.3447]"
            match (text.find("[Version "), text.rfind(']')) {
                (Some(start), Some(end)) if end > start + 9 => text[start + 9..end].to_string(),
                _ => text,
            }
        }
        _ => "Unknown".to_string(),
    }
}

pub fn cpu_name() -> String {
    if let Ok(file) = File::open("/proc/cpuinfo") {
        let reader = BufReader::new(file);
        for line in reader.lines().map_while(Result::ok) {
            if line.starts_with("model name") {
                if let Some(name) = line.split(':').nth(1) {
                    return name.trim().to_string();
                }
            }
        }
    }
    if cfg!(target_os = "macos") {
        if let Ok(out) = Command::new("sysctl").args(["-n", "machdep.cpu.brand_string"]).output() {
            if out.status.success() {
                return String::from_utf8_lossy(&out.stdout).trim().to_string();
            }
        }
    }
    std::env::var("PROCESSOR_IDENTIFIER").unwrap_or_else(|_| "Unknown".to_string())
}

/// Physical memory in megabytes, if it can be determined
pub fn total_memory_mb() -> Option<u32> {
    if let Ok(file) = File::open("/proc/meminfo") {
        let reader = BufReader::new(file);
        for line in reader.lines().map_while(Result::ok) {
            if line.starts_with("MemTotal:") {
                return parse_meminfo_kb(&line).map(|kb| (kb / 1024) as u32);
            }
        }
    }

    if cfg!(target_os = "macos") {
        let out = Command::new("sysctl").args(["-n", "hw.memsize"]).output().ok()?;
        let bytes: u64 = String::from_utf8_lossy(&out.stdout).trim().parse().ok()?;
        return Some((bytes / 1024 / 1024) as u32);
    }

    if cfg!(target_os = "windows") {
        let out = Command::new("wmic")
            .args(["ComputerSystem", "get", "TotalPhysicalMemory", "/value"])
            .output()
            .ok()?;
        let text = String::from_utf8_lossy(&out.stdout);
        let bytes: u64 = text
            .lines()
            .find_map(|l| l.trim().strip_prefix("TotalPhysicalMemory="))?
            .trim()
            .parse()
            .ok()?;
        return Some((bytes / 1024 / 1024) as u32);
    }

    None
}

fn parse_meminfo_kb(line: &str) -> Option<u64> {
    line.split_whitespace().nth(1)?.parse().ok()
}
