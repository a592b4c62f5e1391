//! SoundFont discovery.
//!
//! Finds a `.sf2` file to play with when none was given explicitly:
//! the `SOUNDSEQ_SOUNDFONT` environment variable first, then well-known
//! file names in the search directories, then any `.sf2` file there.

use crate::config::SOUNDFONT_ENV_VAR;
use std::fs;
use std::path::{Path, PathBuf};

/// Common SoundFont file names, in preference order.
pub const SOUNDFONT_NAMES: [&str; 7] = [
    "FluidR3_GM.sf2",
    "FluidR3_GS.sf2",
    "GeneralUser GS.sf2",
    "TimGM6mb.sf2",
    "default.sf2",
    "soundfont.sf2",
    "gm.sf2",
];

/// Default directory for user SoundFonts (`~/.soundseq/soundfonts`).
pub fn default_soundfont_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".soundseq").join("soundfonts"))
}

/// Directories searched for SoundFonts, in priority order.
///
/// `soundfont_dir` overrides the default user directory.
pub fn search_paths(soundfont_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    match soundfont_dir {
        Some(dir) => paths.push(dir.to_path_buf()),
        None => paths.extend(default_soundfont_dir()),
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join("Music").join("sf2"));
        paths.push(home.join("Music").join("SoundFonts"));
    }
    paths.push(PathBuf::from("/usr/share/sounds/sf2"));
    paths.push(PathBuf::from("/usr/share/soundfonts"));
    paths
}

/// Finds the best available SoundFont.
pub fn find_soundfont(soundfont_dir: Option<&Path>) -> Option<PathBuf> {
    let env = std::env::var_os(SOUNDFONT_ENV_VAR).map(PathBuf::from);
    find_in(env.as_deref(), &search_paths(soundfont_dir))
}

/// Lists every SoundFont found, without duplicates.
pub fn list_soundfonts(soundfont_dir: Option<&Path>) -> Vec<PathBuf> {
    let env = std::env::var_os(SOUNDFONT_ENV_VAR).map(PathBuf::from);
    list_in(env.as_deref(), &search_paths(soundfont_dir))
}

fn find_in(env: Option<&Path>, dirs: &[PathBuf]) -> Option<PathBuf> {
    if let Some(path) = env.filter(|p| p.is_file()) {
        return Some(path.to_path_buf());
    }

    // Known names across all directories before falling back to any .sf2
    for name in SOUNDFONT_NAMES {
        if let Some(path) = dirs.iter().map(|d| d.join(name)).find(|p| p.is_file()) {
            return Some(path);
        }
    }

    dirs.iter().find_map(|d| sf2_files(d).into_iter().next())
}

fn list_in(env: Option<&Path>, dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = Vec::new();
    let candidates = env
        .filter(|p| p.is_file())
        .map(Path::to_path_buf)
        .into_iter()
        .chain(dirs.iter().flat_map(|d| sf2_files(d)));

    for path in candidates {
        if !found.contains(&path) {
            found.push(path);
        }
    }
    found
}

/// `.sf2` files directly inside `dir`, sorted by name.
fn sf2_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_sf2(p))
        .collect();
    files.sort();
    files
}

fn is_sf2(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sf2"))
}
