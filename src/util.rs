//! Shared utility functions.

use std::io;
use std::path::Path;

/// Normalize a Notion id to its dashed UUID form.
///
/// "0297b381142d4bdfb534cbbc043353ac" -> "0297b381-142d-4bdf-b534-cbbc043353ac"
/// Ids that are not 32 hex digits are returned unchanged.
pub fn to_dash_id(id: &str) -> String {
    let bare = to_bare_id(id);
    if bare.len() != 32 || !bare.chars().all(|c| c.is_ascii_hexdigit()) {
        return id.to_string();
    }
    format!(
        "{}-{}-{}-{}-{}",
        &bare[0..8],
        &bare[8..12],
        &bare[12..16],
        &bare[16..20],
        &bare[20..32]
    )
}

/// Strip dashes from a Notion id.
pub fn to_bare_id(id: &str) -> String {
    id.chars().filter(|c| *c != '-').collect()
}

/// Whether a string is a Notion block id (32 hex digits, dashes ignored).
pub fn is_notion_id(id: &str) -> bool {
    let bare = to_bare_id(id);
    bare.len() == 32 && bare.chars().all(|c| c.is_ascii_hexdigit())
}

/// Recursively copy a directory, creating destination directories as needed.
/// A missing source directory is not an error (themes may ship without one).
pub fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    if !src.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
