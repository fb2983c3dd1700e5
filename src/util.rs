use anyhow::{Context, Result};
use std::{fs, path::Path};

pub fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Lines up to (not including) the first blank one.
pub fn non_empty_lines(s: &str) -> impl Iterator<Item = &str> {
    s.lines().take_while(|line| !line.trim().is_empty())
}
