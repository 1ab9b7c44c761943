//! Driver update catalogs
//!
//! A catalog is a JSON object mapping driver names to their newest version:
//!
//! ```json
//! { "e1000e": "3.8.7", "amdgpu": "6.8.0" }
//! ```
//!
//! Only `file://` repositories are read; there is no network client.

use anyhow::{Context, Result};
use hwmgr_types::{HwError, HwResult};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub type Catalog = HashMap<String, String>;

pub fn load(path: &Path) -> Result<Catalog> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read driver catalog {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse driver catalog {}", path.display()))
}

/// Newer version of `driver` published in the repository, if any
pub fn newer_version(repo_url: &str, driver: &str, current: &str) -> HwResult<Option<String>> {
    let Some(path) = repo_url.strip_prefix("file://") else {
        return Err(HwError::NotSupported(format!(
            "driver repository {} is not a local file",
            repo_url
        )));
    };
    let catalog = load(Path::new(path)).map_err(|e| HwError::File(format!("{:#}", e)))?;
    Ok(catalog
        .get(driver)
        .filter(|latest| compare_versions(latest, current) == Ordering::Greater)
        .cloned())
}

/// Compare dotted versions numerically, falling back to text for non-numeric parts
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let split = |v: &str| -> Vec<String> {
        v.split(|c: char| c == '.' || c == '-' || c == '_')
            .map(str::to_string)
            .collect()
    };
    let (left, right) = (split(a), split(b));
    for i in 0..left.len().max(right.len()) {
        let l = left.get(i).map(String::as_str).unwrap_or("0");
        let r = right.get(i).map(String::as_str).unwrap_or("0");
        let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => l.cmp(r),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
