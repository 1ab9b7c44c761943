//! Small helpers over the sysfs/procfs trees
//!
//! Paths are relative to a root so tests can point the reader at a scratch
//! directory laid out like `/sys`.

use anyhow::{anyhow, Context, Result};
use hwmgr_types::DriverIdentity;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Sysfs {
    root: PathBuf,
}

impl Default for Sysfs {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Sysfs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// File contents with surrounding whitespace removed
    pub fn read(&self, rel: &str) -> Result<String> {
        let path = self.path(rel);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(content.trim().to_string())
    }

    pub fn read_hex(&self, rel: &str) -> Result<u32> {
        let value = self.read(rel)?;
        u32::from_str_radix(value.trim_start_matches("0x"), 16)
            .with_context(|| format!("Failed to parse hex value from {}", rel))
    }

    pub fn read_int(&self, rel: &str) -> Result<i64> {
        let value = self.read(rel)?;
        value
            .parse::<i64>()
            .with_context(|| format!("Failed to parse integer from {}", rel))
    }

    /// Final path component of a symlink target, e.g. the driver a device is bound to
    pub fn link_name(&self, rel: &str) -> Result<String> {
        let path = self.path(rel);
        let target = fs::read_link(&path)
            .with_context(|| format!("Failed to read link {}", path.display()))?;
        file_name(&target).ok_or_else(|| anyhow!("Link {} has no file name", path.display()))
    }

    /// Sorted names of the entries in a directory
    pub fn list(&self, rel: &str) -> Result<Vec<String>> {
        let path = self.path(rel);
        let mut names = Vec::new();
        for entry in fs::read_dir(&path).with_context(|| format!("Failed to list {}", path.display()))? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn kernel_release(&self) -> String {
        self.read("proc/sys/kernel/osrelease")
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// Driver identity of a loadable (or built-in) kernel module
    pub fn module(&self, name: &str) -> DriverIdentity {
        let module = name.replace('-', "_");
        let base = format!("sys/module/{}", module);
        let version = self
            .read(&format!("{}/version", base))
            .or_else(|_| self.read(&format!("{}/srcversion", base)))
            .unwrap_or_else(|_| self.kernel_release());
        // Proprietary modules taint the kernel with 'P'
        let proprietary = self
            .read(&format!("{}/taint", base))
            .map(|taint| taint.contains('P'))
            .unwrap_or(false);

        let mut identity = DriverIdentity::new(name, version).kernel_module(!proprietary);
        if self.exists(&base) {
            identity = identity.with_install_path(self.path(&base).display().to_string());
        }
        identity
    }

    /// Driver bound to the device at `device_rel`, following up to two parent devices
    pub fn device_driver(&self, device_rel: &str) -> Option<DriverIdentity> {
        let candidates = [
            format!("{}/driver", device_rel),
            format!("{}/device/driver", device_rel),
            format!("{}/device/device/driver", device_rel),
        ];
        for candidate in candidates {
            let Ok(driver) = self.link_name(&candidate) else {
                continue;
            };
            let module = self
                .link_name(&format!("{}/module", candidate))
                .unwrap_or_else(|_| driver.clone());
            let mut identity = self.module(&module);
            identity.name = driver;
            if identity.install_path.is_empty() {
                let bound = self.path(&candidate);
                let resolved = fs::canonicalize(&bound).unwrap_or(bound);
                identity.install_path = resolved.display().to_string();
            }
            return Some(identity);
        }
        None
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}
