//! Board software information.
//!
//! Reads release files directly instead of shelling out. Every field falls
//! back to "N/A"; read failures are reported per field and collected in
//! `errors`.

use serde::Serialize;
use std::path::{Path, PathBuf};

const NOT_AVAILABLE: &str = "N/A";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SoftwareInfo {
    pub jetpack_release: String,
    pub linux_version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct SoftwareInfoSource {
    pub jetpack_release_path: PathBuf,
    pub linux_version_path: PathBuf,
}

impl Default for SoftwareInfoSource {
    fn default() -> Self {
        Self {
            jetpack_release_path: PathBuf::from("/etc/nv_tegra_release"),
            linux_version_path: PathBuf::from("/proc/version"),
        }
    }
}

impl SoftwareInfoSource {
    pub fn collect(&self) -> SoftwareInfo {
        let mut errors = Vec::new();
        let jetpack_release = read_field(&self.jetpack_release_path, &mut errors);
        let linux_version = read_field(&self.linux_version_path, &mut errors);
        SoftwareInfo {
            jetpack_release,
            linux_version,
            errors,
        }
    }
}

fn read_field(path: &Path, errors: &mut Vec<String>) -> String {
    log::info!("reading {}", path.display());
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let trimmed = contents.trim();
            if trimmed.is_empty() {
                NOT_AVAILABLE.to_string()
            } else {
                trimmed.to_string()
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let msg = format!("File not found: {}", path.display());
            log::error!("{}", msg);
            errors.push(msg);
            "Error: File not found".to_string()
        }
        Err(err) => {
            let msg = format!("Error reading {}: {}", path.display(), err);
            log::error!("{}", msg);
            errors.push(msg);
            format!("Error: {}", err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_trimmed_release_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let release = dir.path().join("nv_tegra_release");
        let version = dir.path().join("version");
        std::fs::write(&release, "# R35 (release), REVISION: 4.1\n")?;
        std::fs::write(&version, "Linux version 5.10.120-tegra\n")?;

        let info = SoftwareInfoSource {
            jetpack_release_path: release,
            linux_version_path: version,
        }
        .collect();

        assert_eq!(info.jetpack_release, "# R35 (release), REVISION: 4.1");
        assert_eq!(info.linux_version, "Linux version 5.10.120-tegra");
        let json = serde_json::to_value(&info)?;
        assert!(json.get("errors").is_none());
        Ok(())
    }

    #[test]
    fn missing_files_are_reported_per_field() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let version = dir.path().join("version");
        std::fs::write(&version, "")?;

        let info = SoftwareInfoSource {
            jetpack_release_path: dir.path().join("absent"),
            linux_version_path: version,
        }
        .collect();

        assert_eq!(info.jetpack_release, "Error: File not found");
        assert_eq!(info.linux_version, "N/A");
        assert_eq!(info.errors.len(), 1);
        Ok(())
    }
}
