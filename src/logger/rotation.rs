//! Size based rotation of the log file
//!
//! A full file is renamed to `<stem>.<timestamp>_<seq>.<ext>`, optionally
//! gzipped, and the oldest rotated files beyond `max_files` are removed.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use flate2::Compression;
use flate2::write::GzEncoder;

use crate::logger::config::RotationConfig;

pub struct RotationManager {
    config: RotationConfig,
    sequence: u32,
}

impl RotationManager {
    pub fn new(config: RotationConfig) -> Self {
        Self {
            config,
            sequence: 0,
        }
    }

    pub fn should_rotate(&self, current_size: u64) -> bool {
        self.config.enabled && current_size >= self.config.max_size
    }

    /// Move `current_path` aside and prune old rotations.
    ///
    /// Returns the path the rotated content ended up at, if the file existed.
    pub fn rotate(&mut self, current_path: &Path) -> io::Result<Option<PathBuf>> {
        let mut rotated = None;

        if current_path.exists() {
            let target = self.rotated_path(current_path);
            fs::rename(current_path, &target)?;
            rotated = Some(if self.config.compress {
                compress_file(&target)?
            } else {
                target
            });
        }

        self.cleanup_old_files(current_path)?;
        Ok(rotated)
    }

    /// Names sort in rotation order: fixed width timestamp, then sequence.
    fn rotated_path(&mut self, base_path: &Path) -> PathBuf {
        self.sequence = self.sequence.wrapping_add(1);
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S%3f");
        let stem = base_path.file_stem().unwrap_or_default().to_string_lossy();
        let name = match base_path.extension() {
            Some(ext) => format!(
                "{}.{}_{:04}.{}",
                stem,
                timestamp,
                self.sequence % 10_000,
                ext.to_string_lossy()
            ),
            None => format!("{}.{}_{:04}", stem, timestamp, self.sequence % 10_000),
        };
        base_path.with_file_name(name)
    }

    fn cleanup_old_files(&self, base_path: &Path) -> io::Result<()> {
        let parent = match base_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let base_name = base_path.file_name().unwrap_or_default();
        let prefix = format!(
            "{}.",
            base_path.file_stem().unwrap_or_default().to_string_lossy()
        );

        let mut rotated: Vec<PathBuf> = fs::read_dir(parent)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                let name = entry.file_name();
                name.as_os_str() != base_name && name.to_string_lossy().starts_with(&prefix)
            })
            .map(|entry| entry.path())
            .collect();
        rotated.sort();

        let keep = self.config.max_files.saturating_sub(1);
        let excess = rotated.len().saturating_sub(keep);
        for oldest in rotated.iter().take(excess) {
            fs::remove_file(oldest)?;
        }
        Ok(())
    }
}

/// Gzip `path` into `<path>.gz` and remove the original.
pub fn compress_file(path: &Path) -> io::Result<PathBuf> {
    let input = fs::read(path)?;

    let mut name = path.as_os_str().to_owned();
    name.push(".gz");
    let compressed = PathBuf::from(name);

    let mut encoder = GzEncoder::new(File::create(&compressed)?, Compression::default());
    encoder.write_all(&input)?;
    encoder.finish()?;

    fs::remove_file(path)?;
    Ok(compressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use proptest::prelude::*;
    use std::io::Read;
    use tempfile::tempdir;

    fn config(max_size: u64, max_files: usize, compress: bool) -> RotationConfig {
        RotationConfig {
            enabled: true,
            max_size,
            max_files,
            compress,
        }
    }

    fn rotated_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| name.starts_with("crm-cron.") && name != "crm-cron.log")
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_disabled_never_rotates() {
        let manager = RotationManager::new(RotationConfig {
            enabled: false,
            ..config(1, 5, false)
        });
        assert!(!manager.should_rotate(u64::MAX));
    }

    #[test]
    fn test_rotate_moves_file_aside() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("crm-cron.log");
        fs::write(&base, "full\n").unwrap();

        let mut manager = RotationManager::new(config(4, 5, false));
        let rotated = manager.rotate(&base).unwrap().unwrap();

        assert!(!base.exists());
        assert_eq!(fs::read_to_string(&rotated).unwrap(), "full\n");
        let name = rotated.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("crm-cron.") && name.ends_with(".log"), "{name}");
    }

    #[test]
    fn test_rotate_missing_file_is_noop() {
        let dir = tempdir().unwrap();
        let mut manager = RotationManager::new(config(4, 5, false));
        assert!(manager.rotate(&dir.path().join("crm-cron.log")).unwrap().is_none());
    }

    #[test]
    fn test_compressed_rotation_round_trips() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("crm-cron.log");
        fs::write(&base, "{\"message\":\"Cron poll completed\"}\n").unwrap();

        let mut manager = RotationManager::new(config(4, 5, true));
        let rotated = manager.rotate(&base).unwrap().unwrap();
        assert!(rotated.to_string_lossy().ends_with(".log.gz"));

        let mut decoded = String::new();
        GzDecoder::new(File::open(&rotated).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "{\"message\":\"Cron poll completed\"}\n");
        assert_eq!(rotated_names(dir.path()).len(), 1);
    }

    #[test]
    fn test_cleanup_removes_oldest() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("crm-cron.log");
        for old in ["crm-cron.20240101_000000000_0001.log", "crm-cron.20240102_000000000_0001.log"] {
            fs::write(dir.path().join(old), "old\n").unwrap();
        }
        fs::write(dir.path().join("other.log"), "unrelated\n").unwrap();
        fs::write(&base, "current\n").unwrap();

        let mut manager = RotationManager::new(config(4, 3, false));
        let rotated = manager.rotate(&base).unwrap().unwrap();

        let names = rotated_names(dir.path());
        assert_eq!(names.len(), 2);
        assert_eq!(names[0], "crm-cron.20240102_000000000_0001.log");
        assert_eq!(
            names[1],
            rotated.file_name().unwrap().to_string_lossy().to_string()
        );
        assert!(dir.path().join("other.log").exists());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_rotation_triggers_at_max_size(
            current_size in 0u64..10_000_000u64,
            max_size in 1u64..10_000_000u64
        ) {
            let manager = RotationManager::new(config(max_size, 5, false));
            prop_assert_eq!(manager.should_rotate(current_size), current_size >= max_size);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn prop_rotated_file_count_bounded(
            max_files in 1usize..6usize,
            rotations in 1usize..10usize
        ) {
            let dir = tempdir().unwrap();
            let base = dir.path().join("crm-cron.log");
            let mut manager = RotationManager::new(config(1, max_files, false));

            for i in 0..rotations {
                fs::write(&base, format!("line {i}\n")).unwrap();
                manager.rotate(&base).unwrap();
            }

            let names = rotated_names(dir.path());
            prop_assert_eq!(names.len(), rotations.min(max_files - 1));
        }
    }
}
