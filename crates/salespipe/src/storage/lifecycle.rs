//! File lifecycle manager: exclusive claims and atomic moves between
//! lifecycle zones.
//!
//! A file is claimed by atomically renaming it to a `.claimed` sibling in
//! the input zone. Rename is atomic on the same filesystem, so when the
//! batch scan and the stream watcher race on one file exactly one caller
//! wins; the loser observes the source gone and gets `AlreadyClaimed`.
//! Claimed files no longer carry the `.csv` extension, so neither path
//! picks them up again.

use std::path::{Path, PathBuf};

use chrono::Utc;
use log::debug;
use uuid::Uuid;

use crate::error::StorageError;

const CLAIM_SUFFIX: &str = ".claimed";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Terminal zone a consumed file is retired into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// Batch-consumed files.
    Archive,
    /// Stream-consumed files.
    Processed,
}

/// Exclusive ownership token for one claimed file. Only the holder may
/// release or unclaim it; dropping the token leaves the file claimed on
/// disk (an operator-visible state, never silently undone).
#[derive(Debug)]
pub struct FileClaim {
    pub token: Uuid,
    original: PathBuf,
    claimed: PathBuf,
}

impl FileClaim {
    /// The path the file arrived under.
    pub fn original_path(&self) -> &Path {
        &self.original
    }

    /// The path the file currently sits at while claimed.
    pub fn claimed_path(&self) -> &Path {
        &self.claimed
    }

    /// The arrival file name, for row tagging and log entries.
    pub fn file_name(&self) -> &str {
        self.original
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
    }
}

#[derive(Clone)]
pub struct LifecycleManager {
    archive_dir: PathBuf,
    processed_dir: PathBuf,
}

impl LifecycleManager {
    pub fn new<A: AsRef<Path>, P: AsRef<Path>>(archive_dir: A, processed_dir: P) -> Self {
        Self {
            archive_dir: archive_dir.as_ref().to_path_buf(),
            processed_dir: processed_dir.as_ref().to_path_buf(),
        }
    }

    /// Atomically claims a file in the input zone. Exactly one concurrent
    /// caller succeeds per file; the rest get `AlreadyClaimed`.
    pub fn claim(&self, path: &Path) -> Result<FileClaim, StorageError> {
        let mut claimed = path.as_os_str().to_owned();
        claimed.push(CLAIM_SUFFIX);
        let claimed = PathBuf::from(claimed);

        match std::fs::rename(path, &claimed) {
            Ok(()) => {
                let claim = FileClaim {
                    token: Uuid::new_v4(),
                    original: path.to_path_buf(),
                    claimed,
                };
                debug!("Claimed {} (token {})", path.display(), claim.token);
                Ok(claim)
            }
            // Source gone: the other path renamed it first (or it was
            // already retired).
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::AlreadyClaimed(path.to_path_buf()))
            }
            Err(e) => Err(StorageError::ClaimFile {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Moves a claimed file into its terminal zone, renamed with a
    /// timestamp prefix so repeated runs never collide. On failure the
    /// file stays claimed and the error propagates to the caller.
    pub fn release(&self, claim: FileClaim, zone: Zone) -> Result<PathBuf, StorageError> {
        let zone_dir = match zone {
            Zone::Archive => &self.archive_dir,
            Zone::Processed => &self.processed_dir,
        };
        ensure_directory(zone_dir)?;

        let timestamp = Utc::now().format(TIMESTAMP_FORMAT);
        let retired_name = format!("{}_{}", timestamp, claim.file_name());
        let destination = resolve_conflict(zone_dir, &retired_name)?;

        move_file(claim.claimed_path(), &destination)?;

        debug!(
            "Released {} -> {} (token {})",
            claim.original.display(),
            destination.display(),
            claim.token
        );
        Ok(destination)
    }

    /// Returns a claimed file to the `arrived` state so the next batch
    /// scan can retry it (store-write failure policy).
    pub fn unclaim(&self, claim: FileClaim) -> Result<(), StorageError> {
        move_file(claim.claimed_path(), claim.original_path())?;
        debug!(
            "Unclaimed {} (token {})",
            claim.original.display(),
            claim.token
        );
        Ok(())
    }
}

/// Move a file from `src` to `dst`. Uses `rename` first (fast, atomic on
/// the same filesystem) and falls back to copy + delete for cross-device
/// moves.
fn move_file(src: &Path, dst: &Path) -> Result<(), StorageError> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    std::fs::copy(src, dst).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    std::fs::remove_file(src).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

/// Finds an available name in `directory`, appending a numeric suffix when
/// the timestamped name is already taken (same file name retired twice
/// within one second).
fn resolve_conflict(directory: &Path, filename: &str) -> Result<PathBuf, StorageError> {
    let path = directory.join(filename);
    if std::fs::symlink_metadata(&path).is_err() {
        return Ok(path);
    }

    let (base, ext) = match filename.rfind('.') {
        Some(dot) => (&filename[..dot], Some(&filename[dot..])),
        None => (filename, None),
    };

    for counter in 2..=1000 {
        let candidate = match ext {
            Some(ext) => format!("{}_{}{}", base, counter, ext),
            None => format!("{}_{}", base, counter),
        };
        let candidate_path = directory.join(&candidate);
        if std::fs::symlink_metadata(&candidate_path).is_err() {
            return Ok(candidate_path);
        }
    }

    Err(StorageError::FileExists(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Zones {
        _tmp: TempDir,
        input: PathBuf,
        manager: LifecycleManager,
        archive: PathBuf,
        processed: PathBuf,
    }

    fn setup() -> Zones {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("input");
        let archive = tmp.path().join("archive");
        let processed = tmp.path().join("processed");
        std::fs::create_dir_all(&input).unwrap();
        let manager = LifecycleManager::new(&archive, &processed);
        Zones {
            _tmp: tmp,
            input,
            manager,
            archive,
            processed,
        }
    }

    #[test]
    fn test_claim_moves_file_aside() {
        let z = setup();
        let file = z.input.join("sales.csv");
        std::fs::write(&file, b"data").unwrap();

        let claim = z.manager.claim(&file).unwrap();
        assert!(!file.exists());
        assert!(claim.claimed_path().exists());
        assert_eq!(claim.file_name(), "sales.csv");
    }

    #[test]
    fn test_second_claim_observes_already_claimed() {
        let z = setup();
        let file = z.input.join("sales.csv");
        std::fs::write(&file, b"data").unwrap();

        let _claim = z.manager.claim(&file).unwrap();
        match z.manager.claim(&file) {
            Err(StorageError::AlreadyClaimed(p)) => assert_eq!(p, file),
            other => panic!("Expected AlreadyClaimed, got {:?}", other.map(|c| c.token)),
        }
    }

    #[test]
    fn test_release_to_archive_with_timestamp_prefix() {
        let z = setup();
        let file = z.input.join("sales.csv");
        std::fs::write(&file, b"data").unwrap();

        let claim = z.manager.claim(&file).unwrap();
        let retired = z.manager.release(claim, Zone::Archive).unwrap();

        assert!(retired.exists());
        assert!(retired.starts_with(&z.archive));
        let name = retired.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with("sales.csv"));
        // <YYYYmmdd_HHMMSS>_ prefix
        assert_eq!(name.as_bytes()[8], b'_');
        assert_eq!(name.as_bytes()[15], b'_');
    }

    #[test]
    fn test_release_to_processed_zone() {
        let z = setup();
        let file = z.input.join("sales.csv");
        std::fs::write(&file, b"data").unwrap();

        let claim = z.manager.claim(&file).unwrap();
        let retired = z.manager.release(claim, Zone::Processed).unwrap();
        assert!(retired.starts_with(&z.processed));
    }

    #[test]
    fn test_release_resolves_name_collisions() {
        let z = setup();
        let mut retired = Vec::new();
        for content in ["one", "two"] {
            let file = z.input.join("sales.csv");
            std::fs::write(&file, content).unwrap();
            let claim = z.manager.claim(&file).unwrap();
            retired.push(z.manager.release(claim, Zone::Archive).unwrap());
        }
        // Both survive even when retired within the same second.
        assert!(retired[0].exists());
        assert!(retired[1].exists());
        assert_ne!(retired[0], retired[1]);
    }

    #[test]
    fn test_unclaim_restores_arrived_state() {
        let z = setup();
        let file = z.input.join("sales.csv");
        std::fs::write(&file, b"data").unwrap();

        let claim = z.manager.claim(&file).unwrap();
        assert!(!file.exists());

        z.manager.unclaim(claim).unwrap();
        assert!(file.exists());
        // And the file can be claimed again afterwards.
        assert!(z.manager.claim(&file).is_ok());
    }

    #[test]
    fn test_release_failure_leaves_file_claimed() {
        let z = setup();
        let file = z.input.join("sales.csv");
        std::fs::write(&file, b"data").unwrap();
        let claim = z.manager.claim(&file).unwrap();
        let claimed_path = claim.claimed_path().to_path_buf();

        // Make the archive zone unusable: a plain file where the
        // directory should be.
        std::fs::write(&z.archive, b"not a directory").unwrap();

        let result = z.manager.release(claim, Zone::Archive);
        assert!(result.is_err());
        assert!(claimed_path.exists());
    }

    #[test]
    fn test_claim_missing_file_is_already_claimed() {
        let z = setup();
        let result = z.manager.claim(&z.input.join("ghost.csv"));
        assert!(matches!(result, Err(StorageError::AlreadyClaimed(_))));
    }
}
