//! Atomic read-transform-replace of a single file.
//!
//! New content is written to a temporary file in the target's directory,
//! given the target's owner, group, and permission bits, synced, and renamed
//! over the target. A reader sees either the old file or the new one, never a
//! mix. A staged write that is dropped before commit deletes its temporary
//! file and leaves the target alone.

use std::ffi::OsString;
use std::fs::{self, File, FileTimes, Metadata};
#[cfg(unix)]
use std::fs::Permissions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};

/// Mode for output files that did not exist before.
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

/// Where the pre-mutation copy goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupPolicy {
    None,
    /// `<file>.bak`, replacing any previous one.
    Sibling,
    /// `<file>.<yyyymmddTHHMMSSZ>.bak`, never replacing an existing backup.
    Timestamped,
}

/// Result of a successful [`AtomicFile::mutate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub path: PathBuf,
    pub backup: Option<PathBuf>,
    pub bytes_written: usize,
}

/// A file replaced only ever as a whole.
#[derive(Debug, Clone)]
pub struct AtomicFile {
    path: PathBuf,
}

impl AtomicFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file.
    pub fn read(&self) -> std::result::Result<Vec<u8>, StoreError> {
        fs::read(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound {
                    path: self.path.clone(),
                }
            } else {
                StoreError::Read {
                    path: self.path.clone(),
                    source,
                }
            }
        })
    }

    /// Read, transform, back up, and atomically replace the file.
    ///
    /// Nothing is written if the transform fails. Nothing is replaced if the
    /// backup fails. If the final rename fails the original is untouched and
    /// the temporary file is removed.
    pub fn mutate<F>(&self, backup: BackupPolicy, transform: F) -> Result<Mutation>
    where
        F: FnOnce(&[u8]) -> Result<Vec<u8>>,
    {
        let original = self.read()?;
        let metadata = fs::metadata(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;

        let replacement = transform(&original)?;

        let backup = self.backup(backup, &metadata)?;
        let staged = self.stage(&replacement, Some(&metadata))?;
        staged.commit()?;

        info!(
            path = %self.path.display(),
            backup = ?backup.as_ref().map(|p| p.display().to_string()),
            bytes = replacement.len(),
            "state file replaced"
        );

        Ok(Mutation {
            path: self.path.clone(),
            backup,
            bytes_written: replacement.len(),
        })
    }

    /// Atomically write `bytes`, creating the file if needed.
    ///
    /// An existing file keeps its owner, group, and mode; a new one gets 0644.
    pub fn write(&self, bytes: &[u8]) -> std::result::Result<(), StoreError> {
        let existing = fs::metadata(&self.path).ok();
        if existing.is_none() {
            fs::create_dir_all(self.dir()).map_err(|source| StoreError::Stage {
                path: self.path.clone(),
                source,
            })?;
        }
        self.stage(bytes, existing.as_ref())?.commit()
    }

    /// Write `bytes` to a temporary sibling without touching the target.
    pub fn stage(
        &self,
        bytes: &[u8],
        template: Option<&Metadata>,
    ) -> std::result::Result<StagedWrite, StoreError> {
        let stage_err = |source| StoreError::Stage {
            path: self.path.clone(),
            source,
        };

        let mut temp = tempfile::Builder::new()
            .prefix(&temp_prefix(&self.path))
            .suffix(".tmp")
            .tempfile_in(self.dir())
            .map_err(stage_err)?;

        temp.write_all(bytes).map_err(stage_err)?;

        match template {
            Some(metadata) => {
                temp.as_file()
                    .set_permissions(metadata.permissions())
                    .map_err(stage_err)?;
                copy_ownership(temp.as_file(), metadata).map_err(|source| {
                    StoreError::Ownership {
                        path: self.path.clone(),
                        source,
                    }
                })?;
            }
            None => {
                apply_new_file_mode(temp.as_file()).map_err(stage_err)?;
            }
        }

        temp.as_file().sync_all().map_err(stage_err)?;
        debug!(temp = %temp.path().display(), target = %self.path.display(), "staged replacement");

        Ok(StagedWrite {
            temp,
            target: self.path.clone(),
        })
    }

    fn backup(
        &self,
        policy: BackupPolicy,
        metadata: &Metadata,
    ) -> std::result::Result<Option<PathBuf>, StoreError> {
        let backup = match policy {
            BackupPolicy::None => return Ok(None),
            BackupPolicy::Sibling => with_suffix(&self.path, ".bak"),
            BackupPolicy::Timestamped => self.timestamped_backup_path(),
        };

        copy_preserving(&self.path, &backup, metadata).map_err(|source| StoreError::Backup {
            path: self.path.clone(),
            backup: backup.clone(),
            source,
        })?;

        debug!(backup = %backup.display(), "backup written");
        Ok(Some(backup))
    }

    fn timestamped_backup_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let mut candidate = with_suffix(&self.path, &format!(".{stamp}.bak"));
        let mut n = 1;
        while candidate.exists() {
            candidate = with_suffix(&self.path, &format!(".{stamp}-{n}.bak"));
            n += 1;
        }
        candidate
    }

    fn dir(&self) -> &Path {
        parent_dir(&self.path)
    }
}

/// A fully written temporary file waiting to replace its target.
///
/// Dropping it without calling [`StagedWrite::commit`] removes the temporary
/// file.
pub struct StagedWrite {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    /// Path of the temporary file.
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Rename the temporary file over the target.
    pub fn commit(self) -> std::result::Result<(), StoreError> {
        let target = self.target;
        self.temp
            .persist(&target)
            .map_err(|err| StoreError::Replace {
                path: target.clone(),
                source: err.error,
            })?;

        if let Err(err) = File::open(parent_dir(&target)).and_then(|dir| dir.sync_all()) {
            warn!(path = %target.display(), error = %err, "directory sync after replace failed");
        }
        Ok(())
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn temp_prefix(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state".to_string());
    format!(".{name}.")
}

/// Copy `src` to `dst` with mode, owner, group, and timestamps.
fn copy_preserving(src: &Path, dst: &Path, metadata: &Metadata) -> io::Result<()> {
    fs::copy(src, dst)?;
    let file = File::open(dst)?;
    file.set_permissions(metadata.permissions())?;
    copy_ownership(&file, metadata)?;
    file.set_times(
        FileTimes::new()
            .set_accessed(metadata.accessed()?)
            .set_modified(metadata.modified()?),
    )?;
    file.sync_all()
}

#[cfg(unix)]
fn copy_ownership(file: &File, metadata: &Metadata) -> io::Result<()> {
    use std::os::unix::fs::{fchown, MetadataExt};

    let current = file.metadata()?;
    if current.uid() == metadata.uid() && current.gid() == metadata.gid() {
        return Ok(());
    }
    fchown(file, Some(metadata.uid()), Some(metadata.gid())).map_err(|err| {
        if err.kind() == io::ErrorKind::PermissionDenied && !is_root() {
            io::Error::new(
                err.kind(),
                format!(
                    "{err}; file is owned by uid {} gid {}, rerun as that user or root",
                    metadata.uid(),
                    metadata.gid()
                ),
            )
        } else {
            err
        }
    })
}

#[cfg(not(unix))]
fn copy_ownership(_file: &File, _metadata: &Metadata) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(unix)]
fn apply_new_file_mode(file: &File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(Permissions::from_mode(NEW_FILE_MODE))
}

#[cfg(not(unix))]
fn apply_new_file_mode(_file: &File) -> io::Result<()> {
    Ok(())
}
