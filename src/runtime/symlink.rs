//! Symlink operations (create, read, remove).

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn symlink_impl(&self, original: &Path, link: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::symlink as unix_symlink;
            unix_symlink(original, link)
                .with_context(|| format!("Failed to create symlink {:?} -> {:?}", link, original))?;
        }
        #[cfg(windows)]
        {
            use anyhow::bail;
            use std::os::windows::fs::{symlink_dir, symlink_file};
            use tracing::trace;

            // `is_dir()` on a relative path is relative to CWD; we want it relative to the link's parent.
            let target_path = if original.is_absolute() {
                original.to_path_buf()
            } else {
                link.parent()
                    .context("Failed to get parent directory for symlink")?
                    .join(original)
            };

            // Dangling targets (a module path not built yet) are linked as directories.
            if target_path.is_dir() || !target_path.exists() {
                trace!("Creating directory symlink {:?} -> {:?}", link, original);
                symlink_dir(original, link).context("Failed to create directory symlink")?;
            } else {
                trace!("Creating file symlink {:?} -> {:?}", link, original);
                symlink_file(original, link).context("Failed to create file symlink")?;
            }

            if fs::symlink_metadata(link).is_err() {
                bail!(
                    "Symlink creation reported success but link does not exist: link={:?} target={:?}",
                    link,
                    original
                );
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_link_impl(&self, path: &Path) -> Result<PathBuf> {
        fs::read_link(path).with_context(|| format!("Failed to read symlink {:?}", path))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn is_symlink_impl(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_symlink_impl(&self, path: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            fs::remove_file(path).with_context(|| format!("Failed to remove symlink {:?}", path))?;
        }
        #[cfg(windows)]
        {
            // Directory symlinks need remove_dir, file symlinks remove_file.
            fs::remove_dir(path)
                .or_else(|_| fs::remove_file(path))
                .with_context(|| format!("Failed to remove symlink {:?}", path))?;
        }
        Ok(())
    }
}
