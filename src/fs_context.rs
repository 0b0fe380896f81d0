//! Filesystem context used by the linker.
//!
//! [`FsContext`] is the narrow capability set the link pass needs: probes
//! that reflect the filesystem at call time and mutations whose only result
//! is success or failure. [`RuntimeFsContext`] implements it on top of a
//! [`Runtime`], translating [`Path`] values into native paths.

use anyhow::{Context, Result, bail};
use log::debug;
use serde_json::Value;

use crate::path::Path;
use crate::runtime::Runtime;

#[cfg_attr(test, mockall::automock)]
pub trait FsContext {
    /// Whether an absolute path exists. Dangling symlinks count as existing.
    fn exists_abs(&self, path: &Path) -> bool;

    /// Whether `relative` exists inside `in_dir`.
    fn exists(&self, relative: &Path, in_dir: &Path) -> bool;

    fn read_json(&self, path: &Path) -> Result<Value>;

    /// Remove `relative` inside `in_dir`: a symlink is unlinked without
    /// following it, a directory is removed recursively.
    fn rm(&self, relative: &Path, in_dir: &Path) -> Result<()>;

    fn mkdir(&self, name: &str, in_dir: &Path) -> Result<()>;

    /// Create every missing level of `dirs` inside `in_dir` and return the
    /// absolute path of the deepest directory.
    fn mkdir_tree(&self, dirs: &Path, in_dir: &Path) -> Result<Path>;

    /// Create a symlink called `name` inside `in_dir` pointing at `target`.
    /// A relative `target` is stored as-is and resolves from `in_dir`.
    fn slink(&self, name: &str, target: &Path, in_dir: &Path) -> Result<()>;

    fn is_symlink(&self, path: &Path) -> bool;

    /// The raw target of a symlink, relative or absolute as it was written.
    fn get_symlink_target(&self, path: &Path) -> Result<Path>;
}

pub struct RuntimeFsContext<'a, R: Runtime> {
    runtime: &'a R,
}

impl<'a, R: Runtime> RuntimeFsContext<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self { runtime }
    }
}

impl<R: Runtime> FsContext for RuntimeFsContext<'_, R> {
    fn exists_abs(&self, path: &Path) -> bool {
        let native = path.to_path_buf();
        self.runtime.exists(&native) || self.runtime.is_symlink(&native)
    }

    fn exists(&self, relative: &Path, in_dir: &Path) -> bool {
        match in_dir.join(relative) {
            Ok(path) => self.exists_abs(&path),
            Err(e) => {
                debug!("{} does not resolve inside {}: {}", relative, in_dir, e);
                false
            }
        }
    }

    fn read_json(&self, path: &Path) -> Result<Value> {
        let content = self.runtime.read_to_string(&path.to_path_buf())?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON in {}", path))
    }

    fn rm(&self, relative: &Path, in_dir: &Path) -> Result<()> {
        let path = in_dir.join(relative)?;
        let native = path.to_path_buf();
        if self.runtime.is_symlink(&native) {
            debug!("Removing symlink {}", path);
            self.runtime.remove_symlink(&native)
        } else if self.runtime.is_dir(&native) {
            debug!("Removing directory {}", path);
            self.runtime.remove_dir_all(&native)
        } else if self.runtime.exists(&native) {
            debug!("Removing file {}", path);
            self.runtime.remove_file(&native)
        } else {
            debug!("Nothing to remove at {}", path);
            Ok(())
        }
    }

    fn mkdir(&self, name: &str, in_dir: &Path) -> Result<()> {
        let path = in_dir.child(name)?;
        self.runtime.create_dir(&path.to_path_buf())
    }

    fn mkdir_tree(&self, dirs: &Path, in_dir: &Path) -> Result<Path> {
        let path = in_dir.join(dirs)?;
        self.runtime.create_dir_all(&path.to_path_buf())?;
        Ok(path)
    }

    fn slink(&self, name: &str, target: &Path, in_dir: &Path) -> Result<()> {
        let link = in_dir.child(name)?;
        debug!("Linking {} -> {}", link, target);
        self.runtime
            .symlink(&target.to_path_buf(), &link.to_path_buf())
            .with_context(|| format!("Failed to link {} to {}", link, target))
    }

    fn is_symlink(&self, path: &Path) -> bool {
        self.runtime.is_symlink(&path.to_path_buf())
    }

    fn get_symlink_target(&self, path: &Path) -> Result<Path> {
        if !self.is_symlink(path) {
            bail!("{} is not a symlink", path);
        }
        let target = self.runtime.read_link(&path.to_path_buf())?;
        let text = target.to_string_lossy();
        Path::parse(&text, path.is_windows())
            .with_context(|| format!("Unreadable symlink target {:?} at {}", text, path))
    }
}
