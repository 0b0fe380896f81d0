//! Platform-tagged path values.
//!
//! A [`Path`] is an immutable list of segments plus two flags: whether the
//! path is relative, and whether it follows Windows semantics (backslash
//! separator, drive-letter root). The flags are part of the value, so a
//! POSIX path and a Windows path never compare equal even when they render
//! to similar strings.
//!
//! # Structure
//!
//! - `relative` - Offset arithmetic (`find_relative`, `relative_to`)

mod relative;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub use relative::{find_relative, relative_to};

/// Segment that moves one level up.
pub const PARENT: &str = "..";

/// Segment that refers to the current directory.
pub const CURRENT: &str = ".";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// A segment was empty, whitespace-only, `.`, contained a separator, or
    /// contained a `:` on Windows.
    #[error("invalid path segment {segment:?} at index {index}")]
    InvalidSegment { index: usize, segment: String },

    /// More `..` segments than the base path has levels.
    #[error("relative path {relative} escapes the root of {base}")]
    EscapesRoot { base: String, relative: String },

    /// The two paths do not share a root (platform or drive differs).
    #[error("cannot compute a relative path from {from} to {to}: different roots")]
    DifferentRoots { from: String, to: String },

    #[error("expected an absolute path, got {0}")]
    NotAbsolute(String),

    /// `\\server\share` and `\\?\` prefixed paths.
    #[error("UNC paths are not supported: {0}")]
    Unc(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<String>,
    relative: bool,
    windows: bool,
}

impl Path {
    /// Build a path from explicit segments, root to leaf.
    pub fn new<I, S>(segments: I, relative: bool, windows: bool) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if let Some((index, segment)) = segments
            .iter()
            .enumerate()
            .find(|(_, s)| !is_valid_segment(s, windows))
        {
            return Err(PathError::InvalidSegment {
                index,
                segment: segment.clone(),
            });
        }
        Ok(Self {
            segments,
            relative,
            windows,
        })
    }

    /// The root of a POSIX filesystem, or the separator-only root on Windows.
    pub fn root(windows: bool) -> Self {
        Self {
            segments: Vec::new(),
            relative: false,
            windows,
        }
    }

    /// Parse platform text into a path.
    ///
    /// On Windows both `/` and `\` separate segments, `C:` becomes the bare
    /// drive segment `C`, and the Git-Bash form `/c/Users` is read as drive
    /// `c`. Empty and `.` segments are dropped on every platform.
    pub fn parse(text: &str, windows: bool) -> Result<Self, PathError> {
        let is_separator = |c: char| c == '/' || (windows && c == '\\');
        if windows && text.starts_with(r"\\") {
            return Err(PathError::Unc(text.to_string()));
        }
        let leading_separator = text.starts_with(is_separator);

        let mut segments: Vec<String> = text
            .split(is_separator)
            .filter(|s| !s.is_empty() && *s != CURRENT)
            .map(str::to_string)
            .collect();

        let mut relative = !leading_separator;
        if windows {
            if let Some(first) = segments.first_mut() {
                if let Some(letter) = drive_designator(first) {
                    *first = letter.to_string();
                    relative = false;
                } else if leading_separator && is_drive_letter(first) {
                    // Git-Bash style: /c/Users/...
                    relative = false;
                }
            }
        }

        Self::new(segments, relative, windows)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_relative(&self) -> bool {
        self.relative
    }

    pub fn is_windows(&self) -> bool {
        self.windows
    }

    /// The drive letter of an absolute Windows path, if it has one.
    pub fn drive(&self) -> Option<char> {
        if !self.windows || self.relative {
            return None;
        }
        self.segments
            .first()
            .filter(|s| is_drive_letter(s))
            .and_then(|s| s.chars().next())
    }

    /// Number of leading segments that make up the root (the drive letter).
    pub(crate) fn root_len(&self) -> usize {
        usize::from(self.drive().is_some())
    }

    pub fn is_root(&self) -> bool {
        !self.relative && self.segments.len() == self.root_len()
    }

    pub fn has_parent(&self) -> bool {
        self.segments.len() > 1
    }

    pub fn parent(&self) -> Option<Self> {
        if !self.has_parent() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self {
            segments,
            relative: self.relative,
            windows: self.windows,
        })
    }

    /// Append one segment, keeping the relative and platform flags.
    pub fn child(&self, name: &str) -> Result<Self, PathError> {
        if !is_valid_segment(name, self.windows) {
            return Err(PathError::InvalidSegment {
                index: self.segments.len(),
                segment: name.to_string(),
            });
        }
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Ok(Self {
            segments,
            relative: self.relative,
            windows: self.windows,
        })
    }

    /// Resolve a relative path (which may start with `..`) against this one.
    pub fn join(&self, relative: &Path) -> Result<Self, PathError> {
        find_relative(self, relative)
    }

    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Render with the separator and root syntax of the given platform.
    ///
    /// Rendering a Windows path for POSIX gives the Git-Bash form
    /// (`/c/Users/me`), which [`Path::parse`] reads back as the same drive.
    pub fn render(&self, windows: bool) -> String {
        let separator = if windows { "\\" } else { "/" };
        if self.relative {
            if self.segments.is_empty() {
                return CURRENT.to_string();
            }
            return self.segments.join(separator);
        }
        match (windows, self.drive()) {
            (true, Some(drive)) => {
                let rest = self.segments.get(1..).unwrap_or_default().join(separator);
                format!("{}:{}{}", drive, separator, rest)
            }
            _ => format!("{}{}", separator, self.segments.join(separator)),
        }
    }

    /// Forward-slash rendering, used in messages and comparisons.
    pub fn to_unix(&self) -> String {
        self.render(false)
    }

    /// Unambiguous form that encodes every attribute of the value.
    pub fn canonical(&self) -> String {
        format!(
            "Path[relative={}, windows={}, segments={:?}]",
            self.relative, self.windows, self.segments
        )
    }

    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(self.render(self.windows))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(self.windows))
    }
}

/// Segments must survive `parse(render(..))`: `.` is dropped by `parse`,
/// and a Windows `X:` would be read back as a drive.
fn is_valid_segment(segment: &str, windows: bool) -> bool {
    !segment.trim().is_empty()
        && segment != CURRENT
        && !segment.contains('/')
        && !(windows && (segment.contains('\\') || segment.contains(':')))
}

fn is_drive_letter(segment: &str) -> bool {
    segment.len() == 1 && segment.chars().all(|c| c.is_ascii_alphabetic())
}

/// `C:` -> `C`
fn drive_designator(segment: &str) -> Option<char> {
    let mut chars = segment.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(letter), Some(':'), None) if letter.is_ascii_alphabetic() => Some(letter),
        _ => None,
    }
}
