//! Dependency drift between a project manifest and a shared manifest.

use anyhow::Result;
use log::debug;

use crate::cli::CliCtx;
use crate::fs_context::FsContext;
use crate::manifest::Manifest;
use crate::path::Path;

pub const MISSING_HEADER: &str =
    "The following dependencies are missing from the shared package.json at";
pub const MISMATCH_HEADER: &str =
    "The following dependency versions differ between the shared package.json and the project package.json at";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMismatch {
    pub name: String,
    pub local: String,
    pub shared: String,
}

/// Entries of the project manifest that the shared manifest lacks or pins
/// to another version. Entries only the shared manifest has are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDiff {
    /// `(name, version)` pairs missing from the shared manifest
    pub missing: Vec<(String, String)>,
    pub mismatched: Vec<VersionMismatch>,
}

impl ManifestDiff {
    pub fn between(project: &Manifest, shared: &Manifest) -> Self {
        let shared_deps = shared.all_dependencies();
        let mut diff = Self::default();
        for (name, version) in project.all_dependencies() {
            match shared_deps.get(name) {
                None => diff.missing.push((name.to_string(), version.to_string())),
                Some(shared_version) if *shared_version != version => {
                    diff.mismatched.push(VersionMismatch {
                        name: name.to_string(),
                        local: version.to_string(),
                        shared: shared_version.to_string(),
                    })
                }
                Some(_) => {}
            }
        }
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty()
    }

    pub fn missing_report(&self, shared_path: &Path) -> Option<String> {
        if self.missing.is_empty() {
            return None;
        }
        let entries: Vec<String> = self
            .missing
            .iter()
            .map(|(name, version)| format!("{} {}", name, version))
            .collect();
        Some(format!(
            "{}\t{}\t{}",
            MISSING_HEADER,
            shared_path,
            entries.join("\t")
        ))
    }

    pub fn mismatch_report(&self, shared_path: &Path, project_path: &Path) -> Option<String> {
        if self.mismatched.is_empty() {
            return None;
        }
        let entries: Vec<String> = self
            .mismatched
            .iter()
            .map(|m| format!("{} {} vs shared {}", m.name, m.local, m.shared))
            .collect();
        Some(format!(
            "{}\t{}\t{}\t{}",
            MISMATCH_HEADER,
            shared_path,
            project_path,
            entries.join("\t")
        ))
    }
}

pub struct PackageJsonComparator<'a, C: CliCtx, F: FsContext> {
    ctx: &'a C,
    fs: &'a F,
}

impl<'a, C: CliCtx, F: FsContext> PackageJsonComparator<'a, C, F> {
    pub fn new(ctx: &'a C, fs: &'a F) -> Self {
        Self { ctx, fs }
    }

    /// Compare `project` (read from `project_path`) with the manifest at
    /// `shared_path`, reporting through the CLI context.
    ///
    /// Returns true when anything is missing or mismatched. The missing
    /// report is always written before the mismatch report.
    pub fn compare(
        &self,
        project: &Manifest,
        project_path: &Path,
        shared_path: &Path,
    ) -> Result<bool> {
        let shared = Manifest::from_value(self.fs.read_json(shared_path)?, shared_path)?;
        let diff = ManifestDiff::between(project, &shared);
        debug!(
            "{} missing and {} mismatched dependencies against {}",
            diff.missing.len(),
            diff.mismatched.len(),
            shared_path
        );

        if let Some(report) = diff.missing_report(shared_path) {
            self.ctx.out(&report);
        }
        if let Some(report) = diff.mismatch_report(shared_path, project_path) {
            self.ctx.out(&report);
        }
        Ok(!diff.is_empty())
    }
}
