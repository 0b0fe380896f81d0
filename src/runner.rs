//! The link pass for one project directory.
//!
//! [`SLinkRunner::run`] validates the project root, reads its manifest and
//! executes every declared link phase in [`Manifest::link_plan`] order:
//!
//! - `sharedNodeModuleProjectSLinkEnvVar` - `node_modules` from the first
//!   environment variable that is set
//! - `sharedNodeModuleProjectSLinks` - `node_modules` from the first sibling
//!   project found by ancestor search
//! - `dependencySrcSLinks` - `<project>@slink` pointing at a sibling's `src`
//! - `dependencySLinkGroups` - `node_modules/<group>/<module>` pointing at a
//!   sibling's module path
//!
//! A sibling that cannot be found is reported and skipped. Anything else
//! that goes wrong aborts the run; links created earlier in the same run
//! are left in place.

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};

use crate::cli::CliCtx;
use crate::fs_context::FsContext;
use crate::manifest::{LinkDeclaration, Manifest, NODE_MODULES, PACKAGE_JSON, SLinkGroup, SrcSLink};
use crate::path::{Path, relative_to};

/// Levels searched for a sibling project: the project root, its parent and
/// its grandparent.
pub const ANCESTOR_SEARCH_DEPTH: usize = 3;

/// Directory of a sibling project linked by `dependencySrcSLinks`.
pub const SRC_DIR: &str = "src";

/// Suffix of the link created for each `dependencySrcSLinks` entry.
pub const SRC_LINK_SUFFIX: &str = "@slink";

/// Links followed when resolving a linked `node_modules`.
const MAX_LINK_HOPS: usize = 16;

/// What a run changed or could not resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Links in place after the run, as `link -> target`
    pub linked: Vec<String>,
    /// Declared names no candidate matched
    pub not_found: Vec<String>,
}

/// Per-run state derived once the root is validated.
struct LinkPass {
    root: Path,
    windows: bool,
}

impl LinkPass {
    fn relative(&self, segments: &[&str]) -> Result<Path> {
        Ok(Path::new(segments.iter().copied(), true, self.windows)?)
    }
}

pub struct SLinkRunner<'a, C: CliCtx, F: FsContext> {
    ctx: &'a C,
    fs: &'a F,
}

impl<'a, C: CliCtx, F: FsContext> SLinkRunner<'a, C, F> {
    pub fn new(ctx: &'a C, fs: &'a F) -> Self {
        Self { ctx, fs }
    }

    pub fn run(&self) -> Result<RunSummary> {
        if self.ctx.is_done() {
            debug!("Nothing to link");
            return Ok(RunSummary::default());
        }

        let windows = self.ctx.is_windows();
        let root = self.ctx.get_dir();
        if !self.fs.exists_abs(&root) {
            bail!("Project directory {} does not exist", root);
        }
        let manifest_path = root.child(PACKAGE_JSON)?;
        if !self.fs.exists_abs(&manifest_path) {
            bail!("No {} found at {}", PACKAGE_JSON, manifest_path);
        }
        self.ctx.set_dir()?;

        let manifest = Manifest::from_value(self.fs.read_json(&manifest_path)?, &manifest_path)?;
        let pass = LinkPass { root, windows };
        let mut summary = RunSummary::default();

        for declaration in manifest.link_plan() {
            match declaration {
                LinkDeclaration::EnvVar(vars) => {
                    self.link_env_var_node_modules(&pass, &vars, &mut summary)?
                }
                LinkDeclaration::Project(names) => {
                    self.link_project_node_modules(&pass, &names, &mut summary)?
                }
                LinkDeclaration::Src(links) => self.link_src_dirs(&pass, &links, &mut summary)?,
                LinkDeclaration::Group(group) => self.link_group(&pass, &group, &mut summary)?,
            }
        }

        info!(
            "Linked {} entries in {}, {} not found",
            summary.linked.len(),
            pass.root,
            summary.not_found.len()
        );
        Ok(summary)
    }

    fn link_env_var_node_modules(
        &self,
        pass: &LinkPass,
        vars: &[String],
        summary: &mut RunSummary,
    ) -> Result<()> {
        for var in vars {
            let Some(value) = self.ctx.env_var(var).filter(|v| !v.trim().is_empty()) else {
                debug!("Environment variable {} is not set", var);
                continue;
            };

            let shared = Path::parse(value.trim(), pass.windows)
                .with_context(|| format!("Environment variable {} holds an invalid path", var))?;
            if shared.is_relative() {
                bail!(
                    "Environment variable {} must hold an absolute path, got {:?}",
                    var,
                    value
                );
            }
            let target = if shared.file_name() == Some(NODE_MODULES) {
                shared
            } else {
                shared.child(NODE_MODULES)?
            };
            if !self.fs.exists_abs(&target) {
                bail!("Missing {} (from environment variable {})", target, var);
            }

            self.replace_link(pass, NODE_MODULES, &target, &pass.root)?;
            summary
                .linked
                .push(format!("{} -> {}", pass.root.child(NODE_MODULES)?, target));
            return Ok(());
        }

        debug!("None of {:?} is set, keeping node_modules", vars);
        Ok(())
    }

    fn link_project_node_modules(
        &self,
        pass: &LinkPass,
        names: &[String],
        summary: &mut RunSummary,
    ) -> Result<()> {
        for name in names {
            if let Some(sibling) = self.find_sibling(pass, name, true)? {
                let target = sibling.child(NODE_MODULES)?;
                self.replace_link(pass, NODE_MODULES, &target, &pass.root)?;
                summary
                    .linked
                    .push(format!("{} -> {}", pass.root.child(NODE_MODULES)?, target));
                return Ok(());
            }
        }

        for name in names {
            self.report_not_found(name, summary);
        }
        Ok(())
    }

    fn link_src_dirs(
        &self,
        pass: &LinkPass,
        links: &[SrcSLink],
        summary: &mut RunSummary,
    ) -> Result<()> {
        for link in links {
            let Some(sibling) = self.find_sibling(pass, &link.project, false)? else {
                self.report_not_found(&link.project, summary);
                continue;
            };

            let project_name = sibling
                .file_name()
                .with_context(|| format!("Invalid project name {:?}", link.project))?;
            let link_name = format!("{}{}", project_name, SRC_LINK_SUFFIX);
            let source = sibling.child(SRC_DIR)?;
            if !self.fs.exists_abs(&source) {
                warn!("{} does not exist yet, linking anyway", source);
            }

            let target = relative_to(&pass.root, &source)?;
            self.replace_link(pass, &link_name, &target, &pass.root)?;
            summary
                .linked
                .push(format!("{} -> {}", pass.root.child(&link_name)?, target));
        }
        Ok(())
    }

    fn link_group(
        &self,
        pass: &LinkPass,
        group: &SLinkGroup,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let mut links = Vec::new();
        for entry in &group.projects {
            let Some(sibling) = self.find_sibling(pass, &entry.project, false)? else {
                self.report_not_found(&entry.project, summary);
                continue;
            };

            let module = Path::parse(&entry.module_path, pass.windows)
                .with_context(|| format!("Invalid modulePath {:?}", entry.module_path))?;
            if !module.is_relative() {
                bail!(
                    "modulePath {:?} of {} must be relative",
                    entry.module_path,
                    entry.project
                );
            }
            let link_name = module
                .file_name()
                .with_context(|| format!("Empty modulePath for {}", entry.project))?
                .to_string();

            let source = sibling.join(&module)?;
            if !self.fs.exists_abs(&source) {
                warn!("{} does not exist yet, linking anyway", source);
            }
            links.push((link_name, source));
        }

        if links.is_empty() {
            debug!("Nothing to link for group {}", group.group);
            return Ok(());
        }

        // Relative targets resolve from the physical directory
        let node_modules = self.resolve_node_modules(pass)?;
        let group_rel = pass.relative(&[group.group.as_str()])?;
        let group_dir = if self.fs.exists(&group_rel, &node_modules) {
            node_modules.join(&group_rel)?
        } else {
            debug!("Creating {} in {}", group_rel, node_modules);
            self.fs.mkdir_tree(&group_rel, &node_modules)?
        };

        for (link_name, source) in links {
            let target = relative_to(&group_dir, &source)?;
            self.replace_link(pass, &link_name, &target, &group_dir)?;
            summary
                .linked
                .push(format!("{} -> {}", group_dir.child(&link_name)?, target));
        }
        Ok(())
    }

    /// The directory `<root>/node_modules` stands for, following links that
    /// an earlier phase (or the user) put in its place.
    fn resolve_node_modules(&self, pass: &LinkPass) -> Result<Path> {
        let node_modules = pass.root.child(NODE_MODULES)?;
        let mut dir = node_modules.clone();
        for _ in 0..MAX_LINK_HOPS {
            if !self.fs.is_symlink(&dir) {
                if dir != node_modules {
                    debug!("{} resolves to {}", node_modules, dir);
                }
                return Ok(dir);
            }
            let target = self.fs.get_symlink_target(&dir)?;
            let link_dir = dir
                .parent()
                .with_context(|| format!("{} has no parent directory", dir))?;
            dir = link_dir
                .join(&target)
                .with_context(|| format!("{} points outside the root: {}", dir, target))?;
        }
        bail!("Too many levels of links behind {}", node_modules);
    }

    /// Find `name` under the project root, its parent or its grandparent.
    ///
    /// A candidate must contain a `package.json`, and a `node_modules` as
    /// well when `require_node_modules` is set.
    fn find_sibling(
        &self,
        pass: &LinkPass,
        name: &str,
        require_node_modules: bool,
    ) -> Result<Option<Path>> {
        let relative = Path::parse(name, pass.windows)
            .with_context(|| format!("Invalid project name {:?}", name))?;
        if !relative.is_relative() || relative.segments().is_empty() {
            bail!("Invalid project name {:?}", name);
        }

        let search_dirs =
            std::iter::successors(Some(pass.root.clone()), Path::parent).take(ANCESTOR_SEARCH_DEPTH);
        for dir in search_dirs {
            let candidate = match dir.join(&relative) {
                Ok(candidate) => candidate,
                Err(e) => {
                    debug!("Skipping {} in {}: {}", name, dir, e);
                    continue;
                }
            };
            if !self.fs.exists_abs(&candidate) {
                continue;
            }
            if !self.fs.exists_abs(&candidate.child(PACKAGE_JSON)?) {
                debug!("{} has no {}", candidate, PACKAGE_JSON);
                continue;
            }
            if require_node_modules && !self.fs.exists_abs(&candidate.child(NODE_MODULES)?) {
                debug!("{} has no {}", candidate, NODE_MODULES);
                continue;
            }
            debug!("Found {} at {}", name, candidate);
            return Ok(Some(candidate));
        }
        Ok(None)
    }

    /// Point `name` inside `in_dir` at `target`, replacing whatever is there.
    /// A symlink that already points at `target` is left untouched.
    fn replace_link(&self, pass: &LinkPass, name: &str, target: &Path, in_dir: &Path) -> Result<()> {
        let entry = pass.relative(&[name])?;
        if self.fs.exists(&entry, in_dir) {
            let existing = in_dir.child(name)?;
            if self.fs.is_symlink(&existing) && self.fs.get_symlink_target(&existing)? == *target {
                debug!("{} already points to {}", existing, target);
                return Ok(());
            }
            self.fs.rm(&entry, in_dir)?;
        }
        self.fs.slink(name, target, in_dir)
    }

    fn report_not_found(&self, name: &str, summary: &mut RunSummary) {
        self.ctx.out(&format!("{} not found", name));
        summary.not_found.push(name.to_string());
    }
}
