use anyhow::{Result, bail};
use log::debug;

use crate::cli::{CliCtx, ProcessCliCtx};
use crate::comparator::PackageJsonComparator;
use crate::fs_context::{FsContext, RuntimeFsContext};
use crate::manifest::{Manifest, PACKAGE_JSON};
use crate::path::Path;
use crate::runner::SLinkRunner;
use crate::runtime::Runtime;

use super::config::Config;

/// Link the project in `config.dir` and, when asked, check its dependencies
/// against a shared manifest.
#[tracing::instrument(skip(runtime))]
pub fn link<R: Runtime>(runtime: &R, config: &Config) -> Result<()> {
    let ctx = ProcessCliCtx::new(runtime, config.dir.as_deref(), config.debug, config.no_link)?;
    let fs = RuntimeFsContext::new(runtime);

    // Resolved before the link pass moves the working directory
    let shared = config
        .check_deps
        .as_deref()
        .map(|path| ctx.resolve(path))
        .transpose()?;

    run(&ctx, &fs, shared.as_ref())
}

pub(crate) fn run<C: CliCtx, F: FsContext>(ctx: &C, fs: &F, shared: Option<&Path>) -> Result<()> {
    let summary = SLinkRunner::new(ctx, fs).run()?;
    for entry in &summary.linked {
        ctx.out(&format!("Linked {}", entry));
    }
    if ctx.is_debug() {
        ctx.print(&format!("{}: ", ctx.get_dir()));
        ctx.out(&format!(
            "{} linked, {} not found",
            summary.linked.len(),
            summary.not_found.len()
        ));
    }

    let Some(shared) = shared else {
        return Ok(());
    };

    let manifest_path = ctx.get_dir().child(PACKAGE_JSON)?;
    debug!("Checking {} against {}", manifest_path, shared);
    let manifest = Manifest::from_value(fs.read_json(&manifest_path)?, &manifest_path)?;
    if PackageJsonComparator::new(ctx, fs).compare(&manifest, &manifest_path, shared)? {
        bail!(
            "Dependencies of {} are out of sync with {}",
            manifest_path,
            shared
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::MockCliCtx;
    use crate::comparator::MISSING_HEADER;
    use crate::fs_context::MockFsContext;
    use crate::test_utils::{configure_mock_ctx_basics, posix, test_root};
    use mockall::predicate::eq;
    use serde_json::json;

    fn manifest_path() -> Path {
        test_root().child(PACKAGE_JSON).unwrap()
    }

    #[test]
    fn test_run_prints_linked_entries() {
        // --- Setup ---
        let mut fs = MockFsContext::new();
        fs.expect_exists_abs().returning(|_| true);
        fs.expect_exists().returning(|_, _| false);
        fs.expect_read_json()
            .with(eq(manifest_path()))
            .returning(|_| Ok(json!({"sharedNodeModuleProjectSLinks": ["deps"]})));
        fs.expect_slink().times(1).returning(|_, _, _| Ok(()));

        let mut ctx = MockCliCtx::new();
        configure_mock_ctx_basics(&mut ctx);
        ctx.expect_is_debug().return_const(false);
        ctx.expect_out()
            .with(eq(
                "Linked /ws/apps/proj/node_modules -> /ws/apps/proj/deps/node_modules",
            ))
            .times(1)
            .return_const(());

        // --- Execute ---
        run(&ctx, &fs, None).unwrap();
    }

    #[test]
    fn test_run_debug_prints_counts() {
        let mut fs = MockFsContext::new();
        fs.expect_exists_abs().returning(|_| true);
        fs.expect_read_json().returning(|_| Ok(json!({})));

        let mut ctx = MockCliCtx::new();
        configure_mock_ctx_basics(&mut ctx);
        ctx.expect_is_debug().return_const(true);
        ctx.expect_print()
            .with(eq("/ws/apps/proj: "))
            .times(1)
            .return_const(());
        ctx.expect_out()
            .with(eq("0 linked, 0 not found"))
            .times(1)
            .return_const(());

        run(&ctx, &fs, None).unwrap();
    }

    #[test]
    fn test_run_check_deps_without_link() {
        // --- Setup ---
        let shared = posix("/ws/shared/package.json");
        let mut fs = MockFsContext::new();
        fs.expect_read_json()
            .with(eq(manifest_path()))
            .returning(|_| Ok(json!({"dependencies": {"a": "1.0.0"}})));
        fs.expect_read_json()
            .with(eq(shared.clone()))
            .returning(|_| Ok(json!({"dependencies": {"a": "1.0.0"}})));
        fs.expect_slink().never();

        let mut ctx = MockCliCtx::new();
        ctx.expect_is_done().return_const(true);
        ctx.expect_is_debug().return_const(false);
        ctx.expect_get_dir().returning(test_root);
        ctx.expect_set_dir().never();
        ctx.expect_out().never();

        // --- Execute & Verify ---
        run(&ctx, &fs, Some(&shared)).unwrap();
    }

    #[test]
    fn test_run_check_deps_drift_fails() {
        let shared = posix("/ws/shared/package.json");
        let mut fs = MockFsContext::new();
        fs.expect_read_json()
            .with(eq(manifest_path()))
            .returning(|_| Ok(json!({"dependencies": {"a": "1.0.0"}})));
        fs.expect_read_json()
            .with(eq(shared.clone()))
            .returning(|_| Ok(json!({})));

        let mut ctx = MockCliCtx::new();
        ctx.expect_is_done().return_const(true);
        ctx.expect_is_debug().return_const(false);
        ctx.expect_get_dir().returning(test_root);
        ctx.expect_out()
            .withf(|m| m.starts_with(MISSING_HEADER))
            .times(1)
            .return_const(());

        let err = run(&ctx, &fs, Some(&shared)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Dependencies of /ws/apps/proj/package.json are out of sync with /ws/shared/package.json"
        );
    }

    #[test]
    fn test_run_stops_before_check_when_link_fails() {
        let shared = posix("/ws/shared/package.json");
        let mut fs = MockFsContext::new();
        fs.expect_exists_abs().returning(|_| false);
        fs.expect_read_json().never();

        let mut ctx = MockCliCtx::new();
        configure_mock_ctx_basics(&mut ctx);

        assert!(run(&ctx, &fs, Some(&shared)).is_err());
    }
}
