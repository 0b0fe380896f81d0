//! CLI context: working directory, platform, environment and output.

use anyhow::{Context, Result};
use log::debug;
use std::io::Write;

use crate::path::Path;
use crate::runtime::Runtime;

#[cfg_attr(test, mockall::automock)]
pub trait CliCtx {
    /// The project directory this invocation works on.
    fn get_dir(&self) -> Path;

    /// Make the project directory the working directory of the process.
    fn set_dir(&self) -> Result<()>;

    /// True when the invocation has nothing left to link.
    fn is_done(&self) -> bool;

    fn is_debug(&self) -> bool;

    fn is_windows(&self) -> bool;

    fn env_var(&self, name: &str) -> Option<String>;

    /// Write a full line for the user.
    fn out(&self, message: &str);

    /// Write without a trailing newline.
    fn print(&self, message: &str);
}

/// The context of a real process invocation.
pub struct ProcessCliCtx<'a, R: Runtime> {
    runtime: &'a R,
    invocation_dir: Path,
    dir: Path,
    debug: bool,
    done: bool,
    windows: bool,
}

impl<'a, R: Runtime> ProcessCliCtx<'a, R> {
    /// Build the context from parsed flags.
    ///
    /// `dir` defaults to the current directory; a relative `dir` is taken
    /// from the current directory as well.
    pub fn new(
        runtime: &'a R,
        dir: Option<&std::path::Path>,
        debug: bool,
        done: bool,
    ) -> Result<Self> {
        Self::with_platform(runtime, dir, debug, done, cfg!(windows))
    }

    pub(crate) fn with_platform(
        runtime: &'a R,
        dir: Option<&std::path::Path>,
        debug: bool,
        done: bool,
        windows: bool,
    ) -> Result<Self> {
        let cwd = runtime.current_dir()?;
        let invocation_dir = Path::parse(&cwd.to_string_lossy(), windows)
            .with_context(|| format!("Unsupported working directory {:?}", cwd))?;

        let mut ctx = Self {
            runtime,
            dir: invocation_dir.clone(),
            invocation_dir,
            debug,
            done,
            windows,
        };
        if let Some(dir) = dir {
            ctx.dir = ctx.resolve(dir)?;
        }
        debug!("Project directory is {}", ctx.dir);
        Ok(ctx)
    }

    /// Resolve a user-supplied path against the directory slink was started in.
    pub fn resolve(&self, path: &std::path::Path) -> Result<Path> {
        let text = path.to_string_lossy();
        let parsed = Path::parse(&text, self.windows)
            .with_context(|| format!("Invalid path {:?}", text))?;
        self.invocation_dir
            .join(&parsed)
            .with_context(|| format!("Invalid path {:?}", text))
    }
}

impl<R: Runtime> CliCtx for ProcessCliCtx<'_, R> {
    fn get_dir(&self) -> Path {
        self.dir.clone()
    }

    fn set_dir(&self) -> Result<()> {
        self.runtime.set_current_dir(&self.dir.to_path_buf())
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn is_debug(&self) -> bool {
        self.debug
    }

    fn is_windows(&self) -> bool {
        self.windows
    }

    fn env_var(&self, name: &str) -> Option<String> {
        self.runtime.env_var(name).ok()
    }

    fn out(&self, message: &str) {
        println!("{}", message);
    }

    fn print(&self, message: &str) {
        print!("{}", message);
        let _ = std::io::stdout().flush();
    }
}
