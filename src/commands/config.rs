use std::path::PathBuf;

/// Settings of one invocation, as parsed from flags and environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Project directory; the current directory when absent
    pub dir: Option<PathBuf>,
    pub debug: bool,
    /// Skip the link pass and only run the requested checks
    pub no_link: bool,
    /// Shared `package.json` to compare the project's dependencies with
    pub check_deps: Option<PathBuf>,
}

impl Config {
    pub fn new(dir: Option<PathBuf>, debug: bool, no_link: bool, check_deps: Option<PathBuf>) -> Self {
        Self {
            dir,
            debug,
            no_link,
            check_deps,
        }
    }
}
