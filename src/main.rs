use anyhow::Result;
use clap::Parser;
use slink::commands::{Config, link};
use std::path::PathBuf;

/// slink - source links for monorepo projects
///
/// Reads the package.json of a project and links shared node_modules
/// directories and sibling sources into it, as declared by the
/// sharedNodeModuleProjectSLinkEnvVar, sharedNodeModuleProjectSLinks,
/// dependencySrcSLinks and dependencySLinkGroups keys.
///
/// Examples:
///   slink                                   # Link the project in the current directory
///   slink --dir apps/web                    # Link another project
///   slink --no-link --check-deps ../shared/package.json
#[derive(Parser, Debug)]
#[command(author, version = env!("SLINK_VERSION"), about)]
struct Cli {
    /// Project directory (defaults to the current directory; also via SLINK_DIR)
    #[arg(long = "dir", short = 'd', env = "SLINK_DIR", value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Verbose logging and a summary line
    #[arg(long)]
    pub debug: bool,

    /// Compare dependencies with a shared package.json; exits non-zero on drift
    #[arg(long = "check-deps", value_name = "SHARED_PACKAGE_JSON")]
    pub check_deps: Option<PathBuf>,

    /// Skip creating links
    #[arg(long = "no-link")]
    pub no_link: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let runtime = slink::runtime::RealRuntime;
    let config = Config::new(cli.dir, cli.debug, cli.no_link, cli.check_deps);
    link(&runtime, &config)
}
