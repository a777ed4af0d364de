use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "license-cache",
    about = "Cache dependency license data and check it against policy",
    version
)]
pub struct Cli {
    /// Config file [default: ./.license-cache/config.toml, fallback ~/.config/license-cache/config.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long, global = true, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only print errors and the summary line
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check cached records against the project's current dependencies
    Status(ProjectArgs),

    /// Write or refresh cached records
    Cache {
        #[command(flatten)]
        project: ProjectArgs,

        /// Rewrite records even when the cached version is current
        #[arg(long)]
        force: bool,

        /// Fetch unidentified licenses from package registries
        #[arg(long)]
        online: bool,
    },

    /// List the dependencies every enabled source reports
    List(ProjectArgs),
}

#[derive(Args, Debug)]
pub struct ProjectArgs {
    /// Project path
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

impl Command {
    pub fn path(&self) -> &Path {
        match self {
            Command::Status(args) | Command::List(args) => &args.path,
            Command::Cache { project, .. } => &project.path,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cache_flags() {
        let cli = Cli::parse_from(["license-cache", "-v", "cache", "--force", "app"]);
        assert_eq!(cli.verbose, 1);
        match &cli.command {
            Command::Cache { force, online, .. } => assert!(*force && !*online),
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.command.path(), Path::new("app"));
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["license-cache", "status"]);
        assert!(matches!(cli.report, ReportFormat::Terminal));
        assert_eq!(cli.command.path(), Path::new("."));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["license-cache", "-v", "-q", "list"]).is_err());
    }
}
