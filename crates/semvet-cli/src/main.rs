//! Command semvet compares two versions of the same module and tells
//! whether a Major, Minor, or Patchlevel version bump (or None) is needed
//! to go from one to the other.
//!
//! ```text
//! semvet dirs OLDER NEWER [-q | --pretty] [--v1 V --v2 V]
//! semvet git URL_OLDER REV_OLDER URL_NEWER REV_NEWER [--versions] [--gitcmd CMD]
//! semvet pr URL [--token TOKEN]
//! ```
//!
//! Without --v1/--v2 the output is the minimum required change; in quiet
//! mode the exit status carries it (0..3 for None..Major, 4 for errors).
//! With --v1 and --v2 the output becomes OK or ERR depending on whether
//! the version-number change is adequate, with exit status 0 or 1.

mod github;
mod options;
mod output;

use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;

use semvet_common::Report;
use semvet_git::{Fetcher, compare_git, nearest_tag};
use semvet_loader::GoLoader;
use semvet_solver::compare_dirs;

use crate::options::{Cli, CommandKind};
use crate::output::{EXIT_ERROR, Presentation, show_result};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => match cli.validate() {
            Ok(cli) => cli,
            Err(e) => {
                eprintln!("Error parsing args: {e:#}");
                return ExitCode::from(EXIT_ERROR as u8);
            }
        },
        Err(e)
            if matches!(
                e.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("Error parsing args: {e}");
            return ExitCode::from(EXIT_ERROR as u8);
        }
    };

    let quiet = cli.quiet;
    let plain_mode = cli.v1.is_none();
    let mut opts = Presentation {
        quiet: cli.quiet,
        pretty: cli.pretty,
        v1: cli.v1.clone(),
        v2: cli.v2.clone(),
    };

    match run(cli, &mut opts) {
        Ok(report) => {
            let code = show_result(&mut std::io::stdout().lock(), &report, &opts);
            ExitCode::from(code as u8)
        }
        Err(e) => {
            eprintln!("Error in comparing: {e:#}");
            if quiet && plain_mode {
                ExitCode::from(EXIT_ERROR as u8)
            } else {
                ExitCode::from(1)
            }
        }
    }
}

fn run(cli: Cli, opts: &mut Presentation) -> Result<Report> {
    let loader = GoLoader::new();
    match cli.command {
        CommandKind::Dirs { older, newer } => Ok(compare_dirs(&loader, &older, &newer)?),

        CommandKind::Git {
            url_older,
            rev_older,
            url_newer,
            rev_newer,
            versions,
            gitcmd,
        } => {
            let fetcher = Fetcher::with_git_command(gitcmd);
            if !versions {
                return Ok(compare_git(
                    &fetcher, &loader, &url_older, &rev_older, &url_newer, &rev_newer,
                )?);
            }
            // Derive the version pair from the staged clones before
            // comparing their contents.
            let staged = fetcher.stage(&url_older, &rev_older, &url_newer, &rev_newer)?;
            let v1 = nearest_tag(staged.older(), "HEAD")?
                .with_context(|| format!("no semver tag reachable from {rev_older}"))?;
            let v2 = nearest_tag(staged.newer(), "HEAD")?
                .with_context(|| format!("no semver tag reachable from {rev_newer}"))?;
            opts.v1 = Some(v1);
            opts.v2 = Some(v2);
            Ok(compare_dirs(&loader, staged.older(), staged.newer())?)
        }

        CommandKind::Pr { url, token } => {
            let Some(token) = token else {
                bail!("a token is required for pr (use --token or GITHUB_TOKEN)");
            };
            let client = github::GitHubClient::new(token);
            let fetcher = Fetcher::new();
            github::report_on_pr(&client, &url, |clone_url, base, head| {
                Ok(compare_git(
                    &fetcher, &loader, clone_url, base, clone_url, head,
                )?)
            })
        }
    }
}
