use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use gha_ci::ci;
use gha_ci::config::{self, GitBackend};
use gha_ci::domain::{BuildUnit, ReleaseLabel, UnitKind, VersionLabel};
use gha_ci::git::{discover_root, CliRepository, Git2Repository, GitQuery, SystemGit};
use gha_ci::github::{GitHubApi, GitHubClient, Repo};
use gha_ci::logging;
use gha_ci::outputs::Outputs;
use gha_ci::ui;
use gha_ci::workspace::Workspace;

#[derive(Parser)]
#[command(
    name = "gha-ci",
    version,
    about = "Change detection, versioning and publishing for a monorepo of GitHub Actions"
)]
struct Cli {
    #[arg(long, global = true, help = "Repository root (default: discovered from the current directory)")]
    root: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    log_json: bool,

    #[arg(short, long, global = true, help = "Verbose logging")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GitHubArgs {
    #[arg(long, env = "GITHUB_REPOSITORY", help = "Repository as owner/name")]
    repository: Repo,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,
}

#[derive(Subcommand)]
enum Command {
    /// Matrices of the actions and workflows changed by a pull request
    Changes {
        #[arg(long)]
        base_sha: String,
        #[arg(long)]
        pull_number: u64,
        #[arg(long, env = "GITHUB_REPOSITORY")]
        repository: Repo,
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, help = "Post a summary comment when set")]
        token: Option<String>,
        #[arg(long = "global-trigger", help = "Override the configured global triggers")]
        global_triggers: Vec<String>,
    },
    /// Matrix of changed directories
    ChangedDirs {
        #[arg(long)]
        base_sha: String,
        #[arg(long)]
        regex: Option<String>,
        #[arg(long, default_value_t = 0)]
        max_depth: usize,
        #[arg(long)]
        ignore_if_all_deletions: bool,
    },
    /// Release decision of a pull request
    ReleaseLabel {
        #[command(flatten)]
        github: GitHubArgs,
        #[arg(long)]
        pull_number: u64,
        #[arg(long, help = "Do not fail when the pull request has no release label")]
        tolerate_missing: bool,
    },
    /// Compute the next version of a unit
    Version {
        #[arg(long)]
        unit: String,
        #[arg(long)]
        release_label: VersionLabel,
        #[arg(long)]
        prerelease: Option<String>,
        #[arg(long)]
        force_prerelease: bool,
    },
    /// Publish a unit to its dev branch, or release it
    Publish {
        #[arg(long)]
        kind: UnitKind,
        #[arg(long)]
        unit: String,
        #[arg(long, help = "Prebuilt contents directory")]
        contents: Option<PathBuf>,
        #[arg(long)]
        release: bool,
        #[arg(long)]
        release_label: Option<String>,
        #[arg(long)]
        pull_number: Option<u64>,
        #[arg(long)]
        prerelease: Option<String>,
    },
    /// Delete the dev branches of a pull request
    Cleanup {
        #[command(flatten)]
        github: GitHubArgs,
        #[arg(long)]
        pull_number: u64,
    },
    /// Dispatch the test workflow of a published unit
    TriggerTests {
        #[command(flatten)]
        github: GitHubArgs,
        #[arg(long)]
        unit: String,
        #[arg(long)]
        pull_number: u64,
        #[arg(long)]
        version_branch: String,
        #[arg(long)]
        head_sha: String,
        #[arg(long)]
        head_ref: String,
        #[arg(long)]
        release: bool,
    },
    /// Report the result of a test run as a commit status
    ReportTest {
        #[command(flatten)]
        github: GitHubArgs,
        #[arg(long, help = "JSON of the needs context")]
        needs: String,
        #[arg(long, help = "JSON payload the test workflow received")]
        payload: String,
        #[arg(long)]
        run_id: u64,
        #[arg(long, env = "GITHUB_SERVER_URL", default_value = "https://github.com")]
        server_url: String,
    },
}

/// Empty means "no label": workflows pass the output of `release-label`
/// through unchanged.
fn parse_optional_label(label: Option<String>) -> Result<Option<ReleaseLabel>> {
    match label.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(label) => Ok(Some(label.parse()?)),
    }
}

fn open_workspace(cli: &Cli) -> Result<Workspace> {
    let root = match &cli.root {
        Some(root) => root.clone(),
        None => {
            let cwd = std::env::current_dir()?;
            discover_root(&cwd).with_context(|| {
                format!("{} is not inside a git repository", cwd.display())
            })?
        }
    };
    let config = config::load_config(cli.config.as_deref(), &root)?;
    Ok(Workspace::new(root, config))
}

fn git_query(ws: &Workspace, runner: &SystemGit) -> Result<Box<dyn GitQuery>> {
    let remote = ws.config().release.remote.clone();
    let query: Box<dyn GitQuery> = match ws.config().git.backend {
        GitBackend::Cli => Box::new(CliRepository::new(runner.clone(), ws.root(), remote)),
        GitBackend::Libgit2 => Box::new(Git2Repository::open(ws.root(), remote)?),
    };
    Ok(query)
}

fn github_client(ws: &Workspace, args: &GitHubArgs) -> Result<GitHubClient> {
    Ok(GitHubClient::new(
        &ws.config().github.api_url,
        args.repository.clone(),
        &args.token,
    )?)
}

fn run(cli: Cli) -> Result<()> {
    let ws = open_workspace(&cli)?;
    let runner = SystemGit::new(ws.config().git.executable.clone());
    let git = git_query(&ws, &runner)?;
    let outputs = Outputs::from_env();

    match cli.command {
        Command::Changes {
            base_sha,
            pull_number,
            repository,
            token,
            global_triggers,
        } => {
            let github = match &token {
                Some(token) => Some(GitHubClient::new(
                    &ws.config().github.api_url,
                    repository.clone(),
                    token,
                )?),
                None => None,
            };
            let args = ci::ChangesArgs {
                base_sha,
                pull_number,
                repository,
                global_triggers,
            };
            ci::changes(
                &ws,
                &runner,
                &*git,
                github.as_ref().map(|g| g as &dyn GitHubApi),
                &args,
                &outputs,
            )?;
        }
        Command::ChangedDirs {
            base_sha,
            regex,
            max_depth,
            ignore_if_all_deletions,
        } => {
            let args = ci::ChangedDirsArgs {
                base_sha,
                regex,
                max_depth,
                ignore_if_all_deletions,
            };
            let dirs = ci::changed_dirs(&*git, &args, &outputs)?;
            ui::display_unit_list("Changed directories", &dirs, "No changed directories");
        }
        Command::ReleaseLabel {
            github,
            pull_number,
            tolerate_missing,
        } => {
            let client = github_client(&ws, &github)?;
            let args = ci::ReleaseLabelArgs {
                pull_number,
                tolerate_missing,
            };
            ci::release_label(&client, &args, &outputs)?;
        }
        Command::Version {
            unit,
            release_label,
            prerelease,
            force_prerelease,
        } => {
            let args = ci::VersionArgs {
                unit,
                release_label,
                prerelease,
                force_prerelease,
            };
            let refs = ci::version(&ws, &runner, &*git, &args, &outputs)?;
            println!("{}", refs.new_tag);
        }
        Command::Publish {
            kind,
            unit,
            contents,
            release,
            release_label,
            pull_number,
            prerelease,
        } => {
            let args = ci::PublishArgs {
                unit: BuildUnit::new(kind, unit)?,
                contents,
                release,
                release_label: parse_optional_label(release_label)?,
                pull_number,
                prerelease,
            };
            ci::publish(&ws, &runner, &*git, &args, &outputs)?;
        }
        Command::Cleanup {
            github,
            pull_number,
        } => {
            let client = github_client(&ws, &github)?;
            let report = ci::cleanup(
                &ws,
                &runner,
                &*git,
                &client,
                &ci::CleanupArgs { pull_number },
            )?;
            if !report.failed.is_empty() {
                ui::display_warning(&format!(
                    "{} dev branch(es) could not be deleted",
                    report.failed.len()
                ));
            }
        }
        Command::TriggerTests {
            github,
            unit,
            pull_number,
            version_branch,
            head_sha,
            head_ref,
            release,
        } => {
            let client = github_client(&ws, &github)?;
            let args = ci::TriggerTestsArgs {
                unit,
                pull_number,
                version_branch,
                head_sha,
                head_ref,
                release,
            };
            ci::trigger_tests(&ws, &client, &args)?;
        }
        Command::ReportTest {
            github,
            needs,
            payload,
            run_id,
            server_url,
        } => {
            let client = github_client(&ws, &github)?;
            let args = ci::ReportTestArgs {
                repository: github.repository.clone(),
                needs,
                payload,
                run_id,
                server_url,
            };
            ci::report_test(&client, &args)?;
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.log_json, logging::level_for(cli.verbose));

    if let Err(e) = run(cli) {
        ui::display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
