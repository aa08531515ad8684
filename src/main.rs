use bitbucket_pr::bitbucket::pulls::DEFAULT_MAX_PAGES;
use bitbucket_pr::bitbucket::{
    json_pp, AccessToken, BitbucketClient, PullRequestQuery, PullRequestResult,
    PullRequestSummary, QueryParams,
};
use bitbucket_pr::config::Config;
use bitbucket_pr::report::{self, DiffReport, PullRequestListing, Report};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

/// Fetch pull requests and diffs from Bitbucket Cloud.
///
/// Credentials come from `.bitbucket-pr.toml` or the BITBUCKET_CLIENT_ID and
/// BITBUCKET_SECRET environment variables.
#[derive(Parser, Debug)]
#[command(name = "bitbucket-pr", version, about)]
struct Cli {
    /// Log raw API responses
    #[arg(long, global = true)]
    debug: bool,

    /// Write a markdown report to this file instead of the terminal
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List pull requests of a repository
    List {
        /// Workspace or project owning the repository
        project: String,
        repo: String,

        /// Follow `next` links instead of stopping after the first page
        #[arg(long)]
        all: bool,

        /// Maximum number of page requests when --all is set
        #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
        max_pages: usize,

        /// Extra query parameter, e.g. -q state=MERGED (repeatable)
        #[arg(short = 'q', long = "query", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Show a single pull request as JSON
    Show {
        project: String,
        repo: String,
        pr: String,
    },
    /// Show the diff of a pull request
    Diff {
        project: String,
        repo: String,
        pr: String,

        /// Only list the changed files
        #[arg(long)]
        files_only: bool,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got `{raw}`"))
}

/// Filter used when RUST_LOG is unset. `--debug` raises only this crate's
/// level so HTTP stack internals stay quiet.
fn default_filter(debug: bool) -> &'static str {
    if debug {
        "info,bitbucket_pr=debug"
    } else {
        "info"
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter(cli.debug))),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!("loading configuration");
    let config = Config::load()?;
    let credentials = config.credentials()?;

    let client = BitbucketClient::new();
    let token = client.request_access_token(&credentials, cli.debug)?;
    debug!("obtained access token");

    let built_report = run(&client, &token, cli.command, cli.debug)?;
    report::output(&built_report, cli.output.as_deref())?;

    Ok(())
}

fn run(
    client: &BitbucketClient,
    token: &AccessToken,
    command: Command,
    debug: bool,
) -> Result<Report, Box<dyn std::error::Error>> {
    match command {
        Command::List {
            project,
            repo,
            all,
            max_pages,
            params,
        } => {
            let _span = info_span!("list", project = %project, repo = %repo).entered();
            let mut query = PullRequestQuery::list(&project, &repo)
                .with_params(params.into_iter().collect::<QueryParams>())
                .with_debug(debug);
            if all {
                query = query.with_next_pages(max_pages);
            }

            let page = client.get_pull_requests(&query, token)?;
            let pull_requests = page
                .result
                .into_values()
                .iter()
                .map(PullRequestSummary::from_value)
                .collect();
            Ok(Report::PullRequests(PullRequestListing {
                project,
                repo,
                request_count: page.request_count,
                pull_requests,
            }))
        }
        Command::Show { project, repo, pr } => {
            let query = PullRequestQuery::single(&project, &repo, &pr).with_debug(debug);
            let page = client.get_pull_requests(&query, token)?;
            let json = match page.result {
                PullRequestResult::Single(value) => json_pp(&value)?,
                PullRequestResult::List(values) => json_pp(&values)?,
            };
            Ok(Report::Detail { pr_number: pr, json })
        }
        Command::Diff {
            project,
            repo,
            pr,
            files_only,
        } => {
            let diff = client.get_diff(&project, &repo, token, &pr)?;
            info!(files = diff.files.len(), "fetched diff");
            Ok(Report::Diff(DiffReport {
                pr_number: pr,
                files: diff.files,
                diff: (!files_only).then_some(diff.text),
            }))
        }
    }
}
