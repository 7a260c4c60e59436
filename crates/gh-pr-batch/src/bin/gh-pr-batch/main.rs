mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use gh_client::{ClientManager, PullRequest, Repository};
use gh_pr_batch::{BatchError, BatchOrchestrator, SeededShuffler};
use gh_pr_config::AppConfig;
use log::{debug, error, info, warn};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if BatchError::is_cancellation(&e) => {
            warn!("Cancelled; actions already taken are not rolled back");
            ExitCode::from(130)
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    load_dotenv();

    let config = AppConfig::load();
    let host = cli.host.clone().or_else(|| config.host.clone());
    let delay = cli
        .delay_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.delay());

    let cancel = CancellationToken::new();
    watch_ctrl_c(cancel.clone());

    let orchestrator = BatchOrchestrator::new(Arc::new(ClientManager::new(host)));

    match cli.command {
        Command::List { target, filters } => {
            let query = filters.query();
            let prs = match &target.name {
                Some(name) => {
                    orchestrator
                        .fetcher()
                        .fetch_open(&target.owner, name, &query, &cancel)
                        .await?
                }
                None => {
                    orchestrator
                        .all_for_owner(&target.owner, &query, &cancel)
                        .await?
                }
            };
            print_pull_requests(&prs);
        }

        Command::NonApproved { target, filters } => {
            let query = filters.query();
            let prs = match &target.name {
                Some(name) => {
                    orchestrator
                        .non_approved(&target.owner, name, &query, &cancel)
                        .await?
                }
                None => {
                    orchestrator
                        .non_approved_for_owner(&target.owner, &query, &cancel)
                        .await?
                }
            };
            print_pull_requests(&prs);
        }

        Command::Approve {
            target,
            pr,
            message,
            filters,
        } => {
            let (owner, name) = target.repository()?;
            let message = message.unwrap_or(config.approval_message);

            match pr {
                Some(number) => {
                    let pull_request = orchestrator
                        .fetcher()
                        .fetch_one(owner, name, number, &cancel)
                        .await?;
                    orchestrator
                        .approve(owner, name, &pull_request, &message, &cancel)
                        .await?;
                }
                None => {
                    let approved = orchestrator
                        .approve_all_non_approved(
                            owner,
                            name,
                            &message,
                            &filters.query(),
                            delay,
                            &cancel,
                        )
                        .await?;
                    info!("Approved {} PRs in {}/{}", approved, owner, name);
                }
            }
        }

        Command::Merge {
            target,
            message,
            checks,
            filters,
        } => {
            let (owner, name) = target.repository()?;
            let message = message.unwrap_or(config.merge_message);
            let query = filters.query();

            let merged = if checks.unwrap_or(config.check_passing_checks) {
                orchestrator
                    .merge_all_with_passing_checks(owner, name, &message, &query, delay, &cancel)
                    .await?
            } else {
                orchestrator
                    .merge_all(owner, name, &message, &query, delay, &cancel)
                    .await?
            };
            info!("Merged {} PRs in {}/{}", merged, owner, name);
        }

        Command::MergeOwner {
            owner,
            message,
            checks,
            seed,
            filters,
        } => {
            let message = message.unwrap_or(config.merge_message);
            let orchestrator = match seed {
                Some(seed) => {
                    debug!("Using repository order seed {}", seed);
                    orchestrator.with_shuffler(Arc::new(SeededShuffler::new(seed)))
                }
                None => orchestrator,
            };

            orchestrator
                .merge_for_owner_incrementally(
                    &owner,
                    &message,
                    checks.unwrap_or(config.check_passing_checks),
                    &filters.query(),
                    delay,
                    &cancel,
                )
                .await?;
        }

        Command::ReposOpen { owner, window } => {
            let repositories = orchestrator
                .filter()
                .owner_repositories_with_open_pull_requests(&owner, &window.window(), &cancel)
                .await?;
            print_repositories(&repositories);
        }

        Command::ReposFailed { owner, window } => {
            let repositories = orchestrator
                .filter()
                .owner_repositories_with_failed_builds(&owner, &window.window(), &cancel)
                .await?;
            print_repositories(&repositories);
        }

        Command::HasFailed { target, window } => {
            let (owner, name) = target.repository()?;
            let failed = orchestrator
                .filter()
                .has_failed_run_on_open_pull_requests(owner, name, &window.window(), &cancel)
                .await?;
            println!("{}", failed);
        }
    }

    Ok(())
}

/// Load `.env` when no token is exported yet
fn load_dotenv() {
    if std::env::var("GITHUB_TOKEN").is_ok() {
        return;
    }
    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded .env file from: {:?}", path),
        Err(_) => debug!(".env file not found, will rely on environment variables"),
    }
}

fn watch_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });
}

fn print_pull_requests(prs: &[PullRequest]) {
    for pr in prs {
        println!(
            "#{}\t{}\t{}\t{}\t{}",
            pr.number,
            pr.author,
            pr.created_at.format("%Y-%m-%d"),
            pr.title,
            pr.html_url
        );
    }
}

fn print_repositories(repositories: &[Repository]) {
    for repository in repositories {
        println!("{}", repository.full_name);
    }
}
