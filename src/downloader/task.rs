//! Per-run execution
//!
//! One download run per spawned task. The run is a straight-line sequence:
//! mark running, fetch the profile, page through the listing while relaying
//! each materialised batch, classify the final counters, and always purge
//! the scratch workspace. Errors never escape to the spawner; they land in
//! the task record and are observed by polling.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Result;
use crate::fetcher::{ContentFetcher, PageRequest};
use crate::progress::{completion_percentage, evaluate_run, RunTotals};
use crate::registry::TaskRegistry;
use crate::storage::{ContentCategory, ObjectStore};
use crate::types::{DownloadOptions, Event, TaskStatus, TaskId, UserProfile};
use crate::utils::purge_workspace;

use super::pagination::{PageDecision, PaginationDriver};
use super::relay::relay_workspace;

/// Everything one run needs, cloned out of the downloader at spawn time.
pub(crate) struct RunContext {
    pub registry: Arc<TaskRegistry>,
    pub fetcher: Arc<dyn ContentFetcher>,
    pub store: Arc<dyn ObjectStore>,
    pub config: Config,
    pub event_tx: broadcast::Sender<Event>,
    pub cancel: CancellationToken,
    pub task_id: TaskId,
    pub user_id: String,
    pub options: DownloadOptions,
}

/// Execute one download run to its terminal state.
pub(crate) async fn run_download_task(ctx: RunContext) {
    let workspace: PathBuf = ctx.config.download.temp_dir.join(ctx.task_id.as_str());

    ctx.registry
        .update(&ctx.task_id, |task| task.status = TaskStatus::Running)
        .await;
    ctx.event_tx
        .send(Event::TaskStarted {
            task_id: ctx.task_id.clone(),
        })
        .ok();
    tracing::info!(task_id = %ctx.task_id, user_id = %ctx.user_id, "Download run started");

    match execute(&ctx, &workspace).await {
        Ok(totals) => {
            let outcome = evaluate_run(totals);
            ctx.registry
                .update(&ctx.task_id, |task| {
                    task.finish(outcome.status, outcome.progress, outcome.error.clone())
                })
                .await;

            let event = match outcome.status {
                TaskStatus::Completed => Event::TaskCompleted {
                    task_id: ctx.task_id.clone(),
                    downloaded: totals.downloaded,
                    total: totals.total,
                },
                _ => Event::TaskPartial {
                    task_id: ctx.task_id.clone(),
                    downloaded: totals.downloaded,
                    total: totals.total,
                },
            };
            ctx.event_tx.send(event).ok();
            tracing::info!(
                task_id = %ctx.task_id,
                status = outcome.status.as_str(),
                downloaded = totals.downloaded,
                total = totals.total,
                "Download run finished"
            );
        }
        Err(e) => {
            let message = e.to_string();
            ctx.registry
                .update(&ctx.task_id, |task| {
                    let progress = task.progress;
                    task.finish(TaskStatus::Failed, progress, Some(message.clone()));
                })
                .await;
            ctx.event_tx
                .send(Event::TaskFailed {
                    task_id: ctx.task_id.clone(),
                    error: message.clone(),
                })
                .ok();
            tracing::error!(task_id = %ctx.task_id, error = %message, "Download run failed");
        }
    }

    purge_workspace(&workspace).await;
}

/// The fallible body of a run: profile, pagination, relay.
async fn execute(ctx: &RunContext, workspace: &Path) -> Result<RunTotals> {
    let profile = ctx.fetcher.fetch_profile(&ctx.user_id).await?;
    let declared_total = profile.post_count;

    // Recorded once; later updates only touch the download counters. A
    // likes-only run has no declared count to report.
    let recorded_total = if ctx.options.include_posts {
        declared_total
    } else {
        0
    };
    ctx.registry
        .update(&ctx.task_id, |task| task.total_items = recorded_total)
        .await;

    // The run target: the declared count, lowered by an item cap if one is set
    let target = match ctx.options.max_items {
        Some(cap) => declared_total.min(cap),
        None => declared_total,
    };

    let mut posts = 0u64;
    if ctx.options.include_posts {
        if declared_total == 0 {
            tracing::info!(task_id = %ctx.task_id, "Creator has no posts, nothing to download");
        } else {
            paginate_listing(
                ctx,
                workspace,
                &profile,
                ContentCategory::Posts,
                Some(declared_total),
                &mut posts,
                0,
            )
            .await?;
        }
    }

    // Liked items are relayed and counted in the record, but never against
    // the declared post count: classification compares posts to posts.
    let mut likes = 0u64;
    if ctx.options.include_likes {
        paginate_listing(
            ctx,
            workspace,
            &profile,
            ContentCategory::Likes,
            None,
            &mut likes,
            posts,
        )
        .await?;
    }

    if ctx.options.include_posts {
        Ok(RunTotals {
            downloaded: posts,
            total: target,
        })
    } else {
        // The liked listing has no declared length; exhausting it is completion
        Ok(RunTotals {
            downloaded: likes,
            total: likes,
        })
    }
}

/// Page through one listing, materialising and relaying each batch.
///
/// `declared_total` is the listing's declared length when the platform
/// reports one; without it, progress is left untouched and a cursor stall
/// ends the walk. `already_recorded` carries items counted by an earlier
/// listing so the task record stays cumulative.
async fn paginate_listing(
    ctx: &RunContext,
    workspace: &Path,
    profile: &UserProfile,
    category: ContentCategory,
    declared_total: Option<u64>,
    downloaded: &mut u64,
    already_recorded: u64,
) -> Result<()> {
    let mut driver = PaginationDriver::new();

    loop {
        if ctx.cancel.is_cancelled() {
            tracing::info!(task_id = %ctx.task_id, "Shutdown requested, stopping pagination");
            return Ok(());
        }
        if ctx
            .options
            .max_items
            .is_some_and(|cap| already_recorded + *downloaded >= cap)
        {
            tracing::info!(task_id = %ctx.task_id, cap = ?ctx.options.max_items, "Item cap reached");
            return Ok(());
        }

        let request = PageRequest {
            user_id: &ctx.user_id,
            cursor: driver.cursor(),
            page_size: ctx.config.download.page_size,
            max_items: ctx.options.max_items,
            include_likes: category == ContentCategory::Likes,
        };
        let page =
            crate::retry::with_retry(&ctx.config.download.retry, || ctx.fetcher.fetch_page(request))
                .await?;

        if !page.items.is_empty() {
            ctx.fetcher.download_items(&page.items, workspace).await?;
            let relayed = relay_workspace(
                ctx.store.as_ref(),
                workspace,
                &ctx.user_id,
                &profile.nickname,
                category,
                &ctx.config.storage.source_tag,
                &ctx.config.download.retry,
            )
            .await;

            *downloaded += page.items.len() as u64;
            let count = already_recorded + *downloaded;
            let percent =
                declared_total.map(|total| completion_percentage(*downloaded, total).min(100.0));
            let mut reported = 0.0;
            ctx.registry
                .update(&ctx.task_id, |task| {
                    task.downloaded_items = count;
                    if let Some(p) = percent {
                        task.progress = p;
                    }
                    reported = task.progress;
                })
                .await;
            ctx.event_tx
                .send(Event::TaskProgress {
                    task_id: ctx.task_id.clone(),
                    percent: reported,
                    downloaded: count,
                    total: declared_total.unwrap_or(0),
                })
                .ok();
            tracing::debug!(
                task_id = %ctx.task_id,
                items = page.items.len(),
                relayed,
                cursor = page.cursor,
                "Page processed"
            );
        }

        match driver.observe(&page, *downloaded, declared_total.unwrap_or(0)) {
            PageDecision::Stop => return Ok(()),
            PageDecision::Continue => {}
        }

        if !ctx.config.download.page_delay.is_zero() {
            tokio::time::sleep(ctx.config.download.page_delay).await;
        }
    }
}
