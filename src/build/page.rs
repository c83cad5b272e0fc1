//! The per-page build task.
//!
//! One task takes a table row to a rendered HTML file: fetch (or load from
//! cache), download attachments, rewrite links, render, write. Tasks are
//! independent and report a `TaskOutcome` instead of propagating errors, so
//! one broken page never takes down the run.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::logger::Logger;
use crate::notion::{NotionClient, NotionError};
use crate::util::to_dash_id;

use super::assets::{AssetDownloader, AssetError};
use super::cache::{CONTENT_NAMESPACE, Cache, CacheError};
use super::context::{PageMetadata, SiteContext};
use super::html;
use super::links;
use super::render::{RenderError, Renderer};
use super::scheduler::{FailureKind, TaskOutcome};

/// Collaborators shared by every page task in one build.
pub struct TaskContext {
    pub client: NotionClient,
    pub downloader: AssetDownloader,
    pub renderer: Renderer,
    pub cache: Cache,
    pub out_dir: PathBuf,
    pub logger: Logger,
}

#[derive(thiserror::Error, Debug)]
enum PageError {
    #[error(transparent)]
    Fetch(#[from] NotionError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("no cached copy of page {0}; run \"tablog generate --fresh\" to rebuild it")]
    CacheMissing(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("failed to write {0}: {1}")]
    Write(PathBuf, std::io::Error),
}

impl PageError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Fetch(_) | Self::Asset(_) => FailureKind::Fetch,
            Self::Cache(_) | Self::CacheMissing(_) => FailureKind::Cache,
            Self::Render(_) => FailureKind::Render,
            Self::Write(_, _) => FailureKind::Write,
        }
    }
}

/// Template data for one page, under the `post` key.
#[derive(Serialize)]
struct PostContext<'a> {
    #[serde(flatten)]
    metadata: &'a PageMetadata,
    content_html: &'a str,
}

/// Build one page end to end.
///
/// `stale` means the remote copy is newer than the cache (or `--fresh` was
/// given): fetch, transform, and re-cache before rendering. Otherwise the
/// cached tree is rendered as-is.
pub async fn build_page(
    page: PageMetadata,
    site: Arc<SiteContext>,
    ctx: Arc<TaskContext>,
    stale: bool,
) -> TaskOutcome {
    if !page.publish {
        return TaskOutcome::Skipped("not published".to_string());
    }
    if page.is_external() {
        return TaskOutcome::Skipped("external link".to_string());
    }

    match build_page_inner(&page, &site, &ctx, stale).await {
        Ok(()) => TaskOutcome::Success,
        Err(e) => {
            ctx.logger
                .error(format!("Failed to build page \"{}\": {e}", page.title));
            TaskOutcome::Failed {
                kind: e.failure_kind(),
                message: e.to_string(),
            }
        }
    }
}

async fn build_page_inner(
    page: &PageMetadata,
    site: &Arc<SiteContext>,
    ctx: &TaskContext,
    stale: bool,
) -> Result<(), PageError> {
    let dash_id = to_dash_id(&page.id);

    let tree = if stale {
        let mut tree = ctx.client.fetch_tree(&dash_id).await?;
        ctx.downloader.download_all(&mut tree, &ctx.out_dir).await?;
        links::rewrite_links(&mut tree, site, &ctx.logger);
        ctx.cache
            .set(CONTENT_NAMESPACE, &dash_id, page.last_edited_time, &tree)?;
        ctx.logger.debug(format!("Cache of \"{dash_id}\" is saved"));
        tree
    } else {
        ctx.cache
            .get(CONTENT_NAMESPACE, &dash_id)
            .ok_or_else(|| PageError::CacheMissing(dash_id.clone()))?
    };

    let content_html = html::render_tree(&tree);
    let mut data = tera::Context::new();
    data.insert("site", site.as_ref());
    data.insert(
        "post",
        &PostContext {
            metadata: page,
            content_html: &content_html,
        },
    );
    let rendered = ctx.renderer.render(&page.template, &data)?;

    let dest = ctx.out_dir.join(&page.url);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PageError::Write(parent.to_path_buf(), e))?;
    }
    std::fs::write(&dest, rendered).map_err(|e| PageError::Write(dest, e))?;
    ctx.logger
        .info(format!("Generated \"{}\" -> {}", page.title, page.url));
    Ok(())
}
