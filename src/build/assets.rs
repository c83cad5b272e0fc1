//! Attachment download pass.
//!
//! Finds every `attachment:` locator in a content tree (image sources and
//! hyperlink marks inside property values), downloads each one through the
//! Notion asset proxy into `<outDir>/assets/notion/`, and repoints the tree
//! at the local copies. A failed download leaves its original reference in
//! place; the page still renders.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use reqwest::StatusCode;

use crate::logger::Logger;
use crate::util::to_dash_id;

use super::tree::{ContentNode, Mark, NodeKind};

/// Asset directory relative to the output directory.
pub const ASSET_SUBDIR: &str = "assets/notion";

const S3_BASE: &str = "https://s3.us-west-2.amazonaws.com/secure.notion-static.com";
const PROXY_BASE: &str = "https://www.notion.so/image";

/// Hops to follow before giving up on a redirect chain.
const MAX_REDIRECTS: usize = 10;

#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("request to {0} failed: {1}")]
    Request(String, reqwest::Error),

    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: StatusCode },

    #[error("redirect from {0} carried no usable location header")]
    MissingLocation(String),

    #[error("too many redirects starting from {0}")]
    TooManyRedirects(String),

    #[error("failed to write {0}: {1}")]
    Write(PathBuf, std::io::Error),
}

/// An `attachment:` locator found in the tree, with the block that owns it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct AttachmentRef {
    /// Dashed id of the owning block.
    block_id: String,
    /// The raw `attachment:<uuid>:<filename>[?query]` locator.
    source: String,
}

/// Parsed form of an `attachment:` locator.
#[derive(Debug, PartialEq, Eq)]
struct ParsedAttachment {
    uuid: String,
    filename: String,
}

pub struct AssetDownloader {
    client: reqwest::Client,
    logger: Logger,
}

impl AssetDownloader {
    pub fn new(logger: Logger) -> Result<Self, AssetError> {
        // Redirects are re-issued by hand so a body from an intermediate
        // hop never ends up in the destination file.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(AssetError::Client)?;
        Ok(Self { client, logger })
    }

    /// Download every attachment referenced by `tree` into
    /// `<out_dir>/assets/notion` and rewrite the references that succeeded.
    ///
    /// All downloads run concurrently and are joined before the tree is
    /// touched; per-asset failures are logged and skipped.
    pub async fn download_all(
        &self,
        tree: &mut ContentNode,
        out_dir: &Path,
    ) -> Result<(), AssetError> {
        let asset_dir = out_dir.join(ASSET_SUBDIR);
        std::fs::create_dir_all(&asset_dir).map_err(|e| AssetError::Write(asset_dir.clone(), e))?;

        let mut refs = Vec::new();
        collect_refs(tree, &mut refs);
        refs.sort();
        refs.dedup();

        let downloads = refs.iter().map(|aref| {
            let asset_dir = asset_dir.clone();
            async move {
                let parsed = parse_locator(&aref.source)?;
                let local_name = format!("{}-{}", aref.block_id, parsed.filename);
                let url = proxy_url(&parsed.uuid, &parsed.filename, &aref.block_id);
                match self.fetch(&url, &asset_dir.join(&local_name)).await {
                    Ok(()) => Some((aref.clone(), format!("{ASSET_SUBDIR}/{local_name}"))),
                    Err(e) => {
                        self.logger.error(format!("Failed to download {url}: {e}"));
                        None
                    }
                }
            }
        });
        let results = futures_util::future::join_all(downloads).await;

        let replacements: BTreeMap<AttachmentRef, String> =
            results.into_iter().flatten().collect();
        apply_refs(tree, &replacements, &self.logger);
        Ok(())
    }

    /// Download one URL to `dest`.
    ///
    /// An existing nonzero-size destination short-circuits without any
    /// network traffic; a zero-byte leftover from a failed prior write is
    /// deleted and retried.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), AssetError> {
        if let Ok(meta) = std::fs::metadata(dest) {
            if meta.len() > 0 {
                return Ok(());
            }
            std::fs::remove_file(dest).map_err(|e| AssetError::Write(dest.to_path_buf(), e))?;
        }

        let mut url = url.to_string();
        for _ in 0..MAX_REDIRECTS {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| AssetError::Request(url.clone(), e))?;
            let status = response.status();

            if status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND {
                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| AssetError::MissingLocation(url.clone()))?;
                url = location.to_string();
                continue;
            }
            if !status.is_success() {
                return Err(AssetError::Status { url, status });
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| AssetError::Request(url.clone(), e))?;
            std::fs::write(dest, &bytes).map_err(|e| AssetError::Write(dest.to_path_buf(), e))?;
            return Ok(());
        }
        Err(AssetError::TooManyRedirects(url))
    }
}

/// Remote fetch URL via the Notion asset proxy, keyed by the owning block.
fn proxy_url(uuid: &str, filename: &str, block_id: &str) -> String {
    let s3_url = format!("{S3_BASE}/{uuid}/{filename}");
    format!(
        "{PROXY_BASE}/{}?table=block&id={block_id}",
        urlencoding::encode(&s3_url)
    )
}

/// Parse `attachment:<uuid>:<filename>[?query]`, discarding the query.
fn parse_locator(source: &str) -> Option<ParsedAttachment> {
    let rest = source.strip_prefix("attachment:")?;
    let (uuid, rest) = rest.split_once(':')?;
    let filename = rest.split('?').next().unwrap_or(rest);
    if uuid.is_empty() || filename.is_empty() {
        return None;
    }
    Some(ParsedAttachment {
        uuid: uuid.to_string(),
        filename: filename.to_string(),
    })
}

/// Dashed id of the block owning a reference, derived from its URI.
fn owner_block_id(uri: &str) -> Option<String> {
    let raw = uri.trim_end_matches('/').rsplit('/').next()?;
    if raw.is_empty() {
        return None;
    }
    Some(to_dash_id(raw))
}

fn collect_refs(node: &ContentNode, out: &mut Vec<AttachmentRef>) {
    let block_id = owner_block_id(&node.uri);

    if let NodeKind::Image { source } = &node.kind
        && source.starts_with("attachment:")
        && let Some(block_id) = &block_id
    {
        out.push(AttachmentRef {
            block_id: block_id.clone(),
            source: source.clone(),
        });
    }

    for segments in node.properties.values() {
        for segment in segments {
            for mark in &segment.marks {
                if let Mark::Link { target } = mark
                    && target.starts_with("attachment:")
                    && let Some(block_id) = &block_id
                {
                    out.push(AttachmentRef {
                        block_id: block_id.clone(),
                        source: target.clone(),
                    });
                }
            }
        }
    }

    for child in &node.children {
        collect_refs(child, out);
    }
}

fn apply_refs(node: &mut ContentNode, replacements: &BTreeMap<AttachmentRef, String>, logger: &Logger) {
    let block_id = owner_block_id(&node.uri);

    if let Some(block_id) = &block_id {
        if let NodeKind::Image { source } = &mut node.kind
            && let Some(local) = replacements.get(&AttachmentRef {
                block_id: block_id.clone(),
                source: source.clone(),
            })
        {
            logger.debug(format!("Replace asset: {source} -> {local}"));
            *source = local.clone();
        }

        for segments in node.properties.values_mut() {
            for segment in segments {
                for mark in &mut segment.marks {
                    if let Mark::Link { target } = mark
                        && let Some(local) = replacements.get(&AttachmentRef {
                            block_id: block_id.clone(),
                            source: target.clone(),
                        })
                    {
                        logger.debug(format!("Replace asset: {target} -> {local}"));
                        *target = local.clone();
                    }
                }
            }
        }
    }

    for child in &mut node.children {
        apply_refs(child, replacements, logger);
    }
}
