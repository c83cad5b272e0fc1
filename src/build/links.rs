//! Internal link rewriting.
//!
//! Rewrites references to pages that live in the site table so they point at
//! the locally generated files; references to anything else are normalized
//! to a fully qualified notion.so URL. The pass is a pure function of
//! (tree, site context) and idempotent for local links: resolution goes by
//! block id, which is stable, and already-qualified URLs are never
//! re-qualified.

use crate::logger::Logger;
use crate::util::{is_notion_id, to_bare_id};

use super::context::SiteContext;
use super::tree::{ContentNode, Mark, NodeKind, RichTextSegment};

const REMOTE_BASE: &str = "https://www.notion.so";

/// Rewrite every internal cross-reference in `node` and its descendants.
pub fn rewrite_links(node: &mut ContentNode, site: &SiteContext, logger: &Logger) {
    match &mut node.kind {
        NodeKind::PageReference { target } => {
            if let Some(id) = last_path_segment(target)
                && let Some(page) = site.page_by_id(&id)
            {
                logger.debug(format!("Replace link: {} -> {}", target, page.url));
                *target = page.url.clone();
            } else {
                // Left as a best-effort remote link.
                logger.debug(format!("Unresolved page reference: {target}"));
            }
        }
        NodeKind::Text { title } => rewrite_segments(title, site, logger),
        _ => {}
    }
    for child in &mut node.children {
        rewrite_links(child, site, logger);
    }
}

fn rewrite_segments(segments: &mut [RichTextSegment], site: &SiteContext, logger: &Logger) {
    for segment in segments {
        for mark in &mut segment.marks {
            match mark {
                Mark::PageMention { uri } => rewrite_mention(uri, site, logger),
                Mark::Link { target } => rewrite_hyperlink(target, site, logger),
                _ => {}
            }
        }
    }
}

/// Inline page mention: resolve against the table, otherwise synthesize a
/// fully qualified remote URL so no bare id ever reaches the output.
fn rewrite_mention(uri: &mut String, site: &SiteContext, logger: &Logger) {
    // Already rewritten to a local path on a previous pass.
    if !uri.contains("://") {
        return;
    }
    let Some(id) = last_path_segment(uri) else {
        return;
    };
    if !is_notion_id(&id) {
        return;
    }
    let new_target = match site.page_by_id(&id) {
        Some(page) => page.url.clone(),
        None => format!("{REMOTE_BASE}/{}", to_bare_id(&id)),
    };
    logger.debug(format!("Replace link: {uri} -> {new_target}"));
    *uri = new_target;
}

/// Inline hyperlink whose target is an internal-looking path.
///
/// Internal paths come in three shapes:
///   `/65166b73...`                 link to a page
///   `/ec83369b...#aa3f7c1b...`     link to a block within a page
///   `/59536...?v=...&p=...`        collection preview mode (unsupported)
fn rewrite_hyperlink(target: &mut String, site: &SiteContext, logger: &Logger) {
    // Absolute and external links are left untouched.
    if !target.starts_with('/') {
        return;
    }

    if target.contains('?') {
        // Preview-mode links cannot be reproduced locally.
        let new_target = format!("{REMOTE_BASE}{target}");
        logger.debug(format!("Replace link: {target} -> {new_target}"));
        *target = new_target;
        return;
    }

    let stripped: String = target.chars().filter(|c| *c != '/').collect();
    let (page_id, block_anchor) = match stripped.split_once('#') {
        Some((page, block)) => (page.to_string(), Some(block.to_string())),
        None => (stripped, None),
    };
    if page_id.is_empty() {
        return;
    }

    let new_target = match site.page_by_id(&page_id) {
        Some(page) => match block_anchor {
            // Anchors are not reproduced locally; keep the block id as an
            // inert fragment so the page part stays navigable.
            Some(block) if !block.is_empty() => format!("{}#{}", page.url, block),
            _ => page.url.clone(),
        },
        None => format!("{REMOTE_BASE}{target}"),
    };
    logger.debug(format!("Replace link: {target} -> {new_target}"));
    *target = new_target;
}

/// Last non-empty path segment of a URI.
fn last_path_segment(uri: &str) -> Option<String> {
    uri.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
