//! Build orchestration: one `generate` run from table fetch to sitemap.
//!
//! The generator owns the directory layout and the fatal half of the
//! pipeline (config, theme, table fetch, index). Per-page work is delegated
//! to `page::build_page` tasks run through the bounded scheduler, so page
//! failures degrade the build instead of aborting it.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{ConfigError, SiteConfig};
use crate::logger::Logger;
use crate::notion::{NotionClient, NotionError};
use crate::util::{copy_dir_all, to_dash_id};

use super::assets::{AssetDownloader, AssetError};
use super::cache::{CONTENT_NAMESPACE, Cache};
use super::context::SiteContext;
use super::page::{TaskContext, build_page};
use super::render::{RenderError, Renderer};
use super::scheduler::{BuildSummary, run_bounded};
use super::sitemap::{SitemapError, write_sitemap};

/// Knobs of one `generate` run.
pub struct GenerateOptions {
    pub verbose: bool,
    pub fresh: bool,
    pub concurrency: usize,
}

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot find theme \"{0}\" in themes/")]
    ThemeNotFound(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Notion(#[from] NotionError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Sitemap(#[from] SitemapError),

    #[error("failed to prepare {0}: {1}")]
    Io(PathBuf, std::io::Error),
}

pub struct SiteGenerator {
    theme_dir: PathBuf,
    out_dir: PathBuf,
    cache_dir: PathBuf,
    config: SiteConfig,
    options: GenerateOptions,
    logger: Logger,
}

impl SiteGenerator {
    /// Validate the work directory layout and prepare the output tree.
    pub fn new(work_dir: &std::path::Path, options: GenerateOptions) -> Result<Self, BuildError> {
        let logger = Logger::new(options.verbose);
        let config = SiteConfig::load(work_dir)?;

        let theme_dir = work_dir.join("themes").join(&config.theme);
        if !theme_dir.is_dir() {
            return Err(BuildError::ThemeNotFound(config.theme.clone()));
        }

        let out_dir = work_dir.join("public");
        let tag_dir = out_dir.join("tag");
        std::fs::create_dir_all(&tag_dir).map_err(|e| BuildError::Io(tag_dir, e))?;

        Ok(Self {
            theme_dir,
            out_dir,
            cache_dir: work_dir.join("cache"),
            config,
            options,
            logger,
        })
    }

    pub async fn build(&self) -> Result<BuildSummary, BuildError> {
        let renderer = Renderer::new(&self.theme_dir)?;
        self.copy_theme_assets()?;

        let token = std::env::var("NOTION_TOKEN").ok();
        if token.is_none() {
            self.logger
                .debug("NOTION_TOKEN is not set; only public tables are reachable");
        }
        let client = NotionClient::new(token, self.logger)?;

        // The table is the source of truth; without it there is no build.
        let site = Arc::new(client.fetch_table(&self.config.url).await?);

        let cache = Cache::new(&self.cache_dir);
        let published = site.pages.iter().filter(|p| p.publish).count();
        let stale: Vec<bool> = site
            .pages
            .iter()
            .map(|page| {
                self.options.fresh
                    || cache.should_update(
                        CONTENT_NAMESPACE,
                        &to_dash_id(&page.id),
                        page.last_edited_time,
                    )
            })
            .collect();
        self.logger.info(format!(
            "{} of {} posts have been updated",
            stale.iter().filter(|s| **s).count(),
            site.pages.len()
        ));
        self.logger.info(format!(
            "{published} of {} posts are published",
            site.pages.len()
        ));

        self.render_index(&renderer, &site)?;

        let ctx = Arc::new(TaskContext {
            client,
            downloader: AssetDownloader::new(self.logger)?,
            renderer,
            cache,
            out_dir: self.out_dir.clone(),
            logger: self.logger,
        });
        let tasks: Vec<_> = site
            .pages
            .iter()
            .cloned()
            .zip(stale)
            .map(|(page, stale)| build_page(page, Arc::clone(&site), Arc::clone(&ctx), stale))
            .collect();
        let outcomes = run_bounded(self.options.concurrency, tasks).await;
        let summary = BuildSummary::from_outcomes(&outcomes);

        self.prune_orphans(&site);
        write_sitemap(&self.out_dir, &self.config.site_url, &self.logger)?;

        Ok(summary)
    }

    /// Copy the theme's static assets next to the generated pages.
    fn copy_theme_assets(&self) -> Result<(), BuildError> {
        let src = self.theme_dir.join("assets");
        let dst = self.out_dir.join("assets");
        copy_dir_all(&src, &dst).map_err(|e| BuildError::Io(dst, e))
    }

    /// Render the front page and one listing page per tag.
    fn render_index(&self, renderer: &Renderer, site: &SiteContext) -> Result<(), BuildError> {
        let mut data = tera::Context::new();
        data.insert("site", site);
        let html = renderer.render("index", &data)?;
        let dest = self.out_dir.join("index.html");
        std::fs::write(&dest, html).map_err(|e| BuildError::Io(dest, e))?;
        self.logger.info("Generated \"index\" -> index.html");

        for (tag, pages) in &site.tag_map {
            let mut data = tera::Context::new();
            data.insert("site", site);
            data.insert("tag", tag);
            data.insert("pages", pages);
            let html = renderer.render("tag", &data)?;
            let dest = self.out_dir.join("tag").join(format!("{tag}.html"));
            std::fs::write(&dest, html).map_err(|e| BuildError::Io(dest, e))?;
            self.logger
                .info(format!("Generated \"tag/{tag}\" -> tag/{tag}.html"));
        }
        Ok(())
    }

    /// Delete generated HTML that no current table row accounts for.
    ///
    /// Best effort: a file that cannot be removed is logged and left behind.
    fn prune_orphans(&self, site: &SiteContext) {
        let valid = valid_output_set(site);

        self.prune_dir(&self.out_dir, "", &valid);
        self.prune_dir(&self.out_dir.join("tag"), "tag/", &valid);
    }

    fn prune_dir(&self, dir: &std::path::Path, prefix: &str, valid: &BTreeSet<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "html") {
                continue;
            }
            let name = format!("{prefix}{}", entry.file_name().to_string_lossy());
            if valid.contains(&name) {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => self.logger.info(format!("Removed orphan {name}")),
                Err(e) => self
                    .logger
                    .error(format!("Failed to remove orphan {name}: {e}")),
            }
        }
    }
}

/// Filenames (relative to the output directory) the current table explains.
fn valid_output_set(site: &SiteContext) -> BTreeSet<String> {
    let mut valid = BTreeSet::new();
    valid.insert("index.html".to_string());
    for page in site.pages.iter().filter(|p| p.publish && !p.is_external()) {
        valid.insert(page.url.clone());
    }
    for tag in site.tag_map.keys() {
        valid.insert(format!("tag/{tag}.html"));
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::super::context::test_page;
    use super::*;

    #[test]
    fn test_valid_output_set() {
        let mut external = test_page("b".repeat(32).as_str(), "x.html", true, &["rust"]);
        external.url = "https://elsewhere.example/x".to_string();

        let site = SiteContext::new(vec![
            test_page("a".repeat(32).as_str(), "my-post.html", true, &["rust"]),
            test_page("c".repeat(32).as_str(), "draft.html", false, &[]),
            external,
        ]);
        let valid = valid_output_set(&site);

        assert!(valid.contains("index.html"));
        assert!(valid.contains("my-post.html"));
        assert!(valid.contains("tag/rust.html"));
        // Drafts and external links produce no files.
        assert!(!valid.contains("draft.html"));
        assert!(!valid.contains("https://elsewhere.example/x"));
    }

    fn scaffold_work_dir(work: &std::path::Path) {
        std::fs::write(
            work.join("config.json"),
            r#"{"url": "https://www.notion.so/user/Table-0297b381142d4bdfb534cbbc043353ac", "theme": "pure"}"#,
        )
        .unwrap();
        std::fs::create_dir_all(work.join("themes/pure/layouts")).unwrap();
    }

    #[test]
    fn test_missing_theme_is_an_error() {
        let work = tempfile::tempdir().unwrap();
        scaffold_work_dir(work.path());
        std::fs::write(
            work.path().join("config.json"),
            r#"{"url": "u", "theme": "nope"}"#,
        )
        .unwrap();

        let result = SiteGenerator::new(
            work.path(),
            GenerateOptions {
                verbose: false,
                fresh: false,
                concurrency: 3,
            },
        );
        assert!(matches!(result, Err(BuildError::ThemeNotFound(theme)) if theme == "nope"));
    }

    #[test]
    fn test_prune_orphans_removes_stale_html_only() {
        let work = tempfile::tempdir().unwrap();
        scaffold_work_dir(work.path());
        let generator = SiteGenerator::new(
            work.path(),
            GenerateOptions {
                verbose: false,
                fresh: false,
                concurrency: 3,
            },
        )
        .unwrap();

        let out = work.path().join("public");
        std::fs::write(out.join("index.html"), "x").unwrap();
        std::fs::write(out.join("my-post.html"), "x").unwrap();
        std::fs::write(out.join("gone.html"), "x").unwrap();
        std::fs::write(out.join("style.css"), "x").unwrap();
        std::fs::write(out.join("tag/rust.html"), "x").unwrap();
        std::fs::write(out.join("tag/old.html"), "x").unwrap();

        let site = SiteContext::new(vec![test_page(
            "a".repeat(32).as_str(),
            "my-post.html",
            true,
            &["rust"],
        )]);
        generator.prune_orphans(&site);

        assert!(out.join("index.html").exists());
        assert!(out.join("my-post.html").exists());
        assert!(out.join("style.css").exists());
        assert!(out.join("tag/rust.html").exists());
        assert!(!out.join("gone.html").exists());
        assert!(!out.join("tag/old.html").exists());
    }
}
