//! Sitemap generation over the output directory.
//!
//! Walks `<outDir>` after the build and emits `sitemap.xml` listing every
//! generated HTML file as an absolute URL under the configured site URL.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::logger::Logger;

#[derive(thiserror::Error, Debug)]
pub enum SitemapError {
    #[error("failed to scan {0}: {1}")]
    Scan(PathBuf, std::io::Error),

    #[error("failed to write {0}: {1}")]
    Write(PathBuf, std::io::Error),
}

/// Write `<out_dir>/sitemap.xml` covering every `.html` file under `out_dir`.
pub fn write_sitemap(out_dir: &Path, site_url: &str, logger: &Logger) -> Result<(), SitemapError> {
    let base = site_url.trim_end_matches('/');
    let mut urls = BTreeSet::new();
    collect_html(out_dir, out_dir, base, &mut urls)?;

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");
    for url in &urls {
        xml.push_str(&format!("  <url><loc>{url}</loc></url>\n"));
    }
    xml.push_str("</urlset>\n");

    let dest = out_dir.join("sitemap.xml");
    std::fs::write(&dest, xml).map_err(|e| SitemapError::Write(dest, e))?;
    logger.info(format!("Sitemap lists {} URLs", urls.len()));
    Ok(())
}

fn collect_html(
    dir: &Path,
    root: &Path,
    base: &str,
    urls: &mut BTreeSet<String>,
) -> Result<(), SitemapError> {
    let entries = std::fs::read_dir(dir).map_err(|e| SitemapError::Scan(dir.to_path_buf(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| SitemapError::Scan(dir.to_path_buf(), e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_html(&path, root, base, urls)?;
            continue;
        }
        if path.extension().is_none_or(|ext| ext != "html") {
            continue;
        }

        let rel: String = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if rel == "index.html" {
            urls.insert(format!("{base}/"));
        } else {
            urls.insert(format!("{base}/{rel}"));
        }
    }
    Ok(())
}
