//! Site-level metadata shared by every build task.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::util::to_bare_id;

/// One row of the Notion table, immutable for the duration of a build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMetadata {
    /// Bare (dashless) block id of the page.
    pub id: String,
    pub title: String,
    /// Relative output path, or an absolute URL for external links.
    pub url: String,
    pub tags: Vec<String>,
    pub publish: bool,
    /// Remote edit time, milliseconds since the epoch.
    pub last_edited_time: i64,
    /// Template name the page renders with.
    pub template: String,
    pub description: Option<String>,
}

impl PageMetadata {
    /// Whether `url` points off-site instead of at a generated file.
    pub fn is_external(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }
}

/// Read-only view of the whole site, built once per run from the fetched
/// table and shared across all concurrent tasks.
#[derive(Debug, Clone, Serialize)]
pub struct SiteContext {
    pub pages: Vec<PageMetadata>,
    /// tag -> published pages carrying it, in table order.
    pub tag_map: BTreeMap<String, Vec<PageMetadata>>,
}

impl SiteContext {
    pub fn new(pages: Vec<PageMetadata>) -> Self {
        let mut tag_map: BTreeMap<String, Vec<PageMetadata>> = BTreeMap::new();
        for page in pages.iter().filter(|p| p.publish) {
            for tag in &page.tags {
                tag_map.entry(tag.clone()).or_default().push(page.clone());
            }
        }
        Self { pages, tag_map }
    }

    /// Look up a page by id in either dashed or bare form.
    pub fn page_by_id(&self, id: &str) -> Option<&PageMetadata> {
        let bare = to_bare_id(id);
        self.pages.iter().find(|p| to_bare_id(&p.id) == bare)
    }
}

#[cfg(test)]
pub(crate) fn test_page(id: &str, url: &str, publish: bool, tags: &[&str]) -> PageMetadata {
    PageMetadata {
        id: id.to_string(),
        title: format!("Page {id}"),
        url: url.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        publish,
        last_edited_time: 1_700_000_000_000,
        template: "post".to_string(),
        description: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_map_only_published() {
        let site = SiteContext::new(vec![
            test_page("a".repeat(32).as_str(), "a.html", true, &["rust"]),
            test_page("b".repeat(32).as_str(), "b.html", false, &["rust", "notes"]),
        ]);
        assert_eq!(site.tag_map.len(), 1);
        assert_eq!(site.tag_map["rust"].len(), 1);
    }

    #[test]
    fn test_page_by_id_dashed_or_bare() {
        let site = SiteContext::new(vec![test_page(
            "0297b381142d4bdfb534cbbc043353ac",
            "post.html",
            true,
            &[],
        )]);
        assert!(site.page_by_id("0297b381142d4bdfb534cbbc043353ac").is_some());
        assert!(
            site.page_by_id("0297b381-142d-4bdf-b534-cbbc043353ac")
                .is_some()
        );
        assert!(site.page_by_id("deadbeefdeadbeefdeadbeefdeadbeef").is_none());
    }

    #[test]
    fn test_is_external() {
        let mut page = test_page("a".repeat(32).as_str(), "post.html", true, &[]);
        assert!(!page.is_external());
        page.url = "https://elsewhere.example/post".to_string();
        assert!(page.is_external());
    }
}
