//! Template rendering, wrapping Tera.
//!
//! Templates live in `<themeDir>/layouts/*.html` and are addressed by bare
//! template name (`post` -> `post.html`). From the pipeline's perspective
//! rendering is a pure function from (template, data) to an HTML string.

use std::path::Path;

use tera::Tera;

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("cannot find layouts/ in theme {0}")]
    LayoutsNotFound(String),
}

pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Create a renderer loading every template from the theme's `layouts/`
    /// directory.
    pub fn new(theme_dir: &Path) -> Result<Self, RenderError> {
        let layouts = theme_dir.join("layouts");
        if !layouts.exists() {
            return Err(RenderError::LayoutsNotFound(
                theme_dir.display().to_string(),
            ));
        }

        let glob = layouts.join("**/*.html");
        let tera = Tera::new(&glob.to_string_lossy())?;
        Ok(Self { tera })
    }

    /// Render the named template with the given data.
    pub fn render(&self, template: &str, data: &tera::Context) -> Result<String, RenderError> {
        Ok(self.tera.render(&format!("{template}.html"), data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_by_template_name() {
        let theme = tempfile::tempdir().unwrap();
        let layouts = theme.path().join("layouts");
        std::fs::create_dir_all(&layouts).unwrap();
        std::fs::write(layouts.join("post.html"), "<h1>{{ title }}</h1>").unwrap();

        let renderer = Renderer::new(theme.path()).unwrap();
        let mut data = tera::Context::new();
        data.insert("title", "Hello");
        assert_eq!(renderer.render("post", &data).unwrap(), "<h1>Hello</h1>");
    }

    #[test]
    fn test_missing_layouts_dir() {
        let theme = tempfile::tempdir().unwrap();
        assert!(matches!(
            Renderer::new(theme.path()),
            Err(RenderError::LayoutsNotFound(_))
        ));
    }

    #[test]
    fn test_missing_template() {
        let theme = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(theme.path().join("layouts")).unwrap();
        let renderer = Renderer::new(theme.path()).unwrap();
        assert!(
            renderer
                .render("post", &tera::Context::new())
                .is_err()
        );
    }
}
