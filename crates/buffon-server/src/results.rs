//! HTML results page for `/api` estimates

use std::path::Path;

/// Placeholder replaced by the estimate report
pub const PLACEHOLDER: &str = "{{results}}";

/// File name of the template inside the public directory
pub const TEMPLATE_FILE: &str = "results.html";

const FALLBACK_TEMPLATE: &str = "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>Results</title></head>\n<body><p>{{results}}</p></body></html>\n";

/// Results page template, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsPage {
    template: String,
}

impl ResultsPage {
    /// Use `template` verbatim
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Read `results.html` from `public_dir`, or fall back to a minimal page
    ///
    /// # Errors
    /// I/O errors other than the file being absent.
    pub fn load(public_dir: &Path) -> std::io::Result<Self> {
        let path = public_dir.join(TEMPLATE_FILE);
        match std::fs::read_to_string(&path) {
            Ok(template) => Ok(Self::new(template)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("{} not found, using built-in results page", path.display());
                Ok(Self::new(FALLBACK_TEMPLATE))
            }
            Err(e) => Err(e),
        }
    }

    /// Substitute `report` into the page, one `<br>` per line break
    #[must_use]
    pub fn render(&self, report: &str) -> String {
        let body = escape_html(report).replace('\n', "<br>");
        self.template.replace(PLACEHOLDER, &body)
    }
}

impl Default for ResultsPage {
    fn default() -> Self {
        Self::new(FALLBACK_TEMPLATE)
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
