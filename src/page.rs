use scraper::{ElementRef, Html, Selector};

/// Fixed element set the generic keyword scan walks, in document order.
/// Traversal is bounded by this set; nothing else is visited.
const TEXT_ELEMENTS: &str = "a, button, div, span, p, h1, h2, h3, h4, h5, h6";

/// Parsed DOM snapshot plus the page's own location. The detector only ever
/// reads from this; navigation, rendering, and injection stay with the host.
pub struct PageSnapshot {
    html: Html,
    url: String,
}

impl PageSnapshot {
    pub fn parse(html: &str, url: &str) -> Self {
        Self {
            html: Html::parse_document(html),
            url: url.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// First element matched by the selectors, tried in listed order; yields
    /// its trimmed text. Malformed selectors are skipped rather than raised:
    /// a bad pattern must never take down a scan.
    pub fn select_first_text(&self, selectors: &[&str]) -> Option<String> {
        for raw in selectors {
            let Ok(selector) = Selector::parse(raw) else {
                continue;
            };
            if let Some(element) = self.html.select(&selector).next() {
                return Some(element_text(&element));
            }
        }
        None
    }

    /// Trimmed text of every element in the fixed scan set, document order.
    pub fn text_elements(&self) -> Vec<String> {
        let Ok(selector) = Selector::parse(TEXT_ELEMENTS) else {
            return Vec::new();
        };
        self.html
            .select(&selector)
            .map(|el| element_text(&el))
            .collect()
    }

    /// All visible-ish text of the document, whitespace-collapsed.
    pub fn body_text(&self) -> String {
        let root = self.html.root_element();
        collapse(root.text())
    }

    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| element_text(&el))
            .filter(|t| !t.is_empty())
    }

    pub fn og_title(&self) -> Option<String> {
        let selector = Selector::parse(r#"meta[property="og:title"]"#).ok()?;
        self.html
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

fn element_text(element: &ElementRef) -> String {
    collapse(element.text())
}

fn collapse<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    let joined: String = parts.collect::<Vec<_>>().join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"
        <html>
          <head>
            <title>Acme Plans</title>
            <meta property="og:title" content="Acme Cloud">
          </head>
          <body>
            <div class="pricing-table"><span>Pro</span> <span>$12/month</span></div>
            <p>Some paragraph.</p>
          </body>
        </html>"#;

    #[test]
    fn select_first_text_in_listed_order() {
        let page = PageSnapshot::parse(HTML, "https://acme.example/pricing");
        let text = page.select_first_text(&[".missing", ".pricing-table"]);
        assert_eq!(text.as_deref(), Some("Pro $12/month"));
    }

    #[test]
    fn malformed_selector_is_skipped() {
        let page = PageSnapshot::parse(HTML, "https://acme.example/pricing");
        let text = page.select_first_text(&["[[[", ".pricing-table"]);
        assert!(text.is_some());
    }

    #[test]
    fn titles() {
        let page = PageSnapshot::parse(HTML, "https://acme.example/pricing");
        assert_eq!(page.og_title().as_deref(), Some("Acme Cloud"));
        assert_eq!(page.title().as_deref(), Some("Acme Plans"));
    }

    #[test]
    fn text_elements_document_order() {
        let page = PageSnapshot::parse(HTML, "https://acme.example/pricing");
        let texts = page.text_elements();
        // The wrapping div precedes its span children.
        let div_pos = texts.iter().position(|t| t == "Pro $12/month").unwrap();
        let span_pos = texts.iter().position(|t| t == "Pro").unwrap();
        assert!(div_pos < span_pos);
    }

    #[test]
    fn body_text_collapses_whitespace() {
        let page = PageSnapshot::parse(HTML, "https://acme.example/pricing");
        let body = page.body_text();
        assert!(body.contains("Pro $12/month"));
        assert!(body.contains("Some paragraph."));
        assert!(!body.contains("\n"));
    }
}
