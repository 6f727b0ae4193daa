//! Content extraction functionality for the crawler module
//!
//! Turns rendered HTML into the title, visible text and outgoing links of a page.
//! All functions work on a parsed [`Html`] document, which is not `Send`; callers
//! must finish extraction before the next `.await`.

use scraper::{ElementRef, Html, Selector};

use crate::crawler::error::CrawlError;

/// Elements whose text never counts as page content
const STRIP_SELECTOR: &str = "script, style, noscript, nav, header, footer, aside, \
     .nav, .navigation, .menu, .sidebar, .footer, .header";

/// Main-content containers, probed in order
const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "[role=\"main\"]",
    ".main-content",
    ".content",
    ".post-content",
    ".entry-content",
    ".article-content",
    "article",
    ".container .content",
    ".page-content",
];

/// Elements after which a word break is inserted
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "td", "th",
    "section", "article", "blockquote", "pre", "table", "dd", "dt", "main", "nav", "header",
    "footer", "aside", "form",
];

fn selector(css: &str) -> Result<Selector, CrawlError> {
    Selector::parse(css)
        .map_err(|e| CrawlError::HtmlParse(format!("Failed to parse selector '{}': {}", css, e)))
}

/// Collapse every run of whitespace into a single space and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract the document `<title>`, if it has a non-blank one
pub fn extract_title(document: &Html) -> Result<Option<String>, CrawlError> {
    let title_selector = selector("title")?;

    Ok(document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|title| !title.is_empty()))
}

/// Raw `href` values of every anchor, in document order
pub fn extract_links(document: &Html) -> Result<Vec<String>, CrawlError> {
    let anchor_selector = selector("a[href]")?;

    Ok(document
        .select(&anchor_selector)
        .filter_map(|a| a.value().attr("href"))
        .map(String::from)
        .collect())
}

/// Extract the visible text of the page.
///
/// With `only_main_content`, chrome such as navigation and footers is dropped and
/// the first main-content container yielding more than `main_min_length`
/// characters wins. Otherwise, or when no container qualifies, the whole body is
/// used.
pub fn extract_text(
    document: &Html,
    only_main_content: bool,
    main_min_length: usize,
) -> Result<String, CrawlError> {
    let strip = selector(STRIP_SELECTOR)?;

    if only_main_content {
        for css in MAIN_CONTENT_SELECTORS {
            let candidate_selector = selector(css)?;
            let candidate = document
                .select(&candidate_selector)
                .find(|el| !strip.matches(el) && !has_stripped_ancestor(*el, &strip));

            if let Some(element) = candidate {
                let text = collapse_whitespace(&visible_text(element, Some(&strip)));
                if text.chars().count() > main_min_length {
                    return Ok(text);
                }
            }
        }
    }

    let body_selector = selector("body")?;
    let root = document
        .select(&body_selector)
        .next()
        .unwrap_or_else(|| document.root_element());

    let strip = if only_main_content { Some(&strip) } else { None };
    Ok(collapse_whitespace(&visible_text(root, strip)))
}

fn has_stripped_ancestor(element: ElementRef<'_>, strip: &Selector) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| strip.matches(&ancestor))
}

fn visible_text(element: ElementRef<'_>, strip: Option<&Selector>) -> String {
    let mut out = String::new();
    collect_text(element, strip, &mut out);
    out
}

fn collect_text(element: ElementRef<'_>, strip: Option<&Selector>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            // script and style bodies are never visible text
            if matches!(name, "script" | "style" | "noscript") {
                continue;
            }
            if strip.is_some_and(|s| s.matches(&child_element)) {
                continue;
            }
            collect_text(child_element, strip, out);
            if BLOCK_ELEMENTS.contains(&name) {
                out.push(' ');
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}

/// Everything the crawler needs from one rendered page
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    pub title: Option<String>,
    pub text: String,
    pub links: Vec<String>,
}

/// Parse `html` once and extract title, text and links
pub fn extract_page(
    html: &str,
    only_main_content: bool,
    main_min_length: usize,
) -> Result<ExtractedPage, CrawlError> {
    let document = Html::parse_document(html);

    Ok(ExtractedPage {
        title: extract_title(&document)?,
        text: extract_text(&document, only_main_content, main_min_length)?,
        links: extract_links(&document)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_paragraph(word: &str) -> String {
        vec![word; 40].join(" ")
    }

    #[test]
    fn test_extract_title() {
        let document = Html::parse_document(
            "<html><head><title>  Acme \n Plumbing </title></head><body></body></html>",
        );
        assert_eq!(
            extract_title(&document).unwrap(),
            Some("Acme Plumbing".to_string())
        );

        let untitled = Html::parse_document("<html><head><title> </title></head></html>");
        assert_eq!(extract_title(&untitled).unwrap(), None);
    }

    #[test]
    fn test_main_content_strips_chrome() {
        let html = format!(
            r#"<html><body>
                <nav>Home About Contact</nav>
                <header class="header">Site banner</header>
                <main><h1>Services</h1><p>{}</p><script>var x = 1;</script>
                    <aside>Related links</aside></main>
                <footer>Copyright</footer>
            </body></html>"#,
            long_paragraph("pipes")
        );
        let document = Html::parse_document(&html);
        let text = extract_text(&document, true, 100).unwrap();

        assert!(text.starts_with("Services pipes pipes"));
        assert!(!text.contains("Home About"));
        assert!(!text.contains("Related links"));
        assert!(!text.contains("var x"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn test_short_container_falls_through() {
        let html = format!(
            r#"<html><body>
                <main>Too short</main>
                <article>{}</article>
            </body></html>"#,
            long_paragraph("drains")
        );
        let document = Html::parse_document(&html);
        let text = extract_text(&document, true, 100).unwrap();

        assert!(text.starts_with("drains"));
        assert!(!text.contains("Too short"));
    }

    #[test]
    fn test_falls_back_to_body() {
        let html = "<html><body><nav>Menu</nav><div>Plain page with <b>bold</b> text</div></body></html>";
        let document = Html::parse_document(html);

        assert_eq!(
            extract_text(&document, true, 100).unwrap(),
            "Plain page with bold text"
        );
        assert_eq!(
            extract_text(&document, false, 100).unwrap(),
            "Menu Plain page with bold text"
        );
    }

    #[test]
    fn test_container_inside_chrome_is_skipped() {
        let html = format!(
            r#"<html><body>
                <div class="sidebar"><div class="content">{}</div></div>
                <div class="page-content">{}</div>
            </body></html>"#,
            long_paragraph("sidebar"),
            long_paragraph("real")
        );
        let document = Html::parse_document(&html);
        let text = extract_text(&document, true, 100).unwrap();

        assert!(text.starts_with("real"));
    }

    #[test]
    fn test_extract_page_links() {
        let page = extract_page(
            r##"<html><head><title>Links</title></head><body>
                <a href="/about">About</a><a>No href</a>
                <a href="https://other.com/x">Other</a><a href="#top">Top</a>
            </body></html>"##,
            true,
            100,
        )
        .unwrap();

        assert_eq!(page.title.as_deref(), Some("Links"));
        assert_eq!(page.links, vec!["/about", "https://other.com/x", "#top"]);
    }
}
