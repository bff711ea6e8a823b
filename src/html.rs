//! Thin typed layer over `scraper`: select by tag/class, read text, read
//! attributes. All fixed selectors for the arXiv pages live here so that a
//! markup change only touches this file.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, Result};
use crate::model::normalize_whitespace;

pub struct Sel {
    pub name: &'static str,
    selector: Selector,
}

impl Sel {
    fn new(name: &'static str, css: &str) -> Self {
        let selector = Selector::parse(css).unwrap_or_else(|e| panic!("bad selector {css}: {e:?}"));
        Sel { name, selector }
    }
}

// ── Listing page ──

pub static LISTING: LazyLock<Sel> = LazyLock::new(|| Sel::new("listing <dl>", "dl"));
pub static ENTRY_TERM: LazyLock<Sel> = LazyLock::new(|| Sel::new("entry <dt>", "dt"));
pub static ENTRY_DETAIL: LazyLock<Sel> = LazyLock::new(|| Sel::new("entry <dd>", "dd"));
pub static ABSTRACT_LINK: LazyLock<Sel> =
    LazyLock::new(|| Sel::new("abstract link", r#"a[title="Abstract"]"#));
pub static LIST_TITLE: LazyLock<Sel> = LazyLock::new(|| Sel::new("title block", "div.list-title"));
pub static LIST_AUTHORS: LazyLock<Sel> =
    LazyLock::new(|| Sel::new("authors block", "div.list-authors"));
pub static AUTHOR_LINK: LazyLock<Sel> = LazyLock::new(|| Sel::new("author link", "a"));
pub static LIST_SUBJECTS: LazyLock<Sel> =
    LazyLock::new(|| Sel::new("subjects block", "div.list-subjects"));

// ── Detail page ──

pub static DATELINE: LazyLock<Sel> = LazyLock::new(|| Sel::new("dateline", "div.dateline"));
pub static ABSTRACT_BLOCK: LazyLock<Sel> =
    LazyLock::new(|| Sel::new("abstract block", "blockquote.abstract"));
pub static DESCRIPTOR: LazyLock<Sel> =
    LazyLock::new(|| Sel::new("descriptor label", "span.descriptor"));

pub fn parse(html: &str) -> Html {
    Html::parse_document(html)
}

pub fn find<'a>(doc: &'a Html, sel: &Sel) -> Option<ElementRef<'a>> {
    doc.select(&sel.selector).next()
}

pub fn find_in<'a>(el: ElementRef<'a>, sel: &Sel) -> Option<ElementRef<'a>> {
    el.select(&sel.selector).next()
}

/// Like [`find_in`], but a missing element is a markup error naming the selector.
pub fn require_in<'a>(el: ElementRef<'a>, sel: &Sel) -> Result<ElementRef<'a>> {
    find_in(el, sel).ok_or_else(|| Error::markup("missing element", sel.name))
}

pub fn require<'a>(doc: &'a Html, sel: &Sel) -> Result<ElementRef<'a>> {
    find(doc, sel).ok_or_else(|| Error::markup("missing element", sel.name))
}

pub fn select_all<'a>(el: ElementRef<'a>, sel: &'a Sel) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.select(&sel.selector)
}

/// All descendant text, whitespace-normalized.
pub fn text(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<String>())
}

/// Descendant text, skipping any direct child matching `label`.
pub fn text_without(el: ElementRef<'_>, label: &Sel) -> String {
    let mut out = String::new();
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if label.selector.matches(&child_el) {
                continue;
            }
            out.extend(child_el.text());
        } else if let Some(t) = child.value().as_text() {
            out.push_str(t);
        }
    }
    normalize_whitespace(&out)
}

pub fn attr<'a>(el: ElementRef<'a>, name: &str) -> Option<&'a str> {
    el.value().attr(name)
}

/// Strip a leading `Label:` (as rendered by a descriptor span) from block text.
pub fn strip_label<'a>(text: &'a str, label: &str) -> &'a str {
    text.trim_start()
        .strip_prefix(label)
        .unwrap_or(text)
        .trim()
}
