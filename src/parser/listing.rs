use scraper::ElementRef;
use url::Url;

use crate::error::{Error, Result};
use crate::html;
use crate::model::PartialRecord;

/// Links on the listing page are resolved against this, not the page URL.
pub const ARXIV_BASE: &str = "https://arxiv.org/";

pub enum Listing {
    /// The page has no `<dl>` container at all.
    NotFound,
    Found {
        entries: Vec<Result<PartialRecord>>,
        /// `<dt>`/`<dd>` elements left over when the counts disagree.
        unpaired: usize,
    },
}

pub fn parse_listing(markup: &str, base: &Url) -> Listing {
    let doc = html::parse(markup);
    let Some(dl) = html::find(&doc, &html::LISTING) else {
        return Listing::NotFound;
    };

    let terms: Vec<_> = html::select_all(dl, &html::ENTRY_TERM).collect();
    let details: Vec<_> = html::select_all(dl, &html::ENTRY_DETAIL).collect();
    let unpaired = terms.len().abs_diff(details.len());

    let entries = terms
        .into_iter()
        .zip(details)
        .map(|(dt, dd)| parse_entry(dt, dd, base))
        .collect();

    Listing::Found { entries, unpaired }
}

fn parse_entry(dt: ElementRef<'_>, dd: ElementRef<'_>, base: &Url) -> Result<PartialRecord> {
    let abs_link = html::require_in(dt, &html::ABSTRACT_LINK)?;

    let label = html::text(abs_link);
    let identifier = label.rsplit(':').next().unwrap_or_default().trim().to_string();
    if identifier.is_empty() {
        return Err(Error::markup("empty identifier", label));
    }

    let href = html::attr(abs_link, "href")
        .ok_or_else(|| Error::markup("abstract link without href", identifier.clone()))?;
    let link = base
        .join(href)
        .map_err(|e| Error::markup("unresolvable link", format!("{href}: {e}")))?;
    if !matches!(link.scheme(), "http" | "https") {
        return Err(Error::markup("unsupported link scheme", link.to_string()));
    }

    let title_text = html::text(html::require_in(dd, &html::LIST_TITLE)?);
    let title = html::strip_label(&title_text, "Title:").to_string();
    if title.is_empty() {
        return Err(Error::markup("empty title", identifier));
    }

    // Some entries render without an authors block; that is allowed.
    let authors: Vec<String> = html::find_in(dd, &html::LIST_AUTHORS)
        .map(|block| {
            html::select_all(block, &html::AUTHOR_LINK)
                .map(html::text)
                .filter(|a| !a.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let subjects_text = html::text(html::require_in(dd, &html::LIST_SUBJECTS)?);
    let subjects: Vec<String> = html::strip_label(&subjects_text, "Subjects:")
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if subjects.is_empty() {
        return Err(Error::markup("empty subjects", identifier));
    }

    Ok(PartialRecord {
        identifier,
        link,
        title,
        authors,
        subjects,
    })
}
