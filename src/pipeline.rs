use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::fetch::Fetch;
use crate::model::{PartialRecord, Record};
use crate::parser::detail::parse_detail;
use crate::parser::listing::{parse_listing, Listing, ARXIV_BASE};
use crate::settings::Settings;

/// How far the run got with the index page itself.
#[derive(Debug)]
pub enum ListingStatus {
    Parsed { entries: usize, unpaired: usize },
    NotFound,
    Unreachable(Error),
}

/// A listing entry that did not make it into the batch.
#[derive(Debug)]
pub struct Skipped {
    /// Identifier if the listing got that far, else the index URL.
    pub subject: String,
    pub error: Error,
}

#[derive(Debug)]
pub struct Extraction {
    pub records: Vec<Record>,
    pub skipped: Vec<Skipped>,
    pub status: ListingStatus,
}

impl Extraction {
    fn empty(status: ListingStatus) -> Self {
        Extraction {
            records: Vec::new(),
            skipped: Vec::new(),
            status,
        }
    }
}

pub struct Pipeline<F> {
    fetcher: F,
    base: Url,
    delay: Duration,
}

impl<F: Fetch> Pipeline<F> {
    pub fn new(settings: &Settings, fetcher: F) -> Result<Self> {
        let base = Url::parse(ARXIV_BASE)
            .map_err(|e| Error::Config(format!("bad base URL {ARXIV_BASE}: {e}")))?;
        Ok(Pipeline {
            fetcher,
            base,
            delay: settings.request_delay,
        })
    }

    /// Fetch one index page, then enrich every entry from its detail page,
    /// one request at a time. Never fails as a whole: problems are reported
    /// in the returned [`Extraction`].
    pub async fn extract(&self, index_url: &Url) -> Extraction {
        info!("Scraping listing {}", index_url);

        let markup = match self.fetcher.get(index_url).await {
            Ok(m) => m,
            Err(e) => {
                error!("Could not fetch listing {}: {}", index_url, e);
                return Extraction::empty(ListingStatus::Unreachable(e));
            }
        };

        let (entries, unpaired) = match parse_listing(&markup, &self.base) {
            Listing::NotFound => {
                warn!("No article list (<dl>) found at {}", index_url);
                return Extraction::empty(ListingStatus::NotFound);
            }
            Listing::Found { entries, unpaired } => (entries, unpaired),
        };
        if unpaired > 0 {
            warn!(
                "Listing has mismatched <dt>/<dd> counts; {} trailing element(s) dropped",
                unpaired
            );
        }

        let total = entries.len();
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );

        let mut records = Vec::with_capacity(total);
        let mut skipped = Vec::new();
        let mut fetched_any = false;

        for (i, entry) in entries.into_iter().enumerate() {
            let partial = match entry {
                Ok(p) => p,
                Err(e) => {
                    warn!("Skipping listing entry #{}: {}", i + 1, e);
                    skipped.push(Skipped {
                        subject: format!("{} entry #{}", index_url, i + 1),
                        error: e,
                    });
                    pb.inc(1);
                    continue;
                }
            };

            if fetched_any && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            fetched_any = true;

            match enrich(&self.fetcher, &partial).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping {} ({}): {}", partial.identifier, partial.link, e);
                    skipped.push(Skipped {
                        subject: partial.identifier,
                        error: e,
                    });
                }
            }
            pb.inc(1);
        }

        pb.finish_and_clear();
        info!(
            "Extracted {} of {} entries ({} skipped)",
            records.len(),
            total,
            skipped.len()
        );

        Extraction {
            records,
            skipped,
            status: ListingStatus::Parsed {
                entries: total,
                unpaired,
            },
        }
    }
}

/// Complete a listing entry from its detail page: submission date and abstract.
pub async fn enrich<F: Fetch>(fetcher: &F, partial: &PartialRecord) -> Result<Record> {
    let markup = fetcher.get(&partial.link).await?;
    let detail = parse_detail(&markup)?;
    Ok(partial.complete(detail.submission_date, &detail.abstract_text)?)
}
