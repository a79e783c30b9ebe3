use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::locale::Locale;
use crate::npc;
use crate::settings::Settings;
use crate::writer::SqlFile;

/// Npc listview pages are requested by creature-entry range; one page covers
/// one chunk of the id space.
pub const MAX_ENTRY: u32 = 59000;
const CHUNK: u32 = 200;
const BASE_BACKOFF_MS: u64 = 2000;

pub struct FetchStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

struct FetchedPage {
    id: u32,
    text: Option<String>,
    error: Option<String>,
    latency_ms: u64,
}

fn page_url(locale: Locale, lo: u32, hi: u32) -> String {
    format!(
        "https://{}.wowhead.com/npcs?filter=cr=37:37;crs=1:4;crv={}:{}",
        locale.subdomain(),
        lo,
        hi
    )
}

/// Fetch every chunk in `[start, end]` concurrently and stream each page
/// straight through parse + file append as it arrives. Page-level failures
/// are counted and logged, never fatal.
pub async fn scrape_streaming(
    settings: &Settings,
    locale: Locale,
    start: u32,
    end: u32,
    out: &mut SqlFile,
) -> Result<FetchStats> {
    let client = Arc::new(
        reqwest::Client::builder()
            .user_agent(concat!("wh_scraper/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?,
    );
    let semaphore = Arc::new(Semaphore::new(settings.concurrency));

    let chunks: Vec<(u32, u32)> = (start..=end)
        .step_by(CHUNK as usize)
        .map(|lo| (lo, (lo + CHUNK - 1).min(end)))
        .collect();
    let total = chunks.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    // Channel: workers send fetched pages, the receive loop parses and
    // appends to the output file in arrival order.
    let (tx, mut rx) = tokio::sync::mpsc::channel::<FetchedPage>(settings.concurrency * 2);

    let max_retries = settings.max_retries;
    for (lo, hi) in chunks {
        let client = Arc::clone(&client);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();
        let url = page_url(locale, lo, hi);

        tokio::spawn(async move {
            let _permit = sem.acquire().await.unwrap();
            let page = fetch_with_retry(&client, lo, &url, max_retries).await;
            let _ = tx.send(page).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut ok = 0usize;
    let mut errors = 0usize;

    while let Some(page) = rx.recv().await {
        match (&page.text, &page.error) {
            (Some(text), _) => {
                let item = npc::parse_page(text, page.id, locale, settings)?;
                out.append_block(&item.sql)?;
                ok += 1;
            }
            (None, err) => {
                warn!(
                    page = page.id,
                    error = err.as_deref().unwrap_or("empty response"),
                    latency_ms = page.latency_ms,
                    "page failed"
                );
                errors += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Fetched {} pages ({} ok, {} errors)", total, ok, errors);

    Ok(FetchStats { total, ok, errors })
}

async fn fetch_with_retry(
    client: &reqwest::Client,
    id: u32,
    url: &str,
    max_retries: u32,
) -> FetchedPage {
    let start = Instant::now();

    for attempt in 0..=max_retries {
        match fetch_one(client, url).await {
            Ok(text) => {
                return FetchedPage {
                    id,
                    text: Some(text),
                    error: None,
                    latency_ms: start.elapsed().as_millis() as u64,
                }
            }
            Err(e) => {
                let transient = matches!(e, FetchFailure::Transient(_));
                if !transient || attempt == max_retries {
                    return FetchedPage {
                        id,
                        text: None,
                        error: Some(e.to_string()),
                        latency_ms: start.elapsed().as_millis() as u64,
                    };
                }
                let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
                warn!(
                    "Retrying page {} (attempt {}/{}), backing off {:.1}s",
                    id,
                    attempt + 1,
                    max_retries,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }

    unreachable!("loop returns on final attempt")
}

#[derive(Debug, thiserror::Error)]
enum FetchFailure {
    #[error("HTTP {0}")]
    Transient(u16),
    #[error("HTTP {0}")]
    Permanent(u16),
    #[error(transparent)]
    Network(#[from] reqwest::Error),
}

async fn fetch_one(client: &reqwest::Client, url: &str) -> Result<String, FetchFailure> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if status.as_u16() == 429 || status.is_server_error() {
        return Err(FetchFailure::Transient(status.as_u16()));
    }
    if !status.is_success() {
        return Err(FetchFailure::Permanent(status.as_u16()));
    }
    Ok(resp.text().await?)
}
