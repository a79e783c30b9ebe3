use anyhow::Result;
use tracing::{debug, warn};

use crate::extract::{self, ExtractError};
use crate::locale::Locale;
use crate::settings::Settings;
use crate::sql::SqlBatch;

/// One page's worth of rendered statements.
pub struct PageItem {
    pub id: u32,
    pub sql: String,
}

/// Build the batch targeting the right table for `locale`: the base
/// `creature_template` for English, `locales_creature` with suffixed
/// columns otherwise. The locale choice lives entirely here; extraction
/// itself never branches on it.
pub fn creature_batch(locale: Locale, settings: &Settings) -> Result<SqlBatch> {
    let batch = match locale.column_suffix() {
        None => {
            let mut b = SqlBatch::from_settings("creature_template", "entry", settings)?;
            b.declare_fields(&["name", "subname"])?;
            b
        }
        Some(sfx) => {
            let mut b = SqlBatch::from_settings("locales_creature", "entry", settings)?;
            b.declare_fields(&[format!("name_{sfx}"), format!("subname_{sfx}")])?;
            b
        }
    };
    Ok(batch)
}

/// Parse one fetched page into a statement block. A page without a listview
/// block is normal (empty id range) and yields an empty block; malformed
/// payloads are logged and skipped so one bad page never kills the run.
pub fn parse_page(page: &str, id: u32, locale: Locale, settings: &Settings) -> Result<PageItem> {
    let mut batch = creature_batch(locale, settings)?;

    match extract::extract(page) {
        Ok(records) => {
            debug!(page = id, count = records.len(), "extracted records");
            for record in records {
                batch.append(&record.key, record.values)?;
            }
        }
        Err(ExtractError::NotFound) => {
            debug!(page = id, "no listview data block, skipping");
        }
        Err(e @ ExtractError::BadJson(_)) => {
            warn!(page = id, error = %e, "skipping malformed page");
        }
    }

    Ok(PageItem {
        id,
        sql: batch.render(),
    })
}
