use anyhow::{Context, Result};
use serde::Deserialize;

/// Runtime settings, loadable from an optional `settings.toml` next to the
/// binary plus `WHS_`-prefixed environment overrides (e.g. `WHS_QUERY_KIND`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Write semantics: "update", "insert", "insert-ignore" or "replace".
    pub query_kind: String,
    /// Write empty text fields as `''` in update statements instead of
    /// leaving them out of the SET clause.
    pub allow_empty_values: bool,
    /// Emit a DELETE before the insert-family statement.
    pub append_delete_query: bool,
    /// Output .sql file path.
    pub output: String,
    /// Parallel page fetches.
    pub concurrency: usize,
    /// Retries per page on rate-limit/server errors.
    pub max_retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            query_kind: "replace".into(),
            allow_empty_values: false,
            append_delete_query: false,
            output: "npc.sql".into(),
            concurrency: 4,
            max_retries: 3,
        }
    }
}

pub fn load() -> Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("settings").required(false))
        .add_source(config::Environment::with_prefix("WHS").try_parsing(true))
        .build()
        .context("building settings")?
        .try_deserialize()
        .context("deserializing settings")?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_as_valid_kind() {
        let s = Settings::default();
        assert!(s.query_kind.parse::<crate::sql::QueryKind>().is_ok());
    }
}
