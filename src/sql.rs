use std::fmt::Write as _;

use thiserror::Error;

use crate::settings::Settings;

/// Verb family used to persist a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Update,
    Insert,
    InsertIgnore,
    Replace,
}

impl QueryKind {
    /// Parse the numeric value used in settings files (1..=4, matching the
    /// historical config format; 0 was "none" and anything above 4 is junk).
    pub fn from_config(raw: u8) -> Result<Self, SqlError> {
        match raw {
            1 => Ok(QueryKind::Update),
            2 => Ok(QueryKind::Replace),
            3 => Ok(QueryKind::Insert),
            4 => Ok(QueryKind::InsertIgnore),
            other => Err(SqlError::InvalidKind(other.to_string())),
        }
    }
}

impl std::str::FromStr for QueryKind {
    type Err = SqlError;

    fn from_str(s: &str) -> Result<Self, SqlError> {
        match s.to_ascii_lowercase().as_str() {
            "update" => Ok(QueryKind::Update),
            "insert" => Ok(QueryKind::Insert),
            "insert-ignore" | "insert_ignore" => Ok(QueryKind::InsertIgnore),
            "replace" => Ok(QueryKind::Replace),
            other => Err(SqlError::InvalidKind(other.to_string())),
        }
    }
}

/// What to do with empty field values in update statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPolicy {
    /// Write empty strings as `''`.
    KeepEmpty,
    /// Leave empty fields out of the SET clause entirely.
    SkipEmpty,
}

#[derive(Debug, Error)]
pub enum SqlError {
    #[error("unrecognized query kind: {0:?}")]
    InvalidKind(String),
    #[error("no field columns declared")]
    NoFields,
    #[error("record has {got} values but {want} fields are declared")]
    FieldArity { want: usize, got: usize },
}

struct SqlRow {
    key: String,
    values: Vec<String>,
}

/// Accumulates (key, values) records for one table and renders them as a
/// single statement block. Two-phase: `declare_fields` + `append` while
/// collecting, then `render` once every page in the unit has been parsed.
///
/// Values are wrapped in single quotes as-is; callers pre-sanitize text that
/// may contain quote characters. The builder does SQL-literal quoting only,
/// not escaping.
pub struct SqlBatch {
    table: String,
    key_column: String,
    kind: QueryKind,
    null_policy: NullPolicy,
    delete_before_write: bool,
    fields: Vec<String>,
    rows: Vec<SqlRow>,
}

impl SqlBatch {
    pub fn new(
        table: &str,
        key_column: &str,
        kind: QueryKind,
        null_policy: NullPolicy,
        delete_before_write: bool,
    ) -> Self {
        SqlBatch {
            table: table.to_string(),
            key_column: key_column.to_string(),
            kind,
            null_policy,
            delete_before_write,
            fields: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Construction path from runtime settings: the configured query kind is
    /// free-form text, so this is where an out-of-range value gets rejected,
    /// before any page is fetched or parsed.
    pub fn from_settings(table: &str, key_column: &str, settings: &Settings) -> Result<Self, SqlError> {
        let kind: QueryKind = settings.query_kind.parse()?;
        let null_policy = if settings.allow_empty_values {
            NullPolicy::KeepEmpty
        } else {
            NullPolicy::SkipEmpty
        };
        Ok(SqlBatch::new(
            table,
            key_column,
            kind,
            null_policy,
            settings.append_delete_query,
        ))
    }

    /// Declare the field columns, in the order values will be appended.
    /// Must happen before the first `append`.
    pub fn declare_fields<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), SqlError> {
        if names.is_empty() {
            return Err(SqlError::NoFields);
        }
        self.fields
            .extend(names.iter().map(|n| n.as_ref().to_string()));
        Ok(())
    }

    /// Append one record. `values` must line up positionally with the
    /// declared fields.
    pub fn append(&mut self, key: &str, values: Vec<String>) -> Result<(), SqlError> {
        if self.fields.is_empty() {
            return Err(SqlError::NoFields);
        }
        if values.len() != self.fields.len() {
            return Err(SqlError::FieldArity {
                want: self.fields.len(),
                got: values.len(),
            });
        }
        self.rows.push(SqlRow {
            key: key.to_string(),
            values,
        });
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render the accumulated batch as literal statement text. Pure function
    /// of the current state; an empty batch renders to an empty string.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        match self.kind {
            QueryKind::Update => self.render_update(),
            QueryKind::Insert | QueryKind::InsertIgnore | QueryKind::Replace => {
                self.render_insert()
            }
        }
    }

    fn render_update(&self) -> String {
        let mut out = String::with_capacity(128 * self.rows.len());

        for row in &self.rows {
            let mut stmt = String::with_capacity(128);
            write!(stmt, "UPDATE `{}` SET ", self.table).unwrap();

            let mut wrote_any = false;
            for (field, value) in self.fields.iter().zip(&row.values) {
                if self.null_policy == NullPolicy::SkipEmpty && value.trim().is_empty() {
                    continue;
                }
                write!(stmt, "`{}` = '{}', ", field, value).unwrap();
                wrote_any = true;
            }

            // A record whose every field got skipped produces no statement
            // at all, not an empty SET clause.
            if !wrote_any {
                continue;
            }

            stmt.truncate(stmt.len() - 2); // trailing ", "
            writeln!(stmt, " WHERE `{}` = {};", self.key_column, row.key).unwrap();
            out.push_str(&stmt);
        }

        out
    }

    fn render_insert(&self) -> String {
        let mut out = String::with_capacity(128 * self.rows.len());

        // Single DELETE keyed on the first record only. Inherited batch-level
        // behavior; downstream scripts depend on it, so it is deliberately
        // not per-record (see DESIGN.md).
        if self.delete_before_write {
            writeln!(
                out,
                "DELETE FROM `{}` WHERE `{}` = '{}';",
                self.table, self.key_column, self.rows[0].key
            )
            .unwrap();
        }

        let verb = match self.kind {
            QueryKind::Insert => "INSERT INTO",
            QueryKind::InsertIgnore => "INSERT IGNORE INTO",
            QueryKind::Replace => "REPLACE INTO",
            QueryKind::Update => unreachable!(),
        };

        write!(out, "{} `{}` (`{}`", verb, self.table, self.key_column).unwrap();
        for field in &self.fields {
            write!(out, ", `{}`", field).unwrap();
        }
        out.push_str(") VALUES\n");

        for (i, row) in self.rows.iter().enumerate() {
            write!(out, "('{}'", row.key).unwrap();
            for value in &row.values {
                write!(out, ", '{}'", value).unwrap();
            }
            let terminator = if i + 1 < self.rows.len() { "," } else { ";" };
            out.push(')');
            out.push_str(terminator);
            out.push('\n');
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(kind: QueryKind, policy: NullPolicy, delete: bool) -> SqlBatch {
        let mut b = SqlBatch::new("creature_template", "entry", kind, policy, delete);
        b.declare_fields(&["name", "tag"]).unwrap();
        b
    }

    #[test]
    fn empty_batch_renders_empty() {
        for kind in [
            QueryKind::Update,
            QueryKind::Insert,
            QueryKind::InsertIgnore,
            QueryKind::Replace,
        ] {
            let b = batch(kind, NullPolicy::KeepEmpty, true);
            assert!(b.is_empty());
            assert_eq!(b.render(), "");
        }
    }

    #[test]
    fn insert_round_trip() {
        let mut b = batch(QueryKind::Insert, NullPolicy::KeepEmpty, false);
        b.append("1", vec!["A".into(), "B".into()]).unwrap();
        b.append("2", vec!["".into(), "C".into()]).unwrap();
        assert_eq!(
            b.render(),
            "INSERT INTO `creature_template` (`entry`, `name`, `tag`) VALUES\n\
             ('1', 'A', 'B'),\n\
             ('2', '', 'C');\n"
        );
    }

    #[test]
    fn insert_ignore_verb() {
        let mut b = batch(QueryKind::InsertIgnore, NullPolicy::KeepEmpty, false);
        b.append("7", vec!["X".into(), "".into()]).unwrap();
        assert!(b.render().starts_with("INSERT IGNORE INTO `creature_template`"));
    }

    #[test]
    fn replace_verb() {
        let mut b = batch(QueryKind::Replace, NullPolicy::KeepEmpty, false);
        b.append("7", vec!["X".into(), "".into()]).unwrap();
        assert!(b.render().starts_with("REPLACE INTO `creature_template`"));
    }

    #[test]
    fn delete_only_for_first_record() {
        let mut b = batch(QueryKind::Replace, NullPolicy::KeepEmpty, true);
        b.append("10", vec!["A".into(), "B".into()]).unwrap();
        b.append("11", vec!["C".into(), "D".into()]).unwrap();
        let sql = b.render();
        assert_eq!(sql.matches("DELETE FROM").count(), 1);
        assert!(sql.starts_with("DELETE FROM `creature_template` WHERE `entry` = '10';\n"));
    }

    #[test]
    fn insert_tuple_count_matches_records() {
        let mut b = batch(QueryKind::Insert, NullPolicy::SkipEmpty, false);
        for i in 0..5 {
            b.append(&i.to_string(), vec!["".into(), "".into()]).unwrap();
        }
        let sql = b.render();
        // SkipEmpty never omits fields in insert mode: 5 full tuples.
        assert_eq!(sql.matches("('").count(), 5);
        assert_eq!(sql.matches(", ''").count(), 10);
    }

    #[test]
    fn update_statements() {
        let mut b = batch(QueryKind::Update, NullPolicy::KeepEmpty, false);
        b.append("1", vec!["A".into(), "B".into()]).unwrap();
        assert_eq!(
            b.render(),
            "UPDATE `creature_template` SET `name` = 'A', `tag` = 'B' WHERE `entry` = 1;\n"
        );
    }

    #[test]
    fn update_skips_empty_fields() {
        let mut b = batch(QueryKind::Update, NullPolicy::SkipEmpty, false);
        b.append("1", vec!["A".into(), "".into()]).unwrap();
        assert_eq!(
            b.render(),
            "UPDATE `creature_template` SET `name` = 'A' WHERE `entry` = 1;\n"
        );
    }

    #[test]
    fn update_drops_all_empty_record() {
        let mut b = batch(QueryKind::Update, NullPolicy::SkipEmpty, false);
        b.append("1", vec!["A".into(), "B".into()]).unwrap();
        b.append("2", vec!["".into(), "  ".into()]).unwrap();
        let sql = b.render();
        assert_eq!(sql.matches("UPDATE").count(), 1);
        assert!(sql.contains("WHERE `entry` = 1;"));
        assert!(!sql.contains("`entry` = 2"));
    }

    #[test]
    fn update_keeps_empty_when_allowed() {
        let mut b = batch(QueryKind::Update, NullPolicy::KeepEmpty, false);
        b.append("2", vec!["".into(), "C".into()]).unwrap();
        assert_eq!(
            b.render(),
            "UPDATE `creature_template` SET `name` = '', `tag` = 'C' WHERE `entry` = 2;\n"
        );
    }

    #[test]
    fn render_is_deterministic() {
        let build = || {
            let mut b = batch(QueryKind::Insert, NullPolicy::KeepEmpty, true);
            b.append("1", vec!["A".into(), "B".into()]).unwrap();
            b.append("2", vec!["".into(), "C".into()]).unwrap();
            b.render()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn append_before_declare_fails() {
        let mut b = SqlBatch::new(
            "creature_template",
            "entry",
            QueryKind::Insert,
            NullPolicy::KeepEmpty,
            false,
        );
        assert!(matches!(
            b.append("1", vec!["A".into()]),
            Err(SqlError::NoFields)
        ));
    }

    #[test]
    fn declare_empty_fails() {
        let mut b = batch(QueryKind::Insert, NullPolicy::KeepEmpty, false);
        let empty: &[&str] = &[];
        assert!(matches!(b.declare_fields(empty), Err(SqlError::NoFields)));
    }

    #[test]
    fn arity_mismatch_fails() {
        let mut b = batch(QueryKind::Insert, NullPolicy::KeepEmpty, false);
        let err = b.append("1", vec!["A".into()]).unwrap_err();
        assert!(matches!(err, SqlError::FieldArity { want: 2, got: 1 }));
    }

    #[test]
    fn bad_kind_rejected() {
        assert!(matches!(
            "upsert".parse::<QueryKind>(),
            Err(SqlError::InvalidKind(_))
        ));
        assert!(matches!(QueryKind::from_config(0), Err(SqlError::InvalidKind(_))));
        assert!(matches!(QueryKind::from_config(5), Err(SqlError::InvalidKind(_))));
        assert_eq!(QueryKind::from_config(2).unwrap(), QueryKind::Replace);
    }

    #[test]
    fn bad_settings_reject_construction() {
        let settings = crate::settings::Settings {
            query_kind: "truncate".into(),
            ..Default::default()
        };
        assert!(SqlBatch::from_settings("t", "id", &settings).is_err());
    }
}
