use anyhow::{bail, Result};
use rusqlite::{params, Connection};

/// Local wall-clock time with fractional seconds, same shape the stores write from Rust.
pub const DEFAULT_LOCAL_TIMESTAMP: &str = "(strftime('%Y-%m-%dT%H:%M:%f', 'now', 'localtime'))";

/// Offset added to schema versions in `PRAGMA user_version`, so a database
/// created by something else (version 0) is never mistaken for ours.
pub const BASE_DB_VERSION: usize = 77000;

/// Declares a [`Column`], e.g.
/// `sqlite_column!("job_id", SqlType::Text, non_null = true, unique = true)`.
#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = $crate::sqlite_persistence::Column::new($name, $sql_type);
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
}

impl SqlType {
    fn keyword(self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub primary_key: bool,
    pub non_null: bool,
    pub unique: bool,
    pub default_value: Option<&'static str>,
}

impl Column {
    pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            primary_key: false,
            non_null: false,
            unique: false,
            default_value: None,
        }
    }

    fn definition(&self) -> String {
        let mut parts = vec![self.name.to_string(), self.sql_type.keyword().to_string()];
        if self.primary_key {
            parts.push("PRIMARY KEY".into());
        }
        if self.non_null {
            parts.push("NOT NULL".into());
        }
        if self.unique {
            parts.push("UNIQUE".into());
        }
        if let Some(default_value) = self.default_value {
            parts.push(format!("DEFAULT {}", default_value));
        }
        parts.join(" ")
    }
}

/// A column as reported by `PRAGMA table_info`.
#[derive(Debug)]
struct ColumnInfo {
    name: String,
    type_name: String,
    non_null: bool,
    default_value: Option<String>,
    primary_key: bool,
}

/// sqlite reports expression defaults wrapped in parentheses.
fn unwrap_parens(s: &str) -> &str {
    s.strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(s)
}

impl ColumnInfo {
    fn differences(&self, expected: &Column) -> Vec<String> {
        let mut diffs = Vec::new();
        if self.name != expected.name {
            diffs.push(format!("name is {}", self.name));
        }
        if !self.type_name.eq_ignore_ascii_case(expected.sql_type.keyword()) {
            diffs.push(format!("type is {}", self.type_name));
        }
        if self.non_null != expected.non_null {
            diffs.push(format!("non-null is {}", self.non_null));
        }
        if self.primary_key != expected.primary_key {
            diffs.push(format!("primary key is {}", self.primary_key));
        }
        let actual_default = self.default_value.as_deref().map(unwrap_parens);
        if actual_default != expected.default_value.map(unwrap_parens) {
            diffs.push(format!("default is {:?}", self.default_value));
        }
        diffs
    }
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    /// `(index name, column)` pairs.
    pub indices: &'static [(&'static str, &'static str)],
}

impl Table {
    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(Column::definition).collect();
        format!("CREATE TABLE {} ({});", self.name, columns.join(", "))
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute(&self.create_sql(), params![])?;
        for (index_name, column) in self.indices {
            conn.execute(
                &format!("CREATE INDEX {} ON {}({});", index_name, self.name, column),
                params![],
            )?;
        }
        Ok(())
    }

    fn actual_columns(&self, conn: &Connection) -> Result<Vec<ColumnInfo>> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let columns = stmt
            .query_map(params![], |row| {
                Ok(ColumnInfo {
                    name: row.get(1)?,
                    type_name: row.get(2)?,
                    non_null: row.get::<_, i32>(3)? == 1,
                    default_value: row.get(4)?,
                    primary_key: row.get::<_, i32>(5)? == 1,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    /// Fails unless the live table has exactly the declared columns, in
    /// order, plus every declared index.
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        let actual = self.actual_columns(conn)?;
        if actual.is_empty() {
            bail!("Table {} does not exist", self.name);
        }
        if actual.len() != self.columns.len() {
            let names: Vec<&str> = actual.iter().map(|c| c.name.as_str()).collect();
            bail!(
                "Table {} has {} columns, expected {} (found: {})",
                self.name,
                actual.len(),
                self.columns.len(),
                names.join(", ")
            );
        }

        for (column, expected) in actual.iter().zip(self.columns) {
            let diffs = column.differences(expected);
            if !diffs.is_empty() {
                bail!(
                    "Table {} column {} does not match: {}",
                    self.name,
                    expected.name,
                    diffs.join("; ")
                );
            }
        }

        let mut stmt = conn.prepare(&format!("PRAGMA index_list({});", self.name))?;
        let existing: Vec<String> = stmt
            .query_map(params![], |row| row.get(1))?
            .collect::<Result<Vec<_>, _>>()?;
        if let Some((missing, _)) = self
            .indices
            .iter()
            .find(|(name, _)| !existing.iter().any(|e| e == name))
        {
            bail!("Table {} is missing index '{}'", self.name, missing);
        }
        Ok(())
    }
}

/// The full set of tables at one schema version.
pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
}

impl VersionedSchema {
    pub fn user_version(&self) -> usize {
        BASE_DB_VERSION + self.version
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.create(conn)?;
        }
        conn.pragma_update(None, "user_version", self.user_version() as i64)?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        self.tables.iter().try_for_each(|table| table.validate(conn))
    }
}
