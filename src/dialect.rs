//! Output dialect for the parts of a dump that are not portable SQL.
//!
//! Inserts share one statement shape across engines. Text and binary
//! literals and the post-load sequence adjustment differ. A rendered text
//! literal never contains a raw line break, so every INSERT stays intact
//! under line-based replay.

/// Target SQL dialect for generated dumps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    /// MySQL / MariaDB (default)
    #[default]
    MySql,
    /// PostgreSQL
    Postgres,
    /// SQLite
    Sqlite,
}

impl std::str::FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(SqlDialect::MySql),
            "postgres" | "postgresql" | "pg" => Ok(SqlDialect::Postgres),
            "sqlite" | "sqlite3" => Ok(SqlDialect::Sqlite),
            _ => Err(format!(
                "Unknown dialect: {}. Valid options: mysql, postgres, sqlite",
                s
            )),
        }
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlDialect::MySql => write!(f, "mysql"),
            SqlDialect::Postgres => write!(f, "postgres"),
            SqlDialect::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl SqlDialect {
    /// Statement that moves a table's id sequence to `offset` after load.
    pub fn sequence_adjustment(&self, table: &str, offset: i64) -> String {
        match self {
            SqlDialect::MySql => format!("ALTER TABLE {} AUTO_INCREMENT = {};", table, offset),
            SqlDialect::Postgres => format!(
                "SELECT setval(pg_get_serial_sequence('{}', 'id'), {}, false);",
                table, offset
            ),
            SqlDialect::Sqlite => format!(
                "UPDATE sqlite_sequence SET seq = {} WHERE name = '{}';",
                offset, table
            ),
        }
    }
}

impl SqlDialect {
    /// Quoted string literal for `s`.
    ///
    /// MySQL gets backslash escapes. PostgreSQL and SQLite have no escape
    /// syntax in plain literals, so line breaks are spliced in with the
    /// engine's character function.
    pub fn quote_text(&self, s: &str) -> String {
        match self {
            SqlDialect::MySql => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('\'');
                for c in s.chars() {
                    match c {
                        '\'' => out.push_str("''"),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        c => out.push(c),
                    }
                }
                out.push('\'');
                out
            }
            SqlDialect::Postgres => splice_line_breaks(s, "chr"),
            SqlDialect::Sqlite => splice_line_breaks(s, "char"),
        }
    }

    /// Binary literal for `bytes`
    pub fn blob_literal(&self, bytes: &[u8]) -> String {
        match self {
            SqlDialect::Postgres => format!("'\\x{}'::bytea", hex::encode(bytes)),
            SqlDialect::MySql | SqlDialect::Sqlite => format!("X'{}'", hex::encode(bytes)),
        }
    }
}

fn plain_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// `'a' || chr(10) || 'b'` for text with line breaks; a plain literal otherwise
fn splice_line_breaks(s: &str, char_fn: &str) -> String {
    if !s.contains(['\n', '\r']) {
        return plain_literal(s);
    }

    let mut parts = Vec::new();
    let mut segment = String::new();
    for c in s.chars() {
        if c == '\n' || c == '\r' {
            parts.push(plain_literal(&segment));
            segment.clear();
            parts.push(format!("{}({})", char_fn, c as u32));
        } else {
            segment.push(c);
        }
    }
    parts.push(plain_literal(&segment));
    parts.join(" || ")
}
