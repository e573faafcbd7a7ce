use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::ddl::escape_string_body;

/// Token in a template's table or where clause that is replaced by the active
/// database name.
pub const DATABASE_PLACEHOLDER: &str = "DB_NAME";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTemplate {
    pub columns: &'static [&'static str],
    pub table: &'static str,
    pub where_clause: Option<&'static str>,
}

impl QueryTemplate {
    /// Renders the `SELECT`, embedding `database` as an escaped string literal body.
    #[must_use]
    pub fn render(&self, database: &str) -> String {
        let database = escape_string_body(database);
        let table = self.table.replace(DATABASE_PLACEHOLDER, &database);
        let mut sql = format!("SELECT {} FROM {table}", self.columns.join(", "));
        if let Some(where_clause) = self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause.replace(DATABASE_PLACEHOLDER, &database));
        }
        sql
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("query `{0}` not found")]
pub struct UnknownQuery(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrospectionQuery {
    Tables,
    PrimaryKeys,
    ForeignKeys,
    Indexes,
    Routines,
    Triggers,
    Views,
    Checks,
}

impl IntrospectionQuery {
    pub const ALL: [Self; 8] = [
        Self::Tables,
        Self::PrimaryKeys,
        Self::ForeignKeys,
        Self::Indexes,
        Self::Routines,
        Self::Triggers,
        Self::Views,
        Self::Checks,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Tables => "tables",
            Self::PrimaryKeys => "pk",
            Self::ForeignKeys => "fk",
            Self::Indexes => "indices",
            Self::Routines => "procedures",
            Self::Triggers => "triggers",
            Self::Views => "views",
            Self::Checks => "checks",
        }
    }

    #[must_use]
    pub fn template(self) -> &'static QueryTemplate {
        match self {
            Self::Tables => &TABLES,
            Self::PrimaryKeys => &PRIMARY_KEYS,
            Self::ForeignKeys => &FOREIGN_KEYS,
            Self::Indexes => &INDEXES,
            Self::Routines => &ROUTINES,
            Self::Triggers => &TRIGGERS,
            Self::Views => &VIEWS,
            Self::Checks => &CHECKS,
        }
    }
}

impl FromStr for IntrospectionQuery {
    type Err = UnknownQuery;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|query| query.name() == name)
            .ok_or_else(|| UnknownQuery(name.to_string()))
    }
}

impl fmt::Display for IntrospectionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const TABLES: QueryTemplate = QueryTemplate {
    columns: &["table_name"],
    table: "information_schema.tables",
    where_clause: Some("table_schema = 'DB_NAME'"),
};

const PRIMARY_KEYS: QueryTemplate = QueryTemplate {
    columns: &["table_name", "index_name", "column_name", "index_type"],
    table: "information_schema.statistics",
    where_clause: Some("table_schema = 'DB_NAME' AND index_name = 'PRIMARY'"),
};

const FOREIGN_KEYS: QueryTemplate = QueryTemplate {
    columns: &[
        "table_name",
        "column_name",
        "constraint_name",
        "referenced_table_name",
        "referenced_column_name",
    ],
    table: "information_schema.key_column_usage",
    where_clause: Some("referenced_table_name IS NOT NULL AND table_schema = 'DB_NAME'"),
};

const INDEXES: QueryTemplate = QueryTemplate {
    columns: &["table_name", "index_name", "column_name", "index_type"],
    table: "information_schema.statistics",
    where_clause: Some("table_schema = 'DB_NAME' AND index_name != 'PRIMARY'"),
};

const ROUTINES: QueryTemplate = QueryTemplate {
    columns: &["routine_type", "routine_name"],
    table: "information_schema.routines",
    where_clause: None,
};

const TRIGGERS: QueryTemplate = QueryTemplate {
    columns: &[
        "trigger_name",
        "event_manipulation",
        "event_object_table",
        "action_statement",
    ],
    table: "information_schema.triggers",
    where_clause: None,
};

const VIEWS: QueryTemplate = QueryTemplate {
    columns: &["table_schema", "table_name"],
    table: "information_schema.tables",
    where_clause: Some("table_type = 'VIEW'"),
};

const CHECKS: QueryTemplate = QueryTemplate {
    columns: &["constraint_name", "table_name", "check_clause"],
    table: "information_schema.check_constraints",
    where_clause: None,
};
