//! Statement builders for the schema-editing forms.
//!
//! Every builder is a pure function from a structured descriptor to MariaDB
//! SQL text. Identifiers are always backtick-quoted; type expressions, view
//! selects, check conditions and routine bodies are passed through verbatim.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SqlGenerationError {
    #[error("{0} name cannot be empty")]
    EmptyName(&'static str),
    #[error("column `{0}` needs a data type")]
    EmptyDataType(String),
    #[error("{0} requires at least one column")]
    NoColumns(&'static str),
    #[error("{0} cannot be empty")]
    EmptyClause(&'static str),
    #[error("functions require a return type")]
    MissingReturnType,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub primary_key: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default_value: None,
            primary_key: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColumnChange {
    Add,
    #[default]
    Modify,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AlterColumn {
    #[serde(default)]
    pub change: ColumnChange,
    #[serde(flatten)]
    pub column: ColumnDefinition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerTiming {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoutineKind {
    Function,
    Procedure,
}

impl RoutineKind {
    fn keyword(self) -> &'static str {
        match self {
            Self::Function => "FUNCTION",
            Self::Procedure => "PROCEDURE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoutineParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(
    tag = "statement",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum DdlStatement {
    CreateTable {
        table: String,
        columns: Vec<ColumnDefinition>,
    },
    AlterTable {
        table: String,
        columns: Vec<AlterColumn>,
    },
    CreateIndex {
        name: String,
        table: String,
        columns: Vec<String>,
        #[serde(default)]
        unique: bool,
    },
    CreateView {
        name: String,
        select: String,
        #[serde(default)]
        or_replace: bool,
    },
    DropView {
        name: String,
    },
    AddCheck {
        table: String,
        name: String,
        condition: String,
    },
    DropCheck {
        table: String,
        name: String,
    },
    CreateTrigger {
        name: String,
        timing: TriggerTiming,
        event: TriggerEvent,
        table: String,
        body: String,
    },
    DropTrigger {
        name: String,
    },
    CreateRoutine {
        kind: RoutineKind,
        name: String,
        #[serde(default)]
        parameters: Vec<RoutineParameter>,
        #[serde(default)]
        returns: Option<String>,
        body: String,
    },
    DropRoutine {
        kind: RoutineKind,
        name: String,
    },
}

impl DdlStatement {
    pub fn to_sql(&self) -> Result<String, SqlGenerationError> {
        match self {
            Self::CreateTable { table, columns } => create_table_sql(table, columns),
            Self::AlterTable { table, columns } => alter_table_sql(table, columns),
            Self::CreateIndex {
                name,
                table,
                columns,
                unique,
            } => create_index_sql(name, table, columns, *unique),
            Self::CreateView {
                name,
                select,
                or_replace,
            } => create_view_sql(name, select, *or_replace),
            Self::DropView { name } => drop_view_sql(name),
            Self::AddCheck {
                table,
                name,
                condition,
            } => add_check_sql(table, name, condition),
            Self::DropCheck { table, name } => drop_check_sql(table, name),
            Self::CreateTrigger {
                name,
                timing,
                event,
                table,
                body,
            } => create_trigger_sql(name, *timing, *event, table, body),
            Self::DropTrigger { name } => drop_trigger_sql(name),
            Self::CreateRoutine {
                kind,
                name,
                parameters,
                returns,
                body,
            } => create_routine_sql(*kind, name, parameters, returns.as_deref(), body),
            Self::DropRoutine { kind, name } => drop_routine_sql(*kind, name),
        }
    }
}

#[must_use]
pub fn quote_identifier(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

/// Escapes text for use between single quotes in a MySQL string literal.
#[must_use]
pub fn escape_string_body(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

fn quote_sql_string(value: &str) -> String {
    format!("'{}'", escape_string_body(value))
}

fn quote_default_literal(value: &str) -> String {
    let trimmed = value.trim();
    if is_numeric_literal(trimmed)
        || trimmed.eq_ignore_ascii_case("NULL")
        || trimmed.eq_ignore_ascii_case("CURRENT_TIMESTAMP")
    {
        trimmed.to_string()
    } else {
        quote_sql_string(trimmed)
    }
}

/// Decimal literals only; `NaN` and `inf` parse as floats but are not SQL.
fn is_numeric_literal(value: &str) -> bool {
    value.bytes().any(|byte| byte.is_ascii_digit())
        && value
            .bytes()
            .all(|byte| byte.is_ascii_digit() || matches!(byte, b'+' | b'-' | b'.' | b'e' | b'E'))
        && value.parse::<f64>().is_ok_and(f64::is_finite)
}

fn checked_name<'a>(kind: &'static str, name: &'a str) -> Result<&'a str, SqlGenerationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SqlGenerationError::EmptyName(kind));
    }
    Ok(trimmed)
}

fn checked_clause<'a>(kind: &'static str, clause: &'a str) -> Result<&'a str, SqlGenerationError> {
    let trimmed = clause.trim().trim_end_matches(';').trim_end();
    if trimmed.is_empty() {
        return Err(SqlGenerationError::EmptyClause(kind));
    }
    Ok(trimmed)
}

fn column_definition_sql(column: &ColumnDefinition) -> Result<String, SqlGenerationError> {
    let name = checked_name("column", &column.name)?;
    let data_type = column.data_type.trim();
    if data_type.is_empty() {
        return Err(SqlGenerationError::EmptyDataType(name.to_string()));
    }

    let mut sql = format!("{} {data_type}", quote_identifier(name));
    if let Some(default_value) = column
        .default_value
        .as_deref()
        .filter(|value| !value.trim().is_empty())
    {
        sql.push_str(" DEFAULT ");
        sql.push_str(&quote_default_literal(default_value));
    }
    sql.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
    Ok(sql)
}

fn primary_key_list<'a>(columns: impl Iterator<Item = &'a ColumnDefinition>) -> Option<String> {
    let keys = columns
        .filter(|column| column.primary_key)
        .map(|column| quote_identifier(column.name.trim()))
        .collect::<Vec<_>>();
    (!keys.is_empty()).then(|| keys.join(", "))
}

pub fn create_table_sql(
    table: &str,
    columns: &[ColumnDefinition],
) -> Result<String, SqlGenerationError> {
    let table = checked_name("table", table)?;
    if columns.is_empty() {
        return Err(SqlGenerationError::NoColumns("table"));
    }

    let mut definitions = columns
        .iter()
        .map(column_definition_sql)
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(keys) = primary_key_list(columns.iter()) {
        definitions.push(format!("PRIMARY KEY ({keys})"));
    }

    Ok(format!(
        "CREATE TABLE {} (\n  {}\n)",
        quote_identifier(table),
        definitions.join(",\n  ")
    ))
}

pub fn alter_table_sql(table: &str, columns: &[AlterColumn]) -> Result<String, SqlGenerationError> {
    let table = checked_name("table", table)?;
    if columns.is_empty() {
        return Err(SqlGenerationError::NoColumns("table change"));
    }

    let mut clauses = Vec::with_capacity(columns.len() + 1);
    for alter in columns {
        let verb = match alter.change {
            ColumnChange::Add => "ADD COLUMN",
            ColumnChange::Modify => "MODIFY COLUMN",
        };
        clauses.push(format!("{verb} {}", column_definition_sql(&alter.column)?));
    }
    if let Some(keys) = primary_key_list(columns.iter().map(|alter| &alter.column)) {
        clauses.push(format!("ADD PRIMARY KEY ({keys})"));
    }

    Ok(format!(
        "ALTER TABLE {}\n  {}",
        quote_identifier(table),
        clauses.join(",\n  ")
    ))
}

pub fn create_index_sql(
    name: &str,
    table: &str,
    columns: &[String],
    unique: bool,
) -> Result<String, SqlGenerationError> {
    let name = checked_name("index", name)?;
    let table = checked_name("table", table)?;
    if columns.is_empty() {
        return Err(SqlGenerationError::NoColumns("index"));
    }
    let columns = columns
        .iter()
        .map(|column| checked_name("column", column).map(quote_identifier))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(format!(
        "CREATE {}INDEX {} ON {} ({})",
        if unique { "UNIQUE " } else { "" },
        quote_identifier(name),
        quote_identifier(table),
        columns.join(", ")
    ))
}

pub fn create_view_sql(
    name: &str,
    select: &str,
    or_replace: bool,
) -> Result<String, SqlGenerationError> {
    let name = checked_name("view", name)?;
    let select = checked_clause("view query", select)?;
    Ok(format!(
        "CREATE {}VIEW {} AS {select}",
        if or_replace { "OR REPLACE " } else { "" },
        quote_identifier(name)
    ))
}

pub fn drop_view_sql(name: &str) -> Result<String, SqlGenerationError> {
    let name = checked_name("view", name)?;
    Ok(format!("DROP VIEW IF EXISTS {}", quote_identifier(name)))
}

pub fn add_check_sql(table: &str, name: &str, condition: &str) -> Result<String, SqlGenerationError> {
    let table = checked_name("table", table)?;
    let name = checked_name("check", name)?;
    let condition = checked_clause("check condition", condition)?;
    Ok(format!(
        "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({condition})",
        quote_identifier(table),
        quote_identifier(name)
    ))
}

pub fn drop_check_sql(table: &str, name: &str) -> Result<String, SqlGenerationError> {
    let table = checked_name("table", table)?;
    let name = checked_name("check", name)?;
    Ok(format!(
        "ALTER TABLE {} DROP CONSTRAINT {}",
        quote_identifier(table),
        quote_identifier(name)
    ))
}

pub fn create_trigger_sql(
    name: &str,
    timing: TriggerTiming,
    event: TriggerEvent,
    table: &str,
    body: &str,
) -> Result<String, SqlGenerationError> {
    let name = checked_name("trigger", name)?;
    let table = checked_name("table", table)?;
    let body = checked_clause("trigger body", body)?;
    let timing = match timing {
        TriggerTiming::Before => "BEFORE",
        TriggerTiming::After => "AFTER",
    };
    let event = match event {
        TriggerEvent::Insert => "INSERT",
        TriggerEvent::Update => "UPDATE",
        TriggerEvent::Delete => "DELETE",
    };

    Ok(format!(
        "CREATE TRIGGER {} {timing} {event} ON {}\nFOR EACH ROW\n{body}",
        quote_identifier(name),
        quote_identifier(table)
    ))
}

pub fn drop_trigger_sql(name: &str) -> Result<String, SqlGenerationError> {
    let name = checked_name("trigger", name)?;
    Ok(format!("DROP TRIGGER IF EXISTS {}", quote_identifier(name)))
}

pub fn create_routine_sql(
    kind: RoutineKind,
    name: &str,
    parameters: &[RoutineParameter],
    returns: Option<&str>,
    body: &str,
) -> Result<String, SqlGenerationError> {
    let name = checked_name("routine", name)?;
    let body = checked_clause("routine body", body)?;
    let parameters = parameters
        .iter()
        .map(|parameter| {
            let parameter_name = checked_name("parameter", &parameter.name)?;
            let data_type = parameter.data_type.trim();
            if data_type.is_empty() {
                return Err(SqlGenerationError::EmptyDataType(parameter_name.to_string()));
            }
            Ok(format!("{} {data_type}", quote_identifier(parameter_name)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let returns = match (kind, returns.map(str::trim).filter(|value| !value.is_empty())) {
        (RoutineKind::Function, Some(return_type)) => format!(" RETURNS {return_type}"),
        (RoutineKind::Function, None) => return Err(SqlGenerationError::MissingReturnType),
        (RoutineKind::Procedure, _) => String::new(),
    };

    Ok(format!(
        "CREATE {} {}({}){returns}\nBEGIN\n{body};\nEND",
        kind.keyword(),
        quote_identifier(name),
        parameters.join(", ")
    ))
}

pub fn drop_routine_sql(kind: RoutineKind, name: &str) -> Result<String, SqlGenerationError> {
    let name = checked_name("routine", name)?;
    Ok(format!(
        "DROP {} IF EXISTS {}",
        kind.keyword(),
        quote_identifier(name)
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        add_check_sql, alter_table_sql, create_index_sql, create_routine_sql, create_table_sql,
        create_trigger_sql, create_view_sql, drop_check_sql, quote_identifier, AlterColumn,
        ColumnChange, ColumnDefinition, DdlStatement, RoutineKind, RoutineParameter,
        SqlGenerationError, TriggerEvent, TriggerTiming,
    };

    #[test]
    fn quotes_identifiers_with_backticks() {
        assert_eq!(quote_identifier("users"), "`users`");
        assert_eq!(quote_identifier("odd`name"), "`odd``name`");
    }

    #[test]
    fn create_table_collects_primary_keys_and_defaults() {
        let mut id = ColumnDefinition::new("id", "INT");
        id.nullable = false;
        id.primary_key = true;
        let mut status = ColumnDefinition::new("status", "VARCHAR(16)");
        status.default_value = Some("it's new".to_string());
        let mut stock = ColumnDefinition::new("stock", "INT");
        stock.default_value = Some("0".to_string());

        let sql = create_table_sql("products", &[id, status, stock]).expect("create table sql");
        assert_eq!(
            sql,
            "CREATE TABLE `products` (\n  \
             `id` INT NOT NULL,\n  \
             `status` VARCHAR(16) DEFAULT 'it''s new' NULL,\n  \
             `stock` INT DEFAULT 0 NULL,\n  \
             PRIMARY KEY (`id`)\n)"
        );
    }

    #[test]
    fn non_decimal_float_spellings_are_quoted_as_strings() {
        let columns = ["NaN", "inf", "Infinity", "-1.5e3", "1e999"]
            .iter()
            .enumerate()
            .map(|(index, default)| {
                let mut column = ColumnDefinition::new(format!("c{index}"), "VARCHAR(16)");
                column.default_value = Some((*default).to_string());
                column
            })
            .collect::<Vec<_>>();

        let sql = create_table_sql("labels", &columns).expect("create table sql");
        assert_eq!(
            sql,
            "CREATE TABLE `labels` (\n  \
             `c0` VARCHAR(16) DEFAULT 'NaN' NULL,\n  \
             `c1` VARCHAR(16) DEFAULT 'inf' NULL,\n  \
             `c2` VARCHAR(16) DEFAULT 'Infinity' NULL,\n  \
             `c3` VARCHAR(16) DEFAULT -1.5e3 NULL,\n  \
             `c4` VARCHAR(16) DEFAULT '1e999' NULL\n)"
        );
    }

    #[test]
    fn create_table_rejects_missing_names_and_types() {
        assert_eq!(
            create_table_sql(" ", &[ColumnDefinition::new("id", "INT")]),
            Err(SqlGenerationError::EmptyName("table"))
        );
        assert_eq!(
            create_table_sql("t", &[]),
            Err(SqlGenerationError::NoColumns("table"))
        );
        assert_eq!(
            create_table_sql("t", &[ColumnDefinition::new("", "INT")]),
            Err(SqlGenerationError::EmptyName("column"))
        );
        assert_eq!(
            create_table_sql("t", &[ColumnDefinition::new("id", "")]),
            Err(SqlGenerationError::EmptyDataType("id".to_string()))
        );
    }

    #[test]
    fn alter_table_mixes_added_and_modified_columns() {
        let columns = vec![
            AlterColumn {
                change: ColumnChange::Modify,
                column: ColumnDefinition::new("name", "VARCHAR(64)"),
            },
            AlterColumn {
                change: ColumnChange::Add,
                column: ColumnDefinition {
                    default_value: Some("CURRENT_TIMESTAMP".to_string()),
                    nullable: false,
                    ..ColumnDefinition::new("created_at", "TIMESTAMP")
                },
            },
        ];

        let sql = alter_table_sql("users", &columns).expect("alter table sql");
        assert_eq!(
            sql,
            "ALTER TABLE `users`\n  \
             MODIFY COLUMN `name` VARCHAR(64) NULL,\n  \
             ADD COLUMN `created_at` TIMESTAMP DEFAULT CURRENT_TIMESTAMP NOT NULL"
        );
    }

    #[test]
    fn index_view_and_check_statements() {
        assert_eq!(
            create_index_sql("idx_email", "users", &["email".to_string()], true),
            Ok("CREATE UNIQUE INDEX `idx_email` ON `users` (`email`)".to_string())
        );
        assert_eq!(
            create_view_sql("active_users", "SELECT * FROM users WHERE active = 1;", true),
            Ok("CREATE OR REPLACE VIEW `active_users` AS SELECT * FROM users WHERE active = 1"
                .to_string())
        );
        assert_eq!(
            add_check_sql("products", "chk_stock", "stock >= 0"),
            Ok("ALTER TABLE `products` ADD CONSTRAINT `chk_stock` CHECK (stock >= 0)".to_string())
        );
        assert_eq!(
            drop_check_sql("products", "chk_stock"),
            Ok("ALTER TABLE `products` DROP CONSTRAINT `chk_stock`".to_string())
        );
    }

    #[test]
    fn trigger_wraps_body_for_each_row() {
        let sql = create_trigger_sql(
            "trg_audit",
            TriggerTiming::After,
            TriggerEvent::Insert,
            "orders",
            "INSERT INTO audit (order_id) VALUES (NEW.id);",
        )
        .expect("trigger sql");
        assert_eq!(
            sql,
            "CREATE TRIGGER `trg_audit` AFTER INSERT ON `orders`\nFOR EACH ROW\n\
             INSERT INTO audit (order_id) VALUES (NEW.id)"
        );
    }

    #[test]
    fn functions_need_return_types_procedures_do_not() {
        let parameters = vec![RoutineParameter {
            name: "qty".to_string(),
            data_type: "INT".to_string(),
        }];

        assert_eq!(
            create_routine_sql(RoutineKind::Function, "double_it", &parameters, None, "RETURN qty * 2"),
            Err(SqlGenerationError::MissingReturnType)
        );

        let function = create_routine_sql(
            RoutineKind::Function,
            "double_it",
            &parameters,
            Some("INT"),
            "RETURN qty * 2",
        )
        .expect("function sql");
        assert_eq!(
            function,
            "CREATE FUNCTION `double_it`(`qty` INT) RETURNS INT\nBEGIN\nRETURN qty * 2;\nEND"
        );

        let procedure =
            create_routine_sql(RoutineKind::Procedure, "noop", &[], Some("INT"), "SELECT 1")
                .expect("procedure sql");
        assert_eq!(procedure, "CREATE PROCEDURE `noop`()\nBEGIN\nSELECT 1;\nEND");
    }

    #[test]
    fn statements_deserialize_from_tagged_json() {
        let statement: DdlStatement = serde_json::from_value(json!({
            "statement": "createTable",
            "table": "t",
            "columns": [{"name": "id", "type": "INT", "nullable": false, "primaryKey": true}]
        }))
        .expect("statement should deserialize");
        assert_eq!(
            statement.to_sql(),
            Ok("CREATE TABLE `t` (\n  `id` INT NOT NULL,\n  PRIMARY KEY (`id`)\n)".to_string())
        );

        let statement: DdlStatement = serde_json::from_value(json!({
            "statement": "dropRoutine",
            "kind": "FUNCTION",
            "name": "double_it"
        }))
        .expect("statement should deserialize");
        assert_eq!(
            statement.to_sql(),
            Ok("DROP FUNCTION IF EXISTS `double_it`".to_string())
        );
    }
}
