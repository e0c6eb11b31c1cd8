//! Multi-row INSERT statements and typed parameter binding.

use anyhow::{Context, Result, anyhow};

use super::schema::{Schema, SqlType, quote_ident};

pub(crate) type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

/// Type category for SQL type conversion strategy
#[derive(Debug, Clone, Copy, PartialEq)]
enum TypeCategory {
    /// Types parsed to native Rust values before binding (bool, integers, floats, NaiveDateTime)
    NativeParsed,
    /// Types bound as text and converted by PostgreSQL with CAST (NUMERIC, DATE, TIMESTAMPTZ, BYTEA)
    StringCast,
    /// Text bound directly
    DirectString,
}

impl TypeCategory {
    /// Classify a SQL type into its conversion category
    fn from_sql_type(sql_type: SqlType) -> Self {
        match sql_type {
            SqlType::Boolean
            | SqlType::SmallInt
            | SqlType::Integer
            | SqlType::BigInt
            | SqlType::Real
            | SqlType::DoublePrecision
            | SqlType::Timestamp => TypeCategory::NativeParsed,
            SqlType::Numeric | SqlType::Date | SqlType::TimestampTz | SqlType::Bytea => {
                TypeCategory::StringCast
            }
            SqlType::Text => TypeCategory::DirectString,
        }
    }
}

/// Number of rows that fit into one statement without exceeding `max_params`
pub fn rows_per_statement(num_columns: usize, max_params: usize) -> usize {
    (max_params / num_columns.max(1)).max(1)
}

/// Build `INSERT INTO "t" ("a", "b") VALUES ($1, $2), ($3, $4), ...`
///
/// With `use_pg_cast`, placeholders for text-bound types are wrapped in
/// `CAST(... AS type)` so PostgreSQL converts them on the way in.
pub fn build_insert_sql(
    table_name: &str,
    schema: &Schema,
    num_rows: usize,
    use_pg_cast: bool,
) -> String {
    let column_list = schema
        .columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut value_groups = Vec::with_capacity(num_rows);
    let mut param_idx = 1;

    for _ in 0..num_rows {
        let placeholders: Vec<String> = schema
            .columns
            .iter()
            .map(|col| {
                let placeholder = format!("${}", param_idx);
                param_idx += 1;

                if use_pg_cast
                    && TypeCategory::from_sql_type(col.sql_type) == TypeCategory::StringCast
                {
                    format!("CAST({} AS {})", placeholder, col.sql_type.to_postgres())
                } else {
                    placeholder
                }
            })
            .collect();
        value_groups.push(format!("({})", placeholders.join(", ")));
    }

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_ident(table_name),
        column_list,
        value_groups.join(", ")
    )
}

/// Bind record fields to query with proper types based on schema
pub fn bind_record_fields<'q>(
    mut query: PgQuery<'q>,
    fields: &'q [Option<String>],
    schema: &Schema,
) -> Result<PgQuery<'q>> {
    if fields.len() != schema.columns.len() {
        return Err(anyhow!(
            "Row has {} values but the table has {} columns",
            fields.len(),
            schema.columns.len()
        ));
    }

    for (field, column) in fields.iter().zip(&schema.columns) {
        query = bind_typed_value(query, field.as_deref(), column.sql_type)
            .with_context(|| format!("Invalid value for column '{}'", column.name))?;
    }

    Ok(query)
}

/// Bind a single value with proper type conversion
fn bind_typed_value<'q>(
    query: PgQuery<'q>,
    value: Option<&'q str>,
    sql_type: SqlType,
) -> Result<PgQuery<'q>> {
    let Some(value) = value else {
        return Ok(bind_null(query, sql_type));
    };

    Ok(match sql_type {
        SqlType::Boolean => query.bind(parse_bool(value)?),
        SqlType::SmallInt => query.bind(parse::<i16>(value, sql_type)?),
        SqlType::Integer => query.bind(parse::<i32>(value, sql_type)?),
        SqlType::BigInt => query.bind(parse::<i64>(value, sql_type)?),
        SqlType::Real => query.bind(parse::<f32>(value, sql_type)?),
        SqlType::DoublePrecision => query.bind(parse::<f64>(value, sql_type)?),
        SqlType::Timestamp => query.bind(parse_timestamp(value)?),

        // Text, plus everything converted by CAST() in the statement
        SqlType::Numeric
        | SqlType::Date
        | SqlType::TimestampTz
        | SqlType::Bytea
        | SqlType::Text => query.bind(value),
    })
}

/// Bind NULL value for the appropriate type
fn bind_null(query: PgQuery<'_>, sql_type: SqlType) -> PgQuery<'_> {
    match sql_type {
        SqlType::Boolean => query.bind(None::<bool>),
        SqlType::SmallInt => query.bind(None::<i16>),
        SqlType::Integer => query.bind(None::<i32>),
        SqlType::BigInt => query.bind(None::<i64>),
        SqlType::Real => query.bind(None::<f32>),
        SqlType::DoublePrecision => query.bind(None::<f64>),
        SqlType::Timestamp => query.bind(None::<chrono::NaiveDateTime>),
        _ => query.bind(None::<String>),
    }
}

/// Parse a value from string
fn parse<T: std::str::FromStr>(value: &str, sql_type: SqlType) -> Result<T>
where
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    value.parse().map_err(|e| {
        anyhow!(
            "Type mismatch: cannot convert '{}' to {}: {}",
            value,
            sql_type.to_postgres(),
            e
        )
    })
}

fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(anyhow!(
            "Type mismatch: cannot convert '{}' to BOOLEAN",
            other
        )),
    }
}

fn parse_timestamp(value: &str) -> Result<chrono::NaiveDateTime> {
    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f").map_err(|e| {
        anyhow!(
            "Type mismatch: cannot convert '{}' to TIMESTAMP: {}",
            value,
            e
        )
    })
}

/// Convert Postgres-style placeholders ($1, $2, ...) to SQLite-style (?, ?, ...)
#[cfg(test)]
pub fn convert_to_sqlite_placeholders(sql: &str) -> String {
    let mut result = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' {
            // Skip the dollar sign and any following digits
            while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                chars.next();
            }
            result.push('?');
        } else {
            result.push(ch);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::Column;

    fn schema(columns: &[(&str, SqlType)]) -> Schema {
        Schema {
            columns: columns
                .iter()
                .map(|(name, sql_type)| Column {
                    name: name.to_string(),
                    sql_type: *sql_type,
                    nullable: true,
                })
                .collect(),
        }
    }

    #[test]
    fn test_build_insert_sql_postgres() {
        let schema = schema(&[
            ("id", SqlType::BigInt),
            ("pickup_date", SqlType::Date),
            ("note", SqlType::Text),
        ]);

        let sql = build_insert_sql("trips", &schema, 2, true);

        assert_eq!(
            sql,
            "INSERT INTO \"trips\" (\"id\", \"pickup_date\", \"note\") VALUES \
             ($1, CAST($2 AS DATE), $3), ($4, CAST($5 AS DATE), $6)"
        );
    }

    #[test]
    fn test_build_insert_sql_without_cast() {
        let schema = schema(&[("id", SqlType::BigInt), ("amount", SqlType::Numeric)]);

        let sql = build_insert_sql("trips", &schema, 1, false);

        assert_eq!(sql, "INSERT INTO \"trips\" (\"id\", \"amount\") VALUES ($1, $2)");
        assert_eq!(
            convert_to_sqlite_placeholders(&sql),
            "INSERT INTO \"trips\" (\"id\", \"amount\") VALUES (?, ?)"
        );
    }

    #[test]
    fn test_rows_per_statement() {
        assert_eq!(rows_per_statement(3, 32_766), 10_922);
        assert_eq!(rows_per_statement(19, 32_766), 1_724);
        assert_eq!(rows_per_statement(50_000, 32_766), 1);
        assert_eq!(rows_per_statement(0, 32_766), 32_766);
    }

    #[test]
    fn test_bind_record_fields_rejects_width_mismatch() {
        let schema = schema(&[("id", SqlType::BigInt), ("note", SqlType::Text)]);
        let fields = vec![Some("1".to_string())];

        let result = bind_record_fields(sqlx::query("SELECT 1"), &fields, &schema);
        assert!(result.is_err());
    }

    #[test]
    fn test_bind_record_fields_reports_bad_value() {
        let schema = schema(&[("id", SqlType::Integer)]);
        let fields = vec![Some("not-a-number".to_string())];

        let err = bind_record_fields(sqlx::query("SELECT $1"), &fields, &schema)
            .err()
            .unwrap();
        let message = format!("{err:#}");
        assert!(message.contains("column 'id'"));
        assert!(message.contains("INTEGER"));
    }

    #[test]
    fn test_parsers() {
        assert!(parse_bool("true").unwrap());
        assert!(!parse_bool("false").unwrap());
        assert!(parse_bool("maybe").is_err());

        assert_eq!(parse::<i16>("-42", SqlType::SmallInt).unwrap(), -42);
        assert!(parse::<i16>("70000", SqlType::SmallInt).is_err());
        assert!(parse::<f64>("NaN", SqlType::DoublePrecision).unwrap().is_nan());

        let ts = parse_timestamp("2021-01-01 00:15:56.250").unwrap();
        assert_eq!(ts.to_string(), "2021-01-01 00:15:56.250");
        assert!(parse_timestamp("2021-01-01 00:15:56").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }
}
