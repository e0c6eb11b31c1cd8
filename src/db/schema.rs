use arrow::datatypes::{DataType, Schema as ArrowSchema};

use crate::error::IngestError;

/// SQL data type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Real,
    DoublePrecision,
    Numeric,
    Text,
    Timestamp,
    TimestampTz,
    Date,
    Bytea,
}

impl SqlType {
    /// Returns the Postgres type name
    pub fn to_postgres(&self) -> &'static str {
        match self {
            SqlType::Boolean => "BOOLEAN",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Real => "REAL",
            SqlType::DoublePrecision => "DOUBLE PRECISION",
            SqlType::Numeric => "NUMERIC",
            SqlType::Text => "TEXT",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::TimestampTz => "TIMESTAMP WITH TIME ZONE",
            SqlType::Date => "DATE",
            SqlType::Bytea => "BYTEA",
        }
    }

    /// Map an Arrow type to the narrowest SQL type that holds every value
    ///
    /// Unsigned integers widen by one step since Postgres has no unsigned types.
    pub fn from_arrow(data_type: &DataType) -> Option<SqlType> {
        Some(match data_type {
            DataType::Boolean => SqlType::Boolean,
            DataType::Int8 | DataType::Int16 | DataType::UInt8 => SqlType::SmallInt,
            DataType::Int32 | DataType::UInt16 => SqlType::Integer,
            DataType::Int64 | DataType::UInt32 => SqlType::BigInt,
            DataType::UInt64 | DataType::Decimal128(_, _) | DataType::Decimal256(_, _) => {
                SqlType::Numeric
            }
            DataType::Float16 | DataType::Float32 => SqlType::Real,
            DataType::Float64 => SqlType::DoublePrecision,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => SqlType::Text,
            DataType::Binary | DataType::LargeBinary => SqlType::Bytea,
            DataType::Date32 | DataType::Date64 => SqlType::Date,
            DataType::Timestamp(_, None) => SqlType::Timestamp,
            DataType::Timestamp(_, Some(_)) => SqlType::TimestampTz,
            DataType::Dictionary(_, value_type) => return SqlType::from_arrow(value_type),
            _ => return None,
        })
    }
}

/// A column in a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
}

/// A table schema (ordered collection of columns)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub columns: Vec<Column>,
}

impl Schema {
    /// Derive the table schema from the schema of a record batch
    pub fn from_arrow(schema: &ArrowSchema) -> Result<Schema, IngestError> {
        let columns = schema
            .fields()
            .iter()
            .map(|field| {
                let sql_type = SqlType::from_arrow(field.data_type()).ok_or_else(|| {
                    IngestError::UnsupportedColumnType {
                        column: field.name().clone(),
                        data_type: field.data_type().to_string(),
                    }
                })?;
                Ok(Column {
                    name: field.name().clone(),
                    sql_type,
                    nullable: field.is_nullable(),
                })
            })
            .collect::<Result<Vec<_>, IngestError>>()?;

        Ok(Schema { columns })
    }

    /// Describe the first difference between this schema and `other`
    ///
    /// Only names, order and types are compared; nullability may vary per batch.
    pub fn mismatch(&self, other: &Schema) -> Option<String> {
        for (idx, expected) in self.columns.iter().enumerate() {
            match other.columns.get(idx) {
                None => return Some(format!("column '{}' is missing", expected.name)),
                Some(actual) if actual.name != expected.name => {
                    return Some(format!(
                        "column {} is '{}', expected '{}'",
                        idx + 1,
                        actual.name,
                        expected.name
                    ));
                }
                Some(actual) if actual.sql_type != expected.sql_type => {
                    return Some(format!(
                        "column '{}' is {}, expected {}",
                        expected.name,
                        actual.sql_type.to_postgres(),
                        expected.sql_type.to_postgres()
                    ));
                }
                Some(_) => {}
            }
        }

        other
            .columns
            .get(self.columns.len())
            .map(|extra| format!("column '{}' is not in the table", extra.name))
    }
}

/// Quote an identifier for use in SQL, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Generate DDL statement for creating a table
pub fn generate_ddl(table_name: &str, schema: &Schema) -> String {
    let mut ddl = format!("CREATE TABLE {} (\n", quote_ident(table_name));

    let column_defs: Vec<String> = schema
        .columns
        .iter()
        .map(|col| {
            let nullable_clause = if col.nullable { "" } else { " NOT NULL" };
            format!(
                "  {} {}{}",
                quote_ident(&col.name),
                col.sql_type.to_postgres(),
                nullable_clause
            )
        })
        .collect();

    ddl.push_str(&column_defs.join(",\n"));
    ddl.push_str("\n);");

    ddl
}

pub fn drop_table_sql(table_name: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table_name))
}
