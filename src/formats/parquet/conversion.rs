//! Conversion from Arrow RecordBatch to row-based Records.
//!
//! Every value is rendered as text in a form PostgreSQL accepts for the column
//! type the table was created with; nulls become `None`. The loader parses
//! numeric and timestamp text back to native values when binding.

use anyhow::{Context, Result, anyhow};
use arrow::array::*;
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Decimal128Type, Decimal256Type, Float16Type, Float32Type,
    Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, TimeUnit, TimestampMicrosecondType,
    TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType, UInt8Type, UInt16Type,
    UInt32Type, UInt64Type,
};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};

use crate::formats::reader::Record;

const NAIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const ZONED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%:z";

/// Convert an Arrow RecordBatch to a vector of Records, preserving row order
pub fn record_batch_to_records(batch: &RecordBatch) -> Result<Vec<Record>> {
    let num_rows = batch.num_rows();
    let num_columns = batch.num_columns();

    if num_rows == 0 {
        return Ok(Vec::new());
    }

    let mut column_strings: Vec<Vec<Option<String>>> = Vec::with_capacity(num_columns);
    for (col_idx, field) in batch.schema().fields().iter().enumerate() {
        let array = batch.column(col_idx);
        let strings = array_to_strings(array.as_ref()).with_context(|| {
            format!(
                "Failed to convert column '{}' ({:?}) to text",
                field.name(),
                array.data_type()
            )
        })?;
        column_strings.push(strings);
    }

    // Transpose to rows, draining each column so values are moved rather than cloned
    let mut column_iters: Vec<_> = column_strings.into_iter().map(Vec::into_iter).collect();
    let mut records = Vec::with_capacity(num_rows);
    for _ in 0..num_rows {
        let fields = column_iters
            .iter_mut()
            .map(|col| col.next().flatten())
            .collect();
        records.push(Record { fields });
    }

    Ok(records)
}

/// Convert an Arrow array to a vector of optional string representations
fn array_to_strings(array: &dyn Array) -> Result<Vec<Option<String>>> {
    let mut strings = Vec::with_capacity(array.len());

    match array.data_type() {
        DataType::Boolean => {
            let arr = array.as_boolean();
            strings.extend(arr.iter().map(|v| v.map(|b| b.to_string())));
        }
        DataType::Int8 => convert_primitive::<Int8Type>(array, &mut strings),
        DataType::Int16 => convert_primitive::<Int16Type>(array, &mut strings),
        DataType::Int32 => convert_primitive::<Int32Type>(array, &mut strings),
        DataType::Int64 => convert_primitive::<Int64Type>(array, &mut strings),
        DataType::UInt8 => convert_primitive::<UInt8Type>(array, &mut strings),
        DataType::UInt16 => convert_primitive::<UInt16Type>(array, &mut strings),
        DataType::UInt32 => convert_primitive::<UInt32Type>(array, &mut strings),
        DataType::UInt64 => convert_primitive::<UInt64Type>(array, &mut strings),
        DataType::Float16 => convert_primitive::<Float16Type>(array, &mut strings),
        DataType::Float32 => convert_primitive::<Float32Type>(array, &mut strings),
        DataType::Float64 => convert_primitive::<Float64Type>(array, &mut strings),
        DataType::Utf8 => {
            let arr = array.as_string::<i32>();
            strings.extend(arr.iter().map(|v| v.map(str::to_string)));
        }
        DataType::LargeUtf8 => {
            let arr = array.as_string::<i64>();
            strings.extend(arr.iter().map(|v| v.map(str::to_string)));
        }
        DataType::Utf8View => {
            let arr = array.as_string_view();
            strings.extend(arr.iter().map(|v| v.map(str::to_string)));
        }
        DataType::Binary => {
            let arr = array.as_binary::<i32>();
            strings.extend(arr.iter().map(|v| v.map(bytea_hex)));
        }
        DataType::LargeBinary => {
            let arr = array.as_binary::<i64>();
            strings.extend(arr.iter().map(|v| v.map(bytea_hex)));
        }
        DataType::Date32 => {
            let arr = array.as_primitive::<Date32Type>();
            for value in arr.iter() {
                strings.push(match value {
                    Some(days) => {
                        let date = DateTime::from_timestamp(days as i64 * 86_400, 0)
                            .context("Date out of range")?;
                        Some(date.format("%Y-%m-%d").to_string())
                    }
                    None => None,
                });
            }
        }
        DataType::Date64 => {
            let arr = array.as_primitive::<Date64Type>();
            for value in arr.iter() {
                strings.push(match value {
                    Some(millis) => {
                        let date =
                            DateTime::from_timestamp_millis(millis).context("Date out of range")?;
                        Some(date.format("%Y-%m-%d").to_string())
                    }
                    None => None,
                });
            }
        }
        DataType::Timestamp(unit, tz) => {
            convert_timestamp(array, unit, tz.is_some(), &mut strings)?;
        }
        DataType::Decimal128(_, scale) => {
            let arr = array.as_primitive::<Decimal128Type>();
            strings.extend(
                arr.iter()
                    .map(|v| v.map(|value| format_decimal(value.to_string(), *scale))),
            );
        }
        DataType::Decimal256(_, scale) => {
            let arr = array.as_primitive::<Decimal256Type>();
            strings.extend(
                arr.iter()
                    .map(|v| v.map(|value| format_decimal(value.to_string(), *scale))),
            );
        }
        DataType::Dictionary(_, value_type) => {
            // Materialize the dictionary into a plain array of its value type
            let values = arrow::compute::cast(array, value_type)
                .context("Failed to unpack dictionary array")?;
            return array_to_strings(values.as_ref());
        }
        other => {
            return Err(anyhow!("Unsupported array type for conversion: {:?}", other));
        }
    }

    Ok(strings)
}

/// Helper to convert primitive arrays
fn convert_primitive<T: ArrowPrimitiveType>(array: &dyn Array, strings: &mut Vec<Option<String>>)
where
    T::Native: std::fmt::Display,
{
    let arr = array.as_primitive::<T>();
    strings.extend(arr.iter().map(|v| v.map(|value| value.to_string())));
}

/// Convert timestamp arrays to strings
///
/// Zoned timestamps are stored as UTC instants in Arrow, so they are rendered
/// with an explicit `+00:00` offset.
fn convert_timestamp(
    array: &dyn Array,
    unit: &TimeUnit,
    zoned: bool,
    strings: &mut Vec<Option<String>>,
) -> Result<()> {
    let to_datetime: fn(i64) -> Option<DateTime<Utc>> = match unit {
        TimeUnit::Second => |v| DateTime::from_timestamp(v, 0),
        TimeUnit::Millisecond => DateTime::from_timestamp_millis,
        TimeUnit::Microsecond => DateTime::from_timestamp_micros,
        TimeUnit::Nanosecond => |v| Some(DateTime::from_timestamp_nanos(v)),
    };

    let values: Vec<Option<i64>> = match unit {
        TimeUnit::Second => array.as_primitive::<TimestampSecondType>().iter().collect(),
        TimeUnit::Millisecond => array
            .as_primitive::<TimestampMillisecondType>()
            .iter()
            .collect(),
        TimeUnit::Microsecond => array
            .as_primitive::<TimestampMicrosecondType>()
            .iter()
            .collect(),
        TimeUnit::Nanosecond => array
            .as_primitive::<TimestampNanosecondType>()
            .iter()
            .collect(),
    };

    let format = if zoned {
        ZONED_TIMESTAMP_FORMAT
    } else {
        NAIVE_TIMESTAMP_FORMAT
    };

    for value in values {
        strings.push(match value {
            Some(v) => {
                let datetime = to_datetime(v).context("Timestamp out of range")?;
                Some(datetime.format(format).to_string())
            }
            None => None,
        });
    }
    Ok(())
}

/// Render bytes in PostgreSQL's hex BYTEA input format
fn bytea_hex(bytes: &[u8]) -> String {
    format!("\\x{}", hex::encode(bytes))
}

/// Place the decimal point into the unscaled integer digits of a decimal value
fn format_decimal(digits: String, scale: i8) -> String {
    if scale <= 0 {
        if digits == "0" {
            return digits;
        }
        return format!("{}{}", digits, "0".repeat(scale.unsigned_abs() as usize));
    }

    let scale = scale as usize;
    let (sign, magnitude) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits.as_str()),
    };

    let padded = format!("{:0>width$}", magnitude, width = scale + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);

    format!("{}{}.{}", sign, int_part, frac_part)
}
