//! Parquet fixtures shared by unit and integration tests.

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::path::Path;
use std::sync::Arc;

pub fn id_name_value_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, true),
        Field::new("value", DataType::Float64, true),
    ]))
}

/// Batch holding rows `start..end` as `(id, "name_{id}", id * 1.5)`
pub fn id_name_value_batch(start: usize, end: usize) -> RecordBatch {
    let ids = Int64Array::from_iter_values(start as i64..end as i64);
    let names = StringArray::from_iter_values((start..end).map(|i| format!("name_{i}")));
    let values = Float64Array::from_iter_values((start..end).map(|i| i as f64 * 1.5));

    RecordBatch::try_new(
        id_name_value_schema(),
        vec![
            Arc::new(ids) as ArrayRef,
            Arc::new(names),
            Arc::new(values),
        ],
    )
    .unwrap()
}

/// Like [`id_name_value_batch`] with an extra `extra` column the base schema lacks
pub fn batch_with_extra_column(start: usize, end: usize) -> RecordBatch {
    let base = id_name_value_batch(start, end);
    let mut fields: Vec<Field> = base
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    fields.push(Field::new("extra", DataType::Utf8, true));

    let mut columns = base.columns().to_vec();
    columns.push(Arc::new(StringArray::from_iter_values(
        (start..end).map(|i| format!("extra_{i}")),
    )));

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap()
}

/// Write `batches` to a Parquet file at `path`
pub fn write_parquet(path: &Path, batches: &[RecordBatch], row_group_size: usize) {
    let schema = batches[0].schema();
    let props = WriterProperties::builder()
        .set_max_row_group_size(row_group_size)
        .build();

    let file = std::fs::File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props)).unwrap();
    for batch in batches {
        writer.write(batch).unwrap();
    }
    writer.close().unwrap();
}

/// Serialize `batches` to Parquet bytes in memory
pub fn parquet_bytes(batches: &[RecordBatch], row_group_size: usize) -> Vec<u8> {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("fixture.parquet");
    write_parquet(&path, batches, row_group_size);
    std::fs::read(path).unwrap()
}
