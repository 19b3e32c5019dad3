//! LanceDB vector store (embedded, no server required)
//!
//! One table per collection. Every stored field is its own column so filters
//! translate directly into LanceDB SQL predicates.

use super::{IndexedDocument, MetadataFilter, StoredHit, StoredMetadata, VectorStore};
use crate::error::{Result, StorageError};
use crate::types::ATTRIBUTE_KEYS;
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt32Array, types::Float32Type,
};
use arrow_schema::{DataType, Field, Schema};
use futures::stream::TryStreamExt;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use std::collections::BTreeMap;
use std::sync::Arc;

const VECTOR_COLUMN: &str = "vector";
const DISTANCE_COLUMN: &str = "_distance";

/// String columns in schema order, after `vector`
const TEXT_COLUMNS: [&str; 7] = [
    "id",
    "document_text",
    "source_file",
    "class_name",
    "method_name",
    "chunk_type",
    "archive",
];

pub struct LanceVectorStore {
    connection: Connection,
    table_name: String,
    db_path: String,
    dimension: usize,
}

impl LanceVectorStore {
    /// Connect to the database at `db_path` and make sure the collection table exists
    pub async fn open(db_path: &str, collection: &str, dimension: usize) -> Result<Self> {
        tracing::info!("Connecting to LanceDB at: {}", db_path);

        let connection = lancedb::connect(db_path)
            .execute()
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        let store = Self {
            connection,
            table_name: collection.to_string(),
            db_path: db_path.to_string(),
            dimension,
        };
        store.ensure_table().await?;
        Ok(store)
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    fn create_schema(dimension: usize) -> Arc<Schema> {
        let mut fields = vec![Field::new(
            VECTOR_COLUMN,
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dimension as i32,
            ),
            false,
        )];
        fields.extend(
            TEXT_COLUMNS
                .iter()
                .map(|name| Field::new(*name, DataType::Utf8, false)),
        );
        fields.push(Field::new("start_line", DataType::UInt32, false));
        fields.push(Field::new("end_line", DataType::UInt32, false));
        fields.push(Field::new("content", DataType::Utf8, false));
        fields.extend(
            ATTRIBUTE_KEYS
                .iter()
                .map(|name| Field::new(*name, DataType::Utf8, false)),
        );
        Arc::new(Schema::new(fields))
    }

    async fn table_exists(&self) -> Result<bool> {
        let names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| StorageError::CollectionUnavailable {
                collection: self.table_name.clone(),
                reason: e.to_string(),
            })?;
        Ok(names.contains(&self.table_name))
    }

    async fn ensure_table(&self) -> Result<()> {
        if self.table_exists().await? {
            tracing::debug!("Table '{}' already exists", self.table_name);
            return Ok(());
        }

        let schema = Self::create_schema(self.dimension);
        let empty_batch = RecordBatch::new_empty(schema.clone());
        let batches = RecordBatchIterator::new(vec![empty_batch].into_iter().map(Ok), schema);

        self.connection
            .create_table(&self.table_name, Box::new(batches))
            .execute()
            .await
            .map_err(|e| StorageError::CollectionCreationFailed {
                collection: self.table_name.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(
            "Created table '{}' (dimension {})",
            self.table_name,
            self.dimension
        );
        Ok(())
    }

    async fn get_table(&self) -> Result<Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| {
                StorageError::CollectionUnavailable {
                    collection: self.table_name.clone(),
                    reason: e.to_string(),
                }
                .into()
            })
    }

    fn create_record_batch(
        &self,
        documents: &[IndexedDocument],
        schema: Arc<Schema>,
    ) -> Result<RecordBatch> {
        if let Some(bad) = documents.iter().find(|d| d.embedding.len() != self.dimension) {
            return Err(StorageError::WriteFailed(format!(
                "document {} has dimension {}, collection expects {}",
                bad.id,
                bad.embedding.len(),
                self.dimension
            ))
            .into());
        }

        let vector_array = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            documents
                .iter()
                .map(|d| Some(d.embedding.iter().copied().map(Some))),
            self.dimension as i32,
        );

        let text = |f: fn(&IndexedDocument) -> &str| -> Arc<dyn Array> {
            Arc::new(StringArray::from(documents.iter().map(f).collect::<Vec<_>>()))
        };
        let line = |f: fn(&IndexedDocument) -> usize| -> Arc<dyn Array> {
            Arc::new(UInt32Array::from(
                documents.iter().map(|d| f(d) as u32).collect::<Vec<_>>(),
            ))
        };

        let mut columns: Vec<Arc<dyn Array>> = vec![
            Arc::new(vector_array),
            text(|d| d.id.as_str()),
            text(|d| d.document_text.as_str()),
            text(|d| d.metadata.source_file.as_str()),
            text(|d| d.metadata.class_name.as_str()),
            text(|d| d.metadata.method_name.as_str()),
            text(|d| d.metadata.chunk_type.as_str()),
            text(|d| d.metadata.archive.as_str()),
            line(|d| d.metadata.start_line),
            line(|d| d.metadata.end_line),
            text(|d| d.metadata.content.as_str()),
        ];
        for key in ATTRIBUTE_KEYS {
            columns.push(Arc::new(StringArray::from(
                documents
                    .iter()
                    .map(|d| d.metadata.attributes.get(key).map(String::as_str).unwrap_or(""))
                    .collect::<Vec<_>>(),
            )));
        }

        RecordBatch::try_new(schema, columns)
            .map_err(|e| StorageError::WriteFailed(format!("Failed to create RecordBatch: {}", e)).into())
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| StorageError::MalformedRecord(format!("missing or invalid {} column", name)).into())
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<UInt32Array>())
        .ok_or_else(|| StorageError::MalformedRecord(format!("missing or invalid {} column", name)).into())
}

/// Decoded columns of one result batch
struct BatchColumns<'a> {
    id: &'a StringArray,
    document_text: &'a StringArray,
    source_file: &'a StringArray,
    class_name: &'a StringArray,
    method_name: &'a StringArray,
    chunk_type: &'a StringArray,
    archive: &'a StringArray,
    start_line: &'a UInt32Array,
    end_line: &'a UInt32Array,
    content: &'a StringArray,
    attributes: Vec<(&'static str, &'a StringArray)>,
}

impl<'a> BatchColumns<'a> {
    fn decode(batch: &'a RecordBatch) -> Result<Self> {
        let attributes = ATTRIBUTE_KEYS
            .iter()
            .map(|key| string_column(batch, key).map(|col| (*key, col)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id: string_column(batch, "id")?,
            document_text: string_column(batch, "document_text")?,
            source_file: string_column(batch, "source_file")?,
            class_name: string_column(batch, "class_name")?,
            method_name: string_column(batch, "method_name")?,
            chunk_type: string_column(batch, "chunk_type")?,
            archive: string_column(batch, "archive")?,
            start_line: u32_column(batch, "start_line")?,
            end_line: u32_column(batch, "end_line")?,
            content: string_column(batch, "content")?,
            attributes,
        })
    }

    fn metadata(&self, i: usize) -> StoredMetadata {
        StoredMetadata {
            source_file: self.source_file.value(i).to_string(),
            class_name: self.class_name.value(i).to_string(),
            method_name: self.method_name.value(i).to_string(),
            chunk_type: self.chunk_type.value(i).to_string(),
            archive: self.archive.value(i).to_string(),
            start_line: self.start_line.value(i) as usize,
            end_line: self.end_line.value(i) as usize,
            content: self.content.value(i).to_string(),
            attributes: self
                .attributes
                .iter()
                .map(|(key, col)| (key.to_string(), col.value(i).to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }
}

#[async_trait::async_trait]
impl VectorStore for LanceVectorStore {
    fn collection_name(&self) -> &str {
        &self.table_name
    }

    async fn upsert(&self, documents: Vec<IndexedDocument>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let schema = Self::create_schema(self.dimension);
        let batch = self.create_record_batch(&documents, schema.clone())?;
        let count = batch.num_rows();
        let reader = RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema);

        let table = self.get_table().await?;
        let mut merge = table.merge_insert(&["id"]);
        merge
            .when_matched_update_all(None)
            .when_not_matched_insert_all();
        merge
            .execute(Box::new(reader))
            .await
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;

        tracing::debug!("Upserted {} documents into '{}'", count, self.table_name);
        Ok(count)
    }

    async fn query(
        &self,
        embedding: Vec<f32>,
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<StoredHit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let table = self.get_table().await?;
        let query = table
            .vector_search(embedding)
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?
            .distance_type(DistanceType::Cosine)
            .limit(top_k);

        let stream = match filter.to_sql() {
            Some(predicate) => query.only_if(predicate).execute().await,
            None => query.execute().await,
        }
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let mut hits = Vec::new();
        for batch in &batches {
            let columns = BatchColumns::decode(batch)?;
            let distances = batch
                .column_by_name(DISTANCE_COLUMN)
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| StorageError::MalformedRecord("missing _distance column".into()))?;

            for i in 0..batch.num_rows() {
                hits.push(StoredHit {
                    id: columns.id.value(i).to_string(),
                    document_text: columns.document_text.value(i).to_string(),
                    metadata: columns.metadata(i),
                    distance: distances.value(i) as f64,
                });
            }
        }

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        let table = self.get_table().await?;
        table
            .count_rows(None)
            .await
            .map_err(|e| StorageError::CountFailed(e.to_string()).into())
    }

    async fn sample(&self, limit: usize) -> Result<Vec<StoredMetadata>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let table = self.get_table().await?;
        let stream = table
            .query()
            .limit(limit)
            .execute()
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let mut sample = Vec::new();
        for batch in &batches {
            let columns = BatchColumns::decode(batch)?;
            sample.extend((0..batch.num_rows()).map(|i| columns.metadata(i)));
        }
        sample.truncate(limit);
        Ok(sample)
    }

    async fn delete_where(&self, field: &str, value: &str) -> Result<usize> {
        let Some(predicate) = MetadataFilter::new().with(field, value)?.to_sql() else {
            return Ok(0);
        };
        let table = self.get_table().await?;

        let matching = table
            .count_rows(Some(predicate.clone()))
            .await
            .map_err(|e| StorageError::CountFailed(e.to_string()))?;
        if matching == 0 {
            return Ok(0);
        }

        table
            .delete(&predicate)
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        tracing::info!(
            "Deleted {} documents where {} from '{}'",
            matching,
            predicate,
            self.table_name
        );
        Ok(matching)
    }

    async fn reset(&self) -> Result<()> {
        match self.connection.drop_table(&self.table_name, &[]).await {
            Ok(()) => tracing::info!("Dropped table '{}'", self.table_name),
            Err(lancedb::Error::TableNotFound { .. }) => {
                tracing::debug!("Table '{}' did not exist", self.table_name)
            }
            Err(e) => return Err(StorageError::DeleteFailed(e.to_string()).into()),
        }
        self.ensure_table().await
    }
}
