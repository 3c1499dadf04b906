
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use tracing::{debug, info, warn};

use super::{ChunkRecord, SearchResult, VectorStoreConfig};
use crate::llm::Embedder;
use crate::loader::{Document, DocumentMetadata};
use crate::retriever::mmr::maximal_marginal_relevance;
use crate::{RagError, Result};

/// Persistent embedding index backed by a LanceDB table
pub struct VectorStore {
    connection: Connection,
    embedder: Arc<dyn Embedder>,
    persist_directory: PathBuf,
    table_name: String,
}

/// Cheap, cloneable read handle over the store's collection
#[derive(Clone)]
pub struct VectorStoreHandle {
    connection: Connection,
    embedder: Arc<dyn Embedder>,
    table_name: String,
}

impl std::fmt::Debug for VectorStore {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("persist_directory", &self.persist_directory)
            .field("table_name", &self.table_name)
            .field("embedder", &self.embedder.model_name())
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for VectorStoreHandle {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStoreHandle")
            .field("table_name", &self.table_name)
            .finish_non_exhaustive()
    }
}

impl VectorStore {
    /// Open (or create) the store described by `config`.
    ///
    /// The collection itself is created on the first [`add_documents`](Self::add_documents),
    /// once the embedding dimension is known.
    #[inline]
    pub async fn new(
        embedder: Option<Arc<dyn Embedder>>,
        config: &VectorStoreConfig,
    ) -> Result<Self> {
        let embedder = embedder.ok_or(RagError::UnavailableDependency("Embeddings"))?;

        let persist_directory = config.persist_directory.clone();
        let connection = connect(&persist_directory).await?;

        info!(
            "Vector store opened at {} (collection {})",
            persist_directory.display(),
            config.collection_name
        );

        Ok(Self {
            connection,
            embedder,
            persist_directory,
            table_name: config.collection_name.clone(),
        })
    }

    #[inline]
    pub fn persist_directory(&self) -> &Path {
        &self.persist_directory
    }

    /// Embed `documents` and append them to the collection, returning the
    /// number of rows written
    #[inline]
    pub async fn add_documents(&self, documents: &[Document]) -> Result<usize> {
        if documents.is_empty() {
            debug!("No documents to store");
            return Ok(0);
        }

        let texts: Vec<String> = documents.iter().map(|d| d.page_content.clone()).collect();
        let vectors = self.embedder.embed_documents(&texts)?;

        if vectors.len() != documents.len() {
            return Err(RagError::Provider(format!(
                "Expected {} embeddings, got {}",
                documents.len(),
                vectors.len()
            )));
        }

        let records: Vec<ChunkRecord> = documents
            .iter()
            .zip(vectors)
            .map(|(document, vector)| ChunkRecord::new(document, vector))
            .collect();

        self.store_records(&records).await?;
        Ok(records.len())
    }

    async fn store_records(&self, records: &[ChunkRecord]) -> Result<()> {
        let vector_dim = records.first().map_or(0, |r| r.vector.len());
        if vector_dim == 0 {
            return Err(RagError::Provider("Embedding vectors are empty".to_string()));
        }
        if let Some(bad) = records.iter().find(|r| r.vector.len() != vector_dim) {
            return Err(RagError::Database(format!(
                "Inconsistent embedding dimensions in batch: {} vs {}",
                vector_dim,
                bad.vector.len()
            )));
        }

        let table = match open_existing(&self.connection, &self.table_name).await? {
            Some(table) => {
                let existing = table_vector_dimension(&table).await?;
                if existing != vector_dim {
                    return Err(RagError::Database(format!(
                        "Collection {} stores {}-dimensional vectors but the embedder produced {}",
                        self.table_name, existing, vector_dim
                    )));
                }
                table
            }
            None => {
                info!(
                    "Creating collection {} with {} dimensions",
                    self.table_name, vector_dim
                );
                self.connection
                    .create_empty_table(&self.table_name, create_schema(vector_dim)?)
                    .execute()
                    .await
                    .map_err(|e| RagError::Database(format!("Failed to create table: {}", e)))?
            }
        };

        let record_batch = create_record_batch(records, vector_dim)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to insert chunks: {}", e)))?;

        info!("Stored {} chunks in {}", records.len(), self.table_name);
        Ok(())
    }

    /// Read handle for searching the collection
    #[inline]
    pub fn load(&self) -> VectorStoreHandle {
        VectorStoreHandle {
            connection: self.connection.clone(),
            embedder: Arc::clone(&self.embedder),
            table_name: self.table_name.clone(),
        }
    }

    /// Drop the collection and delete its dataset directory, leaving the
    /// persist directory in place so the store can be written again.
    ///
    /// Nothing else under the persist directory is touched.
    #[inline]
    pub async fn clear(&mut self) -> Result<()> {
        if open_existing(&self.connection, &self.table_name)
            .await?
            .is_some()
        {
            info!("Dropping collection {}", self.table_name);
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| RagError::Database(format!("Failed to drop table: {}", e)))?;
        }

        let dataset = self.dataset_directory();
        if dataset.exists() {
            std::fs::remove_dir_all(&dataset).map_err(|e| {
                RagError::Database(format!("Failed to remove {}: {}", dataset.display(), e))
            })?;
        }

        if let Ok(entries) = std::fs::read_dir(&self.persist_directory) {
            let foreign = entries.count();
            if foreign > 0 {
                warn!(
                    "Leaving {} unrelated entries in {}",
                    foreign,
                    self.persist_directory.display()
                );
            }
        }

        self.connection = connect(&self.persist_directory).await?;
        info!("Vector store cleared");
        Ok(())
    }

    fn dataset_directory(&self) -> PathBuf {
        self.persist_directory.join(format!("{}.lance", self.table_name))
    }

    /// Number of stored chunks, 0 when nothing was written yet
    #[inline]
    pub async fn count(&self) -> Result<usize> {
        count_rows(&self.connection, &self.table_name).await
    }
}

impl VectorStoreHandle {
    /// Return the `k` chunks closest to `query`
    #[inline]
    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        let Some(table) = open_existing(&self.connection, &self.table_name).await? else {
            warn!("Collection {} does not exist yet", self.table_name);
            return Ok(Vec::new());
        };

        let query_vector = self.embedder.embed_query(query)?;
        let results = search(&table, &query_vector, k).await?;

        Ok(results.iter().map(|r| r.record.to_document()).collect())
    }

    /// Fetch `fetch_k` nearest chunks, then pick `k` of them trading relevance
    /// against diversity (`lambda_mult` 1.0 is pure relevance, 0.0 pure diversity)
    #[inline]
    pub async fn max_marginal_relevance_search(
        &self,
        query: &str,
        k: usize,
        fetch_k: usize,
        lambda_mult: f32,
    ) -> Result<Vec<Document>> {
        let Some(table) = open_existing(&self.connection, &self.table_name).await? else {
            warn!("Collection {} does not exist yet", self.table_name);
            return Ok(Vec::new());
        };

        let query_vector = self.embedder.embed_query(query)?;
        let candidates = search(&table, &query_vector, fetch_k.max(k)).await?;

        let vectors: Vec<Vec<f32>> = candidates.iter().map(|c| c.record.vector.clone()).collect();
        let selected = maximal_marginal_relevance(&query_vector, &vectors, k, lambda_mult);
        debug!(
            "MMR selected {:?} out of {} candidates",
            selected,
            candidates.len()
        );

        Ok(selected
            .into_iter()
            .filter_map(|i| candidates.get(i))
            .map(|c| c.record.to_document())
            .collect())
    }

    /// Number of stored chunks, 0 when the collection does not exist
    #[inline]
    pub async fn count(&self) -> Result<usize> {
        count_rows(&self.connection, &self.table_name).await
    }
}

async fn connect(persist_directory: &Path) -> Result<Connection> {
    std::fs::create_dir_all(persist_directory).map_err(|e| {
        RagError::Database(format!(
            "Failed to create vector store directory {}: {}",
            persist_directory.display(),
            e
        ))
    })?;

    let absolute = std::fs::canonicalize(persist_directory)?;
    let uri = absolute.to_string_lossy();
    debug!("Connecting to LanceDB at {}", uri);

    lancedb::connect(&uri)
        .execute()
        .await
        .map_err(|e| RagError::Database(format!("Failed to connect to LanceDB: {}", e)))
}

async fn open_existing(connection: &Connection, table_name: &str) -> Result<Option<Table>> {
    let table_names = connection
        .table_names()
        .execute()
        .await
        .map_err(|e| RagError::Database(format!("Failed to list tables: {}", e)))?;

    if !table_names.iter().any(|name| name == table_name) {
        return Ok(None);
    }

    connection
        .open_table(table_name)
        .execute()
        .await
        .map(Some)
        .map_err(|e| RagError::Database(format!("Failed to open table: {}", e)))
}

async fn count_rows(connection: &Connection, table_name: &str) -> Result<usize> {
    let Some(table) = open_existing(connection, table_name).await? else {
        return Ok(0);
    };

    table
        .count_rows(None)
        .await
        .map_err(|e| RagError::Database(format!("Failed to count rows: {}", e)))
}

async fn table_vector_dimension(table: &Table) -> Result<usize> {
    let schema = table
        .schema()
        .await
        .map_err(|e| RagError::Database(format!("Failed to get table schema: {}", e)))?;

    let field = schema
        .field_with_name("vector")
        .map_err(|e| RagError::Database(format!("Missing vector column: {}", e)))?;

    match field.data_type() {
        DataType::FixedSizeList(_, size) => usize::try_from(*size)
            .map_err(|_| RagError::Database(format!("Invalid vector dimension {}", size))),
        other => Err(RagError::Database(format!(
            "Unexpected vector column type {}",
            other
        ))),
    }
}

fn create_schema(vector_dim: usize) -> Result<Arc<Schema>> {
    let dim = i32::try_from(vector_dim)
        .map_err(|_| RagError::Database(format!("Vector dimension {} too large", vector_dim)))?;

    Ok(Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, false)), dim),
            false,
        ),
        Field::new("content", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("page", DataType::UInt32, true),
        Field::new("chunk_index", DataType::UInt32, true),
        Field::new("created_at", DataType::Utf8, false),
    ])))
}

fn create_record_batch(records: &[ChunkRecord], vector_dim: usize) -> Result<RecordBatch> {
    let schema = create_schema(vector_dim)?;
    let dim = i32::try_from(vector_dim)
        .map_err(|_| RagError::Database(format!("Vector dimension {} too large", vector_dim)))?;

    let mut flat_values = Vec::with_capacity(records.len() * vector_dim);
    for record in records {
        flat_values.extend_from_slice(&record.vector);
    }
    let field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array =
        FixedSizeListArray::try_new(field, dim, Arc::new(Float32Array::from(flat_values)), None)
            .map_err(|e| RagError::Database(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.id.as_str()))),
        Arc::new(vector_array),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.content.as_str()))),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.metadata.source.as_str()),
        )),
        Arc::new(UInt32Array::from(
            records.iter().map(|r| r.metadata.page).collect::<Vec<_>>(),
        )),
        Arc::new(UInt32Array::from(
            records.iter().map(|r| r.metadata.chunk_index).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.created_at.as_str()),
        )),
    ];

    RecordBatch::try_new(schema, arrays)
        .map_err(|e| RagError::Database(format!("Failed to create record batch: {}", e)))
}

async fn search(table: &Table, query_vector: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
    debug!("Searching for nearest vectors with limit: {}", limit);

    let mut stream = table
        .vector_search(query_vector)
        .map_err(|e| RagError::Database(format!("Failed to create vector search: {}", e)))?
        .column("vector")
        .distance_type(DistanceType::Cosine)
        .limit(limit)
        .execute()
        .await
        .map_err(|e| RagError::Database(format!("Failed to execute search: {}", e)))?;

    let mut results = Vec::new();
    while let Some(batch) = stream
        .try_next()
        .await
        .map_err(|e| RagError::Database(format!("Failed to read result stream: {}", e)))?
    {
        results.extend(parse_search_batch(&batch)?);
    }

    // Batches are not guaranteed to arrive in distance order
    results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    debug!("Search returned {} results", results.len());
    Ok(results)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
    let ids = string_column(batch, "id")?;
    let contents = string_column(batch, "content")?;
    let sources = string_column(batch, "source")?;
    let created_ats = string_column(batch, "created_at")?;
    let pages = u32_column(batch, "page")?;
    let chunk_indices = u32_column(batch, "chunk_index")?;

    let vectors = batch
        .column_by_name("vector")
        .ok_or_else(|| RagError::Database("Missing vector column".to_string()))?
        .as_any()
        .downcast_ref::<FixedSizeListArray>()
        .ok_or_else(|| RagError::Database("Invalid vector column type".to_string()))?;

    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    let optional = |array: &UInt32Array, row: usize| {
        if array.is_null(row) {
            None
        } else {
            Some(array.value(row))
        }
    };

    let mut results = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let vector_values = vectors.value(row);
        let vector = vector_values
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| RagError::Database("Invalid vector element type".to_string()))?
            .values()
            .to_vec();

        let record = ChunkRecord {
            id: ids.value(row).to_string(),
            vector,
            content: contents.value(row).to_string(),
            metadata: DocumentMetadata {
                source: sources.value(row).to_string(),
                page: optional(pages, row),
                chunk_index: optional(chunk_indices, row),
            },
            created_at: created_ats.value(row).to_string(),
        };

        let distance = distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        results.push(SearchResult { record, distance });
    }

    Ok(results)
}
