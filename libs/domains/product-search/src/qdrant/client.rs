use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    self, Condition, CreateCollectionBuilder, Distance, Filter, PointId, PointStruct,
    ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::QdrantConfig;
use crate::error::{SearchError, SearchResult};
use crate::models::{EmbeddingRecord, FilterOp, MetadataFilter, Modality, ScoredResult};
use crate::repository::VectorRepository;

/// Payload key holding the human-readable record identifier.
const RECORD_ID_KEY: &str = "record_id";

/// Qdrant-backed implementation of VectorRepository
pub struct QdrantRepository {
    client: Qdrant,
    config: QdrantConfig,
}

impl QdrantRepository {
    pub fn new(config: QdrantConfig) -> SearchResult<Self> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(api_key) = config.api_key.clone() {
            builder = builder.api_key(api_key);
        }

        builder = builder.timeout(Duration::from_secs(config.timeout_secs));

        let client = builder
            .build()
            .map_err(|e| SearchError::VectorStore(format!("Failed to build client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn collection(&self, modality: Modality) -> &str {
        self.config.collection_name(modality)
    }
}

/// Qdrant only accepts integer or UUID point ids; record ids map to a stable UUIDv5.
pub(crate) fn point_uuid(record_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, record_id.as_bytes())
}

/// Cosine similarity on a 0-100 scale, two decimals.
pub(crate) fn scale_score(score: f32) -> f64 {
    (f64::from(score) * 100.0 * 100.0).round() / 100.0
}

pub(crate) fn to_qdrant_filter(filter: &MetadataFilter) -> Option<Filter> {
    if filter.is_empty() {
        return None;
    }

    let mut qdrant_filter = Filter::default();
    for condition in &filter.conditions {
        let matches = Condition::matches(condition.field.clone(), condition.value.clone());
        match condition.op {
            FilterOp::Eq => qdrant_filter.must.push(matches),
            FilterOp::Ne => qdrant_filter.must_not.push(matches),
        }
    }

    Some(qdrant_filter)
}

fn record_payload(record: &EmbeddingRecord) -> HashMap<String, QdrantValue> {
    let mut payload: HashMap<String, QdrantValue> = record
        .metadata
        .iter()
        .map(|(key, val)| (key.clone(), json_to_qdrant_value(val)))
        .collect();
    payload.insert(RECORD_ID_KEY.to_string(), QdrantValue::from(record.id.clone()));
    payload
}

fn json_to_qdrant_value(val: &serde_json::Value) -> QdrantValue {
    match val {
        serde_json::Value::Null => QdrantValue {
            kind: Some(qdrant::value::Kind::NullValue(0)),
        },
        serde_json::Value::Bool(b) => QdrantValue::from(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => QdrantValue::from(i),
            None => QdrantValue::from(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => QdrantValue::from(s.clone()),
        // Metadata is flat; nested values are kept as their JSON text.
        other => QdrantValue::from(other.to_string()),
    }
}

fn qdrant_value_to_json(val: QdrantValue) -> Option<serde_json::Value> {
    use qdrant::value::Kind;

    match val.kind {
        Some(Kind::NullValue(_)) => Some(serde_json::Value::Null),
        Some(Kind::BoolValue(b)) => Some(serde_json::Value::Bool(b)),
        Some(Kind::IntegerValue(i)) => Some(serde_json::Value::Number(i.into())),
        Some(Kind::DoubleValue(f)) => serde_json::Number::from_f64(f).map(serde_json::Value::Number),
        Some(Kind::StringValue(s)) => Some(serde_json::Value::String(s)),
        _ => None,
    }
}

fn point_id_string(point_id: &PointId) -> Option<String> {
    match &point_id.point_id_options {
        Some(qdrant::point_id::PointIdOptions::Uuid(uuid)) => Some(uuid.clone()),
        Some(qdrant::point_id::PointIdOptions::Num(num)) => Some(num.to_string()),
        None => None,
    }
}

/// Results are keyed by the product, so matches from the image and text
/// collections for the same product collapse when merged.
fn to_scored_result(point: ScoredPoint) -> SearchResult<ScoredResult> {
    let fallback_id = point.id.as_ref().and_then(point_id_string);

    let metadata: serde_json::Map<String, serde_json::Value> = point
        .payload
        .into_iter()
        .filter_map(|(key, val)| qdrant_value_to_json(val).map(|v| (key, v)))
        .collect();

    let product_id = [metadata.get("product_id"), metadata.get(RECORD_ID_KEY)]
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str().map(str::to_string))
        .or(fallback_id)
        .ok_or_else(|| SearchError::VectorStore("Point without id or payload".to_string()))?;

    Ok(ScoredResult {
        product_id,
        score: scale_score(point.score),
        metadata: serde_json::Value::Object(metadata),
    })
}

#[async_trait]
impl VectorRepository for QdrantRepository {
    async fn ensure_collection(&self, modality: Modality) -> SearchResult<()> {
        let name = self.collection(modality);

        if self.client.collection_exists(name).await? {
            debug!(collection = name, "Collection already exists");
            return Ok(());
        }

        info!(collection = name, dimension = modality.dimension(), "Creating collection");
        self.client
            .create_collection(CreateCollectionBuilder::new(name).vectors_config(
                VectorParamsBuilder::new(modality.dimension() as u64, Distance::Cosine),
            ))
            .await?;

        Ok(())
    }

    async fn upsert(&self, record: EmbeddingRecord) -> SearchResult<()> {
        let name = self.collection(record.modality);
        let point = PointStruct::new(
            point_uuid(&record.id).to_string(),
            record.vector.clone(),
            record_payload(&record),
        );

        self.client
            .upsert_points(UpsertPointsBuilder::new(name, vec![point]).wait(true))
            .await?;

        info!(record_id = %record.id, collection = name, "Upserted embedding");
        Ok(())
    }

    async fn query(
        &self,
        modality: Modality,
        vector: Vec<f32>,
        top_k: u64,
        filter: MetadataFilter,
    ) -> SearchResult<Vec<ScoredResult>> {
        let name = self.collection(modality);

        let mut builder = SearchPointsBuilder::new(name, vector, top_k).with_payload(true);
        if let Some(filter) = to_qdrant_filter(&filter) {
            builder = builder.filter(filter);
        }

        let response = self.client.search_points(builder).await?;
        let results = response
            .result
            .into_iter()
            .map(to_scored_result)
            .collect::<SearchResult<Vec<_>>>()?;

        info!(collection = name, count = results.len(), "Found similar products");
        Ok(results)
    }

    async fn clear(&self, modality: Modality) -> SearchResult<()> {
        let name = self.collection(modality);

        if self.client.collection_exists(name).await? {
            self.client.delete_collection(name).await?;
        }
        info!(collection = name, "Cleared all vectors");

        self.ensure_collection(modality).await
    }

    async fn health_check(&self) -> SearchResult<()> {
        self.client.health_check().await?;
        Ok(())
    }
}
