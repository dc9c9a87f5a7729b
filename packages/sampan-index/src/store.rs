use qdrant_client::{
	Qdrant,
	client::Payload,
	qdrant::{
		CreateCollectionBuilder, Distance, PointStruct, Query, QueryPointsBuilder,
		UpsertPointsBuilder, Value, VectorParamsBuilder,
	},
};

use crate::{
	Error, Result,
	models::{IndexDocument, KnowledgeHit},
};

pub struct KnowledgeStore {
	pub client: Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl KnowledgeStore {
	pub fn new(cfg: &sampan_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(&self.collection).await? {
			return Ok(());
		}

		self.client
			.create_collection(
				CreateCollectionBuilder::new(&self.collection)
					.vectors_config(VectorParamsBuilder::new(self.vector_dim as u64, Distance::Cosine)),
			)
			.await?;

		Ok(())
	}

	pub async fn search(&self, vector: Vec<f32>, limit: u64) -> Result<Vec<KnowledgeHit>> {
		if vector.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"Query vector dimension {} does not match configured vector_dim {}.",
				vector.len(),
				self.vector_dim
			)));
		}

		let response = self
			.client
			.query(
				QueryPointsBuilder::new(&self.collection)
					.query(Query::new_nearest(vector))
					.limit(limit)
					.with_payload(true),
			)
			.await?;

		Ok(response.result.into_iter().map(KnowledgeHit::from_scored_point).collect())
	}

	pub async fn upsert(&self, documents: &[IndexDocument], vectors: &[Vec<f32>]) -> Result<()> {
		if documents.len() != vectors.len() {
			return Err(Error::InvalidArgument(format!(
				"Got {} vectors for {} documents.",
				vectors.len(),
				documents.len()
			)));
		}

		let mut points = Vec::with_capacity(documents.len());

		for (document, vector) in documents.iter().zip(vectors.iter()) {
			if vector.len() != self.vector_dim as usize {
				return Err(Error::InvalidArgument(format!(
					"Embedding dimension {} does not match configured vector_dim {}.",
					vector.len(),
					self.vector_dim
				)));
			}

			let payload_map: std::collections::HashMap<String, Value> = document
				.payload
				.iter()
				.map(|(key, value)| (key.clone(), Value::from(value.clone())))
				.collect();

			points.push(PointStruct::new(
				document.id.to_string(),
				vector.clone(),
				Payload::from(payload_map),
			));
		}

		let upsert = UpsertPointsBuilder::new(&self.collection, points).wait(true);

		self.client.upsert_points(upsert).await?;

		Ok(())
	}
}
