use crate::error::PipelineError;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// An identified feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub id: String,
    pub vector: Vec<f32>,
}

/// A clustering request as received on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub summaries: Vec<Summary>,
    pub membership_threshold: Option<f64>,
    pub secondary_min_cluster_size: Option<usize>,
}

/// One summary entry. The embedding is kept raw until [`Request::points`] decodes it.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub video_id: String,
    pub embedding: Value,
    pub dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct RawRequest {
    summaries: Option<Vec<RawSummary>>,
    membership_threshold: Option<f64>,
    secondary_min_cluster_size: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSummary {
    video_id: Option<String>,
    #[serde(default)]
    embedding: Value,
    dimensions: Option<usize>,
}

impl Request {
    pub fn from_json(input: &str) -> Result<Self, PipelineError> {
        let raw: RawRequest = serde_json::from_str(input)?;
        let summaries = raw
            .summaries
            .ok_or(PipelineError::MissingField("summaries"))?
            .into_iter()
            .map(|summary| {
                Ok(Summary {
                    video_id: summary.video_id.ok_or(PipelineError::MissingField("videoId"))?,
                    embedding: summary.embedding,
                    dimensions: summary.dimensions,
                })
            })
            .collect::<Result<Vec<Summary>, PipelineError>>()?;

        Ok(Request {
            summaries,
            membership_threshold: raw.membership_threshold,
            secondary_min_cluster_size: raw.secondary_min_cluster_size,
        })
    }

    pub fn ids(&self) -> Vec<String> {
        self.summaries.iter().map(|summary| summary.video_id.clone()).collect()
    }

    /// Decodes every embedding, skipping entries that cannot be decoded or whose dimension
    /// differs from the first valid one.
    ///
    /// Fails with [`PipelineError::NoValidEmbeddings`] when nothing survives.
    pub fn points(&self) -> Result<Vec<Point>, PipelineError> {
        let mut points: Vec<Point> = Vec::with_capacity(self.summaries.len());
        for summary in &self.summaries {
            let Some(vector) = decode_embedding(summary) else {
                continue;
            };
            if let Some(first) = points.first() {
                if first.vector.len() != vector.len() {
                    warn!(
                        "Skipping {}: {} dimensions, expected {}",
                        summary.video_id,
                        vector.len(),
                        first.vector.len()
                    );
                    continue;
                }
            }
            points.push(Point { id: summary.video_id.clone(), vector });
        }

        if points.is_empty() {
            return Err(PipelineError::NoValidEmbeddings);
        }
        debug!("Decoded {} of {} embeddings", points.len(), self.summaries.len());
        Ok(points)
    }
}

fn decode_embedding(summary: &Summary) -> Option<Vec<f32>> {
    let decoded = match &summary.embedding {
        Value::String(encoded) => decode_string(encoded),
        Value::Array(values) => values
            .iter()
            .map(|value| value.as_f64().map(|value| value as f32))
            .collect::<Option<Vec<f32>>>(),
        _ => None,
    };
    let vector = match decoded {
        Some(vector) if !vector.is_empty() => vector,
        _ => {
            warn!("Skipping {}: embedding could not be decoded", summary.video_id);
            return None;
        }
    };
    if let Some(expected) = summary.dimensions {
        if expected != vector.len() {
            warn!(
                "Skipping {}: decoded {} dimensions, request says {}",
                summary.video_id,
                vector.len(),
                expected
            );
            return None;
        }
    }
    Some(vector)
}

/// Base64 of little-endian `f32`s, or failing that a JSON array inside the string.
fn decode_string(encoded: &str) -> Option<Vec<f32>> {
    match general_purpose::STANDARD.decode(encoded) {
        Ok(bytes) if bytes.len() % 4 == 0 => Some(
            bytes
                .chunks_exact(4)
                .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect(),
        ),
        _ => serde_json::from_str::<Vec<f32>>(encoded).ok(),
    }
}
