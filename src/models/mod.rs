pub mod auth;
pub mod child;
pub mod parent;
pub mod prize;
pub mod task;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A reference sent by the client: either a bare id or a whole document
/// carrying `_id`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdRef {
    Id(Uuid),
    Document {
        #[serde(rename = "_id")]
        id: Uuid,
    },
}

impl IdRef {
    pub fn id(&self) -> Uuid {
        match self {
            IdRef::Id(id) | IdRef::Document { id } => *id,
        }
    }
}

/// Envelope for every single-document response.
#[derive(Debug, Serialize)]
pub struct DocumentResponse<T> {
    pub document: T,
}

impl<T> DocumentResponse<T> {
    pub fn new(document: T) -> Self {
        Self { document }
    }
}
