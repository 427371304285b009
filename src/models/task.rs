use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub value: i64,
    #[serde(rename = "imageURL")]
    pub image_url: String,
}

/// Validated fields for creating or replacing a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub name: String,
    pub value: i64,
    pub image_url: String,
}

// Request DTOs. Fields are optional so that missing attributes surface as
// validation errors rather than deserialization failures.
#[derive(Debug, Default, Deserialize)]
pub struct TaskRequest {
    #[serde(rename = "_id")]
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub value: Option<i64>,
    #[serde(rename = "imageURL")]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteTaskRequest {
    #[serde(rename = "taskId")]
    pub task_id: Option<Uuid>,
}
