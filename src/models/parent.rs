use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{child::ChildView, prize::Prize, task::Task};

/// Parent account as stored: references are kept as ordered id lists.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Parent {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(rename = "profilePic")]
    pub profile_pic: String,
    #[serde(rename = "tasks")]
    pub task_ids: Vec<Uuid>,
    #[serde(rename = "prizes")]
    pub prize_ids: Vec<Uuid>,
    #[serde(rename = "usersChildren")]
    pub child_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewParent {
    pub username: String,
    pub password_hash: String,
    pub profile_pic: String,
}

/// Parent with every reference expanded, as returned by `GET /parent`.
#[derive(Debug, Clone, Serialize)]
pub struct ParentView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    #[serde(rename = "profilePic")]
    pub profile_pic: String,
    #[serde(rename = "usersChildren")]
    pub children: Vec<ChildView>,
    pub tasks: Vec<Task>,
    pub prizes: Vec<Prize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "profilePic")]
    pub profile_pic: Option<String>,
}
