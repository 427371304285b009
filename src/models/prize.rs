use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Prize {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    /// Points a child needs to claim the prize.
    pub value: i64,
    #[serde(rename = "imageURL")]
    pub image_url: String,
}

#[derive(Debug, Clone)]
pub struct NewPrize {
    pub name: String,
    pub value: i64,
    pub image_url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PrizeRequest {
    pub name: Option<String>,
    pub value: Option<i64>,
    #[serde(rename = "imageURL")]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeletePrizeRequest {
    #[serde(rename = "prizeId")]
    pub prize_id: Option<Uuid>,
}
