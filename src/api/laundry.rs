use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::api;

pub use crate::db::laundry::{Id, Status};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Laundry {
    pub id: Id,
    pub bag_number: String,
    pub shirts: usize,
    pub bottoms: usize,
    pub towels: usize,
    pub bedsheets: usize,
    pub others: usize,
    pub total_items: usize,
    pub status: Status,
    pub issue: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub pickup_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub delivery_date: Option<OffsetDateTime>,
    pub student: api::Student,
}
