use serde::{Deserialize, Serialize};

/// Projection of a student embedded into laundry responses.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub name: String,
    pub email: String,
    pub gender: String,
    pub bag_number: String,
}
