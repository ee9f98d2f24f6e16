pub mod laundry;
pub mod student;

use serde::{Deserialize, Serialize};

pub use self::{laundry::Laundry, student::Student};

/// Body of every error response.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Error {
    pub message: String,
}

/// Body of a successful login response.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AuthToken {
    pub token: String,
}
