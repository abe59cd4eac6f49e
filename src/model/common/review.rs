use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Publication state of a review.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    /// Held back by moderation until an admin approves it.
    Pending,
    /// Publicly visible.
    Approved,
}

impl From<ReviewStatus> for Bson {
    fn from(status: ReviewStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
