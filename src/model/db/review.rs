use std::ops::{Deref, DerefMut};

use chrono::{DateTime, SubsecRound, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::{
    model::{common::ReviewStatus, db::voter::Voter, mongodb::Id},
    moderation::Moderation,
};

/// Core review data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewCore {
    pub voter_id: Id,
    /// The author's name when the review was written.
    pub voter_name: String,
    pub candidate_id: Option<Id>,
    pub rating: u8,
    pub content: String,
    /// The author's country when the review was written.
    pub country: String,
    /// Outcome of the automatic content filter.
    pub moderation: Moderation,
    pub status: ReviewStatus,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub submitted_at: DateTime<Utc>,
}

impl ReviewCore {
    /// Create a review by the given voter. Reviews that passed moderation are
    /// published immediately; the rest wait for an admin.
    pub fn new(
        voter: &Voter,
        candidate_id: Option<Id>,
        rating: u8,
        content: String,
        moderation: Moderation,
    ) -> Self {
        let status = if moderation.approved {
            ReviewStatus::Approved
        } else {
            ReviewStatus::Pending
        };
        Self {
            voter_id: voter.id,
            voter_name: voter.name.clone(),
            candidate_id,
            rating,
            content,
            country: voter.country.clone(),
            moderation,
            status,
            submitted_at: Utc::now().trunc_subsecs(3),
        }
    }
}

/// A review without an ID.
pub type NewReview = ReviewCore;

/// A review from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub review: ReviewCore,
}

impl Deref for Review {
    type Target = ReviewCore;

    fn deref(&self) -> &Self::Target {
        &self.review
    }
}

impl DerefMut for Review {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.review
    }
}
