use std::net::IpAddr;
use std::ops::Deref;

use chrono::{DateTime, SubsecRound, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{db::voter::Voter, mongodb::Id};

/// Core vote data. Votes are immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub voter_id: Id,
    pub candidate_id: Id,
    /// The voter's country at the moment of casting; later profile edits do
    /// not affect it.
    pub country: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
    /// Network address the vote was submitted from, if known.
    pub origin: Option<String>,
}

impl VoteCore {
    /// Create a vote by the given voter, snapshotting their current country.
    pub fn new(voter: &Voter, candidate_id: Id, origin: Option<IpAddr>) -> Self {
        Self {
            voter_id: voter.id,
            candidate_id,
            country: voter.country.clone(),
            // The database only stores milliseconds.
            cast_at: Utc::now().trunc_subsecs(3),
            origin: origin.map(|ip| ip.to_string()),
        }
    }
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}
