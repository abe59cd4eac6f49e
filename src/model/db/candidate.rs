use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{common::CandidateStatus, mongodb::Id};

/// Core candidate data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub name: String,
    pub party: String,
    pub status: CandidateStatus,
}

impl CandidateCore {
    /// Create a new active candidate.
    pub fn new(name: String, party: String) -> Self {
        Self {
            name,
            party,
            status: CandidateStatus::Active,
        }
    }
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl CandidateCore {
        pub fn example() -> Self {
            Self::new("Sita Adhikari".to_string(), "Green Future".to_string())
        }

        pub fn example2() -> Self {
            Self::new("Ram Bahadur".to_string(), "People's Alliance".to_string())
        }

        pub fn retired_example() -> Self {
            Self {
                status: CandidateStatus::Retired,
                ..Self::new("Hari Prasad".to_string(), "Independent".to_string())
            }
        }
    }
}
