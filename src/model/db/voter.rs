use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{common::DocumentType, mongodb::Id};

/// Core voter user data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    /// Display name.
    pub name: String,
    /// Country of residence. Copied onto votes and reviews when they are made.
    pub country: String,
    pub document_type: DocumentType,
    /// Voter unique ID: the number of their identity document.
    pub document_id: String,
    /// Unique contact address, for voters who registered with one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Argon2 hash of the password chosen at registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Where the uploaded identity document was stored, once verified.
    pub document_path: Option<String>,
    /// Whether the identity document has been verified.
    pub verified: bool,
    /// Whether a vote has been recorded. Only ever goes from false to true.
    pub has_voted: bool,
}

impl VoterCore {
    /// Create a new, unverified voter who has not yet voted.
    pub fn new(
        name: String,
        country: String,
        document_type: DocumentType,
        document_id: String,
    ) -> Self {
        Self {
            name,
            country,
            document_type,
            document_id,
            email: None,
            password_hash: None,
            document_path: None,
            verified: false,
            has_voted: false,
        }
    }

    /// Can this voter currently cast a vote?
    pub fn can_vote(&self) -> bool {
        self.verified && !self.has_voted
    }
}

/// A voter without an ID.
pub type NewVoter = VoterCore;

/// A voter user from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}
