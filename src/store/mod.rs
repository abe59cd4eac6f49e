//! Persistence for voters, candidates, votes, reviews and admins.
//!
//! Everything the server persists goes through the [`Store`] trait, so the
//! same services run against MongoDB in production and against an in-memory
//! store in tests and demos.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use mongodb::bson;
use thiserror::Error;

use crate::model::{
    common::ReviewStatus,
    db::{
        admin::{Admin, NewAdmin},
        candidate::{Candidate, NewCandidate},
        review::{NewReview, Review},
        vote::{NewVote, Vote},
        voter::{NewVoter, Voter},
    },
    mongodb::Id,
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] mongodb::error::Error),
    /// A uniqueness constraint was violated; holds a description of what clashed.
    #[error("Already exists: {0}")]
    Duplicate(String),
    #[error(transparent)]
    Decode(#[from] bson::de::Error),
}

/// Outcome of [`Store::record_vote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Vote(Vote),
    /// The voter is missing, unverified or has already voted.
    VoterIneligible,
    /// The candidate is missing or retired.
    CandidateInactive,
}

/// Storage operations needed by the server.
///
/// Single-record operations are atomic. Operations returning `bool` report
/// whether a matching record existed.
#[rocket::async_trait]
pub trait Store: Send + Sync {
    // Voters

    async fn voter(&self, id: Id) -> Result<Option<Voter>>;

    /// Look up a voter by the number of their identity document.
    async fn voter_by_document(&self, document_id: &str) -> Result<Option<Voter>>;

    /// Find the voter registered with the given (lowercased) email.
    async fn voter_by_email(&self, email: &str) -> Result<Option<Voter>>;

    /// Insert a new voter. Fails with [`StoreError::Duplicate`] if the
    /// document number or email is already registered.
    async fn insert_voter(&self, voter: NewVoter) -> Result<Voter>;

    /// Mark the voter's identity document as verified and record where it is stored.
    async fn mark_verified(&self, id: Id, document_path: &str) -> Result<bool>;

    /// Change the editable profile fields; `None` leaves a field as it is.
    async fn update_voter_profile(
        &self,
        id: Id,
        name: Option<String>,
        country: Option<String>,
    ) -> Result<bool>;

    // Candidates

    async fn candidates(&self, include_retired: bool) -> Result<Vec<Candidate>>;

    async fn candidate(&self, id: Id) -> Result<Option<Candidate>>;

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate>;

    /// Retire a candidate. Retired candidates keep their votes but accept no more.
    async fn retire_candidate(&self, id: Id) -> Result<bool>;

    // Votes

    /// Atomically record a vote and set the voter's `has_voted` flag.
    ///
    /// Succeeds only if the voter exists, is verified and has not voted yet,
    /// and the candidate is still active; otherwise nothing is written. Of any
    /// number of concurrent calls for the same voter, at most one succeeds. A
    /// candidate retired concurrently either receives the vote before its
    /// retirement or refuses it.
    async fn record_vote(&self, vote: NewVote) -> Result<Recorded>;

    /// Number of votes per candidate. Candidates without votes are absent.
    async fn count_by_candidate(&self) -> Result<HashMap<Id, u64>>;

    /// Number of votes per voter country, as recorded at casting time.
    async fn count_by_country(&self) -> Result<HashMap<String, u64>>;

    async fn vote_count(&self) -> Result<u64>;

    // Reviews

    async fn insert_review(&self, review: NewReview) -> Result<Review>;

    /// All reviews with the given status, or every review if `None`,
    /// newest first.
    async fn reviews(&self, status: Option<ReviewStatus>) -> Result<Vec<Review>>;

    async fn approve_review(&self, id: Id) -> Result<bool>;

    async fn delete_review(&self, id: Id) -> Result<bool>;

    // Admins

    async fn admin(&self, id: Id) -> Result<Option<Admin>>;

    async fn admin_by_username(&self, username: &str) -> Result<Option<Admin>>;

    /// Insert a new admin. Fails with [`StoreError::Duplicate`] if the
    /// username is taken.
    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin>;

    async fn admin_count(&self) -> Result<u64>;
}

/// Shared handle on the store in use, placed in managed state.
#[derive(Clone)]
pub struct Storage(Arc<dyn Store>);

impl Storage {
    pub fn new<S: Store + 'static>(store: S) -> Self {
        Self(Arc::new(store))
    }

    /// A fresh, empty in-memory store.
    pub fn memory() -> Self {
        Self::new(MemoryStore::default())
    }
}

impl Deref for Storage {
    type Target = dyn Store;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
