use std::collections::HashMap;
use std::hash::Hash;

use mongodb::{
    bson::{self, doc, Document},
    error::{Error as DbError, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT},
    options::FindOptions,
    Client, ClientSession,
};
use rocket::futures::TryStreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{Recorded, Result, Store, StoreError};
use crate::model::{
    common::{CandidateStatus, ReviewStatus},
    db::{
        admin::{Admin, NewAdmin},
        candidate::{Candidate, NewCandidate},
        review::{NewReview, Review},
        vote::{NewVote, Vote},
        voter::{NewVoter, Voter},
    },
    mongodb::{ensure_indexes_exist, is_duplicate_key_error, Coll, Id},
};

/// How many times a vote transaction is attempted before giving up.
const MAX_TRANSACTION_ATTEMPTS: usize = 5;

/// A store backed by a MongoDB database.
///
/// Recording a vote uses a multi-document transaction, so the database must
/// be a replica set or sharded cluster.
pub struct MongoStore {
    client: Client,
    admins: Coll<Admin>,
    voters: Coll<Voter>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    reviews: Coll<Review>,
}

impl MongoStore {
    /// Connect to the given database and make sure its indexes exist.
    pub async fn connect(db_uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(db_uri).await?;
        let db = client.database(db_name);
        ensure_indexes_exist(&db).await?;
        Ok(Self {
            admins: Coll::from_db(&db),
            voters: Coll::from_db(&db),
            candidates: Coll::from_db(&db),
            votes: Coll::from_db(&db),
            reviews: Coll::from_db(&db),
            client,
        })
    }

    /// One attempt at the vote transaction.
    async fn try_record_vote(
        &self,
        vote: &Vote,
        session: &mut ClientSession,
    ) -> std::result::Result<Recorded, DbError> {
        session.start_transaction(None).await?;

        // Claim the voter's single vote; this only matches an eligible voter.
        let filter = doc! {
            "_id": *vote.voter_id,
            "verified": true,
            "has_voted": false,
        };
        let update = doc! { "$set": { "has_voted": true } };
        let claimed = self
            .voters
            .update_one_with_session(filter, update, None, session)
            .await?;
        if claimed.modified_count == 0 {
            session.abort_transaction().await?;
            return Ok(Recorded::VoterIneligible);
        }

        // Writing to the candidate makes a concurrent retirement conflict with
        // this transaction, so the status checked here holds until commit.
        let filter = doc! {
            "_id": *vote.candidate_id,
            "status": CandidateStatus::Active,
        };
        let update = doc! { "$currentDate": { "last_voted_at": true } };
        let touched = self
            .candidates
            .update_one_with_session(filter, update, None, session)
            .await?;
        if touched.matched_count == 0 {
            session.abort_transaction().await?;
            return Ok(Recorded::CandidateInactive);
        }

        self.votes
            .insert_one_with_session(vote, None, session)
            .await?;

        loop {
            match session.commit_transaction().await {
                Err(e) if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) => {
                    warn!("Vote commit result unknown, retrying commit: {e}");
                }
                result => return result.map(|_| Recorded::Vote(vote.clone())),
            }
        }
    }
}

/// Map a duplicate key error on insert to [`StoreError::Duplicate`].
fn on_duplicate(what: impl FnOnce() -> String) -> impl FnOnce(DbError) -> StoreError {
    move |err| {
        if is_duplicate_key_error(&err) {
            StoreError::Duplicate(what())
        } else {
            err.into()
        }
    }
}

/// A row of a `$group` aggregation counting documents per key.
#[derive(Deserialize)]
struct CountRow<K> {
    #[serde(rename = "_id")]
    key: K,
    count: u64,
}

impl MongoStore {
    /// Count votes grouped by the given field.
    async fn count_votes_by<K>(&self, field: &str) -> Result<HashMap<K, u64>>
    where
        K: DeserializeOwned + Eq + Hash,
    {
        let pipeline = [doc! {
            "$group": {
                "_id": format!("${field}"),
                "count": { "$sum": 1 },
            }
        }];
        let rows: Vec<Document> = self
            .votes
            .aggregate(pipeline, None)
            .await?
            .try_collect()
            .await?;
        rows.into_iter()
            .map(|row| -> Result<(K, u64)> {
                let row: CountRow<K> = bson::from_document(row)?;
                Ok((row.key, row.count))
            })
            .collect()
    }
}

#[rocket::async_trait]
impl Store for MongoStore {
    async fn voter(&self, id: Id) -> Result<Option<Voter>> {
        Ok(self.voters.find_one(id.as_doc(), None).await?)
    }

    async fn voter_by_document(&self, document_id: &str) -> Result<Option<Voter>> {
        let filter = doc! { "document_id": document_id };
        Ok(self.voters.find_one(filter, None).await?)
    }

    async fn voter_by_email(&self, email: &str) -> Result<Option<Voter>> {
        let filter = doc! { "email": email };
        Ok(self.voters.find_one(filter, None).await?)
    }

    async fn insert_voter(&self, voter: NewVoter) -> Result<Voter> {
        let voter = Voter { id: Id::new(), voter };
        self.voters
            .insert_one(&voter, None)
            .await
            .map_err(on_duplicate(|| {
                format!("voter with document '{}' or its email", voter.document_id)
            }))?;
        Ok(voter)
    }

    async fn mark_verified(&self, id: Id, document_path: &str) -> Result<bool> {
        let update = doc! {
            "$set": {
                "verified": true,
                "document_path": document_path,
            }
        };
        let result = self.voters.update_one(id.as_doc(), update, None).await?;
        Ok(result.matched_count > 0)
    }

    async fn update_voter_profile(
        &self,
        id: Id,
        name: Option<String>,
        country: Option<String>,
    ) -> Result<bool> {
        let mut changes = Document::new();
        if let Some(name) = name {
            changes.insert("name", name);
        }
        if let Some(country) = country {
            changes.insert("country", country);
        }
        if changes.is_empty() {
            return Ok(self.voters.count_documents(id.as_doc(), None).await? > 0);
        }
        let update = doc! { "$set": changes };
        let result = self.voters.update_one(id.as_doc(), update, None).await?;
        Ok(result.matched_count > 0)
    }

    async fn candidates(&self, include_retired: bool) -> Result<Vec<Candidate>> {
        let filter = if include_retired {
            None
        } else {
            Some(doc! { "status": CandidateStatus::Active })
        };
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        Ok(self
            .candidates
            .find(filter, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn candidate(&self, id: Id) -> Result<Option<Candidate>> {
        Ok(self.candidates.find_one(id.as_doc(), None).await?)
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        let candidate = Candidate {
            id: Id::new(),
            candidate,
        };
        self.candidates.insert_one(&candidate, None).await?;
        Ok(candidate)
    }

    async fn retire_candidate(&self, id: Id) -> Result<bool> {
        let update = doc! { "$set": { "status": CandidateStatus::Retired } };
        let result = self
            .candidates
            .update_one(id.as_doc(), update, None)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn record_vote(&self, vote: NewVote) -> Result<Recorded> {
        let vote = Vote { id: Id::new(), vote };
        let mut session = self.client.start_session(None).await?;
        let mut attempt = 1;
        loop {
            match self.try_record_vote(&vote, &mut session).await {
                Ok(recorded) => return Ok(recorded),
                Err(e) => {
                    // Leave the session clean for the next attempt; this fails
                    // harmlessly if the transaction already ended.
                    let _ = session.abort_transaction().await;
                    if is_duplicate_key_error(&e) {
                        return Ok(Recorded::VoterIneligible);
                    }
                    if e.contains_label(TRANSIENT_TRANSACTION_ERROR)
                        && attempt < MAX_TRANSACTION_ATTEMPTS
                    {
                        debug!("Transient error recording vote (attempt {attempt}): {e}");
                        attempt += 1;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }

    async fn count_by_candidate(&self) -> Result<HashMap<Id, u64>> {
        self.count_votes_by("candidate_id").await
    }

    async fn count_by_country(&self) -> Result<HashMap<String, u64>> {
        self.count_votes_by("country").await
    }

    async fn vote_count(&self) -> Result<u64> {
        Ok(self.votes.count_documents(None, None).await?)
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review> {
        let review = Review {
            id: Id::new(),
            review,
        };
        self.reviews.insert_one(&review, None).await?;
        Ok(review)
    }

    async fn reviews(&self, status: Option<ReviewStatus>) -> Result<Vec<Review>> {
        let filter = status.map(|status| doc! { "status": status });
        let options = FindOptions::builder()
            .sort(doc! { "submitted_at": -1, "_id": -1 })
            .build();
        Ok(self
            .reviews
            .find(filter, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn approve_review(&self, id: Id) -> Result<bool> {
        let update = doc! { "$set": { "status": ReviewStatus::Approved } };
        let result = self.reviews.update_one(id.as_doc(), update, None).await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_review(&self, id: Id) -> Result<bool> {
        let result = self.reviews.delete_one(id.as_doc(), None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn admin(&self, id: Id) -> Result<Option<Admin>> {
        Ok(self.admins.find_one(id.as_doc(), None).await?)
    }

    async fn admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        let filter = doc! { "username": username };
        Ok(self.admins.find_one(filter, None).await?)
    }

    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin> {
        let admin = Admin { id: Id::new(), admin };
        self.admins
            .insert_one(&admin, None)
            .await
            .map_err(on_duplicate(|| format!("admin '{}'", admin.username)))?;
        Ok(admin)
    }

    async fn admin_count(&self) -> Result<u64> {
        Ok(self.admins.count_documents(None, None).await?)
    }
}
