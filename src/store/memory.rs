use std::collections::HashMap;
use std::sync::Arc;

use rocket::tokio::sync::{Mutex, RwLock};

use super::{Recorded, Result, Store, StoreError};
use crate::model::{
    common::{CandidateStatus, ReviewStatus},
    db::{
        admin::{Admin, NewAdmin},
        candidate::{Candidate, NewCandidate},
        review::{NewReview, Review},
        vote::{NewVote, Vote},
        voter::{NewVoter, Voter, VoterCore},
    },
    mongodb::Id,
};

/// A store that keeps everything in process memory.
///
/// Each voter record sits behind its own lock, which is held for the whole
/// check-and-record of a vote.
#[derive(Default)]
pub struct MemoryStore {
    voters: RwLock<Voters>,
    candidates: RwLock<Vec<Candidate>>,
    votes: RwLock<Vec<Vote>>,
    reviews: RwLock<Vec<Review>>,
    admins: RwLock<Vec<Admin>>,
}

#[derive(Default)]
struct Voters {
    by_id: HashMap<Id, Arc<Mutex<VoterCore>>>,
    by_document: HashMap<String, Id>,
    by_email: HashMap<String, Id>,
}

impl MemoryStore {
    async fn voter_record(&self, id: Id) -> Option<Arc<Mutex<VoterCore>>> {
        self.voters.read().await.by_id.get(&id).cloned()
    }
}

#[rocket::async_trait]
impl Store for MemoryStore {
    async fn voter(&self, id: Id) -> Result<Option<Voter>> {
        let Some(record) = self.voter_record(id).await else {
            return Ok(None);
        };
        let voter = record.lock().await.clone();
        Ok(Some(Voter { id, voter }))
    }

    async fn voter_by_document(&self, document_id: &str) -> Result<Option<Voter>> {
        let id = self.voters.read().await.by_document.get(document_id).copied();
        match id {
            Some(id) => self.voter(id).await,
            None => Ok(None),
        }
    }

    async fn voter_by_email(&self, email: &str) -> Result<Option<Voter>> {
        let id = self.voters.read().await.by_email.get(email).copied();
        match id {
            Some(id) => self.voter(id).await,
            None => Ok(None),
        }
    }

    async fn insert_voter(&self, voter: NewVoter) -> Result<Voter> {
        let mut voters = self.voters.write().await;
        if voters.by_document.contains_key(&voter.document_id) {
            return Err(StoreError::Duplicate(format!(
                "voter with document '{}'",
                voter.document_id
            )));
        }
        if let Some(email) = &voter.email {
            if voters.by_email.contains_key(email) {
                return Err(StoreError::Duplicate(format!(
                    "voter with email '{email}'"
                )));
            }
        }
        let id = Id::new();
        voters.by_document.insert(voter.document_id.clone(), id);
        if let Some(email) = &voter.email {
            voters.by_email.insert(email.clone(), id);
        }
        voters
            .by_id
            .insert(id, Arc::new(Mutex::new(voter.clone())));
        Ok(Voter { id, voter })
    }

    async fn mark_verified(&self, id: Id, document_path: &str) -> Result<bool> {
        let Some(record) = self.voter_record(id).await else {
            return Ok(false);
        };
        let mut voter = record.lock().await;
        voter.verified = true;
        voter.document_path = Some(document_path.to_string());
        Ok(true)
    }

    async fn update_voter_profile(
        &self,
        id: Id,
        name: Option<String>,
        country: Option<String>,
    ) -> Result<bool> {
        let Some(record) = self.voter_record(id).await else {
            return Ok(false);
        };
        let mut voter = record.lock().await;
        if let Some(name) = name {
            voter.name = name;
        }
        if let Some(country) = country {
            voter.country = country;
        }
        Ok(true)
    }

    async fn candidates(&self, include_retired: bool) -> Result<Vec<Candidate>> {
        let candidates = self.candidates.read().await;
        Ok(candidates
            .iter()
            .filter(|c| include_retired || c.status.is_active())
            .cloned()
            .collect())
    }

    async fn candidate(&self, id: Id) -> Result<Option<Candidate>> {
        let candidates = self.candidates.read().await;
        Ok(candidates.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        let candidate = Candidate {
            id: Id::new(),
            candidate,
        };
        self.candidates.write().await.push(candidate.clone());
        Ok(candidate)
    }

    async fn retire_candidate(&self, id: Id) -> Result<bool> {
        let mut candidates = self.candidates.write().await;
        match candidates.iter_mut().find(|c| c.id == id) {
            Some(candidate) => {
                candidate.status = CandidateStatus::Retired;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_vote(&self, vote: NewVote) -> Result<Recorded> {
        let Some(record) = self.voter_record(vote.voter_id).await else {
            return Ok(Recorded::VoterIneligible);
        };
        // Held until the flag is set, so concurrent casts for this voter queue here.
        let mut voter = record.lock().await;
        if !voter.can_vote() {
            return Ok(Recorded::VoterIneligible);
        }
        // Held until the vote is stored, so a retirement cannot slip in between.
        let candidates = self.candidates.read().await;
        let active = candidates
            .iter()
            .any(|c| c.id == vote.candidate_id && c.status.is_active());
        if !active {
            return Ok(Recorded::CandidateInactive);
        }
        let vote = Vote {
            id: Id::new(),
            vote,
        };
        self.votes.write().await.push(vote.clone());
        voter.has_voted = true;
        Ok(Recorded::Vote(vote))
    }

    async fn count_by_candidate(&self) -> Result<HashMap<Id, u64>> {
        let mut counts = HashMap::new();
        for vote in self.votes.read().await.iter() {
            *counts.entry(vote.candidate_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn count_by_country(&self) -> Result<HashMap<String, u64>> {
        let mut counts = HashMap::new();
        for vote in self.votes.read().await.iter() {
            *counts.entry(vote.country.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn vote_count(&self) -> Result<u64> {
        Ok(self.votes.read().await.len() as u64)
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review> {
        let review = Review {
            id: Id::new(),
            review,
        };
        self.reviews.write().await.push(review.clone());
        Ok(review)
    }

    async fn reviews(&self, status: Option<ReviewStatus>) -> Result<Vec<Review>> {
        let reviews = self.reviews.read().await;
        Ok(reviews
            .iter()
            .rev()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect())
    }

    async fn approve_review(&self, id: Id) -> Result<bool> {
        let mut reviews = self.reviews.write().await;
        match reviews.iter_mut().find(|r| r.id == id) {
            Some(review) => {
                review.status = ReviewStatus::Approved;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_review(&self, id: Id) -> Result<bool> {
        let mut reviews = self.reviews.write().await;
        let before = reviews.len();
        reviews.retain(|r| r.id != id);
        Ok(reviews.len() < before)
    }

    async fn admin(&self, id: Id) -> Result<Option<Admin>> {
        let admins = self.admins.read().await;
        Ok(admins.iter().find(|a| a.id == id).cloned())
    }

    async fn admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        let admins = self.admins.read().await;
        Ok(admins.iter().find(|a| a.username == username).cloned())
    }

    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin> {
        let mut admins = self.admins.write().await;
        if admins.iter().any(|a| a.username == admin.username) {
            return Err(StoreError::Duplicate(format!(
                "admin '{}'",
                admin.username
            )));
        }
        let admin = Admin {
            id: Id::new(),
            admin,
        };
        admins.push(admin.clone());
        Ok(admin)
    }

    async fn admin_count(&self) -> Result<u64> {
        Ok(self.admins.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rocket::async_test]
    async fn duplicate_documents_are_rejected() {
        let store = MemoryStore::default();
        store.insert_voter(VoterCore::example()).await.unwrap();
        let result = store.insert_voter(VoterCore::example()).await;
        assert!(matches!(result, Err(StoreError::Duplicate(_))));
        assert!(store
            .voter_by_document(&VoterCore::example().document_id)
            .await
            .unwrap()
            .is_some());
    }

    #[rocket::async_test]
    async fn duplicate_emails_are_rejected() {
        let store = MemoryStore::default();
        let registered = VoterCore {
            email: Some("aarati@example.org".to_string()),
            ..VoterCore::example()
        };
        let voter = store.insert_voter(registered).await.unwrap();

        let same_email = VoterCore {
            email: Some("aarati@example.org".to_string()),
            ..VoterCore::example2()
        };
        let result = store.insert_voter(same_email).await;
        assert!(matches!(result, Err(StoreError::Duplicate(_))));

        // Voters without an email never clash on it.
        store.insert_voter(VoterCore::example2()).await.unwrap();

        let found = store
            .voter_by_email("aarati@example.org")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, voter.id);
        assert!(store.voter_by_email("nobody@example.org").await.unwrap().is_none());
    }

    #[rocket::async_test]
    async fn record_vote_requires_verified_voter() {
        let store = MemoryStore::default();
        let voter = store.insert_voter(VoterCore::example()).await.unwrap();
        let candidate = store
            .insert_candidate(NewCandidate::example())
            .await
            .unwrap();

        let vote = NewVote::new(&voter, candidate.id, None);
        assert_eq!(
            store.record_vote(vote.clone()).await.unwrap(),
            Recorded::VoterIneligible
        );
        assert_eq!(store.vote_count().await.unwrap(), 0);

        assert!(store.mark_verified(voter.id, "doc.pdf").await.unwrap());
        let Recorded::Vote(recorded) = store.record_vote(vote.clone()).await.unwrap() else {
            panic!("vote by a verified voter was not recorded");
        };
        assert_eq!(recorded.vote, vote);
        assert!(store.voter(voter.id).await.unwrap().unwrap().has_voted);

        // A second vote is refused.
        assert_eq!(
            store.record_vote(vote).await.unwrap(),
            Recorded::VoterIneligible
        );
        assert_eq!(store.vote_count().await.unwrap(), 1);
    }

    #[rocket::async_test]
    async fn record_vote_rechecks_candidate() {
        let store = MemoryStore::default();
        let voter = store.insert_voter(VoterCore::verified_example()).await.unwrap();
        let candidate = store
            .insert_candidate(NewCandidate::example())
            .await
            .unwrap();
        let vote = NewVote::new(&voter, candidate.id, None);

        // Retired after any earlier eligibility check, but before recording.
        assert!(store.retire_candidate(candidate.id).await.unwrap());
        assert_eq!(
            store.record_vote(vote).await.unwrap(),
            Recorded::CandidateInactive
        );
        assert_eq!(
            store
                .record_vote(NewVote::new(&voter, Id::new(), None))
                .await
                .unwrap(),
            Recorded::CandidateInactive
        );

        // Nothing was written, so the voter can still vote.
        assert_eq!(store.vote_count().await.unwrap(), 0);
        assert!(!store.voter(voter.id).await.unwrap().unwrap().has_voted);
    }

    #[rocket::async_test]
    async fn retired_candidates_are_hidden_by_default() {
        let store = MemoryStore::default();
        let active = store
            .insert_candidate(NewCandidate::example())
            .await
            .unwrap();
        let retiring = store
            .insert_candidate(NewCandidate::example2())
            .await
            .unwrap();
        assert!(store.retire_candidate(retiring.id).await.unwrap());
        assert!(!store.retire_candidate(Id::new()).await.unwrap());

        let listed = store.candidates(false).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, active.id);
        assert_eq!(store.candidates(true).await.unwrap().len(), 2);
    }

    #[rocket::async_test]
    async fn reviews_filter_by_status_newest_first() {
        use crate::moderation::ModerationFilter;

        let store = MemoryStore::default();
        let voter = store.insert_voter(VoterCore::example()).await.unwrap();
        let filter = ModerationFilter::default();
        let good = "A good candidate with great ideas".to_string();
        let bad = "Such garbage policies".to_string();
        let first = store
            .insert_review(NewReview::new(&voter, None, 5, good.clone(), filter.classify(&good)))
            .await
            .unwrap();
        let second = store
            .insert_review(NewReview::new(&voter, None, 1, bad.clone(), filter.classify(&bad)))
            .await
            .unwrap();

        let all = store.reviews(None).await.unwrap();
        assert_eq!(
            all.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
        let approved = store.reviews(Some(ReviewStatus::Approved)).await.unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].id, first.id);

        assert!(store.approve_review(second.id).await.unwrap());
        assert_eq!(
            store.reviews(Some(ReviewStatus::Pending)).await.unwrap().len(),
            0
        );
        assert!(store.delete_review(first.id).await.unwrap());
        assert!(!store.delete_review(first.id).await.unwrap());
    }

    #[rocket::async_test]
    async fn admin_usernames_are_unique() {
        let store = MemoryStore::default();
        let admin = store.insert_admin(NewAdmin::example()).await.unwrap();
        assert!(matches!(
            store.insert_admin(NewAdmin::example()).await,
            Err(StoreError::Duplicate(_))
        ));
        assert_eq!(store.admin_count().await.unwrap(), 1);
        let found = store
            .admin_by_username(&admin.username)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, admin.id);
    }
}
