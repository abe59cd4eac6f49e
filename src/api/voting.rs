use std::net::IpAddr;

use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    engine::VoteEngine,
    error::Result,
    model::api::{
        response::Success,
        vote::{CandidateTally, CountryTally, ElectionResults, VoteRecorded, VoteRequest},
    },
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, candidate_tally, country_tally, results]
}

#[post("/vote", data = "<request>", format = "json")]
async fn cast_vote(
    request: Json<VoteRequest>,
    client_ip: Option<IpAddr>,
    engine: &State<VoteEngine>,
) -> Result<(Status, Json<Success<VoteRecorded>>)> {
    let vote = engine
        .cast_vote(request.user_id, request.candidate_id, client_ip)
        .await?;

    Ok((
        Status::Created,
        Json(Success::new(VoteRecorded {
            message: "Vote cast successfully".to_string(),
            vote: vote.into(),
        })),
    ))
}

/// Vote counts per candidate ID.
#[get("/votes")]
async fn candidate_tally(engine: &State<VoteEngine>) -> Result<Json<Success<CandidateTally>>> {
    let tally = engine.tally_by_candidate().await?;
    let votes = tally
        .counts
        .into_iter()
        .map(|(id, count)| (id.to_string(), count))
        .collect();
    Ok(Json(Success::new(CandidateTally {
        votes,
        total: tally.total,
    })))
}

/// Vote counts per voter country.
#[get("/voter-stats")]
async fn country_tally(engine: &State<VoteEngine>) -> Result<Json<Success<CountryTally>>> {
    let tally = engine.tally_by_country().await?;
    Ok(Json(Success::new(CountryTally {
        stats: tally.counts,
        total: tally.total,
    })))
}

/// Each candidate's votes and share of the total, most votes first.
#[get("/results")]
async fn results(engine: &State<VoteEngine>) -> Result<Json<Success<ElectionResults>>> {
    let results = engine.results().await?;
    let total = results.iter().map(|result| result.votes).sum();
    Ok(Json(Success::new(ElectionResults {
        total,
        results: results.into_iter().map(Into::into).collect(),
    })))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::{serde_json::json, Value},
    };

    use crate::{
        model::{
            api::auth::LoginRequest,
            db::{
                candidate::{Candidate, NewCandidate},
                voter::{NewVoter, Voter},
            },
            mongodb::Id,
        },
        store::Storage,
    };

    use super::*;

    async fn verified_voter(storage: &Storage, voter: NewVoter) -> Voter {
        let voter = storage.insert_voter(voter).await.unwrap();
        storage.mark_verified(voter.id, "doc.pdf").await.unwrap();
        voter
    }

    async fn vote(client: &Client, voter: Id, candidate: Id) -> (Status, Value) {
        let response = client
            .post(uri!(cast_vote))
            .header(ContentType::JSON)
            .body(
                json!({
                    "userId": voter.to_string(),
                    "candidateId": candidate.to_string(),
                })
                .to_string(),
            )
            .dispatch()
            .await;
        let status = response.status();
        (status, response.into_json().await.unwrap())
    }

    async fn add_candidate(storage: &Storage, candidate: NewCandidate) -> Candidate {
        storage.insert_candidate(candidate).await.unwrap()
    }

    #[backend_test]
    async fn vote_once(client: Client, storage: Storage) {
        let voter = verified_voter(&storage, NewVoter::example()).await;
        let candidate = add_candidate(&storage, NewCandidate::example()).await;

        let (status, body) = vote(&client, voter.id, candidate.id).await;
        assert_eq!(Status::Created, status);
        assert_eq!(body["success"], true);
        assert_eq!(body["vote"]["candidateId"], candidate.id.to_string());
        assert_eq!(body["vote"]["country"], "Nepal");

        let (status, body) = vote(&client, voter.id, candidate.id).await;
        assert_eq!(Status::Conflict, status);
        assert_eq!(body["success"], false);
        assert_eq!(body["reason"], "AlreadyVoted");
        assert_eq!(body["message"], "User has already voted");
        assert_eq!(storage.vote_count().await.unwrap(), 1);
    }

    #[backend_test]
    async fn rejections_have_distinct_statuses(client: Client, storage: Storage) {
        let candidate = add_candidate(&storage, NewCandidate::example()).await;
        let retired = add_candidate(&storage, NewCandidate::retired_example()).await;

        let (status, body) = vote(&client, Id::new(), candidate.id).await;
        assert_eq!(Status::NotFound, status);
        assert_eq!(body["reason"], "VoterNotFound");

        let unverified = storage.insert_voter(NewVoter::example2()).await.unwrap();
        let (status, body) = vote(&client, unverified.id, candidate.id).await;
        assert_eq!(Status::Forbidden, status);
        assert_eq!(body["reason"], "VoterNotVerified");

        let voter = verified_voter(&storage, NewVoter::example()).await;
        let (status, body) = vote(&client, voter.id, retired.id).await;
        assert_eq!(Status::BadRequest, status);
        assert_eq!(body["reason"], "CandidateInvalid");
        assert_eq!(storage.vote_count().await.unwrap(), 0);
    }

    #[backend_test]
    async fn legacy_field_names(client: Client, storage: Storage) {
        let voter = verified_voter(&storage, NewVoter::example()).await;
        let candidate = add_candidate(&storage, NewCandidate::example()).await;

        let response = client
            .post(uri!(cast_vote))
            .header(ContentType::JSON)
            .body(
                json!({
                    "voterRef": voter.id.to_string(),
                    "candidateRef": candidate.id.to_string(),
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
    }

    #[backend_test]
    async fn malformed_ids_are_rejected(client: Client) {
        let response = client
            .post(uri!(cast_vote))
            .header(ContentType::JSON)
            .body(json!({ "userId": "nope", "candidateId": "nope" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::UnprocessableEntity, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["success"], false);
    }

    #[backend_test(voter)]
    async fn full_voter_journey(client: Client, storage: Storage) {
        let voter = storage
            .voter_by_document(&LoginRequest::example().document_id)
            .await
            .unwrap()
            .unwrap();
        storage.mark_verified(voter.id, "doc.pdf").await.unwrap();
        let first = add_candidate(&storage, NewCandidate::example()).await;
        let second = add_candidate(&storage, NewCandidate::example2()).await;
        let other = verified_voter(&storage, NewVoter::example2()).await;

        assert_eq!(vote(&client, voter.id, first.id).await.0, Status::Created);
        assert_eq!(vote(&client, other.id, first.id).await.0, Status::Created);

        let votes: Value = client
            .get(uri!(candidate_tally))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(votes["total"], 2);
        assert_eq!(votes["votes"][first.id.to_string()], 2);
        assert!(votes["votes"].get(second.id.to_string()).is_none());

        let stats: Value = client
            .get(uri!(country_tally))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(stats["total"], 2);
        assert_eq!(stats["stats"]["Nepal"], 1);
        assert_eq!(stats["stats"]["United Kingdom"], 1);

        let results: Value = client
            .get(uri!(results))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(results["total"], 2);
        assert_eq!(results["results"][0]["candidateId"], first.id.to_string());
        assert_eq!(results["results"][0]["percentage"], 100.0);
        assert_eq!(results["results"][1]["candidateId"], second.id.to_string());
        assert_eq!(results["results"][1]["percentage"], 0.0);

        // The voter's profile now shows they have voted.
        let profile: Value = client
            .get("/voters/me")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(profile["user"]["hasVoted"], true);
    }

    #[backend_test]
    async fn empty_tallies(client: Client) {
        let votes: Value = client
            .get(uri!(candidate_tally))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(votes["total"], 0);
        assert_eq!(votes["votes"], json!({}));

        let results: Value = client
            .get(uri!(results))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(results["results"], json!([]));
    }
}
