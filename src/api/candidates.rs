use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            candidate::{CandidateCreated, CandidateList, CandidateSpec},
            response::{Message, Success},
        },
        auth::AuthToken,
        db::{admin::Admin, candidate::NewCandidate},
        mongodb::Id,
    },
    store::Storage,
};

pub fn routes() -> Vec<Route> {
    routes![list_candidates, create_candidate, retire_candidate]
}

/// List candidates. Retired candidates are only included on request.
#[get("/candidates?<include_retired>")]
async fn list_candidates(
    include_retired: Option<bool>,
    storage: &State<Storage>,
) -> Result<Json<Success<CandidateList>>> {
    let candidates = storage
        .candidates(include_retired.unwrap_or(false))
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(Success::new(CandidateList { candidates })))
}

#[post("/candidates", data = "<spec>", format = "json")]
async fn create_candidate(
    _token: AuthToken<Admin>,
    spec: Json<CandidateSpec>,
    storage: &State<Storage>,
) -> Result<(Status, Json<Success<CandidateCreated>>)> {
    let candidate: NewCandidate = spec.0.try_into()?;
    let candidate = storage.insert_candidate(candidate).await?;
    info!("Added candidate {} ({})", candidate.id, candidate.name);

    Ok((
        Status::Created,
        Json(Success::new(CandidateCreated {
            message: "Candidate added successfully".to_string(),
            candidate: candidate.into(),
        })),
    ))
}

/// Retire a candidate. Their votes still count, but they accept no more.
#[delete("/candidates/<candidate_id>")]
async fn retire_candidate(
    _token: AuthToken<Admin>,
    candidate_id: Id,
    storage: &State<Storage>,
) -> Result<Json<Success<Message>>> {
    if !storage.retire_candidate(candidate_id).await? {
        return Err(Error::not_found(format!(
            "Candidate with ID '{candidate_id}'"
        )));
    }
    info!("Retired candidate {candidate_id}");
    Ok(Json(Message::new("Candidate removed successfully")))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::json,
    };

    use super::*;

    #[backend_test(admin)]
    async fn create_and_list(client: Client) {
        let response = client
            .post(uri!(create_candidate))
            .header(ContentType::JSON)
            .body(json!(CandidateSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let created: Success<CandidateCreated> = response.into_json().await.unwrap();
        assert!(created.body.candidate.active);

        let list: Success<CandidateList> = client
            .get("/candidates")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(list.body.candidates, vec![created.body.candidate]);
    }

    #[backend_test]
    async fn create_requires_admin(client: Client, storage: Storage) {
        let response = client
            .post(uri!(create_candidate))
            .header(ContentType::JSON)
            .body(json!(CandidateSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
        assert!(storage.candidates(true).await.unwrap().is_empty());
    }

    #[backend_test(voter)]
    async fn voters_cannot_create(client: Client) {
        let response = client
            .post(uri!(create_candidate))
            .header(ContentType::JSON)
            .body(json!(CandidateSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn create_rejects_blank_party(client: Client) {
        let response = client
            .post(uri!(create_candidate))
            .header(ContentType::JSON)
            .body(json!({ "name": "Sita Adhikari", "party": "  " }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(admin)]
    async fn retire_hides_candidate(client: Client, storage: Storage) {
        let candidate = storage
            .insert_candidate(NewCandidate::example())
            .await
            .unwrap();

        let response = client
            .delete(uri!(retire_candidate(candidate.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let active: Success<CandidateList> = client
            .get("/candidates")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert!(active.body.candidates.is_empty());

        let all: Success<CandidateList> = client
            .get("/candidates?include_retired=true")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(all.body.candidates.len(), 1);
        assert!(!all.body.candidates[0].active);

        // Unknown candidates cannot be retired.
        let response = client
            .delete(uri!(retire_candidate(Id::new())))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}
