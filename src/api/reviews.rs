use std::collections::HashMap;

use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            response::{Message, Success},
            review::{ReviewDescription, ReviewList, ReviewRequest, ReviewSubmitted},
        },
        auth::AuthToken,
        common::ReviewStatus,
        db::{admin::Admin, review::NewReview},
        mongodb::Id,
    },
    moderation::ModerationFilter,
    store::Storage,
};

pub fn routes() -> Vec<Route> {
    routes![
        submit_review,
        all_reviews,
        approved_reviews,
        approve_review,
        delete_review
    ]
}

/// Submit a review. It is published straight away if it passes the content
/// filter, otherwise it waits for an admin.
#[post("/reviews", data = "<request>", format = "json")]
async fn submit_review(
    request: Json<ReviewRequest>,
    storage: &State<Storage>,
    filter: &State<ModerationFilter>,
) -> Result<(Status, Json<Success<ReviewSubmitted>>)> {
    let request = request.0;
    request.validate()?;

    let voter = storage
        .voter(request.user_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voter with ID '{}'", request.user_id)))?;
    if let Some(candidate_id) = request.candidate_id {
        if storage.candidate(candidate_id).await?.is_none() {
            return Err(Error::not_found(format!(
                "Candidate with ID '{candidate_id}'"
            )));
        }
    }

    let moderation = filter.classify(&request.content);
    let review = NewReview::new(
        &voter,
        request.candidate_id,
        request.rating,
        request.content,
        moderation,
    );
    let review = storage.insert_review(review).await?;
    debug!(
        "Review {} by voter {} moderated as {:?}",
        review.id, voter.id, moderation.reason
    );

    let message = if moderation.approved {
        "Review submitted successfully".to_string()
    } else {
        format!("Review filtered by AI: {}", moderation.reason)
    };
    Ok((
        Status::Created,
        Json(Success::new(ReviewSubmitted {
            message,
            ai_filtered: !moderation.approved,
            review_id: review.id.into(),
        })),
    ))
}

/// Every review, including those awaiting moderation.
#[get("/reviews", rank = 1)]
async fn all_reviews(
    _token: AuthToken<Admin>,
    storage: &State<Storage>,
) -> Result<Json<Success<ReviewList>>> {
    list(storage, None).await
}

/// Published reviews only.
#[get("/reviews", rank = 2)]
async fn approved_reviews(storage: &State<Storage>) -> Result<Json<Success<ReviewList>>> {
    list(storage, Some(ReviewStatus::Approved)).await
}

async fn list(
    storage: &Storage,
    status: Option<ReviewStatus>,
) -> Result<Json<Success<ReviewList>>> {
    let candidates = storage
        .candidates(true)
        .await?
        .into_iter()
        .map(|candidate| (candidate.id, candidate))
        .collect::<HashMap<_, _>>();
    let reviews = storage
        .reviews(status)
        .await?
        .into_iter()
        .map(|review| ReviewDescription::new(review, &candidates))
        .collect();
    Ok(Json(Success::new(ReviewList { reviews })))
}

#[put("/reviews/<review_id>/approve")]
async fn approve_review(
    _token: AuthToken<Admin>,
    review_id: Id,
    storage: &State<Storage>,
) -> Result<Json<Success<Message>>> {
    if !storage.approve_review(review_id).await? {
        return Err(Error::not_found(format!("Review with ID '{review_id}'")));
    }
    info!("Approved review {review_id}");
    Ok(Json(Message::new("Review approved successfully")))
}

#[delete("/reviews/<review_id>")]
async fn delete_review(
    _token: AuthToken<Admin>,
    review_id: Id,
    storage: &State<Storage>,
) -> Result<Json<Success<Message>>> {
    if !storage.delete_review(review_id).await? {
        return Err(Error::not_found(format!("Review with ID '{review_id}'")));
    }
    info!("Deleted review {review_id}");
    Ok(Json(Message::new("Review deleted successfully")))
}
