use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};

use crate::model::api::response::Failure;

pub mod auth;
mod candidates;
mod health;
mod reviews;
mod voter;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(voter::routes());
    routes.extend(candidates::routes());
    routes.extend(voting::routes());
    routes.extend(reviews::routes());
    routes.extend(health::routes());
    routes
}

/// Render every unhandled failure in the same JSON shape as route errors.
pub fn catchers() -> Vec<Catcher> {
    catchers![bad_request, unauthorized, not_found, unprocessable, default_catcher]
}

#[catch(400)]
fn bad_request() -> Json<Failure> {
    Json(Failure::new("Malformed request", None))
}

#[catch(401)]
fn unauthorized() -> Json<Failure> {
    Json(Failure::new("Not signed in", None))
}

#[catch(404)]
fn not_found(req: &Request) -> Json<Failure> {
    Json(Failure::new(
        format!("Nothing found at {} {}", req.method(), req.uri()),
        None,
    ))
}

#[catch(422)]
fn unprocessable() -> Json<Failure> {
    Json(Failure::new("Request body has missing or invalid fields", None))
}

#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> Json<Failure> {
    let message = if status.code >= 500 {
        "Something went wrong"
    } else {
        status.reason().unwrap_or("Request failed")
    };
    Json(Failure::new(message, None))
}

#[cfg(test)]
mod tests {
    use rocket::{http::Status, local::asynchronous::Client, serde::json::Value};

    #[backend_test]
    async fn unknown_routes_fail_as_json(client: Client) {
        let response = client.get("/no/such/route").dispatch().await;
        assert_eq!(Status::NotFound, response.status());

        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("/no/such/route"));
    }
}
