use rocket::{
    form::Form,
    fs::TempFile,
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            admin::{AdminCredentials, AdminLogin},
            auth::{LoginRequest, LoginResponse, RegistrationRequest, RegistrationResponse},
            response::{Message, Success},
        },
        auth::{AuthToken, AUTH_TOKEN_COOKIE},
        db::{
            admin::Admin,
            voter::{NewVoter, Voter},
        },
        mongodb::Id,
    },
    store::{Storage, StoreError},
    verification::DocumentVerifier,
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![register, login, verify_document, admin_login, logout]
}

/// Message for a registration that clashes with an existing voter.
const ALREADY_REGISTERED: &str = "User with this email or document already exists";

/// Register a voter up front, with an email and password. Unlike login, this
/// never signs in an existing voter.
#[post("/auth/register", data = "<request>", format = "json")]
pub async fn register(
    request: Json<RegistrationRequest>,
    storage: &State<Storage>,
) -> Result<(Status, Json<Success<RegistrationResponse>>)> {
    let new_voter: NewVoter = request.0.try_into()?;

    let email = new_voter.email.as_deref().unwrap_or_default();
    if storage.voter_by_email(email).await?.is_some()
        || storage
            .voter_by_document(&new_voter.document_id)
            .await?
            .is_some()
    {
        return Err(Error::Conflict(ALREADY_REGISTERED.to_string()));
    }

    let voter = match storage.insert_voter(new_voter).await {
        Ok(voter) => voter,
        // Someone registered the same details concurrently.
        Err(StoreError::Duplicate(_)) => {
            return Err(Error::Conflict(ALREADY_REGISTERED.to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    info!("Registered voter {} with an email", voter.id);

    Ok((
        Status::Created,
        Json(Success::new(RegistrationResponse {
            message: "User registered successfully".to_string(),
            user: voter.into(),
        })),
    ))
}

#[post("/auth/login", data = "<request>", format = "json")]
pub async fn login(
    request: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    storage: &State<Storage>,
    config: &State<Config>,
) -> Result<Json<Success<LoginResponse>>> {
    let new_voter: NewVoter = request.0.try_into()?;

    // A voter is identified by their document; sign in the existing one if any.
    let voter = match storage.voter_by_document(&new_voter.document_id).await? {
        Some(voter) => voter,
        None => find_or_register(storage, new_voter).await?,
    };

    let token = AuthToken::new(&voter).encode(config)?;
    cookies.add(AuthToken::<Voter>::cookie(token.clone(), config));

    Ok(Json(Success::new(LoginResponse {
        token,
        user: voter.into(),
    })))
}

/// Insert a new voter. If a concurrent sign-in registered the same document
/// first, use that voter instead.
async fn find_or_register(storage: &Storage, new_voter: NewVoter) -> Result<Voter> {
    let document_id = new_voter.document_id.clone();
    match storage.insert_voter(new_voter).await {
        Ok(voter) => {
            info!("Registered voter {}", voter.id);
            Ok(voter)
        }
        Err(StoreError::Duplicate(_)) => storage
            .voter_by_document(&document_id)
            .await?
            .ok_or_else(|| Error::Conflict("Voter registration clashed, try again".to_string())),
        Err(e) => Err(e.into()),
    }
}

/// An identity document upload.
#[derive(FromForm)]
pub struct DocumentUpload<'r> {
    #[field(name = "userId")]
    #[field(name = "voterRef")]
    pub user_id: Id,
    pub document: TempFile<'r>,
}

#[post("/auth/verify-document", data = "<upload>")]
pub async fn verify_document(
    mut upload: Form<DocumentUpload<'_>>,
    verifier: &State<DocumentVerifier>,
) -> Result<Json<Success<Message>>> {
    let voter_id = upload.user_id;
    verifier.submit(voter_id, &mut upload.document).await?;

    Ok(Json(Message::new(
        "Document uploaded successfully. Verification in progress...",
    )))
}

#[post("/auth/admin", data = "<credentials>", format = "json")]
pub async fn admin_login(
    credentials: Json<AdminCredentials>,
    cookies: &CookieJar<'_>,
    storage: &State<Storage>,
    config: &State<Config>,
) -> Result<Json<Success<AdminLogin>>> {
    let admin = storage
        .admin_by_username(&credentials.username)
        .await?
        .filter(|admin| admin.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::Unauthorized(
                "No admin found with the provided username and password combination".to_string(),
            )
        })?;

    let token = AuthToken::new(&admin).encode(config)?;
    cookies.add(AuthToken::<Admin>::cookie(token.clone(), config));

    Ok(Json(Success::new(AdminLogin {
        token,
        username: admin.admin.username,
    })))
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar<'_>) -> Json<Success<Message>> {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Json(Message::new("Logged out"))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Header},
        local::asynchronous::Client,
        serde::json::{serde_json::json, Value},
    };

    use crate::model::api::voter::VoterSummary;

    use super::*;

    /// Build a multipart body with a `userId` field and a `document` file.
    fn multipart(user_id: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> (ContentType, Vec<u8>) {
        const BOUNDARY: &str = "X-VOTING-BOUNDARY";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"userId\"\r\n\r\n{user_id}\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"document\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        let content_type = ContentType::new("multipart", "form-data").with_params(("boundary", BOUNDARY));
        (content_type, body)
    }

    #[backend_test]
    async fn voter_login_registers_once(client: Client, storage: Storage) {
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(LoginRequest::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());

        let first: Success<LoginResponse> = response.into_json().await.unwrap();
        assert!(!first.body.token.is_empty());
        assert_eq!(first.body.user.name, "Aarati Gurung");
        assert!(!first.body.user.document_verified);
        assert!(!first.body.user.has_voted);

        // Signing in again finds the same voter.
        let second: Success<LoginResponse> = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(LoginRequest::example()).to_string())
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(first.body.user.id, second.body.user.id);

        let voter = storage
            .voter_by_document(&LoginRequest::example().document_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(VoterSummary::from(voter), second.body.user);
    }

    async fn post_registration(client: &Client, request: &RegistrationRequest) -> (Status, Value) {
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(request).to_string())
            .dispatch()
            .await;
        let status = response.status();
        (status, response.into_json().await.unwrap())
    }

    #[backend_test]
    async fn register_new_voter(client: Client, storage: Storage) {
        let request = RegistrationRequest::example();
        let (status, body) = post_registration(&client, &request).await;
        assert_eq!(Status::Created, status);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "User registered successfully");
        assert_eq!(body["user"]["name"], "Maya Shrestha");
        assert_eq!(body["user"]["email"], "maya.shrestha@example.org");
        assert_eq!(body["user"]["documentVerified"], false);
        // Registration does not sign in.
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));

        let voter = storage
            .voter_by_email("maya.shrestha@example.org")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(body["user"]["id"], voter.id.to_string());
        assert_eq!(voter.document_id, request.document_id);
        assert!(voter.password_hash.is_some());

        // The registered voter can then log in by document.
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(
                json!({
                    "name": request.name,
                    "country": request.country,
                    "documentType": "Citizenship Certificate",
                    "documentId": request.document_id,
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let login: Success<LoginResponse> = response.into_json().await.unwrap();
        assert_eq!(login.body.user.id.to_string(), voter.id.to_string());
    }

    #[backend_test]
    async fn register_rejects_existing_email_or_document(client: Client, storage: Storage) {
        let (status, _) = post_registration(&client, &RegistrationRequest::example()).await;
        assert_eq!(Status::Created, status);

        // Same email, differently cased, with a new document.
        let same_email = RegistrationRequest {
            email: "MAYA.SHRESTHA@example.org".to_string(),
            document_id: "CC-0000-001".to_string(),
            ..RegistrationRequest::example()
        };
        let (status, body) = post_registration(&client, &same_email).await;
        assert_eq!(Status::Conflict, status);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], ALREADY_REGISTERED);

        // Same document as a voter who only ever logged in.
        storage.insert_voter(NewVoter::example()).await.unwrap();
        let same_document = RegistrationRequest {
            email: "aarati@example.org".to_string(),
            document_id: NewVoter::example().document_id,
            ..RegistrationRequest::example()
        };
        let (status, body) = post_registration(&client, &same_document).await;
        assert_eq!(Status::Conflict, status);
        assert_eq!(body["message"], ALREADY_REGISTERED);
        assert!(storage
            .voter_by_email("aarati@example.org")
            .await
            .unwrap()
            .is_none());
    }

    #[backend_test]
    async fn register_rejects_short_password(client: Client) {
        let request = RegistrationRequest {
            password: "short".to_string(),
            ..RegistrationRequest::example()
        };
        let (status, body) = post_registration(&client, &request).await;
        assert_eq!(Status::BadRequest, status);
        assert_eq!(body["success"], false);
    }

    #[backend_test]
    async fn voter_login_rejects_blank_fields(client: Client) {
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(
                json!({
                    "name": " ",
                    "country": "Nepal",
                    "documentType": "Passport",
                    "documentId": "PA1234567",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
    }

    #[backend_test]
    async fn voter_login_rejects_unknown_document_type(client: Client) {
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(
                json!({
                    "name": "Aarati Gurung",
                    "country": "Nepal",
                    "documentType": "Library Card",
                    "documentId": "LC-1",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::UnprocessableEntity, response.status());
    }

    #[backend_test]
    async fn admin_login_valid(client: Client) {
        let response = client
            .post(uri!(admin_login))
            .header(ContentType::JSON)
            .body(json!(AdminCredentials::example()).to_string())
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
    }

    #[backend_test]
    async fn admin_login_invalid(client: Client) {
        // Unknown username.
        let response = client
            .post(uri!(admin_login))
            .header(ContentType::JSON)
            .body(json!(AdminCredentials::empty()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));

        // Wrong password.
        let response = client
            .post(uri!(admin_login))
            .header(ContentType::JSON)
            .body(
                json!({
                    "username": AdminCredentials::example().username,
                    "password": "not the password",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
    }

    #[backend_test(voter)]
    async fn logout_clears_cookie(client: Client) {
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
        let response = client.delete(uri!(logout)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
    }

    #[backend_test]
    async fn bearer_token_is_accepted(client: Client) {
        let login: Success<LoginResponse> = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(LoginRequest::example()).to_string())
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        client.delete(uri!(logout)).dispatch().await;

        // Without the cookie or a header, there is no profile to see.
        let response = client.get("/voters/me").dispatch().await;
        assert_eq!(Status::NotFound, response.status());

        let response = client
            .get("/voters/me")
            .header(Header::new(
                "Authorization",
                format!("Bearer {}", login.body.token),
            ))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
    }

    #[backend_test(voter)]
    async fn document_upload_verifies_later(client: Client, storage: Storage) {
        let voter = storage
            .voter_by_document(&LoginRequest::example().document_id)
            .await
            .unwrap()
            .unwrap();
        let (content_type, body) =
            multipart(&voter.id.to_string(), "passport.png", "image/png", b"\x89PNG fake image");

        let response = client
            .post(uri!(verify_document))
            .header(content_type)
            .body(body)
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        // The response does not wait for verification.
        let voter_now = storage.voter(voter.id).await.unwrap().unwrap();
        assert!(!voter_now.verified);

        let verifier = client.rocket().state::<DocumentVerifier>().unwrap();
        assert!(verifier.finish_pending(voter.id).await);
        let voter_now = storage.voter(voter.id).await.unwrap().unwrap();
        assert!(voter_now.verified);
        let path = voter_now.document_path.clone().unwrap();
        assert!(path.ends_with(".png"));
        assert!(std::path::Path::new(&path).exists());
    }

    #[backend_test(voter)]
    async fn document_upload_rejects_bad_files(client: Client, storage: Storage) {
        let voter = storage
            .voter_by_document(&LoginRequest::example().document_id)
            .await
            .unwrap()
            .unwrap();

        let (content_type, body) =
            multipart(&voter.id.to_string(), "notes.txt", "text/plain", b"not a document");
        let response = client
            .post(uri!(verify_document))
            .header(content_type)
            .body(body)
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let too_big = vec![0_u8; 5 * 1024 * 1024 + 1];
        let (content_type, body) =
            multipart(&voter.id.to_string(), "scan.pdf", "application/pdf", &too_big);
        let response = client
            .post(uri!(verify_document))
            .header(content_type)
            .body(body)
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let verifier = client.rocket().state::<DocumentVerifier>().unwrap();
        assert!(!verifier.finish_pending(voter.id).await);
    }

    #[backend_test]
    async fn document_upload_for_unknown_voter(client: Client) {
        let (content_type, body) =
            multipart(&Id::new().to_string(), "id.jpg", "image/jpeg", b"fake jpeg");
        let response = client
            .post(uri!(verify_document))
            .header(content_type)
            .body(body)
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}
