use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::non_empty,
            response::Success,
            voter::{ProfileUpdate, VoterProfile},
        },
        auth::AuthToken,
        db::voter::Voter,
    },
    store::Storage,
};

pub fn routes() -> Vec<Route> {
    routes![get_profile, update_profile]
}

#[get("/voters/me")]
async fn get_profile(
    token: AuthToken<Voter>,
    storage: &State<Storage>,
) -> Result<Json<Success<VoterProfile>>> {
    let voter = storage
        .voter(token.id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voter with ID '{}'", token.id)))?;
    Ok(Json(Success::new(VoterProfile { user: voter.into() })))
}

/// Change the voter's name and/or country. Votes already cast keep the
/// country they were cast with.
#[put("/voters/me", data = "<update>", format = "json")]
async fn update_profile(
    token: AuthToken<Voter>,
    update: Json<ProfileUpdate>,
    storage: &State<Storage>,
) -> Result<Json<Success<VoterProfile>>> {
    let update = update.0;
    let name = update.name.map(|n| non_empty("name", n)).transpose()?;
    let country = update.country.map(|c| non_empty("country", c)).transpose()?;

    if !storage.update_voter_profile(token.id, name, country).await? {
        return Err(Error::not_found(format!("Voter with ID '{}'", token.id)));
    }
    get_profile(token, storage).await
}
