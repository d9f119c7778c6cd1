use chrono::Utc;
use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            admin::AdminCredentials,
            survey::{ManagerCredentials, SurveyDescription},
        },
        auth::{access_code, policy::Denial, AccessCode, AuthToken, AUTH_TOKEN_COOKIE},
        db::{admin::Admin, partition::PartitionRegistry},
        mongodb::Coll,
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![authenticate_admin, authenticate_manager, logout]
}

#[post("/auth/admin", data = "<credentials>", format = "json")]
pub async fn authenticate_admin(
    cookies: &CookieJar<'_>,
    credentials: Json<AdminCredentials>,
    admins: Coll<Admin>,
    config: &State<Config>,
) -> Result<()> {
    let with_username = doc! {
        "username": &credentials.username
    };

    let admin = admins
        .find_one(with_username, None)
        .await?
        .filter(|admin| admin.verify_password(&credentials.password))
        .ok_or(Error::AuthDenied(Denial::BadCredentials))?;

    let token = AuthToken::new(&admin);
    cookies.add(token.into_cookie(config));

    Ok(())
}

/// Exchange a survey's access code for a manager token scoped to that survey.
#[post("/auth/manager", data = "<credentials>", format = "json")]
pub async fn authenticate_manager(
    cookies: &CookieJar<'_>,
    credentials: Json<ManagerCredentials>,
    registry: &State<PartitionRegistry>,
    config: &State<Config>,
) -> Result<Json<SurveyDescription>> {
    let (survey, _) = registry.resolve(credentials.survey_id).await?;

    let code = AccessCode::from(credentials.access_code.clone());
    access_code::verify_or_deny(&code, &survey.access_code_hash)?;

    let token = AuthToken::new(&survey);
    cookies.add(token.into_cookie(config));

    Ok(Json(SurveyDescription::new(&survey, Utc::now())))
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}
