use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite},
    outcome::{try_outcome, IntoOutcome},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::mongodb::Id;

use super::user::{Rights, User};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token representing a specific user with specific rights.
///
/// For `AuthToken<Admin>` the id is the admin's user id; for
/// `AuthToken<Survey>` (a manager token) the id is the survey's id and `ver`
/// is the access-code version it was issued under, so code rotation
/// invalidates it.
#[derive(Serialize, Deserialize)]
pub struct AuthToken<U> {
    pub id: Id,
    #[serde(rename = "rgt")]
    pub rights: Rights,
    #[serde(rename = "ver", skip_serializing_if = "Option::is_none")]
    pub code_version: Option<u32>,
    #[serde(skip)]
    phantom: PhantomData<U>,
}

impl<U> AuthToken<U> {
    /// Does this token permit the given rights?
    pub fn permits(&self, target: Rights) -> bool {
        self.rights == target
    }
}

impl<U> AuthToken<U>
where
    U: User,
{
    /// Create a new [`AuthToken`] for the given user, with the correct rights for that user type.
    pub fn new(user: &U) -> Self {
        Self {
            id: user.id(),
            rights: U::RIGHTS,
            code_version: user.code_version(),
            phantom: PhantomData,
        }
    }

    /// Serialize this token into a cookie.
    #[allow(clippy::missing_panics_doc)]
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Deserialize and verify a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<U>>| claims.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<U> {
    #[serde(flatten, bound = "")]
    token: AuthToken<U>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, U> FromRequest<'r> for AuthToken<U>
where
    U: User + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie and verify that it has the correct rights for this user
    /// type.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        // Forward to any routes that do not require an authentication token.
        let cookie = match req.cookies().get(AUTH_TOKEN_COOKIE) {
            Some(cookie) => cookie,
            None => return Outcome::Forward(()),
        };

        // Decode the token.
        let token: Self = try_outcome!(Self::from_cookie(cookie, config).or_forward(()));

        // Check it represents the correct rights.
        if !token.permits(U::RIGHTS) {
            return Outcome::Forward(());
        }

        Outcome::Success(token)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use jsonwebtoken::{encode, EncodingKey, Header};

    use crate::model::db::{admin::Admin, survey::Survey};

    use super::*;

    #[test]
    fn cookie_round_trip_preserves_claims() {
        let config = Config::example();
        let survey = Survey::example();
        let token = AuthToken::new(&survey);
        let cookie = token.into_cookie(&config);

        let decoded = AuthToken::<Survey>::from_cookie(&cookie, &config).unwrap();
        assert_eq!(decoded.id, survey.id);
        assert_eq!(decoded.rights, Rights::Manager);
        assert_eq!(decoded.code_version, Some(survey.survey.code_version));
    }

    #[test]
    fn admin_tokens_carry_no_code_version() {
        let config = Config::example();
        let admin = Admin::example();
        let cookie = AuthToken::new(&admin).into_cookie(&config);

        let decoded = AuthToken::<Admin>::from_cookie(&cookie, &config).unwrap();
        assert_eq!(decoded.rights, Rights::Admin);
        assert_eq!(decoded.code_version, None);
    }

    #[test]
    fn manager_token_does_not_permit_admin_rights() {
        let token = AuthToken::new(&Survey::example());
        assert!(token.permits(Rights::Manager));
        assert!(!token.permits(Rights::Admin));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let config = Config::example();
        let claims = Claims {
            token: AuthToken::new(&Survey::example()),
            expire_at: Utc::now() - ChronoDuration::minutes(5),
        };
        let jwt = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .unwrap();
        let cookie = Cookie::new(AUTH_TOKEN_COOKIE, jwt);

        let result = AuthToken::<Survey>::from_cookie(&cookie, &config);
        assert!(matches!(
            result,
            Err(Error::AuthDenied(
                crate::model::auth::policy::Denial::ExpiredToken
            ))
        ));
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let config = Config::example();
        let cookie = AuthToken::new(&Survey::example()).into_cookie(&config);
        let mut tampered = cookie.value().to_string();
        tampered.pop();
        let cookie = Cookie::new(AUTH_TOKEN_COOKIE, tampered);

        assert!(AuthToken::<Survey>::from_cookie(&cookie, &config).is_err());
    }
}
