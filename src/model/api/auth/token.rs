use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use mongodb::Database;
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::{try_outcome, IntoOutcome},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::mongodb::{Coll, Id};

use super::user::{Rights, User};

/// Name of the cookie holding the signed-in account's JWT.
pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// Proof that a request comes from a signed-in account of kind `U`.
///
/// As a request guard, this forwards when the cookie is missing, invalid,
/// expired, carries other rights, or names an account that no longer exists.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthToken<U> {
    pub id: Id,
    #[serde(rename = "rgt")]
    pub rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<U>,
}

/// Signed JWT payload.
#[derive(Serialize, Deserialize)]
struct Claims<U> {
    #[serde(flatten, bound = "")]
    token: AuthToken<U>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

impl<U: User> AuthToken<U> {
    pub fn new(user: &U) -> Self {
        Self {
            id: user.id(),
            rights: U::RIGHTS,
            phantom: PhantomData,
        }
    }

    /// Sign this token into an HTTP-only cookie that lives for `auth_ttl`.
    pub fn into_cookie(self, config: &Config) -> Result<Cookie<'static>> {
        let expire_at = Utc::now() + config.auth_ttl();
        let jwt = self.sign(expire_at, config)?;
        Ok(Cookie::build(AUTH_TOKEN_COOKIE, jwt)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish())
    }

    fn sign(self, expire_at: DateTime<Utc>, config: &Config) -> Result<String> {
        let claims = Claims {
            token: self,
            expire_at,
        };
        Ok(jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?)
    }

    /// Verify a signed token, rejecting bad signatures, expired tokens and
    /// tokens minted for a different kind of account.
    pub fn verify(jwt: &str, config: &Config) -> Result<Self> {
        let claims = jsonwebtoken::decode::<Claims<U>>(
            jwt,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )?
        .claims;
        if claims.token.rights != U::RIGHTS {
            return Err(Error::Status(
                Status::Forbidden,
                format!("Token carries {} rights, not {}", claims.token.rights, U::RIGHTS),
            ));
        }
        Ok(claims.token)
    }

    /// Load the account this token was issued to.
    pub async fn user(&self, users: &Coll<U>) -> Result<U> {
        users
            .find_one(self.id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found(format!("{} {}", self.rights, self.id)))
    }
}

#[rocket::async_trait]
impl<'r, U: User> FromRequest<'r> for AuthToken<U> {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Both are always managed once the fairings have run.
        let config = req.guard::<&State<Config>>().await.unwrap();
        let db = req.guard::<&State<Database>>().await.unwrap();

        let cookie = try_outcome!(req.cookies().get(AUTH_TOKEN_COOKIE).or_forward(()));
        let token = try_outcome!(Self::verify(cookie.value(), config).or_forward(()));

        // A deleted account's token is worthless.
        match Coll::<U>::from_db(db)
            .count_documents(token.id.as_doc(), None)
            .await
        {
            Ok(0) => {
                debug!("Token names missing {} {}", token.rights, token.id);
                Outcome::Forward(())
            }
            Ok(_) => Outcome::Success(token),
            Err(e) => Outcome::Failure((Status::InternalServerError, e.into())),
        }
    }
}
