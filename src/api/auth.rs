use mongodb::bson::{doc, Document};
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
            auth::{AuthToken, User, AUTH_TOKEN_COOKIE},
            voter::VoterCredentials,
        },
        db::{admin::Admin, voter::Voter},
        mongodb::Coll,
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![authenticate_admin, authenticate_voter, logout]
}

#[post("/auth/admin", data = "<credentials>", format = "json")]
pub async fn authenticate_admin(
    cookies: &CookieJar<'_>,
    credentials: Json<AdminCredentials>,
    admins: Coll<Admin>,
    config: &State<Config>,
) -> Result<()> {
    let by_username = doc! { "username": credentials.username.trim() };
    sign_in(cookies, &admins, by_username, &credentials.password, config).await
}

#[post("/auth/voter", data = "<credentials>", format = "json")]
pub async fn authenticate_voter(
    cookies: &CookieJar<'_>,
    credentials: Json<VoterCredentials>,
    voters: Coll<Voter>,
    config: &State<Config>,
) -> Result<()> {
    let by_school_id = doc! { "school_id": credentials.school_id.trim() };
    sign_in(cookies, &voters, by_school_id, &credentials.password, config).await
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}

/// Find the account matching `filter`, check its password, and set the auth cookie.
///
/// Unknown accounts and wrong passwords are indistinguishable to the caller.
async fn sign_in<U: User>(
    cookies: &CookieJar<'_>,
    users: &Coll<U>,
    filter: Document,
    password: &str,
    config: &Config,
) -> Result<()> {
    let user = users
        .find_one(filter, None)
        .await?
        .filter(|user| user.accepts_password(password))
        .ok_or_else(|| {
            Error::Status(
                Status::Unauthorized,
                format!("Unknown {} or wrong password", U::RIGHTS),
            )
        })?;

    cookies.add(AuthToken::new(&user).into_cookie(config)?);
    info!("{} '{}' signed in", U::RIGHTS, user.login_name());
    Ok(())
}

#[cfg(test)]
mod tests {
    use rocket::{http::ContentType, local::asynchronous::Client, serde::json::serde_json::json};

    use crate::model::db::{admin::NewAdmin, voter::NewVoter};

    use super::*;

    #[backend_test]
    async fn admin_authenticate_valid(client: Client, admins: Coll<NewAdmin>) {
        // Ensure there is an admin to login as
        admins.insert_one(NewAdmin::example(), None).await.unwrap();

        // Use valid credentials to attempt admin login
        let response = client
            .post(uri!(authenticate_admin))
            .header(ContentType::JSON)
            .body(json!(AdminCredentials::example()).to_string())
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
    }

    #[backend_test]
    async fn admin_authenticate_invalid(client: Client, admins: Coll<NewAdmin>) {
        // Ensure there is an admin to fail to login as
        admins.insert_one(NewAdmin::example(), None).await.unwrap();

        // Use invalid username to attempt admin login
        let response = client
            .post(uri!(authenticate_admin))
            .header(ContentType::JSON)
            .body(json!(AdminCredentials::empty()).to_string())
            .dispatch()
            .await;

        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));

        // Use invalid password to attempt admin login
        let response = client
            .post(uri!(authenticate_admin))
            .header(ContentType::JSON)
            .body(
                json! ({
                    "username": &NewAdmin::example().username,
                    "password": "",
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
    }

    #[backend_test]
    async fn voter_authenticate(client: Client, voters: Coll<NewVoter>) {
        voters.insert_one(NewVoter::example(), None).await.unwrap();

        let response = client
            .post(uri!(authenticate_voter))
            .header(ContentType::JSON)
            .body(json!(VoterCredentials::example()).to_string())
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
    }

    #[backend_test]
    async fn voter_wrong_password(client: Client, voters: Coll<NewVoter>) {
        voters.insert_one(NewVoter::example(), None).await.unwrap();

        let response = client
            .post(uri!(authenticate_voter))
            .header(ContentType::JSON)
            .body(
                json!({
                    "school_id": &NewVoter::example().school_id,
                    "password": "not-the-password",
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
    }

    #[backend_test(admin)]
    async fn logout_admin(client: Client) {
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());

        let response = client.delete(uri!(logout)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
    }

    #[backend_test(voter)]
    async fn logout_voter(client: Client) {
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());

        let response = client.delete(uri!(logout)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
    }

    #[backend_test]
    async fn logout_not_logged_in(client: Client) {
        let response = client.delete(uri!(logout)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
    }

    #[backend_test(voter)]
    async fn deleted_account_loses_access(client: Client, voters: Coll<Voter>) {
        let my_votes = format!("/voter/elections/{}/votes", crate::model::mongodb::Id::new());

        let response = client.get(my_votes.clone()).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(response.into_string().await.as_deref(), Some("[]"));

        voters.delete_many(doc! {}, None).await.unwrap();

        // The cookie is still present but no longer names anyone, so the guard forwards.
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
        let response = client.get(my_votes).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }
}
