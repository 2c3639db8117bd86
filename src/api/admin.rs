use mongodb::{bson::doc, options::FindOptions};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            admin::AdminCredentials,
            audit::AuditLogDescription,
            auth::AuthToken,
            pagination::{Paginated, PaginationRequest},
            voter::{VoterDescription, VoterSpec},
        },
        db::{
            admin::{Admin, NewAdmin},
            audit_log::{AuditAction, AuditLog, NewAuditLog},
            voter::{NewVoter, Voter},
        },
        mongodb::{Coll, Id},
    },
};

use super::common::{admin_username, conflict_on_duplicate, inserted_id};

pub fn routes() -> Vec<Route> {
    routes![
        get_admins,
        create_admin,
        delete_admin,
        get_voters,
        create_voter,
        delete_voter,
        get_audit_logs,
    ]
}

#[get("/admins")]
async fn get_admins(_token: AuthToken<Admin>, admins: Coll<Admin>) -> Result<Json<Vec<String>>> {
    let admin_list: Vec<Admin> = admins.find(None, None).await?.try_collect().await?;
    let admin_names = admin_list
        .into_iter()
        .map(|admin| admin.admin.username)
        .collect();
    Ok(Json(admin_names))
}

#[post("/admins", data = "<new_admin>", format = "json")]
async fn create_admin(
    token: AuthToken<Admin>,
    new_admin: Json<AdminCredentials>,
    admins: Coll<Admin>,
    new_admins: Coll<NewAdmin>,
    audit_logs: Coll<NewAuditLog>,
) -> Result<()> {
    let actor = admin_username(&token, &admins).await?;

    // Create and insert the admin. The unique index rejects duplicate usernames.
    let admin: NewAdmin = new_admin.0.try_into()?;
    let result = new_admins
        .insert_one(&admin, None)
        .await
        .map_err(|e| {
            conflict_on_duplicate(e, || {
                format!("Admin username already in use: {}", admin.username)
            })
        })?;

    NewAuditLog::new(
        actor,
        AuditAction::CreateAdmin,
        inserted_id(result)?,
        format!("created admin {}", admin.username),
    )
    .record(&audit_logs)
    .await
}

#[delete("/admins", data = "<username>", format = "json")]
async fn delete_admin(
    token: AuthToken<Admin>,
    username: Json<String>,
    admins: Coll<Admin>,
    audit_logs: Coll<NewAuditLog>,
) -> Result<()> {
    // Prevent deleting the last admin.
    let count = admins.count_documents(None, None).await?;
    if count == 1 {
        return Err(Error::Status(
            Status::UnprocessableEntity,
            "Cannot delete last admin!".to_string(),
        ));
    }

    let actor = admin_username(&token, &admins).await?;
    let filter = doc! {
        "username": username.as_str(),
    };
    let deleted = admins
        .find_one_and_delete(filter, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Admin {}", username.as_str())))?;

    NewAuditLog::new(
        actor,
        AuditAction::DeleteAdmin,
        deleted.id,
        format!("deleted admin {}", deleted.username),
    )
    .record(&audit_logs)
    .await
}

#[get("/voters?<pagination..>")]
async fn get_voters(
    _token: AuthToken<Admin>,
    pagination: PaginationRequest,
    voters: Coll<Voter>,
) -> Result<Json<Paginated<VoterDescription>>> {
    let options = FindOptions::builder()
        .sort(doc! { "school_id": 1 })
        .skip(pagination.skip())
        .limit(i64::from(pagination.page_size()))
        .build();
    let page: Vec<VoterDescription> = voters
        .find(None, options)
        .await?
        .map_ok(VoterDescription::from)
        .try_collect()
        .await?;
    let total = voters.count_documents(None, None).await?;
    Ok(Json(pagination.to_paginated(total, page)))
}

#[post("/voters", data = "<spec>", format = "json")]
async fn create_voter(
    token: AuthToken<Admin>,
    spec: Json<VoterSpec>,
    admins: Coll<Admin>,
    voters: Coll<Voter>,
    new_voters: Coll<NewVoter>,
    audit_logs: Coll<NewAuditLog>,
) -> Result<Json<VoterDescription>> {
    let actor = admin_username(&token, &admins).await?;

    let voter: NewVoter = spec.0.try_into()?;
    let result = new_voters.insert_one(&voter, None).await.map_err(|e| {
        conflict_on_duplicate(e, || {
            format!("School ID already registered: {}", voter.school_id)
        })
    })?;
    let voter_id = inserted_id(result)?;

    NewAuditLog::new(
        actor,
        AuditAction::CreateVoter,
        voter_id,
        format!("registered voter {}", voter.school_id),
    )
    .record(&audit_logs)
    .await?;

    let voter = voters
        .find_one(voter_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voter {voter_id}")))?;
    Ok(Json(voter.into()))
}

/// Remove a voter account. Votes already cast remain counted.
#[delete("/voters/<voter_id>")]
async fn delete_voter(
    token: AuthToken<Admin>,
    voter_id: Id,
    admins: Coll<Admin>,
    voters: Coll<Voter>,
    audit_logs: Coll<NewAuditLog>,
) -> Result<()> {
    let actor = admin_username(&token, &admins).await?;
    let deleted = voters
        .find_one_and_delete(voter_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voter {voter_id}")))?;

    NewAuditLog::new(
        actor,
        AuditAction::DeleteVoter,
        voter_id,
        format!("removed voter {}", deleted.school_id),
    )
    .record(&audit_logs)
    .await
}

/// The audit log, newest first.
#[get("/audit-logs?<pagination..>")]
async fn get_audit_logs(
    _token: AuthToken<Admin>,
    pagination: PaginationRequest,
    audit_logs: Coll<AuditLog>,
) -> Result<Json<Paginated<AuditLogDescription>>> {
    let options = FindOptions::builder()
        .sort(doc! { "created_at": -1, "_id": -1 })
        .skip(pagination.skip())
        .limit(i64::from(pagination.page_size()))
        .build();
    let page: Vec<AuditLogDescription> = audit_logs
        .find(None, options)
        .await?
        .map_ok(AuditLogDescription::from)
        .try_collect()
        .await?;
    let total = audit_logs.count_documents(None, None).await?;
    Ok(Json(pagination.to_paginated(total, page)))
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{
        http::ContentType,
        local::asynchronous::{Client, LocalResponse},
        serde::json::{serde_json, serde_json::json},
    };

    use crate::model::{api::voter::VoterCredentials, db::admin::DEFAULT_ADMIN_USERNAME};

    use super::*;

    #[backend_test(admin)]
    async fn create_delete_admin(client: Client, db: Database) {
        // Create admin
        create_admin_expect_status(&client, &AdminCredentials::example2(), Status::Ok).await;

        // Ensure the admin has been inserted
        let admins = Coll::<Admin>::from_db(&db);
        let with_username = doc! { "username": &AdminCredentials::example2().username };
        let inserted_admin = admins
            .find_one(with_username.clone(), None)
            .await
            .unwrap()
            .unwrap();
        assert!(inserted_admin.verify_password(&AdminCredentials::example2().password));

        // Delete the admin.
        let count = admins.count_documents(None, None).await.unwrap();
        assert_eq!(count, 3); // Default admin, test admin, new admin.
        let response = client
            .delete(uri!(delete_admin))
            .header(ContentType::JSON)
            .body(json!(AdminCredentials::example2().username).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        // Ensure the admin has been deleted.
        let remaining_admins: Vec<String> = admins
            .find(None, None)
            .await
            .unwrap()
            .map_ok(|a| a.admin.username)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(
            remaining_admins,
            vec![
                DEFAULT_ADMIN_USERNAME.to_string(),
                AdminCredentials::example().username,
            ]
        );

        // Both changes were audited.
        let actions: Vec<AuditAction> = Coll::<AuditLog>::from_db(&db)
            .find(None, None)
            .await
            .unwrap()
            .map_ok(|log| log.action)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(actions, vec![AuditAction::CreateAdmin, AuditAction::DeleteAdmin]);
    }

    #[backend_test(admin)]
    async fn bad_create_admin(client: Client, admins: Coll<Admin>) {
        // Try empty username.
        let credentials = AdminCredentials {
            username: "".to_string(),
            password: "long enough".to_string(),
        };
        create_admin_expect_status(&client, &credentials, Status::BadRequest).await;

        // Try short password.
        let credentials = AdminCredentials {
            username: "foo".to_string(),
            password: "short".to_string(),
        };
        create_admin_expect_status(&client, &credentials, Status::BadRequest).await;

        // Try duplicate username.
        create_admin_expect_status(&client, &AdminCredentials::example(), Status::Conflict).await;

        // Ensure no admins were created.
        let num_admins = admins.count_documents(None, None).await.unwrap();
        assert_eq!(num_admins, 2); // Default admin and test admin.
    }

    #[backend_test]
    async fn admin_routes_need_admin(client: Client) {
        let response = client.get(uri!(get_admins)).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn register_voter(client: Client, db: Database) {
        let spec = VoterSpec {
            school_id: "2024-00042".to_string(),
            name: "Student 42".to_string(),
            password: "student-pass".to_string(),
        };
        let response = post_voter(&client, &spec).await;
        assert_eq!(Status::Ok, response.status());
        let created: VoterDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(created.school_id, "2024-00042");

        // Same school ID again.
        let response = post_voter(&client, &spec).await;
        assert_eq!(Status::Conflict, response.status());

        // Listed.
        let response = client.get("/voters?page_num=1&page_size=10").dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let page: Paginated<VoterDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(page.items, vec![created.clone()]);
        assert_eq!(page.pagination.total, 1);

        // The new voter can sign in.
        let voter_client = Client::tracked(crate::rocket_for_db(db.name()))
            .await
            .unwrap();
        let response = voter_client
            .post(uri!(crate::api::auth::authenticate_voter))
            .header(ContentType::JSON)
            .body(
                json!(VoterCredentials {
                    school_id: spec.school_id.clone(),
                    password: spec.password.clone(),
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        // Removed.
        let response = client
            .delete(uri!(delete_voter(*created.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let remaining = Coll::<Voter>::from_db(&db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[backend_test(admin)]
    async fn audit_log_newest_first(client: Client) {
        create_admin_expect_status(&client, &AdminCredentials::example2(), Status::Ok).await;
        post_voter(&client, &VoterSpec::example_numbered(1)).await;

        let response = client.get("/audit-logs").dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let page: Paginated<AuditLogDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        let actions: Vec<AuditAction> = page.items.iter().map(|log| log.action).collect();
        assert_eq!(actions, vec![AuditAction::CreateVoter, AuditAction::CreateAdmin]);
        assert!(page
            .items
            .iter()
            .all(|log| log.actor == AdminCredentials::example().username));
    }

    async fn create_admin_expect_status(
        client: &Client,
        credentials: &AdminCredentials,
        status: Status,
    ) {
        let response = client
            .post(uri!(create_admin))
            .header(ContentType::JSON)
            .body(json!(credentials).to_string())
            .dispatch()
            .await;
        assert_eq!(status, response.status());
    }

    async fn post_voter<'c>(client: &'c Client, spec: &VoterSpec) -> LocalResponse<'c> {
        client
            .post(uri!(create_voter))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await
    }
}
