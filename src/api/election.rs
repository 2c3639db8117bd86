use chrono::Utc;
use mongodb::{bson::doc, Client, Database};
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            election::{
                CandidateSpec, ElectionDescription, ElectionSpec, ElectionSummary, PartylistSpec,
                PositionSpec, StatusChange,
            },
        },
        common::election::ElectionStatus,
        db::{
            admin::Admin,
            audit_log::{AuditAction, NewAuditLog},
            candidate::{Candidate, NewCandidate},
            election::{Election, ElectionContents, ElectionScheduler, NewElection},
            partylist::{NewPartylist, Partylist},
            position::{NewPosition, Position},
            vote::Vote,
        },
        mongodb::{Coll, Id},
    },
};

use super::common::{
    admin_username, conflict_on_duplicate, ensure_editable, ensure_stays_ready, find_election,
    inserted_id, load_contents,
};

pub fn routes() -> Vec<Route> {
    routes![
        create_election,
        modify_election,
        delete_election,
        change_status,
        create_position,
        delete_position,
        create_partylist,
        delete_partylist,
        create_candidate,
        delete_candidate,
        delete_vote,
    ]
}

#[post("/elections", data = "<spec>", format = "json")]
async fn create_election(
    token: AuthToken<Admin>,
    spec: Json<ElectionSpec>,
    admins: Coll<Admin>,
    new_elections: Coll<NewElection>,
    audit_logs: Coll<NewAuditLog>,
    db: &State<Database>,
) -> Result<Json<ElectionDescription>> {
    let actor = admin_username(&token, &admins).await?;
    let now = Utc::now();

    let election = spec.0.into_election(now)?;
    let result = new_elections
        .insert_one(&election, None)
        .await
        .map_err(|e| conflict_on_duplicate(e, || format!("Slug already in use: {}", election.slug)))?;
    let election_id = inserted_id(result)?;

    NewAuditLog::new(
        actor,
        AuditAction::CreateElection,
        election_id,
        format!("created election {}", election.name),
    )
    .record(&audit_logs)
    .await?;

    let contents = load_contents(db, election_id).await?;
    Ok(Json(ElectionDescription::new(&contents, now)))
}

#[put("/elections/<election_id>", data = "<spec>", format = "json")]
#[allow(clippy::too_many_arguments)]
async fn modify_election(
    token: AuthToken<Admin>,
    election_id: Id,
    spec: Json<ElectionSpec>,
    admins: Coll<Admin>,
    elections: Coll<Election>,
    audit_logs: Coll<NewAuditLog>,
    scheduler: &State<ElectionScheduler>,
    db: &State<Database>,
) -> Result<Json<ElectionDescription>> {
    let actor = admin_username(&token, &admins).await?;
    let now = Utc::now();

    // Check we are allowed to modify it.
    let mut election = find_election(&elections, election_id).await?;
    ensure_editable(&election, now)?;

    // Replace with the new spec, unless the status moved underneath us.
    spec.0.apply_to(&mut election)?;
    let filter = doc! {
        "_id": election_id,
        "status": election.status,
    };
    let result = elections
        .replace_one(filter, &election, None)
        .await
        .map_err(|e| conflict_on_duplicate(e, || format!("Slug already in use: {}", election.slug)))?;
    if result.matched_count != 1 {
        return Err(Error::Status(
            Status::Conflict,
            format!("Election {election_id} changed while being edited"),
        ));
    }

    NewAuditLog::new(
        actor,
        AuditAction::UpdateElection,
        election_id,
        format!("updated election {}", election.name),
    )
    .record(&audit_logs)
    .await?;

    // The start time may have moved.
    scheduler.schedule_election(&election).await;

    let contents = ElectionContents::load(db, election).await?;
    Ok(Json(ElectionDescription::new(&contents, now)))
}

#[delete("/elections/<election_id>")]
#[allow(clippy::too_many_arguments)]
async fn delete_election(
    token: AuthToken<Admin>,
    election_id: Id,
    admins: Coll<Admin>,
    elections: Coll<Election>,
    audit_logs: Coll<NewAuditLog>,
    scheduler: &State<ElectionScheduler>,
    db: &State<Database>,
    db_client: &State<Client>,
) -> Result<()> {
    let actor = admin_username(&token, &admins).await?;

    // Check that the election is in a deletable state.
    let election = find_election(&elections, election_id).await?;
    let status = election.effective_status(Utc::now());
    if status != ElectionStatus::Pending && !status.is_terminal() {
        return Err(Error::bad_request(format!(
            "Cannot delete election {election_id} while it is {status}"
        )));
    }

    // Atomically delete the election and all associated data.
    {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        elections
            .delete_one_with_session(election_id.as_doc(), None, &mut session)
            .await?;

        let filter = doc! {
            "election_id": election_id,
        };
        Coll::<Position>::from_db(db)
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        Coll::<Partylist>::from_db(db)
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        Coll::<Candidate>::from_db(db)
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        Coll::<Vote>::from_db(db)
            .delete_many_with_session(filter, None, &mut session)
            .await?;

        session.commit_transaction().await?;
    }

    scheduler.cancel_election(election_id).await;

    NewAuditLog::new(
        actor,
        AuditAction::DeleteElection,
        election_id,
        format!("deleted election {}", election.name),
    )
    .record(&audit_logs)
    .await
}

/// Move an election to a new stored status.
///
/// The transition is checked against the status the election currently
/// presents, so an overdue scheduled election counts as ongoing.
#[post("/elections/<election_id>/status", data = "<change>", format = "json")]
#[allow(clippy::too_many_arguments)]
async fn change_status(
    token: AuthToken<Admin>,
    election_id: Id,
    change: Json<StatusChange>,
    admins: Coll<Admin>,
    elections: Coll<Election>,
    audit_logs: Coll<NewAuditLog>,
    scheduler: &State<ElectionScheduler>,
    db: &State<Database>,
) -> Result<Json<ElectionSummary>> {
    let actor = admin_username(&token, &admins).await?;
    let now = Utc::now();
    let target = change.status;

    let contents = load_contents(db, election_id).await?;
    let mut election = contents.election.clone();
    let current = election.effective_status(now);
    if !current.can_transition_to(target) {
        return Err(Error::bad_request(format!(
            "Cannot move election {election_id} from {current} to {target}"
        )));
    }
    // A scheduled election opens by itself, so it must be just as ready.
    if matches!(target, ElectionStatus::Ongoing | ElectionStatus::Scheduled) {
        if !contents.ready_to_start() {
            return Err(Error::bad_request(format!(
                "Election {election_id} needs at least one position, each with a candidate"
            )));
        }
        if now >= election.end_time {
            return Err(Error::bad_request(format!(
                "Election {election_id} ended at {}",
                election.end_time
            )));
        }
    }
    if target == ElectionStatus::Scheduled && election.start_time.is_none() {
        return Err(Error::bad_request(format!(
            "Election {election_id} has no start time to schedule"
        )));
    }

    // Only apply if nobody else changed the stored status meanwhile.
    let filter = doc! {
        "_id": election_id,
        "status": election.status,
    };
    let update = doc! {
        "$set": { "status": target },
    };
    let result = elections.update_one(filter, update, None).await?;
    if result.modified_count != 1 {
        return Err(Error::Status(
            Status::Conflict,
            format!("Election {election_id} changed status concurrently"),
        ));
    }

    NewAuditLog::new(
        actor,
        AuditAction::ChangeStatus,
        election_id,
        format!("{current} -> {target}"),
    )
    .record(&audit_logs)
    .await?;

    election.status = target;
    scheduler.schedule_election(&election).await;

    Ok(Json(ElectionSummary::new(&election, now)))
}

#[post("/elections/<election_id>/positions", data = "<spec>", format = "json")]
#[allow(clippy::too_many_arguments)]
async fn create_position(
    token: AuthToken<Admin>,
    election_id: Id,
    spec: Json<PositionSpec>,
    admins: Coll<Admin>,
    new_positions: Coll<NewPosition>,
    audit_logs: Coll<NewAuditLog>,
    db: &State<Database>,
) -> Result<Json<ElectionDescription>> {
    let actor = admin_username(&token, &admins).await?;
    let now = Utc::now();

    let contents = load_contents(db, election_id).await?;
    ensure_editable(&contents.election, now)?;
    let position = spec.0.into_position(election_id, now)?;
    // Positions are looked up by name when filtering results.
    if contents
        .positions
        .iter()
        .any(|p| p.name.eq_ignore_ascii_case(&position.name))
    {
        return Err(Error::Status(
            Status::Conflict,
            format!("Position {} already exists", position.name),
        ));
    }
    let position_id = inserted_id(new_positions.insert_one(&position, None).await?)?;

    NewAuditLog::new(
        actor,
        AuditAction::CreatePosition,
        position_id,
        format!("added position {} to {}", position.name, contents.election.name),
    )
    .record(&audit_logs)
    .await?;

    let contents = ElectionContents::load(db, contents.election).await?;
    Ok(Json(ElectionDescription::new(&contents, now)))
}

#[delete("/elections/<election_id>/positions/<position_id>")]
#[allow(clippy::too_many_arguments)]
async fn delete_position(
    token: AuthToken<Admin>,
    election_id: Id,
    position_id: Id,
    admins: Coll<Admin>,
    elections: Coll<Election>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
    audit_logs: Coll<NewAuditLog>,
    db: &State<Database>,
) -> Result<()> {
    let actor = admin_username(&token, &admins).await?;
    let now = Utc::now();
    let election = find_election(&elections, election_id).await?;
    ensure_editable(&election, now)?;
    ensure_stays_ready(db, &election, position_id, now).await?;

    let filter = doc! {
        "_id": position_id,
        "election_id": election_id,
    };
    let position = positions
        .find_one_and_delete(filter, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Position {position_id}")))?;
    candidates
        .delete_many(doc! { "position_id": position_id }, None)
        .await?;

    NewAuditLog::new(
        actor,
        AuditAction::DeletePosition,
        position_id,
        format!("removed position {} from {}", position.name, election.name),
    )
    .record(&audit_logs)
    .await
}

#[post("/elections/<election_id>/partylists", data = "<spec>", format = "json")]
#[allow(clippy::too_many_arguments)]
async fn create_partylist(
    token: AuthToken<Admin>,
    election_id: Id,
    spec: Json<PartylistSpec>,
    admins: Coll<Admin>,
    new_partylists: Coll<NewPartylist>,
    audit_logs: Coll<NewAuditLog>,
    db: &State<Database>,
) -> Result<Json<ElectionDescription>> {
    let actor = admin_username(&token, &admins).await?;
    let now = Utc::now();

    let contents = load_contents(db, election_id).await?;
    ensure_editable(&contents.election, now)?;
    let partylist = spec.0.into_partylist(election_id)?;
    if contents
        .partylists
        .iter()
        .any(|p| p.name.eq_ignore_ascii_case(&partylist.name))
    {
        return Err(Error::Status(
            Status::Conflict,
            format!("Partylist {} already exists", partylist.name),
        ));
    }
    let partylist_id = inserted_id(new_partylists.insert_one(&partylist, None).await?)?;

    NewAuditLog::new(
        actor,
        AuditAction::CreatePartylist,
        partylist_id,
        format!("added partylist {} to {}", partylist.name, contents.election.name),
    )
    .record(&audit_logs)
    .await?;

    let contents = ElectionContents::load(db, contents.election).await?;
    Ok(Json(ElectionDescription::new(&contents, now)))
}

/// Remove a partylist. Its candidates stay on the ballot as independents.
#[delete("/elections/<election_id>/partylists/<partylist_id>")]
#[allow(clippy::too_many_arguments)]
async fn delete_partylist(
    token: AuthToken<Admin>,
    election_id: Id,
    partylist_id: Id,
    admins: Coll<Admin>,
    elections: Coll<Election>,
    partylists: Coll<Partylist>,
    candidates: Coll<Candidate>,
    audit_logs: Coll<NewAuditLog>,
) -> Result<()> {
    let actor = admin_username(&token, &admins).await?;
    let election = find_election(&elections, election_id).await?;
    ensure_editable(&election, Utc::now())?;

    let filter = doc! {
        "_id": partylist_id,
        "election_id": election_id,
    };
    let partylist = partylists
        .find_one_and_delete(filter, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Partylist {partylist_id}")))?;
    candidates
        .update_many(
            doc! { "partylist_id": partylist_id },
            doc! { "$set": { "partylist_id": null } },
            None,
        )
        .await?;

    NewAuditLog::new(
        actor,
        AuditAction::DeletePartylist,
        partylist_id,
        format!("removed partylist {} from {}", partylist.name, election.name),
    )
    .record(&audit_logs)
    .await
}

#[post(
    "/elections/<election_id>/positions/<position_id>/candidates",
    data = "<spec>",
    format = "json"
)]
#[allow(clippy::too_many_arguments)]
async fn create_candidate(
    token: AuthToken<Admin>,
    election_id: Id,
    position_id: Id,
    spec: Json<CandidateSpec>,
    admins: Coll<Admin>,
    new_candidates: Coll<NewCandidate>,
    audit_logs: Coll<NewAuditLog>,
    db: &State<Database>,
) -> Result<Json<ElectionDescription>> {
    let actor = admin_username(&token, &admins).await?;
    let now = Utc::now();

    let contents = load_contents(db, election_id).await?;
    ensure_editable(&contents.election, now)?;
    let position = contents
        .positions
        .iter()
        .find(|p| p.id == position_id)
        .ok_or_else(|| Error::not_found(format!("Position {position_id}")))?;
    if let Some(partylist_id) = spec.partylist_id.map(Id::from) {
        if !contents.partylists.iter().any(|p| p.id == partylist_id) {
            return Err(Error::not_found(format!("Partylist {partylist_id}")));
        }
    }

    let candidate = spec.0.into_candidate(election_id, position_id)?;
    let candidate_id = inserted_id(new_candidates.insert_one(&candidate, None).await?)?;

    NewAuditLog::new(
        actor,
        AuditAction::CreateCandidate,
        candidate_id,
        format!("added candidate {} for {}", candidate.name, position.name),
    )
    .record(&audit_logs)
    .await?;

    let contents = ElectionContents::load(db, contents.election).await?;
    Ok(Json(ElectionDescription::new(&contents, now)))
}

#[delete("/elections/<election_id>/candidates/<candidate_id>")]
#[allow(clippy::too_many_arguments)]
async fn delete_candidate(
    token: AuthToken<Admin>,
    election_id: Id,
    candidate_id: Id,
    admins: Coll<Admin>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    audit_logs: Coll<NewAuditLog>,
    db: &State<Database>,
) -> Result<()> {
    let actor = admin_username(&token, &admins).await?;
    let now = Utc::now();
    let election = find_election(&elections, election_id).await?;
    ensure_editable(&election, now)?;
    ensure_stays_ready(db, &election, candidate_id, now).await?;

    let filter = doc! {
        "_id": candidate_id,
        "election_id": election_id,
    };
    let candidate = candidates
        .find_one_and_delete(filter, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate {candidate_id}")))?;

    NewAuditLog::new(
        actor,
        AuditAction::DeleteCandidate,
        candidate_id,
        format!("removed candidate {} from {}", candidate.name, election.name),
    )
    .record(&audit_logs)
    .await
}

/// Strike a single vote. Exceptional; always audited.
#[delete("/elections/<election_id>/votes/<vote_id>")]
async fn delete_vote(
    token: AuthToken<Admin>,
    election_id: Id,
    vote_id: Id,
    admins: Coll<Admin>,
    votes: Coll<Vote>,
    audit_logs: Coll<NewAuditLog>,
) -> Result<()> {
    let actor = admin_username(&token, &admins).await?;

    let filter = doc! {
        "_id": vote_id,
        "election_id": election_id,
    };
    let vote = votes
        .find_one_and_delete(filter, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Vote {vote_id}")))?;

    NewAuditLog::new(
        actor,
        AuditAction::DeleteVote,
        vote_id,
        format!(
            "removed vote by {} for candidate {} (position {})",
            vote.voter_id, vote.candidate_id, vote.position_id,
        ),
    )
    .record(&audit_logs)
    .await
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::ContentType,
        local::asynchronous::{Client, LocalResponse},
        serde::json::{serde_json, serde_json::json},
    };

    use rocket::futures::TryStreamExt;

    use crate::model::db::audit_log::{AuditAction, AuditLog};

    use super::*;

    async fn body<T: serde::de::DeserializeOwned>(response: LocalResponse<'_>) -> T {
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    async fn post_json<'c>(
        client: &'c Client,
        uri: String,
        value: rocket::serde::json::Value,
    ) -> LocalResponse<'c> {
        client
            .post(uri)
            .header(ContentType::JSON)
            .body(value.to_string())
            .dispatch()
            .await
    }

    async fn set_status<'c>(
        client: &'c Client,
        election_id: Id,
        status: ElectionStatus,
    ) -> LocalResponse<'c> {
        post_json(
            client,
            uri!(change_status(election_id)).to_string(),
            json!(StatusChange { status }),
        )
        .await
    }

    /// Create an election with one position and one candidate.
    async fn create_ready_election(client: &Client, spec: ElectionSpec) -> ElectionDescription {
        let response = post_json(client, uri!(create_election).to_string(), json!(spec)).await;
        assert_eq!(Status::Ok, response.status());
        let election: ElectionDescription = body(response).await;
        let election_id = *election.summary.id;

        let response = post_json(
            client,
            uri!(create_position(election_id)).to_string(),
            json!(PositionSpec {
                name: "President".to_string()
            }),
        )
        .await;
        assert_eq!(Status::Ok, response.status());
        let election: ElectionDescription = body(response).await;
        let position_id = *election.positions[0].id;

        let response = post_json(
            client,
            uri!(create_candidate(election_id, position_id)).to_string(),
            json!(CandidateSpec::example("Abe")),
        )
        .await;
        assert_eq!(Status::Ok, response.status());
        body(response).await
    }

    #[backend_test(admin)]
    async fn create_and_structure_election(client: Client, db: Database) {
        let election = create_ready_election(&client, ElectionSpec::future_example()).await;
        assert_eq!(election.summary.status, ElectionStatus::Pending);
        assert_eq!(election.summary.slug, "ssc-special-election");
        assert_eq!(election.positions.len(), 1);
        assert_eq!(election.positions[0].candidates[0].name, "Abe");
        assert_eq!(election.positions[0].candidates[0].partylist, "INDEPENDENT");

        // Same name, same slug.
        let response = post_json(
            &client,
            uri!(create_election).to_string(),
            json!(ElectionSpec::future_example()),
        )
        .await;
        assert_eq!(Status::Conflict, response.status());

        // Position names are unique within an election, ignoring case.
        let response = post_json(
            &client,
            uri!(create_position(*election.summary.id)).to_string(),
            json!(PositionSpec {
                name: "PRESIDENT".to_string()
            }),
        )
        .await;
        assert_eq!(Status::Conflict, response.status());

        let actions: Vec<AuditAction> = Coll::<AuditLog>::from_db(&db)
            .find(None, None)
            .await
            .unwrap()
            .map_ok(|log| log.action)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(
            actions,
            vec![
                AuditAction::CreateElection,
                AuditAction::CreatePosition,
                AuditAction::CreateCandidate,
            ]
        );
    }

    #[backend_test(admin)]
    async fn transitions_follow_table(client: Client, elections: Coll<Election>) {
        let election = create_ready_election(&client, ElectionSpec::future_example()).await;
        let election_id = *election.summary.id;

        // Pending cannot jump to the end.
        let response = set_status(&client, election_id, ElectionStatus::Completed).await;
        assert_eq!(Status::BadRequest, response.status());

        let response = set_status(&client, election_id, ElectionStatus::Scheduled).await;
        assert_eq!(Status::Ok, response.status());
        let summary: ElectionSummary = body(response).await;
        assert_eq!(summary.status, ElectionStatus::Scheduled);
        let scheduler = client.rocket().state::<ElectionScheduler>().unwrap();
        assert!(scheduler.next_run(election_id).await.is_some());

        // Scheduled elections can still be edited, and cannot be deleted.
        let mut spec = ElectionSpec::future_example();
        spec.name = "SSC Special Election 2".to_string();
        let response = client
            .put(uri!(modify_election(election_id)))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let response = client
            .delete(uri!(delete_election(election_id)))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        // Start by hand, then stop for good.
        let response = set_status(&client, election_id, ElectionStatus::Ongoing).await;
        assert_eq!(Status::Ok, response.status());
        assert!(scheduler.next_run(election_id).await.is_some());
        let response = set_status(&client, election_id, ElectionStatus::Paused).await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(scheduler.next_run(election_id).await, None);
        let response = set_status(&client, election_id, ElectionStatus::Stopped).await;
        assert_eq!(Status::Ok, response.status());
        let response = set_status(&client, election_id, ElectionStatus::Ongoing).await;
        assert_eq!(Status::BadRequest, response.status());

        let stored = elections
            .find_one(election_id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ElectionStatus::Stopped);
        assert_eq!(stored.name, "SSC Special Election 2");

        // Stopped elections are frozen.
        let response = client
            .put(uri!(modify_election(election_id)))
            .header(ContentType::JSON)
            .body(json!(ElectionSpec::future_example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        // Stopped elections may be deleted, along with everything in them.
        let response = client
            .delete(uri!(delete_election(election_id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(elections.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test(admin)]
    async fn cannot_start_without_candidates(client: Client) {
        let response = post_json(
            &client,
            uri!(create_election).to_string(),
            json!(ElectionSpec::current_example()),
        )
        .await;
        let election: ElectionDescription = body(response).await;
        let election_id = *election.summary.id;

        // No positions at all.
        let response = set_status(&client, election_id, ElectionStatus::Ongoing).await;
        assert_eq!(Status::BadRequest, response.status());

        // A position nobody is running for.
        post_json(
            &client,
            uri!(create_position(election_id)).to_string(),
            json!(PositionSpec {
                name: "Auditor".to_string()
            }),
        )
        .await;
        let response = set_status(&client, election_id, ElectionStatus::Ongoing).await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(admin)]
    async fn cannot_schedule_without_candidates(client: Client) {
        let response = post_json(
            &client,
            uri!(create_election).to_string(),
            json!(ElectionSpec::future_example()),
        )
        .await;
        let election: ElectionDescription = body(response).await;
        let election_id = *election.summary.id;

        let response = set_status(&client, election_id, ElectionStatus::Scheduled).await;
        assert_eq!(Status::BadRequest, response.status());

        let response = post_json(
            &client,
            uri!(create_position(election_id)).to_string(),
            json!(PositionSpec {
                name: "Auditor".to_string()
            }),
        )
        .await;
        let election: ElectionDescription = body(response).await;
        let response = set_status(&client, election_id, ElectionStatus::Scheduled).await;
        assert_eq!(Status::BadRequest, response.status());

        let position_id = *election.positions[0].id;
        post_json(
            &client,
            uri!(create_candidate(election_id, position_id)).to_string(),
            json!(CandidateSpec::example("Abe")),
        )
        .await;
        let response = set_status(&client, election_id, ElectionStatus::Scheduled).await;
        assert_eq!(Status::Ok, response.status());
        let scheduler = client.rocket().state::<ElectionScheduler>().unwrap();
        assert!(scheduler.next_run(election_id).await.is_some());
    }

    #[backend_test(admin)]
    async fn scheduled_election_keeps_a_full_ballot(client: Client, candidates: Coll<Candidate>) {
        let election = create_ready_election(&client, ElectionSpec::future_example()).await;
        let election_id = *election.summary.id;
        let position_id = *election.positions[0].id;
        let abe = *election.positions[0].candidates[0].id;

        let response = set_status(&client, election_id, ElectionStatus::Scheduled).await;
        assert_eq!(Status::Ok, response.status());

        // Neither the only candidate nor the only position can go.
        let response = client
            .delete(uri!(delete_candidate(election_id, abe)))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        let response = client
            .delete(uri!(delete_position(election_id, position_id)))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        assert_eq!(candidates.count_documents(None, None).await.unwrap(), 1);

        // With a second candidate standing, one of them may withdraw.
        let response = post_json(
            &client,
            uri!(create_candidate(election_id, position_id)).to_string(),
            json!(CandidateSpec::example("Bella")),
        )
        .await;
        assert_eq!(Status::Ok, response.status());
        let response = client
            .delete(uri!(delete_candidate(election_id, abe)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        // Back in planning, anything goes.
        let response = set_status(&client, election_id, ElectionStatus::Pending).await;
        assert_eq!(Status::Ok, response.status());
        let response = client
            .delete(uri!(delete_position(election_id, position_id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(candidates.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test]
    async fn empty_scheduled_election_does_not_open(
        client: Client,
        new_elections: Coll<NewElection>,
        elections: Coll<Election>,
        audit_logs: Coll<AuditLog>,
    ) {
        // Stored directly, as if its ballot had been emptied after scheduling.
        let mut core = crate::model::db::election::ElectionCore::pending_example();
        core.status = ElectionStatus::Scheduled;
        core.start_time = Some(Utc::now() + chrono::Duration::seconds(1));
        let election_id = inserted_id(new_elections.insert_one(&core, None).await.unwrap()).unwrap();
        let election = find_election(&elections, election_id).await.unwrap();

        let scheduler = client.rocket().state::<ElectionScheduler>().unwrap();
        scheduler.schedule_election(&election).await;

        rocket::tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        let stored = find_election(&elections, election_id).await.unwrap();
        assert_eq!(stored.status, ElectionStatus::Pending);
        assert_eq!(stored.effective_status(Utc::now()), ElectionStatus::Pending);
        assert!(!stored.accepting_ballots(Utc::now()));
        assert_eq!(scheduler.next_run(election_id).await, None);

        let refusal = audit_logs
            .find_one(doc! { "target": election_id }, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refusal.action, AuditAction::ChangeStatus);
        assert_eq!(refusal.actor, crate::model::db::audit_log::SYSTEM_ACTOR);
        assert!(refusal.details.contains("start refused"));
    }

    #[backend_test(admin)]
    async fn scheduled_election_opens_itself(client: Client, elections: Coll<Election>) {
        let mut spec = ElectionSpec::future_example();
        let start = Utc::now() + chrono::Duration::seconds(1);
        spec.start_time = Some(start);
        spec.end_time = start + chrono::Duration::days(1);
        let election = create_ready_election(&client, spec).await;
        let election_id = *election.summary.id;

        let response = set_status(&client, election_id, ElectionStatus::Scheduled).await;
        assert_eq!(Status::Ok, response.status());

        rocket::tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        let stored = elections
            .find_one(election_id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ElectionStatus::Ongoing);
    }
}
