use chrono::{DateTime, Utc};
use mongodb::{
    bson::doc, error::Error as DbError, results::InsertOneResult, Database,
};
use rocket::{futures::TryStreamExt, http::Status};

use crate::error::{Error, Result};
use crate::model::{
    common::election::ElectionStatus,
    db::{
        admin::Admin,
        election::{Election, ElectionContents},
        vote::Vote,
    },
    api::auth::{AuthToken, User},
    mongodb::{is_duplicate_key_error, Coll, Id},
    tally::VoteFact,
};

/// Look up an election by ID.
pub async fn find_election(elections: &Coll<Election>, election_id: Id) -> Result<Election> {
    elections
        .find_one(election_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))
}

/// Look up an election by ID, along with its positions, candidates and partylists.
pub async fn load_contents(db: &Database, election_id: Id) -> Result<ElectionContents> {
    let election = find_election(&Coll::from_db(db), election_id).await?;
    ElectionContents::load(db, election).await
}

/// Every vote cast in an election, ready for counting.
pub async fn election_votes(votes: &Coll<Vote>, election_id: Id) -> Result<Vec<VoteFact>> {
    let facts = votes
        .find(doc! { "election_id": election_id }, None)
        .await?
        .map_ok(VoteFact::from)
        .try_collect()
        .await?;
    Ok(facts)
}

/// Username of the signed-in admin, for the audit log.
pub async fn admin_username(token: &AuthToken<Admin>, admins: &Coll<Admin>) -> Result<String> {
    Ok(token.user(admins).await?.login_name().to_string())
}

/// Reject structural changes once an election has left the planning stage.
pub fn ensure_editable(election: &Election, now: DateTime<Utc>) -> Result<()> {
    let status = election.effective_status(now);
    if status.is_editable() {
        Ok(())
    } else {
        Err(Error::bad_request(format!(
            "Election {} is {status} and can no longer be edited",
            election.id
        )))
    }
}

/// A scheduled election opens by itself, so refuse removals that would leave
/// a position with nobody to vote for.
pub async fn ensure_stays_ready(
    db: &Database,
    election: &Election,
    removed: Id,
    now: DateTime<Utc>,
) -> Result<()> {
    if election.effective_status(now) != ElectionStatus::Scheduled {
        return Ok(());
    }
    let contents = ElectionContents::load(db, election.clone()).await?;
    if contents.ready_without(removed) {
        Ok(())
    } else {
        Err(Error::bad_request(format!(
            "Election {} is scheduled and every position needs a candidate",
            election.id
        )))
    }
}

/// The ID the database assigned to an inserted document.
pub fn inserted_id(result: InsertOneResult) -> Result<Id> {
    result
        .inserted_id
        .as_object_id()
        .map(Id::from)
        .ok_or_else(|| {
            Error::Status(
                Status::InternalServerError,
                "Database returned a non-ObjectId key".to_string(),
            )
        })
}

/// Map unique-index violations to 409 Conflict, and everything else to a database error.
pub fn conflict_on_duplicate(err: DbError, what: impl FnOnce() -> String) -> Error {
    if is_duplicate_key_error(&err) {
        Error::Status(Status::Conflict, what())
    } else {
        err.into()
    }
}
