use chrono::Utc;
use mongodb::{bson::doc, Client, Database};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            ballot::{ballot_votes, BallotEntry, VoteDescription},
        },
        db::{
            vote::{NewVote, Vote},
            voter::Voter,
        },
        mongodb::{Coll, Id},
    },
};

use super::common::{conflict_on_duplicate, load_contents};

pub fn routes() -> Vec<Route> {
    routes![cast_ballot, my_votes]
}

/// Record a voter's choices. Each position can be voted on once; the whole
/// ballot is rejected if any position already has a vote from this voter.
#[post("/voter/elections/<election_id>/ballot", data = "<ballot>", format = "json")]
#[allow(clippy::too_many_arguments)]
async fn cast_ballot(
    token: AuthToken<Voter>,
    election_id: Id,
    ballot: Json<Vec<BallotEntry>>,
    votes: Coll<Vote>,
    new_votes: Coll<NewVote>,
    db: &State<Database>,
    db_client: &State<Client>,
) -> Result<Json<Vec<VoteDescription>>> {
    let now = Utc::now();
    let contents = load_contents(db, election_id).await?;
    if !contents.election.accepting_ballots(now) {
        return Err(Error::Status(
            Status::Forbidden,
            format!("Election {election_id} is not accepting ballots"),
        ));
    }

    let cast = ballot_votes(
        &ballot,
        &contents.position_entries(),
        token.id,
        election_id,
        now,
    )?;

    // Friendlier than the unique index for the common case.
    let positions: Vec<Id> = cast.iter().map(|vote| vote.position_id).collect();
    let filter = doc! {
        "voter_id": token.id,
        "election_id": election_id,
        "position_id": { "$in": positions },
    };
    if votes.count_documents(filter, None).await? > 0 {
        return Err(Error::Status(
            Status::Conflict,
            "Already voted for at least one of these positions".to_string(),
        ));
    }

    // All or nothing.
    {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;
        new_votes
            .insert_many_with_session(&cast, None, &mut session)
            .await
            .map_err(|e| {
                conflict_on_duplicate(e, || {
                    "Already voted for at least one of these positions".to_string()
                })
            })?;
        session.commit_transaction().await?;
    }
    info!(
        "Voter {} cast {} vote(s) in election {election_id}",
        token.id,
        cast.len()
    );

    voter_votes(&votes, token.id, election_id).await.map(Json)
}

/// The signed-in voter's own votes in an election.
#[get("/voter/elections/<election_id>/votes")]
async fn my_votes(
    token: AuthToken<Voter>,
    election_id: Id,
    votes: Coll<Vote>,
) -> Result<Json<Vec<VoteDescription>>> {
    voter_votes(&votes, token.id, election_id).await.map(Json)
}

async fn voter_votes(
    votes: &Coll<Vote>,
    voter_id: Id,
    election_id: Id,
) -> Result<Vec<VoteDescription>> {
    let filter = doc! {
        "voter_id": voter_id,
        "election_id": election_id,
    };
    let descriptions = votes
        .find(filter, None)
        .await?
        .map_ok(VoteDescription::from)
        .try_collect()
        .await?;
    Ok(descriptions)
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::ContentType,
        local::asynchronous::{Client, LocalResponse},
        serde::json::{serde_json, serde_json::json},
    };

    use crate::model::{
        api::{
            election::{RankingView, StatisticsView},
            ApiId,
        },
        common::election::ElectionStatus,
        db::election::{Election, ElectionContents, ElectionCore},
    };

    use super::*;

    fn entry(contents: &ElectionContents, candidate: usize) -> BallotEntry {
        let candidate = &contents.candidates[candidate];
        BallotEntry {
            position_id: ApiId::from(candidate.position_id),
            candidate_id: ApiId::from(candidate.id),
        }
    }

    async fn cast<'c>(
        client: &'c Client,
        election_id: Id,
        ballot: &[BallotEntry],
    ) -> LocalResponse<'c> {
        client
            .post(uri!(cast_ballot(election_id)))
            .header(ContentType::JSON)
            .body(json!(ballot).to_string())
            .dispatch()
            .await
    }

    #[backend_test(voter)]
    async fn one_vote_per_position(client: Client, db: Database, votes: Coll<Vote>) {
        let contents = ElectionContents::example();
        contents.insert(&db).await;
        let election_id = contents.election.id;

        // President: Abe.
        let response = cast(&client, election_id, &[entry(&contents, 1)]).await;
        assert_eq!(Status::Ok, response.status());
        let recorded: Vec<VoteDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(*recorded[0].candidate_id, contents.candidates[1].id);

        // President again, even for someone else, and bundled with a fresh position.
        let response = cast(&client, election_id, &[entry(&contents, 0)]).await;
        assert_eq!(Status::Conflict, response.status());
        let response = cast(
            &client,
            election_id,
            &[entry(&contents, 2), entry(&contents, 0)],
        )
        .await;
        assert_eq!(Status::Conflict, response.status());
        assert_eq!(votes.count_documents(None, None).await.unwrap(), 1);

        // Secretary is still open.
        let response = cast(&client, election_id, &[entry(&contents, 2)]).await;
        assert_eq!(Status::Ok, response.status());

        let response = client.get(uri!(my_votes(election_id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let mine: Vec<VoteDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(mine.len(), 2);

        // One voter, two votes.
        let response = client
            .get(format!("/elections/{election_id}/ranking"))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let ranking: RankingView =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(ranking.turnout, 1);
        assert_eq!(ranking.positions[0].candidates[0].name, "Abe");
        assert_eq!(ranking.positions[0].candidates[0].votes, 1);
        assert_eq!(ranking.positions[1].total_votes, 1);

        let response = client
            .get(format!("/elections/{election_id}/statistics?window=15m"))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let stats: StatisticsView =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(stats.turnout, 1);
        assert_eq!(stats.registered_voters, 1);
        assert_eq!(stats.participation, 100.0);

        // Still running, so no final results yet.
        let response = client
            .get(format!("/elections/{election_id}/results"))
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
    }

    #[backend_test(voter)]
    async fn closed_elections_reject_ballots(client: Client, db: Database, votes: Coll<Vote>) {
        let elections = Coll::<Election>::from_db(&db);

        let mut pending = ElectionContents::example();
        pending.election.status = ElectionStatus::Pending;
        pending.election.slug = "pending".to_string();
        pending.insert(&db).await;
        let response = cast(&client, pending.election.id, &[entry(&pending, 0)]).await;
        assert_eq!(Status::Forbidden, response.status());

        let mut paused = ElectionContents::example();
        paused.election.status = ElectionStatus::Paused;
        paused.election.slug = "paused".to_string();
        paused.insert(&db).await;
        let response = cast(&client, paused.election.id, &[entry(&paused, 0)]).await;
        assert_eq!(Status::Forbidden, response.status());

        // Past its end time but never completed.
        let mut overdue = ElectionContents::example();
        overdue.election.election = ElectionCore::finished_example();
        overdue.election.slug = "overdue".to_string();
        overdue.insert(&db).await;
        let response = cast(&client, overdue.election.id, &[entry(&overdue, 0)]).await;
        assert_eq!(Status::Forbidden, response.status());
        // But its results are public.
        let response = client
            .get(format!("/elections/{}/results", overdue.election.id))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        assert_eq!(votes.count_documents(None, None).await.unwrap(), 0);
        assert_eq!(elections.count_documents(None, None).await.unwrap(), 3);
    }

    #[backend_test(voter)]
    async fn ballot_must_match_layout(client: Client, db: Database) {
        let contents = ElectionContents::example();
        contents.insert(&db).await;

        // Secretary candidate listed under President.
        let wrong = BallotEntry {
            position_id: ApiId::from(contents.positions[0].id),
            candidate_id: ApiId::from(contents.candidates[2].id),
        };
        let response = cast(&client, contents.election.id, &[wrong]).await;
        assert_eq!(Status::BadRequest, response.status());

        let response = cast(&client, contents.election.id, &[]).await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test]
    async fn ballots_need_a_voter(client: Client, db: Database) {
        let contents = ElectionContents::example();
        contents.insert(&db).await;
        let response = cast(&client, contents.election.id, &[entry(&contents, 0)]).await;
        assert_eq!(Status::NotFound, response.status());
    }
}
