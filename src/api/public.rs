use chrono::Utc;
use mongodb::{bson::doc, options::FindOptions, Database};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route, State};

use crate::error::{Error, Result};
use crate::model::{
    api::election::{ElectionDescription, ElectionSummary, RankingView, ResultView, StatisticsView},
    db::{
        election::{Election, ElectionContents},
        vote::Vote,
        voter::Voter,
    },
    mongodb::{Coll, Id},
    tally::{tally_election, PositionFilter, TimeWindow},
};

use super::common::{election_votes, load_contents};

pub fn routes() -> Vec<Route> {
    routes![
        elections,
        election,
        election_by_slug,
        ranking,
        results,
        statistics,
    ]
}

/// Every election, newest first.
#[get("/elections")]
async fn elections(elections: Coll<Election>) -> Result<Json<Vec<ElectionSummary>>> {
    let now = Utc::now();
    let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
    let summaries = elections
        .find(None, options)
        .await?
        .map_ok(|election| ElectionSummary::new(&election, now))
        .try_collect()
        .await?;
    Ok(Json(summaries))
}

#[get("/elections/<election_id>")]
async fn election(election_id: Id, db: &State<Database>) -> Result<Json<ElectionDescription>> {
    let contents = load_contents(db, election_id).await?;
    Ok(Json(ElectionDescription::new(&contents, Utc::now())))
}

// Ranked below the `/elections/<id>/...` routes, which it overlaps.
#[get("/elections/slug/<slug>", rank = 1)]
async fn election_by_slug(
    slug: &str,
    elections: Coll<Election>,
    db: &State<Database>,
) -> Result<Json<ElectionDescription>> {
    let election = elections
        .find_one(doc! { "slug": slug }, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with slug '{slug}'")))?;
    let contents = ElectionContents::load(db, election).await?;
    Ok(Json(ElectionDescription::new(&contents, Utc::now())))
}

/// Live standings. Available once voting has opened.
#[get("/elections/<election_id>/ranking?<position>&<window>")]
async fn ranking(
    election_id: Id,
    position: Option<&str>,
    window: TimeWindow,
    votes: Coll<Vote>,
    db: &State<Database>,
) -> Result<Json<RankingView>> {
    let now = Utc::now();
    let contents = load_contents(db, election_id).await?;
    if !contents.election.ranking_visible(now) {
        return Err(Error::Status(
            Status::Forbidden,
            format!("Ranking for election {election_id} is not open yet"),
        ));
    }

    let facts = election_votes(&votes, election_id).await?;
    let tally = tally_election(
        &contents.position_entries(),
        &facts,
        &PositionFilter::parse(position),
        window,
        now,
    );
    let summary = ElectionSummary::new(&contents.election, now);
    Ok(Json(RankingView::new(summary, &tally, window, now)))
}

/// Final results. Available once the election is over.
#[get("/elections/<election_id>/results?<position>")]
async fn results(
    election_id: Id,
    position: Option<&str>,
    votes: Coll<Vote>,
    db: &State<Database>,
) -> Result<Json<ResultView>> {
    let now = Utc::now();
    let contents = load_contents(db, election_id).await?;
    if !contents.election.results_visible(now) {
        return Err(Error::Status(
            Status::Forbidden,
            format!("Results for election {election_id} are not available yet"),
        ));
    }

    let facts = election_votes(&votes, election_id).await?;
    let tally = tally_election(
        &contents.position_entries(),
        &facts,
        &PositionFilter::parse(position),
        TimeWindow::All,
        now,
    );
    let summary = ElectionSummary::new(&contents.election, now);
    Ok(Json(ResultView::new(summary, &tally)))
}

/// Turnout against the registered electorate.
#[get("/elections/<election_id>/statistics?<window>")]
async fn statistics(
    election_id: Id,
    window: TimeWindow,
    votes: Coll<Vote>,
    voters: Coll<Voter>,
    db: &State<Database>,
) -> Result<Json<StatisticsView>> {
    let now = Utc::now();
    let contents = load_contents(db, election_id).await?;
    if !contents.election.ranking_visible(now) {
        return Err(Error::Status(
            Status::Forbidden,
            format!("Statistics for election {election_id} are not open yet"),
        ));
    }

    let facts = election_votes(&votes, election_id).await?;
    let tally = tally_election(
        &contents.position_entries(),
        &facts,
        &PositionFilter::All,
        window,
        now,
    );
    let registered = voters.count_documents(None, None).await?;
    let summary = ElectionSummary::new(&contents.election, now);
    Ok(Json(StatisticsView::new(summary, &tally, window, registered)))
}
