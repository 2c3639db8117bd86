use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use mongodb::{bson::doc, Database};
use rocket::futures::TryStreamExt;
use rocket::{
    fairing::{Fairing, Info, Kind},
    futures::future::{BoxFuture, FutureExt},
    tokio::sync::Mutex,
    Build, Rocket,
};

use crate::{
    error::Result,
    model::{
        common::election::ElectionStatus,
        db::audit_log::{AuditAction, NewAuditLog, SYSTEM_ACTOR},
        mongodb::{Coll, Id},
    },
    scheduled_task::ScheduledTask,
};

use super::{contents::ElectionContents, db::Election};

/// How long to wait before retrying a lifecycle job that failed.
const RETRY_INTERVAL_SECONDS: i64 = 300;

/// Map from election IDs to their pending lifecycle job.
type TaskMap = HashMap<Id, ScheduledTask<Result<()>>>;

/// The next automatic status change due for an election.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LifecycleJob {
    pub from: ElectionStatus,
    pub to: ElectionStatus,
    pub due: DateTime<Utc>,
}

impl LifecycleJob {
    /// Work out which automatic transition, if any, an election is waiting on.
    ///
    /// Scheduled elections open at their start time and ongoing elections
    /// complete at their end time. Everything else waits for an admin.
    pub fn next_for(election: &Election) -> Option<Self> {
        match election.status {
            ElectionStatus::Scheduled => election.start_time.map(|start| Self {
                from: ElectionStatus::Scheduled,
                to: ElectionStatus::Ongoing,
                due: start,
            }),
            ElectionStatus::Ongoing => Some(Self {
                from: ElectionStatus::Ongoing,
                to: ElectionStatus::Completed,
                due: election.end_time,
            }),
            _ => None,
        }
    }
}

/// Election lifecycle jobs: scheduled tasks that persist start and end transitions.
pub struct ElectionScheduler {
    tasks: Arc<Mutex<TaskMap>>,
    db: Database,
    elections: Coll<Election>,
}

impl ElectionScheduler {
    /// Create a scheduler with no jobs.
    pub fn new(db: &Database) -> Self {
        Self {
            tasks: Default::default(),
            db: db.clone(),
            elections: Coll::from_db(db),
        }
    }

    /// When the election's pending lifecycle job is due, if it has one.
    pub async fn next_run(&self, election_id: Id) -> Option<DateTime<Utc>> {
        self.tasks
            .lock()
            .await
            .get(&election_id)
            .map(ScheduledTask::run_at)
    }

    /// Schedule a job for every election that is waiting on one.
    pub async fn schedule_elections(&self) -> Result<()> {
        let filter = doc! {
            "status": { "$in": [ElectionStatus::Scheduled, ElectionStatus::Ongoing] },
        };
        let elections: Vec<Election> = self.elections.find(filter, None).await?.try_collect().await?;
        for election in elections.iter() {
            self.schedule_election(election).await;
        }
        Ok(())
    }

    /// (Re)schedule the job for the given election to match its stored state.
    /// Any existing job is cancelled first.
    pub async fn schedule_election(&self, election: &Election) {
        let mut tasks_locked = self.tasks.lock().await;
        if let Some(task) = tasks_locked.remove(&election.id) {
            task.cancel().await;
        }
        if let Some(job) = LifecycleJob::next_for(election) {
            debug!(
                "Election {} will move {} -> {} at {}",
                election.id, job.from, job.to, job.due
            );
            let future = Self::job(election.id, job, self.db.clone(), self.tasks.clone());
            tasks_locked.insert(election.id, ScheduledTask::new(future, job.due));
        }
    }

    /// Drop any job for the given election, e.g. once it has been deleted.
    pub async fn cancel_election(&self, election_id: Id) {
        let task = self.tasks.lock().await.remove(&election_id);
        if let Some(task) = task {
            task.cancel().await;
            trace!("Cancelled lifecycle job for election {election_id}");
        }
    }

    /// Carry out one lifecycle transition, then schedule the next one.
    /// Since this is a recursive async function, we must use `BoxFuture` to
    /// avoid an infinitely-recursive state machine.
    fn job(
        election_id: Id,
        job: LifecycleJob,
        db: Database,
        tasks: Arc<Mutex<TaskMap>>,
    ) -> BoxFuture<'static, Result<()>> {
        /// Nested function for error handling.
        async fn transition(
            election_id: Id,
            job: LifecycleJob,
            db: &Database,
        ) -> Result<Option<Election>> {
            let elections = Coll::<Election>::from_db(db);
            let audit_logs = Coll::<NewAuditLog>::from_db(db);

            // Only move if nobody changed the status in the meantime.
            let filter = doc! {
                "_id": election_id,
                "status": job.from,
            };
            let election = match elections.find_one(filter.clone(), None).await? {
                Some(election) => election,
                None => {
                    debug!("Lifecycle job for election {election_id} had nothing to do");
                    return Ok(None);
                }
            };

            // Ballots may have been emptied since the election was scheduled.
            if job.to == ElectionStatus::Ongoing
                && !ElectionContents::load(db, election).await?.ready_to_start()
            {
                let update = doc! {
                    "$set": { "status": ElectionStatus::Pending },
                };
                if elections.update_one(filter, update, None).await?.modified_count == 1 {
                    NewAuditLog::new(
                        SYSTEM_ACTOR,
                        AuditAction::ChangeStatus,
                        election_id,
                        format!(
                            "{} -> {} (start refused: a position has no candidates)",
                            job.from,
                            ElectionStatus::Pending
                        ),
                    )
                    .record(&audit_logs)
                    .await?;
                    warn!("Election {election_id} was not ready to start and is pending again");
                }
                return Ok(None);
            }

            let update = doc! {
                "$set": { "status": job.to },
            };
            let result = elections.update_one(filter, update, None).await?;
            if result.modified_count != 1 {
                debug!("Lifecycle job for election {election_id} had nothing to do");
                return Ok(None);
            }
            NewAuditLog::new(
                SYSTEM_ACTOR,
                AuditAction::ChangeStatus,
                election_id,
                format!("{} -> {} (scheduled)", job.from, job.to),
            )
            .record(&audit_logs)
            .await?;
            info!("Election {election_id} moved {} -> {}", job.from, job.to);
            Ok(elections.find_one(election_id.as_doc(), None).await?)
        }

        async move {
            let result = transition(election_id, job, &db).await;
            let mut tasks_locked = tasks.lock().await;
            match result {
                Ok(updated) => {
                    tasks_locked.remove(&election_id);
                    let next = updated
                        .as_ref()
                        .and_then(|e| LifecycleJob::next_for(e).map(|j| (e.id, j)));
                    if let Some((id, next_job)) = next {
                        let future = Self::job(id, next_job, db.clone(), tasks.clone());
                        tasks_locked.insert(id, ScheduledTask::new(future, next_job.due));
                    }
                    trace!("Lifecycle job completed for election {election_id}");
                    Ok(())
                }
                Err(e) => {
                    error!("Lifecycle job for election {election_id} failed: {e}");
                    let retry = Self::job(election_id, job, db.clone(), tasks.clone());
                    let retry_time = Utc::now() + Duration::seconds(RETRY_INTERVAL_SECONDS);
                    tasks_locked.insert(election_id, ScheduledTask::new(retry, retry_time));
                    warn!("Failed lifecycle job will be retried in {RETRY_INTERVAL_SECONDS} seconds");
                    Err(e)
                }
            }
        }
        .boxed()
    }
}

/// A fairing that schedules lifecycle jobs for all applicable elections
/// during Rocket ignition, and places an `ElectionScheduler` into managed state.
/// This fairing depends on the database being available in managed state,
/// and so must be attached after the fairing responsible for that.
pub struct ElectionSchedulerFairing;

#[rocket::async_trait]
impl Fairing for ElectionSchedulerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Election Scheduler",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        info!("Scheduling election lifecycle jobs...");
        let scheduler = match rocket.state::<Database>() {
            Some(db) => ElectionScheduler::new(db),
            None => {
                error!("Database was not available when scheduling lifecycle jobs");
                return Err(rocket);
            }
        };
        if let Err(e) = scheduler.schedule_elections().await {
            error!("Failed to schedule election lifecycle jobs: {e}");
            return Err(rocket);
        }
        info!("...election lifecycle jobs scheduled!");

        rocket = rocket.manage(scheduler);
        Ok(rocket)
    }
}
