#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::{
    config::{ConfigFairing, DatabaseFairing},
    logging::LoggerFairing,
    model::db::election::ElectionSchedulerFairing,
};

pub mod api;
mod config;
pub mod error;
mod logging;
pub mod model;
mod scheduled_task;

pub use config::Config;

/// Assemble the server: config, database, lifecycle scheduler, logging and routes.
pub fn build() -> Rocket<Build> {
    assemble(rocket::build())
}

/// Fairing order matters: the scheduler needs the database in managed state.
fn assemble(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(ElectionSchedulerFairing)
        .attach(LoggerFairing)
        .mount("/", api::routes())
}

/// A MongoDB client for tests, connected using the configured `db_uri`.
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .unwrap();
    mongodb::Client::with_uri_str(db_uri).await.unwrap()
}

/// A fresh database name, so tests never see each other's data.
#[cfg(test)]
pub(crate) fn database() -> String {
    let random: u32 = rand::random();
    format!("test{random}")
}

/// The server as [`build`] makes it, but pointed at the named database.
#[cfg(test)]
pub(crate) fn rocket_for_db(db_name: &str) -> Rocket<Build> {
    let figment = rocket::Config::figment().merge(("db_name", db_name));
    assemble(rocket::custom(figment))
}
