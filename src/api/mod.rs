use rocket::Route;

mod admin;
pub mod auth;
mod common;
mod election;
mod public;
mod voter;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(auth::routes());
    routes.extend(election::routes());
    routes.extend(public::routes());
    routes.extend(voter::routes());
    routes
}
