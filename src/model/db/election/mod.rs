mod base;
mod contents;
mod db;
mod scheduler;

pub use base::ElectionCore;
pub use contents::ElectionContents;
pub use db::{Election, NewElection};
pub use scheduler::{ElectionScheduler, ElectionSchedulerFairing, LifecycleJob};
