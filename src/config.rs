use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    common::password::MIN_PASSWORD_LENGTH,
    db::admin::ensure_admin_exists,
    mongodb::{ensure_indexes_exist, Coll},
};

/// Session settings, read from `Rocket.toml` and `ROCKET_*` environment
/// variables, and kept in managed state.
#[derive(Deserialize)]
pub struct Config {
    /// Seconds a sign-in stays valid.
    auth_ttl: u32,
    jwt_secret: String,
}

impl Config {
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Refuse settings that would make every session useless or forgeable.
    fn check(&self) -> Result<(), String> {
        if self.auth_ttl == 0 {
            return Err("auth_ttl must be at least one second".to_string());
        }
        if self.jwt_secret.trim().is_empty() {
            return Err("jwt_secret must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
impl Config {
    pub fn example() -> Self {
        Self::example_with_secret("example-signing-secret")
    }

    pub fn example_with_secret(secret: &str) -> Self {
        Self {
            auth_ttl: 3600,
            jwt_secret: secret.to_string(),
        }
    }
}

/// Loads [`Config`] into managed state, aborting ignition if it is missing or unusable.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load session config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        if let Err(why) = config.check() {
            error!("Invalid session config: {why}");
            return Err(rocket);
        }
        Ok(rocket.manage(config))
    }
}

/// Where the election data lives.
#[derive(Deserialize)]
struct DbConfig {
    #[serde(default = "default_db_name")]
    db_name: String,
    db_uri: String,
    /// Password for the bootstrap admin, used only while no admin exists.
    default_admin_password: String,
}

fn default_db_name() -> String {
    "ssc_evoting".to_string()
}

impl DbConfig {
    fn check(&self) -> Result<(), String> {
        if self.default_admin_password.len() < MIN_PASSWORD_LENGTH {
            return Err(format!(
                "default_admin_password must be at least {MIN_PASSWORD_LENGTH} characters"
            ));
        }
        Ok(())
    }
}

/// Connects to MongoDB, prepares indexes and the bootstrap admin, and
/// manages both the `Client` and the election `Database`.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        if let Err(why) = config.check() {
            error!("Invalid database config: {why}");
            return Err(rocket);
        }

        info!("Connecting to election database '{}'...", config.db_name);
        let client = match MongoClient::with_uri_str(&config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&config.db_name);

        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to create indexes: {e}");
            return Err(rocket);
        }
        if let Err(e) = ensure_admin_exists(&Coll::from_db(&db), &config.default_admin_password).await
        {
            error!("Failed to create the bootstrap admin: {e}");
            return Err(rocket);
        }
        info!("...election database ready");

        Ok(rocket.manage(client).manage(db))
    }
}
