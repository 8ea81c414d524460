use log::*;

#[cfg(feature = "postgres")]
use crate::PostgresDatabase;

/// Loads `.env.test` (if present) and initialises logging. Safe to call from every test.
pub fn prepare_test_env() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
}

/// The URL of a Postgres server that tests may create throwaway databases on, from `GM_TEST_DATABASE_URL`.
pub fn test_database_url() -> Option<String> {
    prepare_test_env();
    let url = std::env::var("GM_TEST_DATABASE_URL").ok();
    if url.is_none() {
        warn!("🚀️ GM_TEST_DATABASE_URL is not set. Postgres backend tests will be skipped.");
    }
    url
}

/// Replaces the database name in `server_url` with a random one.
pub fn random_db_url(server_url: &str) -> String {
    let name = format!("gm_test_{}", rand::random::<u32>());
    match server_url.rfind('/') {
        Some(i) if i > "postgres://".len() => format!("{}/{name}", &server_url[..i]),
        _ => format!("{}/{name}", server_url.trim_end_matches('/')),
    }
}

/// Creates a fresh database on the server named by `server_url`, migrates it, and connects to it.
#[cfg(feature = "postgres")]
pub async fn create_postgres_database(server_url: &str) -> PostgresDatabase {
    use sqlx::{migrate::MigrateDatabase, Postgres};
    let url = random_db_url(server_url);
    Postgres::create_database(&url).await.expect("Error creating test database");
    info!("🚀️ Created test database");
    let db = PostgresDatabase::new_with_url(&url, 10).await.expect("Error connecting to test database");
    db.run_migrations().await.expect("Error running DB migrations");
    db
}

#[cfg(feature = "postgres")]
pub async fn drop_postgres_database(db: PostgresDatabase) {
    use sqlx::{migrate::MigrateDatabase, Postgres};
    let url = db.url().to_string();
    db.close().await;
    if let Err(e) = Postgres::drop_database(&url).await {
        warn!("🚀️ Could not drop test database: {e}");
    }
}

#[cfg(test)]
mod test {
    use super::random_db_url;

    #[test]
    fn random_urls_replace_the_database_name() {
        let url = random_db_url("postgres://gm:pw@localhost:5432/postgres");
        assert!(url.starts_with("postgres://gm:pw@localhost:5432/gm_test_"));
        let url = random_db_url("postgres://localhost");
        assert!(url.starts_with("postgres://localhost/gm_test_"));
    }
}
