use std::sync::Arc;

use anyhow::Context;
use bootcamp_mailer::{
    app::App, config::get_configuration, repository::PgStore, telemetry::get_subscriber,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration().context("Failed to read configuration.")?;

    get_subscriber(&config.log_level, std::io::stderr).init();

    let db = PgPoolOptions::new()
        .max_connections(50)
        .connect_with(config.database.with_db())
        .await
        .context("Could not connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("Could not run database migrations")?;

    let app = App::with(config, Arc::new(PgStore::new(db))).await?;

    tracing::info!(address = %app.address(), "starting server");
    app.serve().await.context("The server should be running")?;

    Ok(())
}
