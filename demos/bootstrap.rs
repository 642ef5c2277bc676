use app_bootstrap::{ApplicationContext, DirectoryRole};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Database {
    host: String,
    port: u16,
    name: String,
    url: String,
}

fn main() -> Result<(), app_bootstrap::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let ctx = ApplicationContext::create("demos/app")?;

    println!("App: {} (development={})", ctx.name(), ctx.in_development());
    for role in DirectoryRole::ALL {
        if let Some(path) = ctx.directory(role) {
            println!("  {role:<9} {}", path.display());
        }
    }
    if let Some(uploads) = ctx.get_directory("uploads") {
        println!("  uploads   {}", uploads.display());
    }

    // Evaluated once; the second call is served from the cache.
    let db: Database = ctx.deserialize_config("database.toml")?;
    let again: Database = ctx.with_name("copy").deserialize_config("database.toml")?;
    println!("Database URL: {} / {}", db.url, again.url);

    let port = ctx.get_from_environment("PORT", Some("8080"))?;
    println!("Listening port: {port}");

    Ok(())
}
