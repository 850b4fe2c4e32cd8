use actix_web::{web, HttpServer};
use log::info;
use school_admin_backend::{create_app, init_db, seed_admin_user, AppState};
use std::env;
use std::path::PathBuf;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    // Load environment variables from .env if present
    dotenv::dotenv().ok();

    let database_url = env::var("DATABASE_URL")
        .map_err(|_| std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "DATABASE_URL environment variable is required"
        ))?;

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let static_dir = PathBuf::from(
        env::var("STATIC_DIR").unwrap_or_else(|_| "client/build".to_string()),
    );
    let admin_username = env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let admin_password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin1818".to_string());

    let db_pool = init_db(&database_url)
        .await
        .map_err(|e| std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to initialize database: {}", e)
        ))?;

    seed_admin_user(&db_pool, &admin_username, &admin_password)
        .await
        .map_err(|e| std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to seed admin user: {}", e)
        ))?;

    info!("Database initialized successfully");

    let app_state = web::Data::new(AppState {
        db: db_pool.clone(),
        static_dir,
    });

    info!("Starting server at http://{}:{}", host, port);

    HttpServer::new(move || create_app(app_state.clone()))
        .bind((host.as_str(), port))?
        .run()
        .await?;

    db_pool.close().await;

    Ok(())
}
