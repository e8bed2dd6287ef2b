mod auth;
mod config;
mod error;
mod github;
mod handlers;
mod models;
mod search;
mod templates;

use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use actix_web::{middleware, web, App, HttpServer};
use log::{info, warn};
use rustls::ServerConfig;
use rustls_pemfile::{certs, pkcs8_private_keys};

use config::AppConfig;

/// Shared application state. Everything is read-only after startup except
/// the session registry, which guards its own map.
pub struct AppState {
    pub accounts: Vec<auth::Account>,
    pub sessions: auth::SessionStore,
    pub github: github::GithubClient,
    pub pages: templates::Pages,
}

fn startup_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    // Override the log level with the RUST_LOG environment variable,
    // e.g. `RUST_LOG=debug cargo run` for more verbose output.
    env::set_var(
        "RUST_LOG",
        env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
    );
    env_logger::init();

    let config = AppConfig::from_env().map_err(startup_error)?;
    let addr = format!("{}:{}", config.host, config.port);

    let pages = templates::Pages::load().map_err(startup_error)?;
    let state = web::Data::new(AppState {
        accounts: auth::account_table(&config),
        sessions: auth::SessionStore::new(&config.secret_key),
        github: github::GithubClient::new(&config),
        pages,
    });

    info!(
        "Serving documents from '{}/{}' (branch '{}')",
        config.github_owner, config.repo_name, config.branch
    );

    let mut http_server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(handlers::login_form)
            .service(handlers::login_submit)
            .service(handlers::logout)
            .service(handlers::index)
            .service(handlers::run_search)
            .service(handlers::view_file)
            .service(handlers::static_asset)
    });

    if let (Ok(cert_path), Ok(key_path)) = (env::var("CERT_PATH"), env::var("KEY_PATH")) {
        if !Path::new(&cert_path).exists() || !Path::new(&key_path).exists() {
            warn!("CERT_PATH or KEY_PATH points to a non-existent file. Starting without HTTPS.");
            http_server = http_server.bind(addr.as_str())?;
        } else {
            info!("Attempting to start HTTPS server...");
            let cert_file = &mut BufReader::new(File::open(cert_path)?);
            let key_file = &mut BufReader::new(File::open(key_path)?);
            let cert_chain = certs(cert_file).map(|r| r.unwrap()).collect();
            let mut keys = pkcs8_private_keys(key_file)
                .map(|r| r.unwrap())
                .collect::<Vec<_>>();

            if keys.is_empty() {
                return Err(startup_error("No private keys found in key file"));
            }

            let tls = ServerConfig::builder()
                .with_no_client_auth()
                .with_single_cert(cert_chain, keys.remove(0).into())
                .map_err(startup_error)?;

            info!("Successfully configured TLS. Binding to https://{}", addr);
            http_server = http_server.bind_rustls_0_23(addr.as_str(), tls)?;
        }
    } else {
        info!("No CERT_PATH or KEY_PATH found in env. Listening on http://{}", addr);
        http_server = http_server.bind(addr.as_str())?;
    }

    http_server.run().await
}
