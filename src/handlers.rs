use std::time::Instant;

use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::web::Bytes;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use futures::stream::{self, Stream, StreamExt};
use log::{debug, error, info, warn};
use rust_embed::RustEmbed;
use serde::Serialize;

use crate::auth::{self, SESSION_COOKIE};
use crate::config::CATEGORIES;
use crate::error::PortalError;
use crate::github::{encode_path, DirectoryLister};
use crate::models::{DocumentEntry, FlashQuery, LoginForm, SearchForm};
use crate::search::search_documents;
use crate::AppState;

#[derive(RustEmbed)]
#[folder = "static/"]
struct Asset;

/// Streamed responses relay the remote body in fixed-size pieces.
const STREAM_CHUNK_SIZE: usize = 1024;

#[derive(Serialize)]
struct LoginContext {
    has_error: bool,
    error: String,
}

#[derive(Serialize)]
struct DocumentView {
    name: String,
    category: String,
    view_href: String,
    download_url: String,
}

#[derive(Serialize)]
struct IndexContext {
    username: String,
    search_term: String,
    has_message: bool,
    message: String,
    has_results: bool,
    results: Vec<DocumentView>,
}

/// Resolves the session cookie to the authenticated principal, if any.
fn session_user(req: &HttpRequest, state: &AppState) -> Option<String> {
    let cookie = req.cookie(SESSION_COOKIE)?;
    state.sessions.principal(cookie.value())
}

fn redirect_to(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.to_string()))
        .finish()
}

/// Sends the caller back to the search page with a flash message.
fn redirect_with_error(message: &str) -> HttpResponse {
    redirect_to(&format!("/?error={}", urlencoding::encode(message)))
}

fn html_page(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

/// Traversal guard; must hold before any network request is issued.
fn is_safe_path(path: &str) -> bool {
    !path.is_empty() && !path.starts_with('/') && path.split('/').all(|segment| segment != "..")
}

/// Fixed extension to MIME map from the original deployment; anything else
/// is served as opaque bytes.
fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

fn document_view(entry: DocumentEntry) -> DocumentView {
    DocumentView {
        view_href: format!("/view/{}", encode_path(&entry.path)),
        name: entry.name,
        category: entry.category,
        download_url: entry.download_url,
    }
}

#[get("/login")]
pub async fn login_form(state: web::Data<AppState>) -> Result<HttpResponse, PortalError> {
    let body = state.pages.render(
        "login.html",
        LoginContext {
            has_error: false,
            error: String::new(),
        },
    )?;
    Ok(html_page(body))
}

#[post("/login")]
pub async fn login_submit(
    state: web::Data<AppState>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, PortalError> {
    if let Some(account) = auth::authenticate(&state.accounts, &form.username, &form.password) {
        info!("User '{}' logged in", account.username);
        let cookie = Cookie::build(SESSION_COOKIE, state.sessions.open(&account.username))
            .path("/")
            .http_only(true)
            .finish();
        return Ok(HttpResponse::Found()
            .cookie(cookie)
            .insert_header((header::LOCATION, "/"))
            .finish());
    }

    warn!("Failed login attempt for '{}'", form.username);
    let body = state.pages.render(
        "login.html",
        LoginContext {
            has_error: true,
            error: "Identifiant ou mot de passe incorrect".to_string(),
        },
    )?;
    Ok(html_page(body))
}

#[get("/logout")]
pub async fn logout(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    if session_user(&req, state.get_ref()).is_none() {
        return redirect_to("/login");
    }

    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        state.sessions.close(cookie.value());
    }
    let mut removal = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    removal.make_removal();
    HttpResponse::Found()
        .cookie(removal)
        .insert_header((header::LOCATION, "/login"))
        .finish()
}

#[get("/")]
pub async fn index(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<FlashQuery>,
) -> Result<HttpResponse, PortalError> {
    let Some(username) = session_user(&req, state.get_ref()) else {
        return Ok(redirect_to("/login"));
    };

    let body = state.pages.render(
        "index.html",
        IndexContext {
            username,
            search_term: String::new(),
            has_message: query.error.is_some(),
            message: query.error.clone().unwrap_or_default(),
            has_results: false,
            results: Vec::new(),
        },
    )?;
    Ok(html_page(body))
}

#[post("/")]
pub async fn run_search(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<SearchForm>,
) -> Result<HttpResponse, PortalError> {
    let Some(username) = session_user(&req, state.get_ref()) else {
        return Ok(redirect_to("/login"));
    };

    let search_term = form.search.as_deref().unwrap_or("").trim().to_string();
    let mut message = String::new();
    let mut results = Vec::new();

    if search_term.is_empty() {
        message = "Veuillez renseigner la barre de recherche.".to_string();
    } else {
        info!("User '{}' searching for '{}'", username, search_term);
        let start = Instant::now();
        let matches = search_documents(&state.github, CATEGORIES, &search_term).await;
        info!(
            "Search for '{}' returned {} documents in {:.2?}",
            search_term,
            matches.len(),
            start.elapsed()
        );
        if matches.is_empty() {
            message = "Aucun document trouvé pour cette recherche.".to_string();
        }
        results = matches.into_iter().map(document_view).collect();
    }

    let body = state.pages.render(
        "index.html",
        IndexContext {
            username,
            search_term,
            has_message: !message.is_empty(),
            message,
            has_results: !results.is_empty(),
            results,
        },
    )?;
    Ok(html_page(body))
}

#[get("/view/{path:.*}")]
pub async fn view_file(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> HttpResponse {
    if session_user(&req, state.get_ref()).is_none() {
        return redirect_to("/login");
    }

    let file_path = path.into_inner();
    if !is_safe_path(&file_path) {
        warn!("Rejected unsafe file path '{}'", file_path);
        return redirect_with_error("Chemin de fichier non autorisé");
    }

    let filename = file_path
        .rsplit('/')
        .next()
        .unwrap_or(file_path.as_str())
        .to_string();
    let mimetype = content_type_for(&filename);

    match state.github.fetch_raw(&file_path).await {
        Ok(response) if response.status() == reqwest::StatusCode::OK => {
            debug!("Streaming '{}' as {}", file_path, mimetype);
            HttpResponse::Ok()
                .content_type(mimetype)
                .insert_header((
                    header::CONTENT_DISPOSITION,
                    format!("inline; filename=\"{}\"", filename),
                ))
                .insert_header((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                .streaming(rechunk(response.bytes_stream()))
        }
        Ok(response) => {
            error!(
                "Erreur {} pour {}",
                response.status().as_u16(),
                state.github.raw_url(&file_path)
            );
            redirect_with_error(&format!(
                "Le fichier n'a pas pu être chargé (erreur {})",
                response.status().as_u16()
            ))
        }
        Err(e) => {
            error!("Connection error for '{}': {}", file_path, e);
            redirect_with_error("Erreur de connexion au serveur GitHub")
        }
    }
}

/// Splits the inbound body into 1024-byte pieces as it arrives, so the relay
/// never holds more than one transport chunk in memory.
fn rechunk<S>(body: S) -> impl Stream<Item = Result<Bytes, reqwest::Error>>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>>,
{
    body.flat_map(|chunk| match chunk {
        Ok(mut rest) => {
            let mut pieces = Vec::with_capacity(rest.len() / STREAM_CHUNK_SIZE + 1);
            while rest.len() > STREAM_CHUNK_SIZE {
                pieces.push(Ok(rest.split_to(STREAM_CHUNK_SIZE)));
            }
            if !rest.is_empty() {
                pieces.push(Ok(rest));
            }
            stream::iter(pieces)
        }
        Err(e) => stream::iter(vec![Err(e)]),
    })
}

#[get("/static/{path:.*}")]
pub async fn static_asset(path: web::Path<String>) -> HttpResponse {
    let path = path.into_inner();
    debug!("Serving static asset: {}", path);

    match Asset::get(&path) {
        Some(content) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            HttpResponse::Ok()
                .content_type(mime.as_ref())
                .body(content.data.into_owned())
        }
        None => HttpResponse::NotFound().body("404 Not Found"),
    }
}
