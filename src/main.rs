mod config;
mod database;
mod error;
mod model;
mod omdb;

use actix_web::{http::header, middleware::Logger, web, App, HttpResponse, HttpServer};
use config::Config;
use database::{MovieDb, UserDb};
use error::AppError;
use log::info;
use model::*;
use omdb::{MovieLookup, OmdbClient};
use serde::Deserialize;
use std::sync::Arc;

type Tera = web::Data<tera::Tera>;
type Db = web::Data<sled::Db>;
type Lookup = web::Data<dyn MovieLookup>;

type HandlerResult = Result<HttpResponse, AppError>;

fn render(tera: &tera::Tera, template: &str, ctx: &tera::Context) -> HandlerResult {
    let body = tera.render(template, ctx)?;
    Ok(HttpResponse::Ok().content_type("text/html").body(body))
}

fn redirect<S: Into<String>>(location: S) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.into()))
        .finish()
}

fn existing_user(db: &sled::Db, user_id: u64) -> Result<User, AppError> {
    db.get_user(user_id)?.ok_or_else(|| AppError::user_not_found(user_id))
}

/// A movie that exists and belongs to `user_id`. Anything else counts as
/// missing.
fn owned_movie(db: &sled::Db, user_id: u64, movie_id: u64) -> Result<Movie, AppError> {
    db.get_movie(movie_id)?
        .filter(|movie| movie.user_id == user_id)
        .ok_or_else(|| AppError::movie_not_found(movie_id))
}

/// Trimmed form value, `None` when left empty.
fn supplied(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}

async fn index(tera: Tera) -> HandlerResult {
    render(&tera, "index.html", &tera::Context::new())
}

async fn list_users(tera: Tera, db: Db) -> HandlerResult {
    let users = db.all_users()?;
    let mut ctx = tera::Context::new();
    ctx.insert("users", &users);
    render(&tera, "users.html", &ctx)
}

async fn user_movies(path: web::Path<u64>, tera: Tera, db: Db) -> HandlerResult {
    let user_id = path.into_inner();
    let user = existing_user(&db, user_id)?;
    let movies = db.user_movies(user_id)?;
    let mut ctx = tera::Context::new();
    ctx.insert("user", &user);
    ctx.insert("movies", &movies);
    render(&tera, "user_movies.html", &ctx)
}

async fn add_user_form(tera: Tera) -> HandlerResult {
    render(&tera, "add_user.html", &tera::Context::new())
}

#[derive(Deserialize)]
struct AddUserParams {
    name: String,
}

async fn add_user(params: web::Form<AddUserParams>, db: Db) -> HandlerResult {
    let name = supplied(&params.name)
        .ok_or_else(|| AppError::BadRequest("Name must not be empty".to_owned()))?;
    let user_id = db.add_user(&name)?;
    info!("added user {} ({:?})", user_id, name);
    Ok(redirect("/users"))
}

async fn delete_user(path: web::Path<u64>, db: Db) -> HandlerResult {
    let user_id = path.into_inner();
    if !db.delete_user(user_id)? {
        return Err(AppError::user_not_found(user_id));
    }
    info!("deleted user {}", user_id);
    Ok(redirect("/users"))
}

async fn add_movie_form(path: web::Path<u64>, tera: Tera, db: Db) -> HandlerResult {
    let user = existing_user(&db, path.into_inner())?;
    let mut ctx = tera::Context::new();
    ctx.insert("user", &user);
    render(&tera, "add_movie.html", &ctx)
}

#[derive(Deserialize)]
struct AddMovieParams {
    #[serde(default)]
    title: String,
}

async fn add_movie(
    path: web::Path<u64>,
    params: web::Form<AddMovieParams>,
    db: Db,
    lookup: Lookup,
) -> HandlerResult {
    let user_id = path.into_inner();
    existing_user(&db, user_id)?;
    let title = supplied(&params.title)
        .ok_or_else(|| AppError::BadRequest("Title must not be empty".to_owned()))?;
    let movie = lookup.find_by_title(&title).await?;
    // The user may have been deleted while the lookup was running.
    let movie_id = db
        .add_movie(user_id, &movie)?
        .ok_or_else(|| AppError::user_not_found(user_id))?;
    info!("added movie {} ({:?}) for user {}", movie_id, movie.title, user_id);
    Ok(redirect(format!("/users/{}", user_id)))
}

async fn update_movie_form(path: web::Path<(u64, u64)>, tera: Tera, db: Db) -> HandlerResult {
    let (user_id, movie_id) = path.into_inner();
    let user = existing_user(&db, user_id)?;
    let movie = owned_movie(&db, user_id, movie_id)?;
    let mut ctx = tera::Context::new();
    ctx.insert("user", &user);
    ctx.insert("movie", &movie);
    render(&tera, "update_movie.html", &ctx)
}

#[derive(Deserialize)]
struct UpdateMovieParams {
    #[serde(default)]
    title: String,
    #[serde(default)]
    director: String,
    #[serde(default)]
    year: String,
    #[serde(default)]
    rating: String,
}

impl UpdateMovieParams {
    fn to_update(&self) -> Result<MovieUpdate, AppError> {
        let year = supplied(&self.year)
            .map(|year| {
                year.parse::<i32>()
                    .map_err(|_| AppError::BadRequest(format!("Invalid year {:?}", year)))
            })
            .transpose()?;
        let rating = supplied(&self.rating)
            .map(|rating| match rating.parse::<f64>() {
                Ok(value) if (0.0..=10.0).contains(&value) => Ok(value),
                _ => Err(AppError::BadRequest(format!("Invalid rating {:?}", rating))),
            })
            .transpose()?;
        Ok(MovieUpdate {
            title: supplied(&self.title),
            director: supplied(&self.director),
            year,
            rating,
        })
    }
}

async fn update_movie(
    path: web::Path<(u64, u64)>,
    params: web::Form<UpdateMovieParams>,
    db: Db,
) -> HandlerResult {
    let (user_id, movie_id) = path.into_inner();
    existing_user(&db, user_id)?;
    owned_movie(&db, user_id, movie_id)?;
    let update = params.to_update()?;
    if !update.is_empty() {
        db.update_movie(movie_id, &update)?
            .ok_or_else(|| AppError::movie_not_found(movie_id))?;
        info!("updated movie {} with {:?}", movie_id, update);
    }
    Ok(redirect(format!("/users/{}", user_id)))
}

async fn delete_movie(path: web::Path<(u64, u64)>, db: Db) -> HandlerResult {
    let (user_id, movie_id) = path.into_inner();
    existing_user(&db, user_id)?;
    owned_movie(&db, user_id, movie_id)?;
    if !db.delete_movie(movie_id)? {
        return Err(AppError::movie_not_found(movie_id));
    }
    info!("deleted movie {} of user {}", movie_id, user_id);
    Ok(redirect(format!("/users/{}", user_id)))
}

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/users", web::get().to(list_users))
        .route("/users/{id}", web::get().to(user_movies))
        .route("/add_user", web::get().to(add_user_form))
        .route("/add_user", web::post().to(add_user))
        .route("/users/{id}/delete", web::post().to(delete_user))
        .route("/users/{id}/add_movie", web::get().to(add_movie_form))
        .route("/users/{id}/add_movie", web::post().to(add_movie))
        .route(
            "/users/{id}/update_movie/{movie_id}",
            web::get().to(update_movie_form),
        )
        .route(
            "/users/{id}/update_movie/{movie_id}",
            web::post().to(update_movie),
        )
        .route(
            "/users/{id}/delete_movie/{movie_id}",
            web::post().to(delete_movie),
        );
}

fn startup_error<E: std::fmt::Display>(context: &str, err: E) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("movieweb=debug,actix_web=info"),
    )
    .init();

    let config = Config::from_env().map_err(|err| startup_error("Invalid configuration", err))?;
    info!("opening database at {:?}", config.database_path);

    let tera = web::Data::new(
        tera::Tera::new(&config.templates).map_err(|err| startup_error("Template error", err))?,
    );
    let db = web::Data::new(
        sled::open(&config.database_path).map_err(|err| startup_error("Database error", err))?,
    );
    let omdb: Arc<dyn MovieLookup> =
        Arc::new(OmdbClient::new(config.omdb_url.clone(), config.omdb_api_key.clone()));
    let lookup: Lookup = web::Data::from(omdb);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(tera.clone())
            .app_data(db.clone())
            .app_data(lookup.clone())
            .configure(configure)
    })
    .bind(&config.bind)?
    .run()
    .await
}
