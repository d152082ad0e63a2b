use crate::{database, omdb::LookupError};
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Database error")]
    Database(#[from] database::Error),
    #[error("Template error")]
    Template(#[from] tera::Error),
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl AppError {
    pub fn user_not_found(id: u64) -> Self {
        AppError::NotFound(format!("User {}", id))
    }

    pub fn movie_not_found(id: u64) -> Self {
        AppError::NotFound(format!("Movie {}", id))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(database::Error::EmptyName) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Lookup(LookupError::Transport(_)) => StatusCode::BAD_GATEWAY,
            AppError::Lookup(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Only the variant name reaches the client for server side failures.
        match self {
            AppError::Database(database::Error::EmptyName) => {}
            AppError::Database(err) => error!("{:?}", err),
            AppError::Template(err) => error!("{:?}", err),
            AppError::Lookup(err @ LookupError::Transport(_)) => error!("{:?}", err),
            _ => {}
        }
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::omdb::{MovieLookup, OmdbClient};

    #[test]
    fn statuses() {
        assert_eq!(
            AppError::user_not_found(3).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::user_not_found(3).to_string(), "User 3 not found");
        assert_eq!(
            AppError::from(LookupError::NotFound("x".to_owned())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::BadRequest("Name must not be empty".to_owned()).status_code(),
            StatusCode::BAD_REQUEST
        );
        let incomplete = LookupError::Incomplete {
            title: "Untitled".to_owned(),
            field: "year",
        };
        assert_eq!(
            AppError::from(incomplete).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(database::Error::EmptyName).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[actix_rt::test]
    async fn unreachable_lookup_is_bad_gateway() {
        let client = OmdbClient::new("http://127.0.0.1:1/", "key");
        let err = AppError::from(client.find_by_title("Inception").await.unwrap_err());
        assert!(matches!(err, AppError::Lookup(LookupError::Transport(_))));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.error_response().status(), StatusCode::BAD_GATEWAY);
    }
}
