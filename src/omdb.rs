use crate::model::NewMovie;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("no movie found for {0:?}")]
    NotFound(String),
    #[error("incomplete metadata for {title:?}: missing {field}")]
    Incomplete { title: String, field: &'static str },
    #[error("metadata request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Source of movie metadata, looked up by title.
#[async_trait]
pub trait MovieLookup: Send + Sync {
    async fn find_by_title(&self, title: &str) -> Result<NewMovie, LookupError>;
}

pub struct OmdbClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OmdbClient {
    pub fn new<U: Into<String>, K: Into<String>>(base_url: U, api_key: K) -> Self {
        OmdbClient {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl MovieLookup for OmdbClient {
    async fn find_by_title(&self, title: &str) -> Result<NewMovie, LookupError> {
        let response: OmdbResponse = self
            .client
            .get(&self.base_url)
            .query(&[("apikey", self.api_key.as_str()), ("t", title)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!("omdb response for {:?}: {:?}", title, response);
        response.into_movie(title)
    }
}

const NOT_AVAILABLE: &str = "N/A";

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct OmdbResponse {
    response: String,
    title: Option<String>,
    year: Option<String>,
    director: Option<String>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    poster: Option<String>,
    error: Option<String>,
}

impl OmdbResponse {
    fn into_movie(self, requested: &str) -> Result<NewMovie, LookupError> {
        if self.response != "True" {
            if let Some(error) = &self.error {
                debug!("omdb error for {:?}: {}", requested, error);
            }
            return Err(LookupError::NotFound(requested.to_owned()));
        }
        let year = self
            .year
            .as_deref()
            .and_then(parse_year)
            .ok_or_else(|| LookupError::Incomplete {
                title: requested.to_owned(),
                field: "year",
            })?;
        // Unknown ratings are stored as 0.0.
        let rating = self
            .imdb_rating
            .as_deref()
            .and_then(|r| r.parse::<f64>().ok())
            .unwrap_or(0.0);
        Ok(NewMovie {
            title: self
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| requested.to_owned()),
            director: self.director.unwrap_or_else(|| NOT_AVAILABLE.to_owned()),
            year,
            rating,
            poster: self.poster.filter(|p| p != NOT_AVAILABLE && !p.is_empty()),
        })
    }
}

// Series report ranges like "2010–2012"; the first year is kept.
fn parse_year(year: &str) -> Option<i32> {
    let digits: String = year
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
