use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: u64,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Movie {
    pub id: u64,
    pub user_id: u64,
    pub title: String,
    pub director: String,
    pub year: i32,
    pub rating: f64,
    pub poster: Option<String>,
}

/// Movie fields as they arrive from the metadata lookup, before an id and
/// owner are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovie {
    pub title: String,
    pub director: String,
    pub year: i32,
    pub rating: f64,
    pub poster: Option<String>,
}

impl NewMovie {
    pub fn with_ids(&self, id: u64, user_id: u64) -> Movie {
        Movie {
            id,
            user_id,
            title: self.title.clone(),
            director: self.director.clone(),
            year: self.year,
            rating: self.rating,
            poster: self.poster.clone(),
        }
    }
}

/// Partial update of a movie. Every `Some` field overwrites, including a
/// rating of `0.0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieUpdate {
    pub title: Option<String>,
    pub director: Option<String>,
    pub year: Option<i32>,
    pub rating: Option<f64>,
}

impl MovieUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.director.is_none()
            && self.year.is_none()
            && self.rating.is_none()
    }

    pub fn apply(&self, movie: &mut Movie) {
        if let Some(title) = &self.title {
            movie.title = title.clone();
        }
        if let Some(director) = &self.director {
            movie.director = director.clone();
        }
        if let Some(year) = self.year {
            movie.year = year;
        }
        if let Some(rating) = self.rating {
            movie.rating = rating;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inception() -> Movie {
        NewMovie {
            title: "Inception".to_owned(),
            director: "Christopher Nolan".to_owned(),
            year: 2010,
            rating: 8.8,
            poster: None,
        }
        .with_ids(3, 1)
    }

    #[test]
    fn apply_zero_rating() {
        let mut movie = inception();
        MovieUpdate {
            rating: Some(0.0),
            ..Default::default()
        }
        .apply(&mut movie);
        assert_eq!(movie.rating, 0.0);
        assert_eq!(movie.title, "Inception");
    }

    #[test]
    fn empty_update() {
        let mut movie = inception();
        let update = MovieUpdate::default();
        assert!(update.is_empty());
        update.apply(&mut movie);
        assert_eq!(movie, inception());
    }
}
