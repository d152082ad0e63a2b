use crate::model::*;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError, Transactional,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("user name must not be empty")]
    EmptyName,
}

impl From<TransactionError<Error>> for Error {
    fn from(err: TransactionError<Error>) -> Self {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => Error::Storage(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

type TxResult<T> = ConflictableTransactionResult<T, Error>;

/// Stored form of a user. `movies` is the owner index used for listing and
/// cascading deletes.
#[derive(Serialize, Deserialize, Debug)]
struct UserRecord {
    name: String,
    movies: Vec<u64>,
}

// Big endian so that tree iteration follows id order.
fn serialize_id(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn deserialize_id<V: AsRef<[u8]>>(id: V) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(id.as_ref());
    u64::from_be_bytes(bytes)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

fn tx_encode<T: Serialize>(value: &T) -> TxResult<Vec<u8>> {
    encode(value).map_err(ConflictableTransactionError::Abort)
}

fn tx_decode<T: DeserializeOwned>(bytes: &[u8]) -> TxResult<T> {
    decode(bytes).map_err(ConflictableTransactionError::Abort)
}

pub trait UserDb {
    type Error;
    fn all_users(&self) -> std::result::Result<Vec<User>, Self::Error>;
    fn get_user(&self, id: u64) -> std::result::Result<Option<User>, Self::Error>;
    fn user_movies(&self, id: u64) -> std::result::Result<Vec<Movie>, Self::Error>;
    /// Fails with `EmptyName` for a blank name.
    fn add_user(&self, name: &str) -> std::result::Result<u64, Self::Error>;
    /// Removes the user together with every movie it owns.
    fn delete_user(&self, id: u64) -> std::result::Result<bool, Self::Error>;
}

pub trait MovieDb {
    type Error;
    fn get_movie(&self, id: u64) -> std::result::Result<Option<Movie>, Self::Error>;
    /// Returns `None` if the owning user does not exist.
    fn add_movie(
        &self,
        user_id: u64,
        movie: &NewMovie,
    ) -> std::result::Result<Option<u64>, Self::Error>;
    fn delete_movie(&self, id: u64) -> std::result::Result<bool, Self::Error>;
    fn update_movie(
        &self,
        id: u64,
        update: &MovieUpdate,
    ) -> std::result::Result<Option<Movie>, Self::Error>;
}

const USERS: &[u8] = b"users";
const MOVIES: &[u8] = b"movies";

impl UserDb for sled::Db {
    type Error = Error;

    fn all_users(&self) -> Result<Vec<User>> {
        let users = self.open_tree(USERS)?;
        users
            .iter()
            .map(|entry| -> Result<User> {
                let (key, value) = entry?;
                let record: UserRecord = decode(&value)?;
                Ok(User {
                    id: deserialize_id(key),
                    name: record.name,
                })
            })
            .collect()
    }

    fn get_user(&self, id: u64) -> Result<Option<User>> {
        let users = self.open_tree(USERS)?;
        match users.get(serialize_id(id))? {
            Some(value) => {
                let record: UserRecord = decode(&value)?;
                Ok(Some(User {
                    id,
                    name: record.name,
                }))
            }
            None => Ok(None),
        }
    }

    fn user_movies(&self, id: u64) -> Result<Vec<Movie>> {
        let users = self.open_tree(USERS)?;
        let movies = self.open_tree(MOVIES)?;
        let record: UserRecord = match users.get(serialize_id(id))? {
            Some(value) => decode(&value)?,
            None => return Ok(Vec::new()),
        };
        let mut ret = Vec::with_capacity(record.movies.len());
        for movie_id in record.movies {
            if let Some(value) = movies.get(serialize_id(movie_id))? {
                ret.push(decode(&value)?);
            }
        }
        Ok(ret)
    }

    fn add_user(&self, name: &str) -> Result<u64> {
        if name.trim().is_empty() {
            return Err(Error::EmptyName);
        }
        let users = self.open_tree(USERS)?;
        let id = self.generate_id()?;
        let record = UserRecord {
            name: name.to_owned(),
            movies: Vec::new(),
        };
        users.insert(serialize_id(id), encode(&record)?)?;
        Ok(id)
    }

    fn delete_user(&self, id: u64) -> Result<bool> {
        let users = self.open_tree(USERS)?;
        let movies = self.open_tree(MOVIES)?;
        let deleted = (&users, &movies).transaction(|(users, movies)| -> TxResult<bool> {
            let record: UserRecord = match users.remove(&serialize_id(id))? {
                Some(value) => tx_decode(&value)?,
                None => return Ok(false),
            };
            for movie_id in &record.movies {
                movies.remove(&serialize_id(*movie_id))?;
            }
            Ok(true)
        })?;
        Ok(deleted)
    }
}

impl MovieDb for sled::Db {
    type Error = Error;

    fn get_movie(&self, id: u64) -> Result<Option<Movie>> {
        let movies = self.open_tree(MOVIES)?;
        match movies.get(serialize_id(id))? {
            Some(value) => Ok(Some(decode(&value)?)),
            None => Ok(None),
        }
    }

    fn add_movie(&self, user_id: u64, movie: &NewMovie) -> Result<Option<u64>> {
        let users = self.open_tree(USERS)?;
        let movies = self.open_tree(MOVIES)?;
        // Generated outside the transaction so a retried closure keeps the id.
        let id = self.generate_id()?;
        let encoded = encode(&movie.with_ids(id, user_id))?;
        let added = (&users, &movies).transaction(|(users, movies)| -> TxResult<Option<u64>> {
            let owner_key = serialize_id(user_id);
            let mut owner: UserRecord = match users.get(&owner_key)? {
                Some(value) => tx_decode(&value)?,
                None => return Ok(None),
            };
            owner.movies.push(id);
            users.insert(&owner_key, tx_encode(&owner)?)?;
            movies.insert(&serialize_id(id), encoded.clone())?;
            Ok(Some(id))
        })?;
        Ok(added)
    }

    fn delete_movie(&self, id: u64) -> Result<bool> {
        let users = self.open_tree(USERS)?;
        let movies = self.open_tree(MOVIES)?;
        let deleted = (&users, &movies).transaction(|(users, movies)| -> TxResult<bool> {
            let movie: Movie = match movies.remove(&serialize_id(id))? {
                Some(value) => tx_decode(&value)?,
                None => return Ok(false),
            };
            let owner_key = serialize_id(movie.user_id);
            if let Some(value) = users.get(&owner_key)? {
                let mut owner: UserRecord = tx_decode(&value)?;
                owner.movies.retain(|movie_id| *movie_id != id);
                users.insert(&owner_key, tx_encode(&owner)?)?;
            }
            Ok(true)
        })?;
        Ok(deleted)
    }

    fn update_movie(&self, id: u64, update: &MovieUpdate) -> Result<Option<Movie>> {
        let movies = self.open_tree(MOVIES)?;
        let updated = movies.transaction(|movies| -> TxResult<Option<Movie>> {
            let key = serialize_id(id);
            let mut movie: Movie = match movies.get(&key)? {
                Some(value) => tx_decode(&value)?,
                None => return Ok(None),
            };
            update.apply(&mut movie);
            movies.insert(&key, tx_encode(&movie)?)?;
            Ok(Some(movie))
        })?;
        Ok(updated)
    }
}
