use std::ops::Deref;

use mongodb::{
    bson::{doc, Document},
    error::Error as DbError,
    options::IndexOptions,
    Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    admin::{Admin, NewAdmin},
    opinion::{NewOpinion, PublishedOpinion},
    question::{NewQuestion, Question},
    response::{NewRawResponse, RawResponse},
    survey::Survey,
    upvote::{NewUpvote, Upvote},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the *registry* database connection from the managed state and wrap
    /// it in a collection. Tenant collections must instead be reached through
    /// a resolved [`Partition`](crate::model::db::partition::Partition), so
    /// only registry types should be used as guards.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

// Registry collections.
const SURVEYS: &str = "surveys";
impl MongoCollection for Survey {
    const NAME: &'static str = SURVEYS;
}

const ADMINS: &str = "admins";
impl MongoCollection for Admin {
    const NAME: &'static str = ADMINS;
}
impl MongoCollection for NewAdmin {
    const NAME: &'static str = ADMINS;
}

// Tenant collections, one set per survey partition.
const QUESTIONS: &str = "questions";
impl MongoCollection for Question {
    const NAME: &'static str = QUESTIONS;
}
impl MongoCollection for NewQuestion {
    const NAME: &'static str = QUESTIONS;
}

const RAW_RESPONSES: &str = "raw_responses";
impl MongoCollection for RawResponse {
    const NAME: &'static str = RAW_RESPONSES;
}
impl MongoCollection for NewRawResponse {
    const NAME: &'static str = RAW_RESPONSES;
}

const PUBLISHED_OPINIONS: &str = "published_opinions";
impl MongoCollection for PublishedOpinion {
    const NAME: &'static str = PUBLISHED_OPINIONS;
}
impl MongoCollection for NewOpinion {
    const NAME: &'static str = PUBLISHED_OPINIONS;
}

const UPVOTES: &str = "upvotes";
impl MongoCollection for Upvote {
    const NAME: &'static str = UPVOTES;
}
impl MongoCollection for NewUpvote {
    const NAME: &'static str = UPVOTES;
}

/// All tenant collections created inside a freshly provisioned partition.
pub const TENANT_COLLECTIONS: [&str; 4] = [QUESTIONS, RAW_RESPONSES, PUBLISHED_OPINIONS, UPVOTES];

fn unique_index(keys: Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

/// The registry's uniqueness indexes. Partition names are derived from the
/// survey ID and must never collide, even across purged surveys.
fn registry_index_models() -> Vec<(&'static str, IndexModel)> {
    vec![
        (ADMINS, unique_index(doc! {"username": 1})),
        (SURVEYS, unique_index(doc! {"partition_name": 1})),
    ]
}

/// The uniqueness indexes inside every tenant partition. These back the two
/// atomic check-and-insert invariants: at most one published opinion per raw
/// response, and at most one upvote per (opinion, fingerprint) pair.
fn tenant_index_models() -> Vec<(&'static str, IndexModel)> {
    vec![
        (PUBLISHED_OPINIONS, unique_index(doc! {"raw_response_id": 1})),
        (UPVOTES, unique_index(doc! {"opinion_id": 1, "fingerprint": 1})),
    ]
}

/// Ensure that all the required indexes exist on the registry database.
///
/// This operation is idempotent.
pub async fn ensure_registry_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring registry indexes exist");
    for (collection, index) in registry_index_models() {
        db.collection::<Document>(collection)
            .create_index(index, None)
            .await?;
    }
    Ok(())
}

/// Ensure the uniqueness indexes exist inside a tenant partition.
pub async fn ensure_tenant_indexes_exist(db: &Database) -> Result<(), DbError> {
    for (collection, index) in tenant_index_models() {
        db.collection::<Document>(collection)
            .create_index(index, None)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_for<'m>(models: &'m [(&'static str, IndexModel)], collection: &str) -> &'m IndexModel {
        let (_, index) = models
            .iter()
            .find(|(name, _)| *name == collection)
            .unwrap();
        index
    }

    fn assert_unique(index: &IndexModel, keys: Document) {
        assert_eq!(index.keys, keys);
        assert_eq!(index.options.as_ref().unwrap().unique, Some(true));
    }

    #[test]
    fn tenant_invariants_are_backed_by_unique_indexes() {
        let models = tenant_index_models();
        assert_unique(
            index_for(&models, PUBLISHED_OPINIONS),
            doc! {"raw_response_id": 1},
        );
        assert_unique(
            index_for(&models, UPVOTES),
            doc! {"opinion_id": 1, "fingerprint": 1},
        );
    }

    #[test]
    fn registry_usernames_and_partition_names_are_unique() {
        let models = registry_index_models();
        assert_unique(index_for(&models, ADMINS), doc! {"username": 1});
        assert_unique(index_for(&models, SURVEYS), doc! {"partition_name": 1});
    }
}
