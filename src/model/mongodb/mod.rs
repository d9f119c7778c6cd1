mod bson;
mod collection;
pub mod errors;

pub use bson::Id;
pub use collection::{
    ensure_registry_indexes_exist, ensure_tenant_indexes_exist, Coll, MongoCollection,
    TENANT_COLLECTIONS,
};
