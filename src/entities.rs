//! Read-only access to the properties and contacts owned by the wider
//! back-office.

use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;

use crate::db::{with_conn, PgPool};
use crate::models::{Contact, Property};
use crate::schema::{contacts, properties};

#[async_trait]
pub trait EntityLookup: Send + Sync + 'static {
    async fn property(&self, id: i32) -> Result<Option<Property>>;
    async fn contact(&self, id: i32) -> Result<Option<Contact>>;
    /// Ids of every property, oldest first.
    async fn property_ids(&self) -> Result<Vec<i32>>;
}

pub struct PgEntityLookup {
    pool: PgPool,
}

impl PgEntityLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityLookup for PgEntityLookup {
    async fn property(&self, id: i32) -> Result<Option<Property>> {
        with_conn(&self.pool, move |conn| {
            Ok(properties::table.find(id).first(conn).optional()?)
        })
        .await
    }

    async fn contact(&self, id: i32) -> Result<Option<Contact>> {
        with_conn(&self.pool, move |conn| {
            Ok(contacts::table.find(id).first(conn).optional()?)
        })
        .await
    }

    async fn property_ids(&self) -> Result<Vec<i32>> {
        with_conn(&self.pool, |conn| {
            Ok(properties::table
                .select(properties::id)
                .order(properties::id.asc())
                .load(conn)?)
        })
        .await
    }
}
