use std::sync::Arc;

use crate::{
    checkout::{CheckoutService, PgStorage},
    db::{DbPool, OrmConn},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub jwt_secret: Arc<str>,
    pub checkout: Arc<CheckoutService<PgStorage>>,
}

impl AppState {
    pub fn new(pool: DbPool, orm: OrmConn, jwt_secret: impl Into<Arc<str>>) -> Self {
        let checkout = Arc::new(CheckoutService::new(PgStorage::new(orm.clone())));
        Self {
            pool,
            orm,
            jwt_secret: jwt_secret.into(),
            checkout,
        }
    }
}
