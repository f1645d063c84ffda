use std::{future::Future, pin::Pin};

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::ResultEngine;

mod access;
mod groups;
mod memberships;
mod recurring;
mod reminders;
mod statistics;
mod transactions;
mod users;

pub use recurring::RecurringReport;
pub use transactions::{NewTransaction, Page, PageRequest, TransactionFilter, TransactionUpdate};
pub use users::NewUser;

/// Future returned by a [`Engine::with_tx`] body.
pub(crate) type TxFuture<'a, T> = Pin<Box<dyn Future<Output = ResultEngine<T>> + Send + 'a>>;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Run `body` inside a DB transaction, committing on success and rolling
    /// back on error.
    ///
    /// Every query issued by `body` must go through the given transaction.
    pub(crate) async fn with_tx<T, F>(&self, body: F) -> ResultEngine<T>
    where
        T: Send,
        F: for<'a> FnOnce(&'a Engine, &'a DatabaseTransaction) -> TxFuture<'a, T> + Send,
    {
        let db_tx = self.database.begin().await?;
        match body(self, &db_tx).await {
            Ok(value) => {
                db_tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = db_tx.rollback().await {
                    tracing::warn!("rollback failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
