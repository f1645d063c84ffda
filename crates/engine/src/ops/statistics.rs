use uuid::Uuid;

use crate::{EngineError, PeriodBucket, ResultEngine, Statistics, StatsScope, Transaction};

use super::{
    Engine,
    transactions::{ApplyTxFilters, TransactionFilter, owned_by, shared_with},
};

impl Engine {
    /// Aggregates the transactions in `scope` that match `filter`.
    ///
    /// A user scope is only available to that user; a group scope requires
    /// membership.
    pub async fn statistics(
        &self,
        actor_id: Uuid,
        scope: StatsScope,
        filter: &TransactionFilter,
        period: PeriodBucket,
    ) -> ResultEngine<Statistics> {
        let filter = filter.clone();
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let query = match scope {
                    StatsScope::User(user_id) => {
                        if user_id != actor_id {
                            return Err(EngineError::Forbidden(
                                "statistics of another user".to_string(),
                            ));
                        }
                        owned_by(user_id)
                    }
                    StatsScope::Group(group_id) => {
                        engine.require_group_member(db_tx, group_id, actor_id).await?;
                        shared_with(group_id)
                    }
                };

                let rows = query.apply_tx_filters(&filter).all(db_tx).await?;
                let transactions = rows
                    .into_iter()
                    .map(Transaction::try_from)
                    .collect::<ResultEngine<Vec<_>>>()?;
                Statistics::from_transactions(&transactions, period)
            })
        })
        .await
    }
}
