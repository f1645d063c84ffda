use std::collections::HashMap;

use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Group, MembershipRole, ResultEngine, Transaction, group_members, groups,
    transaction_groups, transactions, users,
};

use super::Engine;

impl Engine {
    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        user_id: Uuid,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    pub(super) async fn require_group(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
    ) -> ResultEngine<groups::Model> {
        groups::Entity::find_by_id(group_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))
    }

    pub(super) async fn membership_role(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<Option<MembershipRole>> {
        let row = group_members::Entity::find_by_id((group_id.to_string(), user_id.to_string()))
            .one(db)
            .await?;
        row.as_ref()
            .map(|m| MembershipRole::try_from(m.role.as_str()))
            .transpose()
    }

    /// Group must exist (`KeyNotFound`) and `user_id` must be a member
    /// (`Forbidden`), in that order.
    pub(super) async fn require_group_member(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<groups::Model> {
        let group = self.require_group(db, group_id).await?;
        if self.membership_role(db, group_id, user_id).await?.is_none() {
            return Err(EngineError::Forbidden(
                "not a member of this group".to_string(),
            ));
        }
        Ok(group)
    }

    /// Checks every group in `group_ids`; used before sharing a transaction.
    pub(super) async fn require_member_of_all(
        &self,
        db: &DatabaseTransaction,
        group_ids: &[Uuid],
        user_id: Uuid,
    ) -> ResultEngine<()> {
        for group_id in group_ids {
            self.require_group_member(db, *group_id, user_id).await?;
        }
        Ok(())
    }

    /// Transactions are only visible to their owner; anything else is
    /// reported as missing.
    pub(super) async fn require_owned_transaction(
        &self,
        db: &DatabaseTransaction,
        transaction_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<transactions::Model> {
        transactions::Entity::find_by_id(transaction_id.to_string())
            .filter(transactions::Column::UserId.eq(user_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))
    }

    /// Loads the groups linked to each transaction id, keyed by id.
    pub(super) async fn load_groups(
        &self,
        db: &DatabaseTransaction,
        transaction_ids: &[String],
    ) -> ResultEngine<HashMap<String, Vec<Group>>> {
        if transaction_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = transaction_groups::Entity::find()
            .filter(transaction_groups::Column::TransactionId.is_in(transaction_ids.to_vec()))
            .find_also_related(groups::Entity)
            .order_by_asc(groups::Column::Name)
            .all(db)
            .await?;

        let mut out: HashMap<String, Vec<Group>> = HashMap::new();
        for (link, group) in rows {
            let Some(group) = group else {
                continue;
            };
            out.entry(link.transaction_id)
                .or_default()
                .push(Group::try_from(group)?);
        }
        Ok(out)
    }

    /// Converts rows to domain transactions with their groups attached.
    pub(super) async fn with_groups(
        &self,
        db: &DatabaseTransaction,
        models: Vec<transactions::Model>,
    ) -> ResultEngine<Vec<Transaction>> {
        let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
        let mut groups = self.load_groups(db, &ids).await?;
        models
            .into_iter()
            .map(|model| {
                let linked = groups.remove(&model.id).unwrap_or_default();
                let mut tx = Transaction::try_from(model)?;
                tx.groups = linked;
                Ok(tx)
            })
            .collect()
    }

    /// Replaces the group links of a transaction.
    pub(super) async fn link_groups(
        &self,
        db: &DatabaseTransaction,
        transaction_id: Uuid,
        group_ids: &[Uuid],
    ) -> ResultEngine<()> {
        transaction_groups::Entity::delete_many()
            .filter(transaction_groups::Column::TransactionId.eq(transaction_id.to_string()))
            .exec(db)
            .await?;
        for group_id in group_ids {
            transaction_groups::ActiveModel {
                transaction_id: sea_orm::ActiveValue::Set(transaction_id.to_string()),
                group_id: sea_orm::ActiveValue::Set(group_id.to_string()),
            }
            .insert(db)
            .await?;
        }
        Ok(())
    }
}

/// Deduplicates ids while keeping their first-seen order.
pub(super) fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}
