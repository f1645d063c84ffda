use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, QuerySelect, QueryTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Group, MembershipRole, ResultEngine, group_members, groups, transaction_groups,
    util::normalize_required,
};

use super::Engine;

impl Engine {
    /// Creates a group owned by `owner_id`, who is enrolled as its first
    /// member in the same DB transaction.
    pub async fn create_group(
        &self,
        name: &str,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<Group> {
        let name = normalize_required(name, "group name")?;
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_user(db_tx, owner_id).await?;

                let group_id = Uuid::new_v4();
                let model = groups::ActiveModel {
                    id: ActiveValue::Set(group_id.to_string()),
                    name: ActiveValue::Set(name),
                    owner_id: ActiveValue::Set(owner_id.to_string()),
                    created_at: ActiveValue::Set(now),
                }
                .insert(db_tx)
                .await?;

                group_members::ActiveModel {
                    group_id: ActiveValue::Set(group_id.to_string()),
                    user_id: ActiveValue::Set(owner_id.to_string()),
                    role: ActiveValue::Set(MembershipRole::Owner.as_str().to_string()),
                    joined_at: ActiveValue::Set(now),
                }
                .insert(db_tx)
                .await?;

                tracing::info!(%group_id, %owner_id, "group created");
                Group::try_from(model)
            })
        })
        .await
    }

    /// Every group `user_id` is a member of, ordered by name.
    pub async fn groups_for_user(&self, user_id: Uuid) -> ResultEngine<Vec<Group>> {
        self.with_tx(|_engine, db_tx| {
            Box::pin(async move {
                let rows = groups::Entity::find()
                    .filter(
                        groups::Column::Id.in_subquery(
                            group_members::Entity::find()
                                .select_only()
                                .column(group_members::Column::GroupId)
                                .filter(group_members::Column::UserId.eq(user_id.to_string()))
                                .into_query(),
                        ),
                    )
                    .order_by_asc(groups::Column::Name)
                    .order_by_asc(groups::Column::Id)
                    .all(db_tx)
                    .await?;
                rows.into_iter().map(Group::try_from).collect()
            })
        })
        .await
    }

    /// Return the group; the actor must be a member.
    pub async fn group(&self, group_id: Uuid, actor_id: Uuid) -> ResultEngine<Group> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let model = engine.require_group_member(db_tx, group_id, actor_id).await?;
                Group::try_from(model)
            })
        })
        .await
    }

    /// Membership test. A missing group is `KeyNotFound`.
    pub async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> ResultEngine<bool> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_group(db_tx, group_id).await?;
                Ok(engine
                    .membership_role(db_tx, group_id, user_id)
                    .await?
                    .is_some())
            })
        })
        .await
    }

    /// `KeyNotFound` for a missing group, `Forbidden` for a non-member.
    pub async fn authorize_group_action(&self, group_id: Uuid, user_id: Uuid) -> ResultEngine<()> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_group_member(db_tx, group_id, user_id).await?;
                Ok(())
            })
        })
        .await
    }

    pub async fn rename_group(
        &self,
        group_id: Uuid,
        name: &str,
        actor_id: Uuid,
    ) -> ResultEngine<Group> {
        let name = normalize_required(name, "group name")?;
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let model = engine.require_group_member(db_tx, group_id, actor_id).await?;
                let mut active: groups::ActiveModel = model.into();
                active.name = ActiveValue::Set(name);
                let model = active.update(db_tx).await?;
                Group::try_from(model)
            })
        })
        .await
    }

    /// Deletes the group with its memberships and transaction links.
    ///
    /// The shared transactions themselves are kept.
    pub async fn delete_group(&self, group_id: Uuid, actor_id: Uuid) -> ResultEngine<()> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_group_member(db_tx, group_id, actor_id).await?;

                transaction_groups::Entity::delete_many()
                    .filter(transaction_groups::Column::GroupId.eq(group_id.to_string()))
                    .exec(db_tx)
                    .await?;
                group_members::Entity::delete_many()
                    .filter(group_members::Column::GroupId.eq(group_id.to_string()))
                    .exec(db_tx)
                    .await?;
                groups::Entity::delete_by_id(group_id.to_string())
                    .exec(db_tx)
                    .await?;

                tracing::info!(%group_id, %actor_id, "group deleted");
                Ok(())
            })
        })
        .await
    }
}
