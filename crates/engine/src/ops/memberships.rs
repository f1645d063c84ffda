use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Member, MembershipChange, MembershipRole, ResultEngine, User, group_members,
    users,
};

use super::Engine;

impl Engine {
    /// Adds `user_id` to the group. The actor must be a member.
    ///
    /// Adding an existing member changes nothing and reports
    /// [`MembershipChange::AlreadyMember`].
    pub async fn add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        actor_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<MembershipChange> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_group_member(db_tx, group_id, actor_id).await?;
                engine.require_user(db_tx, user_id).await?;

                if engine
                    .membership_role(db_tx, group_id, user_id)
                    .await?
                    .is_some()
                {
                    return Ok(MembershipChange::AlreadyMember);
                }

                group_members::ActiveModel {
                    group_id: ActiveValue::Set(group_id.to_string()),
                    user_id: ActiveValue::Set(user_id.to_string()),
                    role: ActiveValue::Set(MembershipRole::Member.as_str().to_string()),
                    joined_at: ActiveValue::Set(now),
                }
                .insert(db_tx)
                .await?;
                tracing::info!(%group_id, %user_id, %actor_id, "member added");
                Ok(MembershipChange::Added)
            })
        })
        .await
    }

    /// Removes `user_id` from the group. The actor must be a member and the
    /// owner can never be removed.
    pub async fn remove_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        actor_id: Uuid,
    ) -> ResultEngine<MembershipChange> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let group = engine.require_group_member(db_tx, group_id, actor_id).await?;
                engine.require_user(db_tx, user_id).await?;

                if group.owner_id == user_id.to_string() {
                    return Err(EngineError::InvalidInput(
                        "cannot remove the group owner".to_string(),
                    ));
                }

                let res = group_members::Entity::delete_by_id((
                    group_id.to_string(),
                    user_id.to_string(),
                ))
                .exec(db_tx)
                .await?;
                if res.rows_affected == 0 {
                    return Ok(MembershipChange::NotMember);
                }
                tracing::info!(%group_id, %user_id, %actor_id, "member removed");
                Ok(MembershipChange::Removed)
            })
        })
        .await
    }

    /// Lists the members of a group, oldest first. The actor must be a member.
    pub async fn group_members(&self, group_id: Uuid, actor_id: Uuid) -> ResultEngine<Vec<Member>> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_group_member(db_tx, group_id, actor_id).await?;

                let rows = group_members::Entity::find()
                    .filter(group_members::Column::GroupId.eq(group_id.to_string()))
                    .find_also_related(users::Entity)
                    .order_by_asc(group_members::Column::JoinedAt)
                    .order_by_asc(group_members::Column::UserId)
                    .all(db_tx)
                    .await?;

                let mut out = Vec::with_capacity(rows.len());
                for (membership, user) in rows {
                    let Some(user) = user else {
                        continue;
                    };
                    out.push(Member {
                        user: User::try_from(user)?,
                        role: MembershipRole::try_from(membership.role.as_str())?,
                        joined_at: membership.joined_at,
                    });
                }
                Ok(out)
            })
        })
        .await
    }
}
