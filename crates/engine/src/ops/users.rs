use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, User, hash_password, users,
    util::{normalize_login, normalize_required},
    verify_password,
};

use super::Engine;

/// Registration request.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub login: String,
    pub password: String,
}

impl Engine {
    /// Creates a user with a hashed credential.
    ///
    /// Fails with `ExistingKey` when the (normalized) login is taken.
    pub async fn register(&self, new_user: NewUser, now: DateTime<Utc>) -> ResultEngine<User> {
        let first_name = normalize_required(&new_user.first_name, "first_name")?;
        let last_name = normalize_required(&new_user.last_name, "last_name")?;
        let login = normalize_login(&new_user.login)?;
        let password_hash = hash_password(&new_user.password)?;

        self.with_tx(|_engine, db_tx| {
            Box::pin(async move {
                let taken = users::Entity::find()
                    .filter(users::Column::Login.eq(login.clone()))
                    .one(db_tx)
                    .await?;
                if taken.is_some() {
                    return Err(EngineError::ExistingKey(login));
                }

                let model = users::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4().to_string()),
                    first_name: ActiveValue::Set(first_name),
                    last_name: ActiveValue::Set(last_name),
                    login: ActiveValue::Set(login),
                    password: ActiveValue::Set(password_hash),
                    created_at: ActiveValue::Set(now),
                }
                .insert(db_tx)
                .await?;
                let user = User::try_from(model)?;
                tracing::info!(user_id = %user.id, "user registered");
                Ok(user)
            })
        })
        .await
    }

    /// Verifies a login/password pair.
    ///
    /// Unknown logins and wrong passwords are indistinguishable to callers.
    pub async fn authenticate(&self, login: &str, password: &str) -> ResultEngine<User> {
        let login = normalize_login(login)
            .map_err(|_| EngineError::Unauthorized("invalid login or password".to_string()))?;
        let password = password.to_string();

        self.with_tx(|_engine, db_tx| {
            Box::pin(async move {
                let model = users::Entity::find()
                    .filter(users::Column::Login.eq(login))
                    .one(db_tx)
                    .await?;
                match model {
                    Some(model) if verify_password(&password, &model.password) => {
                        User::try_from(model)
                    }
                    _ => Err(EngineError::Unauthorized(
                        "invalid login or password".to_string(),
                    )),
                }
            })
        })
        .await
    }

    /// Return the user by id.
    pub async fn user(&self, user_id: Uuid) -> ResultEngine<User> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let model = engine.require_user(db_tx, user_id).await?;
                User::try_from(model)
            })
        })
        .await
    }

    /// Replaces the credential after checking the current one.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> ResultEngine<()> {
        let current_password = current_password.to_string();
        let new_hash = hash_password(new_password)?;

        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let model = engine.require_user(db_tx, user_id).await?;
                if !verify_password(&current_password, &model.password) {
                    return Err(EngineError::Unauthorized(
                        "current password is incorrect".to_string(),
                    ));
                }
                let mut active: users::ActiveModel = model.into();
                active.password = ActiveValue::Set(new_hash);
                active.update(db_tx).await?;
                tracing::info!(%user_id, "password changed");
                Ok(())
            })
        })
        .await
    }
}
