use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;

pub(crate) async fn ensure_superuser(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_superuser_password.is_empty() {
        tracing::warn!("FIRST_SUPERUSER_PASSWORD not configured; skipping superuser creation");
        return Ok(());
    }

    let username = &admin.first_superuser_username;
    let user = repositories::users::find_by_username(state.db(), username).await?;
    let now = primitive_now_utc();

    if let Some(user) = user {
        let verified =
            security::verify_password(&admin.first_superuser_password, &user.hashed_password)
                .unwrap_or(false);
        let needs_update = !verified || !user.is_admin() || !user.is_active;

        if !needs_update {
            tracing::info!(username = %username, "Default superuser already up to date");
            return Ok(());
        }

        let hashed_password = if verified {
            None
        } else {
            Some(security::hash_password(&admin.first_superuser_password)?)
        };

        repositories::users::update(
            state.db(),
            user.id,
            repositories::users::UpdateUser {
                username: None,
                email: None,
                role: Some(UserRole::Admin),
                is_active: Some(true),
                hashed_password,
                updated_at: now,
            },
        )
        .await?;

        tracing::info!(user_id = user.id, username = %username, "Updated default superuser");
        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.first_superuser_password)?;
    let created = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            username,
            email: &admin.first_superuser_email,
            hashed_password,
            role: UserRole::Admin,
            is_active: true,
            created_at: now,
        },
    )
    .await?;

    tracing::info!(user_id = created.id, username = %username, "Created default superuser");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn creates_then_repairs_superuser() {
        let Some(ctx) = test_support::setup_test_context().await else {
            return;
        };
        std::env::set_var("FIRST_SUPERUSER_USERNAME", "root");
        std::env::set_var("FIRST_SUPERUSER_EMAIL", "root@test.com");
        std::env::set_var("FIRST_SUPERUSER_PASSWORD", "root-password");
        let settings = crate::core::config::Settings::load().expect("settings");
        let state = AppState::new(settings, ctx.state.db().clone(), ctx.state.storage().clone());

        ensure_superuser(&state).await.expect("create superuser");
        let user = repositories::users::find_by_username(state.db(), "root")
            .await
            .expect("query")
            .expect("superuser exists");
        assert_eq!(user.role, UserRole::Admin);
        assert!(user.is_active);

        sqlx::query("UPDATE users SET role = 'student', is_active = FALSE WHERE id = $1")
            .bind(user.id)
            .execute(state.db())
            .await
            .expect("demote");

        ensure_superuser(&state).await.expect("repair superuser");
        let repaired = repositories::users::find_by_id(state.db(), user.id)
            .await
            .expect("query")
            .expect("superuser exists");
        assert_eq!(repaired.role, UserRole::Admin);
        assert!(repaired.is_active);
        assert!(security::verify_password("root-password", &repaired.hashed_password)
            .expect("verify"));

        std::env::remove_var("FIRST_SUPERUSER_PASSWORD");
    }
}
