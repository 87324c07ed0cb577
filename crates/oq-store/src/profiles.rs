use crate::{Store, StoreError};
use chrono::Utc;
use oq_schemas::{Dialect, PowerFlags, PowerUpdate, Profile, ProfileId, ProfileSpec};
use sqlx::Row;

const SETTINGS_ACTIVE_PROFILE_KEY: &str = "active_profile_id";

impl Store {
    pub async fn create_profile(&self, spec: ProfileSpec) -> Result<Profile, StoreError> {
        let profile = Profile {
            id: ProfileId::new(),
            name: spec.name,
            dialect: spec.dialect,
            host: spec.host,
            port: spec.port,
            database: spec.database,
            user: spec.user,
            ssl: spec.ssl,
            created_at: Utc::now(),
            power: PowerFlags::default(),
        };

        sqlx::query(
            r#"
            INSERT INTO profiles
                (id, name, dialect, host, port, database, "user", ssl, created_at,
                 allow_write, allow_dangerous, power_confirm_phrase)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(profile.id.to_string())
        .bind(&profile.name)
        .bind(profile.dialect.as_str())
        .bind(&profile.host)
        .bind(profile.port as i64)
        .bind(&profile.database)
        .bind(&profile.user)
        .bind(profile.ssl)
        .bind(crate::format_timestamp(profile.created_at))
        .bind(profile.power.allow_write)
        .bind(profile.power.allow_dangerous)
        .bind(&profile.power.confirm_phrase)
        .execute(&self.pool)
        .await?;

        Ok(profile)
    }

    pub async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        let rows = sqlx::query("SELECT * FROM profiles ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_profile).collect()
    }

    pub async fn get_profile(&self, id: ProfileId) -> Result<Profile, StoreError> {
        let row = sqlx::query("SELECT * FROM profiles WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::ProfileNotFound(id.to_string()))?;
        row_to_profile(&row)
    }

    pub async fn get_profile_by_name(&self, name: &str) -> Result<Profile, StoreError> {
        let row = sqlx::query("SELECT * FROM profiles WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::ProfileNotFound(name.to_string()))?;
        row_to_profile(&row)
    }

    pub async fn delete_profile(&self, id: ProfileId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::ProfileNotFound(id.to_string()));
        }

        let active = self.get_active_profile_id().await?;
        if active == Some(id) {
            self.clear_active_profile().await?;
        }
        Ok(())
    }

    /// Applies a POWER update and returns the updated profile. Disabling
    /// `allow_write` forces `allow_dangerous` off, per `Profile::apply_power_update`.
    pub async fn update_power(
        &self,
        id: ProfileId,
        update: PowerUpdate,
    ) -> Result<Profile, StoreError> {
        let mut profile = self.get_profile(id).await?;
        profile.apply_power_update(update);

        sqlx::query(
            r#"
            UPDATE profiles
            SET allow_write = ?, allow_dangerous = ?, power_confirm_phrase = ?
            WHERE id = ?
            "#,
        )
        .bind(profile.power.allow_write)
        .bind(profile.power.allow_dangerous)
        .bind(&profile.power.confirm_phrase)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(profile)
    }

    pub async fn set_active_profile(&self, id: ProfileId) -> Result<(), StoreError> {
        // Confirm the profile exists before pointing settings at it.
        self.get_profile(id).await?;
        self.set_setting(SETTINGS_ACTIVE_PROFILE_KEY, &id.to_string())
            .await
    }

    pub async fn clear_active_profile(&self) -> Result<(), StoreError> {
        self.delete_setting(SETTINGS_ACTIVE_PROFILE_KEY).await
    }

    pub async fn get_active_profile_id(&self) -> Result<Option<ProfileId>, StoreError> {
        let Some(raw) = self.get_setting(SETTINGS_ACTIVE_PROFILE_KEY).await? else {
            return Ok(None);
        };
        let uuid = uuid::Uuid::parse_str(&raw).map_err(|e| StoreError::CorruptRow {
            table: "settings",
            detail: e.to_string(),
        })?;
        Ok(Some(ProfileId::from(uuid)))
    }

    pub async fn get_active_profile(&self) -> Result<Profile, StoreError> {
        let id = self
            .get_active_profile_id()
            .await?
            .ok_or(StoreError::NoActiveProfile)?;
        self.get_profile(id).await
    }
}

fn row_to_profile(row: &sqlx::sqlite::SqliteRow) -> Result<Profile, StoreError> {
    let id_raw: String = row.try_get("id")?;
    let id = ProfileId::from(uuid::Uuid::parse_str(&id_raw).map_err(|e| {
        StoreError::CorruptRow {
            table: "profiles",
            detail: e.to_string(),
        }
    })?);

    let dialect_raw: String = row.try_get("dialect")?;
    let dialect = Dialect::parse(&dialect_raw).ok_or_else(|| StoreError::CorruptRow {
        table: "profiles",
        detail: format!("unknown dialect {dialect_raw}"),
    })?;

    let created_raw: String = row.try_get("created_at")?;
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_raw)
        .map_err(|e| StoreError::CorruptRow {
            table: "profiles",
            detail: e.to_string(),
        })?
        .with_timezone(&Utc);

    let port: i64 = row.try_get("port")?;

    Ok(Profile {
        id,
        name: row.try_get("name")?,
        dialect,
        host: row.try_get("host")?,
        port: port as u16,
        database: row.try_get("database")?,
        user: row.try_get("user")?,
        ssl: row.try_get("ssl")?,
        created_at,
        power: PowerFlags {
            allow_write: row.try_get("allow_write")?,
            allow_dangerous: row.try_get("allow_dangerous")?,
            confirm_phrase: row.try_get("power_confirm_phrase")?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::migrated_store;

    fn sample_spec(name: &str) -> ProfileSpec {
        ProfileSpec {
            name: name.to_string(),
            dialect: Dialect::Postgres,
            host: "localhost".to_string(),
            port: 5432,
            database: "app".to_string(),
            user: "app".to_string(),
            ssl: false,
        }
    }

    #[tokio::test]
    async fn create_and_fetch_round_trips() {
        let store = migrated_store().await;
        let created = store.create_profile(sample_spec("local")).await.unwrap();
        let fetched = store.get_profile(created.id).await.unwrap();
        assert_eq!(created, fetched);
        assert!(!fetched.power.allow_write);
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let store = migrated_store().await;
        store.create_profile(sample_spec("dup")).await.unwrap();
        let err = store.create_profile(sample_spec("dup")).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn delete_clears_active_profile() {
        let store = migrated_store().await;
        let p = store.create_profile(sample_spec("local")).await.unwrap();
        store.set_active_profile(p.id).await.unwrap();
        store.delete_profile(p.id).await.unwrap();
        assert_eq!(store.get_active_profile_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_power_persists_and_enforces_invariant() {
        let store = migrated_store().await;
        let p = store.create_profile(sample_spec("local")).await.unwrap();

        let updated = store
            .update_power(
                p.id,
                PowerUpdate {
                    allow_write: Some(true),
                    allow_dangerous: Some(true),
                    confirm_phrase: None,
                },
            )
            .await
            .unwrap();
        assert!(updated.power.allow_write && updated.power.allow_dangerous);

        let reverted = store
            .update_power(
                p.id,
                PowerUpdate {
                    allow_write: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!reverted.power.allow_write);
        assert!(!reverted.power.allow_dangerous);
    }

    #[tokio::test]
    async fn get_active_profile_without_one_set_errors() {
        let store = migrated_store().await;
        let err = store.get_active_profile().await;
        assert!(matches!(err, Err(StoreError::NoActiveProfile)));
    }
}
