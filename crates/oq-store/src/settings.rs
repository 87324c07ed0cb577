use crate::{Store, StoreError};
use sqlx::Row;

impl Store {
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match row {
            Some(row) => Some(row.try_get("value")?),
            None => None,
        })
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_setting(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::migrated_store;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = migrated_store().await;
        store.set_setting("theme", "dark").await.unwrap();
        assert_eq!(
            store.get_setting("theme").await.unwrap(),
            Some("dark".to_string())
        );
    }

    #[tokio::test]
    async fn set_overwrites_existing_value() {
        let store = migrated_store().await;
        store.set_setting("theme", "dark").await.unwrap();
        store.set_setting("theme", "light").await.unwrap();
        assert_eq!(
            store.get_setting("theme").await.unwrap(),
            Some("light".to_string())
        );
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let store = migrated_store().await;
        assert_eq!(store.get_setting("missing").await.unwrap(), None);
    }
}
