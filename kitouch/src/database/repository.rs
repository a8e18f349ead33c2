//! Repository layer for database operations
//!
//! This module provides CRUD operations for contacts, their connect
//! channels and interactions. Multi-row writes use transactions.

use super::models::*;
use crate::config::LEGACY_SENTINEL_BIRTH_YEAR;
use crate::error::{AppError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(FromRow)]
struct ContactRow {
    id: String,
    name: String,
    contact_type: String,
    custom_contact_type: String,
    image_name: String,
    phone: String,
    last_message: Option<DateTime<Utc>>,
    count_messages: i64,
    system_contact_id: Option<String>,
    birthday_month: Option<i64>,
    birthday_day: Option<i64>,
    birthday_year: Option<i64>,
    birthday_reminder: bool,
    birthday_advance_reminder: bool,
    birthday_advance_days: i64,
    keep_in_touch: bool,
    keep_in_touch_anchor: NaiveDateTime,
    keep_in_touch_recurrence: String,
}

impl ContactRow {
    fn into_contact(self, connect_channels: Vec<ConnectChannel>) -> Result<Contact> {
        let birthday = match (self.birthday_month, self.birthday_day) {
            (Some(month), Some(day)) => {
                let year = match self.birthday_year {
                    Some(y) => Some(
                        i32::try_from(y)
                            .map_err(|_| AppError::InvalidData(format!("birthday_year {}", y)))?,
                    ),
                    None => None,
                };
                let year = year.filter(|y| *y != LEGACY_SENTINEL_BIRTH_YEAR);
                Some(
                    BirthdayDate::new(
                        to_u32(month, "birthday_month")?,
                        to_u32(day, "birthday_day")?,
                        year,
                    )
                    .map_err(|e| AppError::InvalidData(e.to_string()))?,
                )
            }
            _ => None,
        };

        Ok(Contact {
            id: parse_uuid(&self.id)?,
            name: self.name,
            contact_type: self.contact_type.parse().map_err(AppError::InvalidData)?,
            custom_contact_type: self.custom_contact_type,
            image_name: self.image_name,
            phone: self.phone,
            last_message: self.last_message,
            count_messages: to_u32(self.count_messages, "count_messages")?,
            system_contact_id: self.system_contact_id,
            reminders: ReminderConfig {
                birthday,
                birthday_reminder_enabled: self.birthday_reminder,
                birthday_advance_reminder_enabled: self.birthday_advance_reminder,
                birthday_advance_days: to_u32(self.birthday_advance_days, "birthday_advance_days")?,
                keep_in_touch_enabled: self.keep_in_touch,
                keep_in_touch_anchor: self.keep_in_touch_anchor,
                keep_in_touch_recurrence: self
                    .keep_in_touch_recurrence
                    .parse()
                    .map_err(AppError::InvalidData)?,
            },
            connect_channels,
        })
    }
}

#[derive(FromRow)]
struct ConnectChannelRow {
    id: String,
    contact_id: String,
    social_media_type: String,
    login: String,
}

impl ConnectChannelRow {
    fn into_channel(self) -> Result<ConnectChannel> {
        Ok(ConnectChannel {
            id: parse_uuid(&self.id)?,
            social_media_type: self.social_media_type.parse().map_err(AppError::InvalidData)?,
            login: self.login,
        })
    }
}

#[derive(FromRow)]
struct InteractionRow {
    id: String,
    contact_id: String,
    date: DateTime<Utc>,
    notes: String,
    kind: String,
}

impl InteractionRow {
    fn into_interaction(self) -> Result<Interaction> {
        Ok(Interaction {
            id: parse_uuid(&self.id)?,
            contact_id: parse_uuid(&self.contact_id)?,
            date: self.date,
            notes: self.notes,
            kind: self.kind.parse().map_err(AppError::InvalidData)?,
        })
    }
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| AppError::InvalidData(format!("id {}: {}", value, e)))
}

fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| AppError::InvalidData(format!("{} out of range: {}", column, value)))
}

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or update a contact together with its connect channels
    pub async fn save_contact(&self, contact: &Contact) -> Result<()> {
        let now = Utc::now();
        let id = contact.id.to_string();
        let config = &contact.reminders;
        let birthday = config.birthday.as_ref();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO contacts (
                id, name, contact_type, custom_contact_type, image_name, phone,
                last_message, count_messages, system_contact_id,
                birthday_month, birthday_day, birthday_year,
                birthday_reminder, birthday_advance_reminder, birthday_advance_days,
                keep_in_touch, keep_in_touch_anchor, keep_in_touch_recurrence,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                contact_type = excluded.contact_type,
                custom_contact_type = excluded.custom_contact_type,
                image_name = excluded.image_name,
                phone = excluded.phone,
                last_message = excluded.last_message,
                count_messages = excluded.count_messages,
                system_contact_id = excluded.system_contact_id,
                birthday_month = excluded.birthday_month,
                birthday_day = excluded.birthday_day,
                birthday_year = excluded.birthday_year,
                birthday_reminder = excluded.birthday_reminder,
                birthday_advance_reminder = excluded.birthday_advance_reminder,
                birthday_advance_days = excluded.birthday_advance_days,
                keep_in_touch = excluded.keep_in_touch,
                keep_in_touch_anchor = excluded.keep_in_touch_anchor,
                keep_in_touch_recurrence = excluded.keep_in_touch_recurrence,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&id)
        .bind(&contact.name)
        .bind(contact.contact_type.as_str())
        .bind(&contact.custom_contact_type)
        .bind(&contact.image_name)
        .bind(&contact.phone)
        .bind(contact.last_message)
        .bind(i64::from(contact.count_messages))
        .bind(contact.system_contact_id.as_deref())
        .bind(birthday.map(|b| i64::from(b.month())))
        .bind(birthday.map(|b| i64::from(b.day())))
        .bind(birthday.and_then(|b| b.year()).map(i64::from))
        .bind(config.birthday_reminder_enabled)
        .bind(config.birthday_advance_reminder_enabled)
        .bind(i64::from(config.birthday_advance_days))
        .bind(config.keep_in_touch_enabled)
        .bind(config.keep_in_touch_anchor)
        .bind(config.keep_in_touch_recurrence.as_str())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM connect_channels WHERE contact_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        for channel in &contact.connect_channels {
            sqlx::query(
                r#"
                INSERT INTO connect_channels (id, contact_id, social_media_type, login)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(channel.id.to_string())
            .bind(&id)
            .bind(channel.social_media_type.as_str())
            .bind(&channel.login)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            "Saved contact: {} ({} channels)",
            id,
            contact.connect_channels.len()
        );
        Ok(())
    }

    /// Load a contact by ID, `None` when it does not exist
    pub async fn load_contact(&self, id: Uuid) -> Result<Option<Contact>> {
        let id = id.to_string();

        let row = sqlx::query_as::<_, ContactRow>("SELECT * FROM contacts WHERE id = ?")
            .bind(&id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let channels = sqlx::query_as::<_, ConnectChannelRow>(
            "SELECT * FROM connect_channels WHERE contact_id = ? ORDER BY social_media_type, login",
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(ConnectChannelRow::into_channel)
        .collect::<Result<Vec<_>>>()?;

        row.into_contact(channels).map(Some)
    }

    /// Get a contact by ID
    pub async fn get_contact(&self, id: Uuid) -> Result<Contact> {
        self.load_contact(id)
            .await?
            .ok_or_else(|| AppError::ContactNotFound(id.to_string()))
    }

    /// List all contacts ordered by name
    pub async fn list_contacts(&self) -> Result<Vec<Contact>> {
        let rows = sqlx::query_as::<_, ContactRow>(
            "SELECT * FROM contacts ORDER BY name COLLATE NOCASE ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut channels_by_contact: HashMap<String, Vec<ConnectChannel>> = HashMap::new();
        let channel_rows = sqlx::query_as::<_, ConnectChannelRow>(
            "SELECT * FROM connect_channels ORDER BY social_media_type, login",
        )
        .fetch_all(&self.pool)
        .await?;
        for row in channel_rows {
            let contact_id = row.contact_id.clone();
            channels_by_contact
                .entry(contact_id)
                .or_default()
                .push(row.into_channel()?);
        }

        rows.into_iter()
            .map(|row| {
                let channels = channels_by_contact.remove(&row.id).unwrap_or_default();
                row.into_contact(channels)
            })
            .collect()
    }

    /// Delete a contact with its channels and interactions
    pub async fn delete_contact(&self, id: Uuid) -> Result<()> {
        let id = id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM connect_channels WHERE contact_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM interactions WHERE contact_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        let rows = sqlx::query("DELETE FROM contacts WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::ContactNotFound(id));
        }

        tx.commit().await?;

        tracing::debug!("Deleted contact: {}", id);
        Ok(())
    }

    /// Bump the message counter, keeping the most recent interaction time
    pub async fn touch_last_message(&self, contact_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let rows = sqlx::query(
            r#"
            UPDATE contacts
            SET last_message = CASE
                    WHEN last_message IS NULL OR last_message < ? THEN ?
                    ELSE last_message
                END,
                count_messages = count_messages + 1,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(at)
        .bind(at)
        .bind(Utc::now())
        .bind(contact_id.to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::ContactNotFound(contact_id.to_string()));
        }

        Ok(())
    }

    /// Create an interaction
    pub async fn create_interaction(&self, interaction: &Interaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO interactions (id, contact_id, date, notes, kind)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(interaction.id.to_string())
        .bind(interaction.contact_id.to_string())
        .bind(interaction.date)
        .bind(&interaction.notes)
        .bind(interaction.kind.as_str())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            "Created interaction: {} for contact: {}",
            interaction.id,
            interaction.contact_id
        );
        Ok(())
    }

    /// List interactions for a contact, newest first
    pub async fn list_interactions(&self, contact_id: Uuid) -> Result<Vec<Interaction>> {
        sqlx::query_as::<_, InteractionRow>(
            r#"
            SELECT * FROM interactions WHERE contact_id = ? ORDER BY date DESC
            "#,
        )
        .bind(contact_id.to_string())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(InteractionRow::into_interaction)
        .collect()
    }

    /// Update an interaction's date, notes, kind and owner
    pub async fn update_interaction(&self, interaction: &Interaction) -> Result<()> {
        let rows = sqlx::query(
            r#"
            UPDATE interactions SET contact_id = ?, date = ?, notes = ?, kind = ? WHERE id = ?
            "#,
        )
        .bind(interaction.contact_id.to_string())
        .bind(interaction.date)
        .bind(&interaction.notes)
        .bind(interaction.kind.as_str())
        .bind(interaction.id.to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::InteractionNotFound(interaction.id.to_string()));
        }

        tracing::debug!("Updated interaction: {}", interaction.id);
        Ok(())
    }

    /// Delete an interaction
    pub async fn delete_interaction(&self, id: Uuid) -> Result<()> {
        let rows = sqlx::query("DELETE FROM interactions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::InteractionNotFound(id.to_string()));
        }

        tracing::debug!("Deleted interaction: {}", id);
        Ok(())
    }

    /// Get/set small key-value state
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Set setting: {} = {}", key, value);
        Ok(())
    }

    pub async fn remove_setting(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Removed setting: {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::initialize_database;
    use chrono::{NaiveDate, TimeZone};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_repo() -> Repository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        Repository::new(pool)
    }

    fn anchor() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn sample_contact() -> Contact {
        let mut contact = Contact::new("Anna");
        contact.contact_type = ContactType::Friend;
        contact.image_name = "🙂".to_string();
        contact.phone = "+7 900 000 00 00".to_string();
        contact.reminders = ReminderConfig {
            birthday: Some(BirthdayDate::new(3, 10, Some(2000)).unwrap()),
            birthday_reminder_enabled: true,
            birthday_advance_reminder_enabled: true,
            birthday_advance_days: 3,
            keep_in_touch_enabled: true,
            keep_in_touch_anchor: anchor(),
            keep_in_touch_recurrence: RecurrenceKind::HalfYearly,
        };
        contact.connect_channels = vec![
            ConnectChannel::new(SocialMediaType::Instagram, "anna.ig"),
            ConnectChannel::new(SocialMediaType::Email, "anna@example.com"),
        ];
        contact
    }

    #[tokio::test]
    async fn test_save_and_load_contact() {
        let repo = create_test_repo().await;
        let contact = sample_contact();

        repo.save_contact(&contact).await.unwrap();

        let loaded = repo.load_contact(contact.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Anna");
        assert_eq!(loaded.contact_type, ContactType::Friend);
        assert_eq!(loaded.reminders, contact.reminders);
        assert_eq!(loaded.connect_channels.len(), 2);
    }

    #[tokio::test]
    async fn test_load_missing_contact_is_none() {
        let repo = create_test_repo().await;

        assert!(repo.load_contact(Uuid::new_v4()).await.unwrap().is_none());
        assert!(matches!(
            repo.get_contact(Uuid::new_v4()).await,
            Err(AppError::ContactNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_save_replaces_channels_and_config() {
        let repo = create_test_repo().await;
        let mut contact = sample_contact();
        repo.save_contact(&contact).await.unwrap();

        contact.connect_channels = vec![ConnectChannel::new(SocialMediaType::Teams, "anna")];
        contact.reminders.birthday_reminder_enabled = false;
        contact.reminders.birthday = None;
        repo.save_contact(&contact).await.unwrap();

        let loaded = repo.get_contact(contact.id).await.unwrap();
        assert_eq!(loaded.connect_channels.len(), 1);
        assert_eq!(loaded.connect_channels[0].social_media_type, SocialMediaType::Teams);
        assert!(!loaded.reminders.birthday_reminder_enabled);
        assert!(loaded.reminders.birthday.is_none());

        let contacts = repo.list_contacts().await.unwrap();
        assert_eq!(contacts.len(), 1);
    }

    #[tokio::test]
    async fn test_legacy_sentinel_year_row_loads_without_year() {
        let repo = create_test_repo().await;
        let contact = sample_contact();
        repo.save_contact(&contact).await.unwrap();

        sqlx::query("UPDATE contacts SET birthday_year = 1 WHERE id = ?")
            .bind(contact.id.to_string())
            .execute(&repo.pool)
            .await
            .unwrap();

        let loaded = repo.get_contact(contact.id).await.unwrap();
        let birthday = loaded.reminders.birthday.unwrap();
        assert_eq!(birthday.year(), None);
        assert_eq!((birthday.month(), birthday.day()), (3, 10));
    }

    #[tokio::test]
    async fn test_list_contacts_sorted_by_name() {
        let repo = create_test_repo().await;

        for name in ["zoe", "Boris", "anna"] {
            repo.save_contact(&Contact::new(name)).await.unwrap();
        }

        let names: Vec<String> = repo
            .list_contacts()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["anna", "Boris", "zoe"]);
    }

    #[tokio::test]
    async fn test_delete_contact_removes_children() {
        let repo = create_test_repo().await;
        let contact = sample_contact();
        repo.save_contact(&contact).await.unwrap();
        repo.create_interaction(&Interaction::new(contact.id, InteractionKind::Call, "hi"))
            .await
            .unwrap();

        repo.delete_contact(contact.id).await.unwrap();

        assert!(repo.load_contact(contact.id).await.unwrap().is_none());
        assert!(repo.list_interactions(contact.id).await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_contact(contact.id).await,
            Err(AppError::ContactNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_interactions() {
        let repo = create_test_repo().await;
        let contact = sample_contact();
        repo.save_contact(&contact).await.unwrap();

        let mut older = Interaction::new(contact.id, InteractionKind::Meeting, "coffee");
        older.date = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let mut newer = Interaction::new(contact.id, InteractionKind::Message, "texted");
        newer.date = Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap();

        repo.create_interaction(&older).await.unwrap();
        repo.create_interaction(&newer).await.unwrap();

        let listed = repo.list_interactions(contact.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);

        older.notes = "long coffee".to_string();
        repo.update_interaction(&older).await.unwrap();
        let listed = repo.list_interactions(contact.id).await.unwrap();
        assert_eq!(listed[1].notes, "long coffee");

        repo.delete_interaction(newer.id).await.unwrap();
        assert_eq!(repo.list_interactions(contact.id).await.unwrap().len(), 1);
        assert!(matches!(
            repo.delete_interaction(newer.id).await,
            Err(AppError::InteractionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_touch_last_message() {
        let repo = create_test_repo().await;
        let contact = sample_contact();
        repo.save_contact(&contact).await.unwrap();

        let at = Utc.with_ymd_and_hms(2025, 3, 3, 8, 30, 0).unwrap();
        repo.touch_last_message(contact.id, at).await.unwrap();

        let loaded = repo.get_contact(contact.id).await.unwrap();
        assert_eq!(loaded.last_message, Some(at));
        assert_eq!(loaded.count_messages, 1);

        // Backdated interactions count but do not move the timestamp back
        let earlier = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        repo.touch_last_message(contact.id, earlier).await.unwrap();

        let loaded = repo.get_contact(contact.id).await.unwrap();
        assert_eq!(loaded.last_message, Some(at));
        assert_eq!(loaded.count_messages, 2);
    }

    #[tokio::test]
    async fn test_settings() {
        let repo = create_test_repo().await;

        repo.set_setting("pending_contact_id", "abc").await.unwrap();
        assert_eq!(
            repo.get_setting("pending_contact_id").await.unwrap(),
            Some("abc".to_string())
        );

        repo.set_setting("pending_contact_id", "def").await.unwrap();
        assert_eq!(
            repo.get_setting("pending_contact_id").await.unwrap(),
            Some("def".to_string())
        );

        repo.remove_setting("pending_contact_id").await.unwrap();
        assert_eq!(repo.get_setting("pending_contact_id").await.unwrap(), None);
    }
}
