//! Contacts service
//!
//! Business rules for contacts and their interaction history.
//! Scheduling is not done here; `RemindersService` wraps writes that
//! affect reminders.

use crate::config::{MAX_BIRTHDAY_ADVANCE_DAYS, MAX_CONTACT_NAME_LENGTH, MIN_BIRTHDAY_ADVANCE_DAYS};
use crate::database::{Contact, Interaction, InteractionKind, Repository};
use crate::error::{AppError, Result};
use chrono::{SubsecRound, Utc};
use uuid::Uuid;

/// Service for managing contacts
#[derive(Clone)]
pub struct ContactsService {
    repo: Repository,
}

impl ContactsService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Check a contact before it is stored
    pub fn validate_contact(contact: &Contact) -> Result<()> {
        let name = contact.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Contact name cannot be empty".to_string()));
        }
        if name.chars().count() > MAX_CONTACT_NAME_LENGTH {
            return Err(AppError::Validation(format!(
                "Contact name exceeds {} characters",
                MAX_CONTACT_NAME_LENGTH
            )));
        }

        let days = contact.reminders.birthday_advance_days;
        if !(MIN_BIRTHDAY_ADVANCE_DAYS..=MAX_BIRTHDAY_ADVANCE_DAYS).contains(&days) {
            return Err(AppError::Validation(format!(
                "Birthday advance days must be between {} and {}, got {}",
                MIN_BIRTHDAY_ADVANCE_DAYS, MAX_BIRTHDAY_ADVANCE_DAYS, days
            )));
        }

        if let Some(channel) = contact
            .connect_channels
            .iter()
            .find(|channel| channel.login.trim().is_empty())
        {
            return Err(AppError::Validation(format!(
                "Login for {} cannot be empty",
                channel.social_media_type.as_str()
            )));
        }

        Ok(())
    }

    /// Create or update a contact
    pub async fn save_contact(&self, contact: &Contact) -> Result<()> {
        Self::validate_contact(contact)?;

        tracing::debug!("Saving contact: {}", contact.id);
        self.repo.save_contact(contact).await?;
        tracing::info!("Contact saved successfully: {}", contact.id);

        Ok(())
    }

    pub async fn get_contact(&self, id: Uuid) -> Result<Contact> {
        self.repo.get_contact(id).await
    }

    pub async fn load_contact(&self, id: Uuid) -> Result<Option<Contact>> {
        self.repo.load_contact(id).await
    }

    pub async fn list_contacts(&self) -> Result<Vec<Contact>> {
        self.repo.list_contacts().await
    }

    /// Search contacts by name or phone, case-insensitive
    pub async fn search_contacts(&self, query: &str) -> Result<Vec<Contact>> {
        let query = query.trim().to_lowercase();
        let contacts = self.repo.list_contacts().await?;

        if query.is_empty() {
            return Ok(contacts);
        }

        Ok(contacts
            .into_iter()
            .filter(|contact| {
                contact.name.to_lowercase().contains(&query) || contact.phone.contains(&query)
            })
            .collect())
    }

    /// Delete a contact with its channels and interactions
    pub async fn delete_contact(&self, id: Uuid) -> Result<()> {
        tracing::info!("Deleting contact: {}", id);

        self.repo.delete_contact(id).await?;

        tracing::info!("Contact deleted successfully: {}", id);

        Ok(())
    }

    /// Store an interaction as is
    pub async fn add_interaction(&self, interaction: &Interaction) -> Result<()> {
        // Reject orphans with a domain error rather than a foreign key failure
        self.repo.get_contact(interaction.contact_id).await?;
        self.repo.create_interaction(interaction).await
    }

    /// Log an interaction happening now and update the contact's counters
    pub async fn record_interaction(
        &self,
        contact_id: Uuid,
        kind: InteractionKind,
        notes: impl Into<String>,
    ) -> Result<Interaction> {
        let mut interaction = Interaction::new(contact_id, kind, notes);
        interaction.date = Utc::now().trunc_subsecs(0);

        self.add_interaction(&interaction).await?;
        self.repo
            .touch_last_message(contact_id, interaction.date)
            .await?;

        tracing::info!("Recorded {} with contact {}", kind.as_str(), contact_id);

        Ok(interaction)
    }

    /// Interactions of a contact, newest first
    pub async fn list_interactions(&self, contact_id: Uuid) -> Result<Vec<Interaction>> {
        self.repo.list_interactions(contact_id).await
    }

    pub async fn update_interaction(&self, interaction: &Interaction) -> Result<()> {
        self.repo.update_interaction(interaction).await
    }

    pub async fn delete_interaction(&self, id: Uuid) -> Result<()> {
        self.repo.delete_interaction(id).await
    }
}
