//! Credential repository for database operations
//!
//! This module provides the CredentialRepository struct which encapsulates
//! SeaORM operations for the dealer_credentials table. Secrets are
//! encrypted on the way in and only decrypted into transient
//! [`DealerApiCredentials`] values that never leave the sync engine.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::crypto::{CryptoKey, decrypt_secret, encrypt_secret};
use crate::easycars::{DealerApiCredentials, Environment};
use crate::models::dealer_credential::{self, Entity as DealerCredential};

/// Plaintext input for creating or replacing a dealership credential.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub account_number: String,
    pub account_secret: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub environment: Environment,
    pub yard_code: Option<String>,
    pub is_active: bool,
}

/// Repository for dealer credential database operations
#[derive(Debug, Clone)]
pub struct CredentialRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
    /// Crypto key for secret encryption
    pub crypto_key: CryptoKey,
}

impl CredentialRepository {
    /// Creates a new CredentialRepository instance
    pub fn new(db: Arc<DatabaseConnection>, crypto_key: CryptoKey) -> Self {
        Self { db, crypto_key }
    }

    /// Creates or replaces the single credential for a dealership.
    ///
    /// A dealership has at most one credential row; a second upsert
    /// overwrites the secrets in place rather than inserting a sibling.
    pub async fn upsert(
        &self,
        dealership_id: Uuid,
        input: NewCredential,
    ) -> Result<dealer_credential::Model> {
        let environment = input.environment.as_str();
        let account_number_ciphertext = encrypt_secret(
            &self.crypto_key,
            &dealership_id,
            environment,
            &input.account_number,
        )?;
        let account_secret_ciphertext = encrypt_secret(
            &self.crypto_key,
            &dealership_id,
            environment,
            &input.account_secret,
        )?;
        let client_id_ciphertext = input
            .client_id
            .as_deref()
            .map(|v| encrypt_secret(&self.crypto_key, &dealership_id, environment, v))
            .transpose()?;
        let client_secret_ciphertext = input
            .client_secret
            .as_deref()
            .map(|v| encrypt_secret(&self.crypto_key, &dealership_id, environment, v))
            .transpose()?;

        let now = Utc::now().fixed_offset();
        let existing = DealerCredential::find()
            .filter(dealer_credential::Column::DealershipId.eq(dealership_id))
            .one(&*self.db)
            .await?;

        let model = match existing {
            Some(current) => {
                let mut active: dealer_credential::ActiveModel = current.into();
                active.account_number_ciphertext = Set(account_number_ciphertext);
                active.account_secret_ciphertext = Set(account_secret_ciphertext);
                active.client_id_ciphertext = Set(client_id_ciphertext);
                active.client_secret_ciphertext = Set(client_secret_ciphertext);
                active.environment = Set(environment.to_string());
                active.yard_code = Set(input.yard_code);
                active.is_active = Set(input.is_active);
                active.deleted_at = Set(None);
                active.updated_at = Set(now);
                active.update(&*self.db).await?
            }
            None => {
                let active = dealer_credential::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    dealership_id: Set(dealership_id),
                    account_number_ciphertext: Set(account_number_ciphertext),
                    account_secret_ciphertext: Set(account_secret_ciphertext),
                    client_id_ciphertext: Set(client_id_ciphertext),
                    client_secret_ciphertext: Set(client_secret_ciphertext),
                    environment: Set(environment.to_string()),
                    yard_code: Set(input.yard_code),
                    is_active: Set(input.is_active),
                    deleted_at: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                active.insert(&*self.db).await?
            }
        };

        Ok(model)
    }

    /// Finds the active credential for a dealership, ignoring soft-deleted
    /// and deactivated rows.
    pub async fn find_active(
        &self,
        dealership_id: &Uuid,
    ) -> Result<Option<dealer_credential::Model>> {
        Ok(DealerCredential::find()
            .filter(dealer_credential::Column::DealershipId.eq(*dealership_id))
            .filter(dealer_credential::Column::IsActive.eq(true))
            .filter(dealer_credential::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?)
    }

    /// Finds the credential row for a dealership regardless of state.
    pub async fn find_by_dealership(
        &self,
        dealership_id: &Uuid,
    ) -> Result<Option<dealer_credential::Model>> {
        Ok(DealerCredential::find()
            .filter(dealer_credential::Column::DealershipId.eq(*dealership_id))
            .filter(dealer_credential::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?)
    }

    /// Lists all active credentials, for the scheduler's tick.
    pub async fn list_active(&self) -> Result<Vec<dealer_credential::Model>> {
        Ok(DealerCredential::find()
            .filter(dealer_credential::Column::IsActive.eq(true))
            .filter(dealer_credential::Column::DeletedAt.is_null())
            .all(&*self.db)
            .await?)
    }

    /// Decrypts a credential row into plaintext API credentials.
    pub fn decrypt(&self, model: &dealer_credential::Model) -> Result<DealerApiCredentials> {
        let dealership_id = model.dealership_id;
        let environment = model.environment.as_str();

        let account_number = decrypt_secret(
            &self.crypto_key,
            &dealership_id,
            environment,
            &model.account_number_ciphertext,
        )
        .map_err(|e| anyhow!("account number decryption failed: {}", e))?;
        let account_secret = decrypt_secret(
            &self.crypto_key,
            &dealership_id,
            environment,
            &model.account_secret_ciphertext,
        )
        .map_err(|e| anyhow!("account secret decryption failed: {}", e))?;
        let client_id = model
            .client_id_ciphertext
            .as_deref()
            .map(|c| decrypt_secret(&self.crypto_key, &dealership_id, environment, c))
            .transpose()
            .map_err(|e| anyhow!("client id decryption failed: {}", e))?;
        let client_secret = model
            .client_secret_ciphertext
            .as_deref()
            .map(|c| decrypt_secret(&self.crypto_key, &dealership_id, environment, c))
            .transpose()
            .map_err(|e| anyhow!("client secret decryption failed: {}", e))?;

        Ok(DealerApiCredentials {
            dealership_id,
            account_number,
            account_secret,
            client_id,
            client_secret,
            environment: Environment::from_db(environment),
            yard_code: model.yard_code.clone(),
        })
    }

    /// Toggles whether scheduled syncs run for a dealership.
    pub async fn set_active(
        &self,
        dealership_id: &Uuid,
        is_active: bool,
    ) -> Result<Option<dealer_credential::Model>> {
        let Some(current) = self.find_by_dealership(dealership_id).await? else {
            return Ok(None);
        };
        let mut active: dealer_credential::ActiveModel = current.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now().fixed_offset());
        Ok(Some(active.update(&*self.db).await?))
    }

    /// Soft-deletes the credential for a dealership. The ciphertext stays
    /// in place for audit but the credential stops resolving.
    pub async fn soft_delete(&self, dealership_id: &Uuid) -> Result<bool> {
        let Some(current) = self.find_by_dealership(dealership_id).await? else {
            return Ok(false);
        };
        let mut active: dealer_credential::ActiveModel = current.into();
        active.is_active = Set(false);
        active.deleted_at = Set(Some(Utc::now().fixed_offset()));
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&*self.db).await?;
        Ok(true)
    }
}
