//! DealerCredential entity model
//!
//! This module contains the SeaORM entity model for the dealer_credentials
//! table, which stores one set of EasyCars connection secrets per
//! dealership. Secret columns hold AES-256-GCM ciphertext; plaintext never
//! leaves the sync engine.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// DealerCredential entity representing a dealership's EasyCars connection
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "dealer_credentials")]
pub struct Model {
    /// Unique identifier for the credential (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Dealership this credential belongs to (unique, one per dealership)
    pub dealership_id: Uuid,

    /// Encrypted EasyCars account number
    pub account_number_ciphertext: Vec<u8>,

    /// Encrypted EasyCars account secret
    pub account_secret_ciphertext: Vec<u8>,

    /// Encrypted API client id (optional, client-credential flow)
    pub client_id_ciphertext: Option<Vec<u8>>,

    /// Encrypted API client secret (optional, client-credential flow)
    pub client_secret_ciphertext: Option<Vec<u8>>,

    /// Target environment ("test" or "production")
    pub environment: String,

    /// Optional yard code scoping stock queries to one physical yard
    pub yard_code: Option<String>,

    /// Whether this credential is active for scheduled syncs
    pub is_active: bool,

    /// Soft-delete timestamp set by the admin delete action
    pub deleted_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the credential was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the credential was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
