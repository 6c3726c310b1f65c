//! # famledger-core: Pure Domain Logic for famledger
//!
//! This crate holds the record types shared by the local store, the sync
//! engine and any frontend. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        famledger Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                apps/syncd (composition root)                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              famledger-sync (offline sync engine)               │   │
//! │  └──────────────┬──────────────────────────────────┬───────────────┘   │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────┐                   │                    │
//! │  │   famledger-db (SQLite)     │                   │                    │
//! │  └──────────────┬──────────────┘                   │                    │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────────────────────────▼───────────────┐   │
//! │  │             ★ famledger-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  record   │  │ validation│  │   │
//! │  │   │  Ledger   │  │   Money   │  │SyncRecord │  │   rules   │  │   │
//! │  │   │  Budget   │  │           │  │EntityKind │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Ledger entries, budgets, categories
//! - [`record`] - The `SyncRecord` contract and `EntityKind`
//! - [`money`] - Money type with integer arithmetic (minor units)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use famledger_core::{LedgerEntry, SyncRecord, TransactionType};
//!
//! let entry = LedgerEntry::new_local(
//!     "fam-1",
//!     "member-1",
//!     TransactionType::Expense,
//!     2500,
//!     "USD",
//!     "cat-groceries",
//!     Utc::now(),
//!     None,
//! );
//!
//! // Locally created records start dirty and unknown to the server
//! assert!(entry.needs_sync());
//! assert!(!entry.is_online());
//! ```

pub mod error;
pub mod money;
pub mod record;
pub mod types;
pub mod validation;

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use record::{EntityKind, SyncRecord};
pub use types::*;

/// Default ISO-4217 currency for new records when none is configured.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Default budget alert threshold (percent of the overall limit).
pub const DEFAULT_ALERT_THRESHOLD_PCT: u32 = 80;
