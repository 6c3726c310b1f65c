//! # Domain Types
//!
//! The three record types kept on the device and synced with the remote
//! ledger service.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  LedgerEntry    │   │     Budget      │   │    Category     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  family_id      │   │  family_id      │   │  family_id      │       │
//! │  │  member_id      │   │  name           │   │  name, icon     │       │
//! │  │  entry_type     │   │  limit_minor    │   │  color #RRGGBB  │       │
//! │  │  amount_minor   │   │  period         │   │  category_type  │       │
//! │  │  category_id ───┼───┼─────────────────┼──►│  archived       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  All three carry: is_online, needs_sync, created_at, updated_at        │
//! │  Push-only: LedgerEntry       Refreshable: Budget, Category            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## JSON
//! Records serialize to camelCase JSON for the frontends (the exported
//! TypeScript bindings). `needs_sync` and `is_online` are local bookkeeping
//! and are skipped in both directions. The ledger service speaks different
//! shapes; `famledger_sync::wire` converts between the two.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::record::{EntityKind, SyncRecord};
use crate::validation;
use crate::DEFAULT_ALERT_THRESHOLD_PCT;

/// Generates a new record id (UUID v4).
///
/// Ids are created on the device so records can be written offline and
/// pushed later without coordination.
pub fn generate_record_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Transaction Type
// =============================================================================

/// Direction of money movement. Also used to classify categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Income,
    Expense,
}

impl Default for TransactionType {
    fn default() -> Self {
        TransactionType::Expense
    }
}

// =============================================================================
// Ledger Entry
// =============================================================================

/// A single income or expense recorded by a family member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Unique identifier (UUID v4 when created on the device).
    pub id: String,

    /// Family this entry belongs to.
    pub family_id: String,

    /// Member who recorded the entry.
    pub member_id: String,

    #[serde(rename = "type")]
    pub entry_type: TransactionType,

    /// Amount in minor units, always positive. Direction comes from `entry_type`.
    pub amount_minor: i64,

    /// ISO-4217 currency code.
    pub currency: String,

    pub category_id: String,

    /// When the money actually moved.
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,

    pub notes: Option<String>,

    /// Server has acknowledged this entry at least once.
    #[serde(skip)]
    #[ts(skip)]
    pub is_online: bool,

    /// Created or modified locally since the last confirmed push.
    #[serde(skip)]
    #[ts(skip)]
    pub needs_sync: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Creates a new entry on the device: fresh id, dirty, not yet online.
    #[allow(clippy::too_many_arguments)]
    pub fn new_local(
        family_id: impl Into<String>,
        member_id: impl Into<String>,
        entry_type: TransactionType,
        amount_minor: i64,
        currency: impl Into<String>,
        category_id: impl Into<String>,
        occurred_at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        LedgerEntry {
            id: generate_record_id(),
            family_id: family_id.into(),
            member_id: member_id.into(),
            entry_type,
            amount_minor,
            currency: currency.into(),
            category_id: category_id.into(),
            occurred_at,
            notes,
            is_online: false,
            needs_sync: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_minor(self.amount_minor)
    }

    /// Returns the amount signed by direction: expenses are negative.
    pub fn signed_amount(&self) -> Money {
        match self.entry_type {
            TransactionType::Income => self.amount(),
            TransactionType::Expense => -self.amount(),
        }
    }
}

fn validate_ledger_entry(entry: &LedgerEntry) -> CoreResult<()> {
    validation::validate_required("family_id", &entry.family_id)?;
    validation::validate_required("member_id", &entry.member_id)?;
    validation::validate_required("category_id", &entry.category_id)?;
    validation::validate_amount_minor("amount_minor", entry.amount_minor)?;
    validation::validate_currency(&entry.currency)?;
    if let Some(notes) = &entry.notes {
        validation::validate_notes(notes)?;
    }
    Ok(())
}

// =============================================================================
// Budget
// =============================================================================

/// Length of a budget period.
///
/// JSON names are the ledger service's (`MONTH`, `QUARTER`, `YEAR`,
/// `CUSTOM`); the local store keeps the lowercase variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
pub enum PeriodType {
    #[serde(rename = "MONTH")]
    Monthly,
    #[serde(rename = "QUARTER")]
    Quarterly,
    #[serde(rename = "YEAR")]
    Yearly,
    /// Any explicit start/end range.
    #[serde(rename = "CUSTOM")]
    Custom,
}

impl Default for PeriodType {
    fn default() -> Self {
        PeriodType::Monthly
    }
}

/// A spending limit for a family over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: String,
    pub family_id: String,
    pub name: String,
    /// Overall limit in minor units.
    pub overall_limit_minor: i64,
    pub currency: String,
    pub period_type: PeriodType,
    #[ts(as = "String")]
    pub period_start: NaiveDate,
    /// Inclusive.
    #[ts(as = "String")]
    pub period_end: NaiveDate,
    /// Percent of the limit (0-100) at which the family is alerted.
    #[serde(default = "default_alert_threshold_pct")]
    pub alert_threshold_pct: u32,
    /// Whether recurring entries count against the limit.
    #[serde(default = "default_include_recurring")]
    pub include_recurring: bool,
    #[serde(skip)]
    #[ts(skip)]
    pub is_online: bool,
    #[serde(skip)]
    #[ts(skip)]
    pub needs_sync: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

fn default_alert_threshold_pct() -> u32 {
    DEFAULT_ALERT_THRESHOLD_PCT
}

fn default_include_recurring() -> bool {
    true
}

impl Budget {
    /// Creates a new budget on the device with the default alert threshold.
    pub fn new_local(
        family_id: impl Into<String>,
        name: impl Into<String>,
        overall_limit_minor: i64,
        currency: impl Into<String>,
        period_type: PeriodType,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Budget {
            id: generate_record_id(),
            family_id: family_id.into(),
            name: name.into(),
            overall_limit_minor,
            currency: currency.into(),
            period_type,
            period_start,
            period_end,
            alert_threshold_pct: DEFAULT_ALERT_THRESHOLD_PCT,
            include_recurring: true,
            is_online: false,
            needs_sync: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn overall_limit(&self) -> Money {
        Money::from_minor(self.overall_limit_minor)
    }

    /// Whether `date` falls inside the budget period (both ends inclusive).
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.period_start && date <= self.period_end
    }

    /// Whether `spent` has reached the alert threshold.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use famledger_core::{Budget, Money, PeriodType};
    ///
    /// let budget = Budget::new_local(
    ///     "fam-1",
    ///     "Groceries",
    ///     50_000,
    ///     "USD",
    ///     PeriodType::Monthly,
    ///     NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
    ///     NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
    /// );
    ///
    /// assert!(!budget.reaches_alert(Money::from_minor(39_999)));
    /// assert!(budget.reaches_alert(Money::from_minor(40_000)));
    /// ```
    pub fn reaches_alert(&self, spent: Money) -> bool {
        spent
            .percent_of(self.overall_limit())
            .map(|pct| pct >= i64::from(self.alert_threshold_pct))
            .unwrap_or(false)
    }

    /// Amount left before the limit. Negative when overspent.
    pub fn remaining(&self, spent: Money) -> Money {
        self.overall_limit() - spent
    }
}

fn validate_budget(budget: &Budget) -> CoreResult<()> {
    validation::validate_required("family_id", &budget.family_id)?;
    validation::validate_name("name", &budget.name)?;
    validation::validate_amount_minor("overall_limit_minor", budget.overall_limit_minor)?;
    validation::validate_currency(&budget.currency)?;
    validation::validate_percentage("alert_threshold_pct", budget.alert_threshold_pct)?;
    if budget.period_end < budget.period_start {
        return Err(CoreError::InvalidPeriod {
            start: budget.period_start.to_string(),
            end: budget.period_end.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Category
// =============================================================================

/// A family-defined label for ledger entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub family_id: String,
    pub name: String,
    /// Icon name understood by the frontends.
    pub icon: String,
    /// Hex color, `#RRGGBB`.
    pub color: String,
    #[serde(rename = "type")]
    pub category_type: TransactionType,
    /// Archived categories stay referenced by old entries but are hidden.
    #[serde(default)]
    pub archived: bool,
    #[serde(skip)]
    #[ts(skip)]
    pub is_online: bool,
    #[serde(skip)]
    #[ts(skip)]
    pub needs_sync: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new_local(
        family_id: impl Into<String>,
        name: impl Into<String>,
        icon: impl Into<String>,
        color: impl Into<String>,
        category_type: TransactionType,
    ) -> Self {
        let now = Utc::now();
        Category {
            id: generate_record_id(),
            family_id: family_id.into(),
            name: name.into(),
            icon: icon.into(),
            color: color.into(),
            category_type,
            archived: false,
            is_online: false,
            needs_sync: true,
            created_at: now,
            updated_at: now,
        }
    }
}

fn validate_category(category: &Category) -> CoreResult<()> {
    validation::validate_required("family_id", &category.family_id)?;
    validation::validate_name("name", &category.name)?;
    validation::validate_required("icon", &category.icon)?;
    validation::validate_color(&category.color)?;
    Ok(())
}

// =============================================================================
// SyncRecord Implementations
// =============================================================================

macro_rules! impl_sync_record {
    ($ty:ty, $kind:expr, $validate:ident) => {
        impl SyncRecord for $ty {
            const KIND: EntityKind = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn family_id(&self) -> &str {
                &self.family_id
            }

            fn needs_sync(&self) -> bool {
                self.needs_sync
            }

            fn is_online(&self) -> bool {
                self.is_online
            }

            fn updated_at(&self) -> DateTime<Utc> {
                self.updated_at
            }

            fn mark_dirty(&mut self, now: DateTime<Utc>) {
                self.needs_sync = true;
                self.updated_at = now;
            }

            fn into_synced(mut self) -> Self {
                self.needs_sync = false;
                self.is_online = true;
                self
            }

            fn into_rekeyed(mut self, id: &str) -> Self {
                self.id = id.to_string();
                self.is_online = true;
                self
            }

            fn validate(&self) -> CoreResult<()> {
                $validate(self)
            }
        }
    };
}

impl_sync_record!(LedgerEntry, EntityKind::LedgerEntry, validate_ledger_entry);
impl_sync_record!(Budget, EntityKind::Budget, validate_budget);
impl_sync_record!(Category, EntityKind::Category, validate_category);

// =============================================================================
// Unit Tests
// =============================================================================
