//! # Service Wire Shapes
//!
//! The ledger service does not speak the local record structs. Its responses
//! leave out the family (it comes from the caller's token), budgets nest
//! their period, and some fields the device keeps are never echoed back.
//!
//! ```text
//!  push:    record ──to_request()──► Request JSON ──► service
//!  confirm: service ──► Response JSON ──from_response(family, Some(sent))──► record
//!  list:    service ──► [Response]    ──from_response(family, None)──────► [record]
//!
//!  ┌──────────────┬─────────────────────────────┬─────────────────────────────┐
//!  │ Kind         │ Missing from the response   │ Filled from                 │
//!  ├──────────────┼─────────────────────────────┼─────────────────────────────┤
//!  │ ledger_entry │ familyId                    │ pushed record / list scope  │
//!  │ category     │ familyId, icon/color (null) │ pushed record / defaults    │
//!  │ budget       │ currency (older servers)    │ pushed record / USD         │
//!  └──────────────┴─────────────────────────────┴─────────────────────────────┘
//! ```
//!
//! A response that does carry `familyId` keeps it, so a foreign record in a
//! listing still shows up as foreign.

use chrono::{DateTime, NaiveDate, Utc};
use famledger_core::{
    Budget, Category, LedgerEntry, PeriodType, SyncRecord, TransactionType,
    DEFAULT_ALERT_THRESHOLD_PCT, DEFAULT_CURRENCY,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Icon given to a listed category the service stored without one.
pub const DEFAULT_CATEGORY_ICON: &str = "tag";

/// Color given to a listed category the service stored without one.
pub const DEFAULT_CATEGORY_COLOR: &str = "#9E9E9E";

/// Conversion between a record and the service's JSON for its kind.
pub trait WireRecord: SyncRecord {
    /// Body of create and update requests.
    type Request: Serialize + Send + Sync;

    /// One record as the service returns it.
    type Response: DeserializeOwned + Send;

    fn to_request(&self) -> Self::Request;

    /// Builds the server's copy of a record, flagged online and clean.
    ///
    /// ## Arguments
    /// * `response` - decoded service record
    /// * `family_id` - family used when the response has none
    /// * `sent` - the pushed record, for fields the response leaves out
    fn from_response(response: Self::Response, family_id: &str, sent: Option<&Self>) -> Self;
}

fn timestamp(value: Option<DateTime<Utc>>, sent: Option<DateTime<Utc>>) -> DateTime<Utc> {
    value.or(sent).unwrap_or_else(Utc::now)
}

// =============================================================================
// Ledger Entry
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryRequest {
    pub member_id: String,
    #[serde(rename = "type")]
    pub entry_type: TransactionType,
    pub amount_minor: i64,
    pub currency: String,
    pub category_id: String,
    pub occurred_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryResponse {
    pub id: String,
    pub family_id: Option<String>,
    pub member_id: Option<String>,
    #[serde(rename = "type")]
    pub entry_type: TransactionType,
    pub amount_minor: i64,
    pub currency: Option<String>,
    pub category_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl WireRecord for LedgerEntry {
    type Request = LedgerEntryRequest;
    type Response = LedgerEntryResponse;

    fn to_request(&self) -> LedgerEntryRequest {
        LedgerEntryRequest {
            member_id: self.member_id.clone(),
            entry_type: self.entry_type,
            amount_minor: self.amount_minor,
            currency: self.currency.clone(),
            category_id: self.category_id.clone(),
            occurred_at: self.occurred_at,
            notes: self.notes.clone(),
        }
    }

    fn from_response(r: LedgerEntryResponse, family_id: &str, sent: Option<&Self>) -> Self {
        LedgerEntry {
            id: r.id,
            family_id: r.family_id.unwrap_or_else(|| family_id.to_string()),
            member_id: r
                .member_id
                .or_else(|| sent.map(|s| s.member_id.clone()))
                .unwrap_or_default(),
            entry_type: r.entry_type,
            amount_minor: r.amount_minor,
            currency: r
                .currency
                .or_else(|| sent.map(|s| s.currency.clone()))
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            category_id: r
                .category_id
                .or_else(|| sent.map(|s| s.category_id.clone()))
                .unwrap_or_default(),
            occurred_at: r.occurred_at,
            notes: r.notes,
            is_online: true,
            needs_sync: false,
            created_at: timestamp(r.created_at, sent.map(|s| s.created_at)),
            updated_at: timestamp(r.updated_at, sent.map(|s| s.updated_at)),
        }
    }
}

// =============================================================================
// Budget
// =============================================================================

/// A budget's date range, nested under `period` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetPeriod {
    #[serde(rename = "type")]
    pub period_type: PeriodType,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRequest {
    pub id: String,
    pub name: String,
    pub period: BudgetPeriod,
    pub overall_limit_minor: i64,
    pub currency: String,
    pub include_recurring: bool,
    pub alert_threshold_pct: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetResponse {
    pub id: String,
    pub family_id: Option<String>,
    pub name: String,
    pub period: BudgetPeriod,
    pub overall_limit_minor: i64,
    pub currency: Option<String>,
    pub include_recurring: Option<bool>,
    pub alert_threshold_pct: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl WireRecord for Budget {
    type Request = BudgetRequest;
    type Response = BudgetResponse;

    fn to_request(&self) -> BudgetRequest {
        BudgetRequest {
            id: self.id.clone(),
            name: self.name.clone(),
            period: BudgetPeriod {
                period_type: self.period_type,
                start: self.period_start,
                end: self.period_end,
            },
            overall_limit_minor: self.overall_limit_minor,
            currency: self.currency.clone(),
            include_recurring: self.include_recurring,
            alert_threshold_pct: self.alert_threshold_pct,
        }
    }

    fn from_response(r: BudgetResponse, family_id: &str, sent: Option<&Self>) -> Self {
        Budget {
            id: r.id,
            family_id: r.family_id.unwrap_or_else(|| family_id.to_string()),
            name: r.name,
            overall_limit_minor: r.overall_limit_minor,
            currency: r
                .currency
                .or_else(|| sent.map(|s| s.currency.clone()))
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            period_type: r.period.period_type,
            period_start: r.period.start,
            period_end: r.period.end,
            alert_threshold_pct: r.alert_threshold_pct.unwrap_or(DEFAULT_ALERT_THRESHOLD_PCT),
            include_recurring: r.include_recurring.unwrap_or(true),
            is_online: true,
            needs_sync: false,
            created_at: timestamp(r.created_at, sent.map(|s| s.created_at)),
            updated_at: timestamp(r.updated_at, sent.map(|s| s.updated_at)),
        }
    }
}

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: TransactionType,
    pub icon: String,
    pub color: String,
    pub archived: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: String,
    pub family_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: TransactionType,
    pub icon: Option<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub archived: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl WireRecord for Category {
    type Request = CategoryRequest;
    type Response = CategoryResponse;

    fn to_request(&self) -> CategoryRequest {
        CategoryRequest {
            name: self.name.clone(),
            category_type: self.category_type,
            icon: self.icon.clone(),
            color: self.color.clone(),
            archived: self.archived,
        }
    }

    fn from_response(r: CategoryResponse, family_id: &str, sent: Option<&Self>) -> Self {
        Category {
            id: r.id,
            family_id: r.family_id.unwrap_or_else(|| family_id.to_string()),
            name: r.name,
            icon: r
                .icon
                .or_else(|| sent.map(|s| s.icon.clone()))
                .unwrap_or_else(|| DEFAULT_CATEGORY_ICON.to_string()),
            color: r
                .color
                .or_else(|| sent.map(|s| s.color.clone()))
                .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            category_type: r.category_type,
            archived: r.archived,
            is_online: true,
            needs_sync: false,
            created_at: timestamp(r.created_at, sent.map(|s| s.created_at)),
            updated_at: timestamp(r.updated_at, sent.map(|s| s.updated_at)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode<T: WireRecord>(value: serde_json::Value, family_id: &str, sent: Option<&T>) -> T {
        let response: T::Response = serde_json::from_value(value).unwrap();
        T::from_response(response, family_id, sent)
    }

    #[test]
    fn test_category_response_without_family_takes_the_pushed_one() {
        let sent = Category::new_local("fam-1", "Pets", "paw", "#AABBCC", TransactionType::Expense);
        let body = json!({
            "id": "srv-cat-9",
            "name": "Pets",
            "type": "EXPENSE",
            "icon": null,
            "color": "#AABBCC",
            "archived": false,
            "createdAt": "2026-10-01T08:00:00Z",
            "updatedAt": "2026-10-01T08:00:00Z"
        });

        let confirmed: Category = decode(body, sent.family_id(), Some(&sent));

        assert_eq!(confirmed.id, "srv-cat-9");
        assert_eq!(confirmed.family_id, "fam-1");
        assert_eq!(confirmed.icon, "paw");
        assert!(confirmed.is_online);
        assert!(!confirmed.needs_sync);
    }

    #[test]
    fn test_listed_category_gets_defaults_for_missing_fields() {
        let body = json!({ "id": "c-1", "name": "Salary", "type": "INCOME" });

        let listed: Category = decode(body, "fam-7", None);

        assert_eq!(listed.family_id, "fam-7");
        assert_eq!(listed.icon, DEFAULT_CATEGORY_ICON);
        assert_eq!(listed.color, DEFAULT_CATEGORY_COLOR);
        assert!(!listed.archived);
    }

    #[test]
    fn test_explicit_family_in_response_is_kept() {
        let body = json!({
            "id": "c-2",
            "familyId": "fam-2",
            "name": "Rent",
            "type": "EXPENSE",
            "icon": "home",
            "color": "#112233"
        });

        let listed: Category = decode(body, "fam-1", None);
        assert_eq!(listed.family_id, "fam-2");
    }

    #[test]
    fn test_ledger_entry_response_shape() {
        let body = json!({
            "id": "e-1",
            "memberId": "member-3",
            "type": "EXPENSE",
            "amountMinor": 1250,
            "currency": "EUR",
            "categoryId": "cat-food",
            "categoryName": "Food",
            "occurredAt": "2026-10-02T18:30:00Z",
            "notes": null,
            "attachments": [],
            "recurringId": null,
            "createdAt": "2026-10-02T18:31:00Z",
            "updatedAt": "2026-10-02T18:31:00Z"
        });

        let entry: LedgerEntry = decode(body, "fam-1", None);

        assert_eq!(entry.family_id, "fam-1");
        assert_eq!(entry.member_id, "member-3");
        assert_eq!(entry.amount_minor, 1250);
        assert_eq!(entry.currency, "EUR");
        assert_eq!(entry.notes, None);
    }

    #[test]
    fn test_ledger_request_has_no_local_fields() {
        let entry = LedgerEntry::new_local(
            "fam-1",
            "member-1",
            TransactionType::Income,
            900,
            "USD",
            "cat-salary",
            Utc::now(),
            Some("bonus".into()),
        );

        let body = serde_json::to_value(entry.to_request()).unwrap();

        assert_eq!(body["type"], "INCOME");
        assert_eq!(body["amountMinor"], 900);
        assert_eq!(body["memberId"], "member-1");
        assert!(body.get("familyId").is_none());
        assert!(body.get("needsSync").is_none());
        assert!(body.get("isOnline").is_none());
    }

    #[test]
    fn test_budget_period_is_nested_both_ways() {
        let sent = Budget::new_local(
            "fam-1",
            "Quarter groceries",
            300_000,
            "GBP",
            PeriodType::Quarterly,
            NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
        );

        let request = serde_json::to_value(sent.to_request()).unwrap();
        assert_eq!(request["period"]["type"], "QUARTER");
        assert_eq!(request["period"]["start"], "2026-10-01");
        assert_eq!(request["period"]["end"], "2026-12-31");
        assert!(request.get("periodType").is_none());

        let body = json!({
            "id": sent.id.as_str(),
            "familyId": "fam-1",
            "name": "Quarter groceries",
            "period": { "type": "QUARTER", "start": "2026-10-01", "end": "2026-12-31" },
            "overallLimitMinor": 300000,
            "includeRecurring": false,
            "alertThresholdPct": 75,
            "perCategory": [{ "categoryId": "cat-food", "limitMinor": 100000 }],
            "createdAt": "2026-10-01T00:00:00Z",
            "updatedAt": "2026-10-01T00:00:00Z"
        });
        let confirmed: Budget = decode(body, "fam-1", Some(&sent));

        assert_eq!(confirmed.period_type, PeriodType::Quarterly);
        assert_eq!(confirmed.period_end, sent.period_end);
        assert_eq!(confirmed.currency, "GBP");
        assert_eq!(confirmed.alert_threshold_pct, 75);
        assert!(!confirmed.include_recurring);
    }

    #[test]
    fn test_listed_budget_defaults() {
        let body = json!({
            "id": "b-9",
            "name": "Year",
            "period": { "type": "YEAR", "start": "2026-01-01", "end": "2026-12-31" },
            "overallLimitMinor": 1000000
        });

        let listed: Budget = decode(body, "fam-1", None);

        assert_eq!(listed.currency, DEFAULT_CURRENCY);
        assert_eq!(listed.alert_threshold_pct, DEFAULT_ALERT_THRESHOLD_PCT);
        assert!(listed.include_recurring);
    }
}
