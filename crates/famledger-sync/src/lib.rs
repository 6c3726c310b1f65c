//! # famledger-sync: Offline Sync Engine for famledger
//!
//! This crate moves records the user created or edited on the device to the
//! remote ledger service, and pulls the service's authoritative copies back.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Engine Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      SyncAgent (Orchestrator)                    │  │
//! │  │                                                                  │  │
//! │  │  Owned by the composition root, stopped at shutdown             │  │
//! │  │  Periodic loop (PeriodicTask) + on-demand + force sync           │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │ Connectivity gate                       │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ EntitySync     │  │ EntitySync     │  │ EntitySync             │    │
//! │  │ Worker<Ledger> │  │ Worker<Budget> │  │ Worker<Category>       │    │
//! │  └───────┬────────┘  └───────┬────────┘  └───────────┬────────────┘    │
//! │          │ LocalStore<T>     │                       │ RemoteApi<T>    │
//! │          ▼                   ▼                       ▼                  │
//! │  ┌─────────────────────────────────┐  ┌────────────────────────────┐   │
//! │  │ famledger-db repositories       │  │ ApiClient (reqwest, JSON)  │   │
//! │  │ MemoryStore (tests, demos)      │  │                            │   │
//! │  └─────────────────────────────────┘  └────────────────────────────┘   │
//! │                                                                         │
//! │  OfflineRepository<T>: the application's write path. Local first,      │
//! │  remote when online, dirty marker when not. It shares PushClaims with  │
//! │  the workers so a record is never pushed by both at once.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! ### Orchestration
//! - [`agent`] - `SyncAgent`, status snapshot, event emitter, builder
//! - [`worker`] - Per-kind push and refresh
//! - [`schedule`] - Cancellable periodic task
//! - [`report`] - Push, refresh and cycle reports
//!
//! ### Seams
//! - [`connectivity`] - Online/offline oracle
//! - [`store`] - Local store contract (+ SQLite implementation)
//! - [`memory`] - In-memory local store
//! - [`remote`] - Remote service contract and token source
//! - [`http`] - HTTP implementation of the remote contract
//! - [`wire`] - The ledger service's JSON shapes
//! - [`offline`] - Offline-first write path
//! - [`claims`] - Keeps one record from being pushed twice at once
//!
//! ### Ambient
//! - [`config`] - Sync configuration (TOML + environment)
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use famledger_sync::{ApiClient, SyncAgentBuilder, SyncConfig};
//!
//! let config = SyncConfig::load_or_default(None);
//! let api = Arc::new(ApiClient::new(&config.remote)?);
//!
//! let agent = SyncAgentBuilder::new(config)
//!     .with_standard_workers(&database, api)
//!     .build()?;
//!
//! agent.start_periodic_sync().await;
//! // ...
//! let report = agent.force_sync(agent.family_id()).await?;
//! println!("Pushed: {}", report.total_confirmed());
//!
//! agent.stop_sync().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod agent;
pub mod claims;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod http;
pub mod memory;
pub mod offline;
pub mod remote;
pub mod report;
pub mod schedule;
pub mod store;
pub mod wire;
pub mod worker;

// =============================================================================
// Re-exports
// =============================================================================

pub use agent::{NoOpEmitter, SyncAgent, SyncAgentBuilder, SyncEventEmitter, SyncStatus};
pub use claims::{PushClaim, PushClaims};
pub use config::{RefreshPolicy, SyncConfig, SyncMode};
pub use connectivity::{AlwaysOnline, Connectivity, ConnectivityFlag};
pub use error::{SyncError, SyncResult};
pub use http::{ApiClient, Endpoint};
pub use memory::MemoryStore;
pub use offline::OfflineRepository;
pub use remote::{RemoteApi, StaticToken, TokenSource};
pub use report::{
    CycleOutcome, CycleReport, PushReport, RecordFailure, RefreshReport, SyncTrigger,
    WorkerFailure, WorkerPhase,
};
pub use schedule::PeriodicTask;
pub use store::LocalStore;
pub use wire::WireRecord;
pub use worker::{EntitySyncWorker, SyncWorker};
