pub mod auth;
pub mod config;
pub mod dashboard;
pub mod decimal;
pub mod desk;
pub mod errors;
pub mod events;
pub mod identity;
pub mod lifecycle;
pub mod store;
pub mod types;
pub mod views;

// re-export key types
pub use auth::{IdentityService, Permissions};
pub use config::{DeskConfig, StorageKeys};
pub use dashboard::{ChartPoint, DashboardStats, SeriesMetric};
pub use decimal::{Money, Rate};
pub use desk::LoanDesk;
pub use errors::{DeskError, Result};
pub use events::{Event, EventStore};
pub use identity::{Identity, IdentityUpdate, NewIdentity};
pub use lifecycle::{LoanApplication, LoanBook, LoanFilter, LoanRequest, Page};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use types::{IdentityId, LoanAction, LoanId, LoanStatus, LoanType, Role};
pub use views::{ApplicantView, IdentityView, LoanView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
