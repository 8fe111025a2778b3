// crmdash-api: Async client for the training-CRM backend (list, stats, chart endpoints)

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::ApiClient;
pub use error::Error;
pub use models::{
    ChartHistory, College, Lead, ListResponse, Pagination, RecordId, RejectedRecord,
    StatsResponse, Trainer, User,
};
pub use transport::{TlsMode, TransportConfig};
