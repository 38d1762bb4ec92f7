mod config;
mod decoder;
mod error;
mod metrics;
mod pricing;
mod table;
mod transform;

pub use config::{
    AgentBackend, AgentSettings, AppConfig, AwsSettings, DataKeys, DEFAULT_BIND_ADDR,
    DEFAULT_CONTACTS_KEY, DEFAULT_ROLODEX_KEY, DEFAULT_STATUS_TTL_SECS,
};
pub use decoder::{decode, Candidate, DecodeProfile, TextEncoding};
pub use error::{DecodeError, DeskError, RejectedCandidate, Result, TableError, TransformError};
pub use metrics::{
    aggregate, daily_volume, default_window, recent_interactions, synthetic_events, AgentEvent,
    DailyVolume, Feedback, MetricsSummary, DEFAULT_RECENT_LIMIT, DEFAULT_WINDOW_DAYS,
};
pub use pricing::{PricingConfig, PricingRate};
pub use table::{Cell, Column, TabularDataset};
pub use transform::{
    contact_rename, extract_label, extract_link, prepare, rolodex_hyperlink_split, DatasetKind,
    PreparedUpload, DOCUMENTATION_LINK,
};
