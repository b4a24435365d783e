// ── Re-exports from coinboard-common / coinboard-types ──
pub use coinboard_common::{constants, error, traits, types};
pub use coinboard_types::config;

// ── Core modules ──
pub mod db;
pub mod queries;
pub mod query;
pub mod retry;
pub mod service;
pub mod source;
pub mod workspace;

pub use db::{CoinDb, CoinStore};
pub use queries::MarketQueries;
pub use query::{ErrorNotifier, QueryCache, QueryOptions, QueryState, QueryStatus, RequestGuard};
pub use service::MarketService;
pub use source::SourceChain;
pub use workspace::init_workspace;
