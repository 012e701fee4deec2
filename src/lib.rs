pub mod app;
pub mod errors;
pub mod filter;
pub mod handlers;
pub mod ingest;
pub mod models;
pub mod stats;
pub mod storage;
pub mod state;

pub use app::router;
pub use filter::filter_records;
pub use state::AppState;
pub use stats::{aggregate_totals, build_daily_series, build_dashboard, rank_clients};
pub use storage::{load_snapshot, resolve_data_path};
