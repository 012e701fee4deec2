use crate::models::AdRecord;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::RwLock;

/// The full record set of one fetch cycle. Never mutated; a reload swaps in
/// a new one.
pub type Snapshot = Arc<Vec<AdRecord>>;

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    snapshot: Arc<RwLock<Snapshot>>,
}

impl AppState {
    pub fn new(data_path: PathBuf, records: Vec<AdRecord>) -> Self {
        Self {
            data_path,
            snapshot: Arc::new(RwLock::new(Arc::new(records))),
        }
    }

    pub async fn snapshot(&self) -> Snapshot {
        Arc::clone(&*self.snapshot.read().await)
    }

    /// Replace the held snapshot wholesale. Readers holding the previous
    /// `Arc` keep working on it.
    pub async fn replace(&self, records: Vec<AdRecord>) {
        *self.snapshot.write().await = Arc::new(records);
    }
}
