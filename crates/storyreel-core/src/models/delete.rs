use serde::Serialize;

/// Result of deleting one URL in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted { url: String },
    NotFound { url: String },
    Failed { url: String, reason: String },
}

impl DeleteOutcome {
    pub fn url(&self) -> &str {
        match self {
            DeleteOutcome::Deleted { url }
            | DeleteOutcome::NotFound { url }
            | DeleteOutcome::Failed { url, .. } => url,
        }
    }
}

/// Per-item outcomes of a batch delete, in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteReport {
    pub outcomes: Vec<DeleteOutcome>,
}

impl DeleteReport {
    pub fn deleted(&self) -> usize {
        self.count(|o| matches!(o, DeleteOutcome::Deleted { .. }))
    }

    pub fn not_found(&self) -> usize {
        self.count(|o| matches!(o, DeleteOutcome::NotFound { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DeleteOutcome::Failed { .. }))
    }

    /// True when nothing failed. Missing objects count as success.
    pub fn is_complete_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&DeleteOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

/// Information derived from a stored object's URL without contacting the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteFileInfo {
    pub key: String,
    pub file_name: String,
    pub extension: Option<String>,
    pub bucket: Option<String>,
}
