use serde::{Deserialize, Serialize};

/// Status of a long-running operation.
///
/// `NotStarted` and `InProgress` keep the poll loop going; the other three
/// are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OperationStatus {
    NotStarted,
    InProgress,
    Succeeded,
    Failed,
    Canceled,
}

impl OperationStatus {
    /// Map a body-level status string onto the five known statuses.
    ///
    /// Terminal names are matched case-insensitively. Any other non-empty
    /// string (`Running`, `Creating`, `Deleting`, ...) is a resource-specific
    /// intermediate state and counts as in progress. Returns `None` for an
    /// empty string so the caller falls back to the status code.
    pub fn from_provisioning_state(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        let status = if value.eq_ignore_ascii_case("Succeeded") {
            OperationStatus::Succeeded
        } else if value.eq_ignore_ascii_case("Failed") {
            OperationStatus::Failed
        } else if value.eq_ignore_ascii_case("Canceled") || value.eq_ignore_ascii_case("Cancelled")
        {
            OperationStatus::Canceled
        } else if value.eq_ignore_ascii_case("NotStarted") {
            OperationStatus::NotStarted
        } else {
            OperationStatus::InProgress
        };
        Some(status)
    }

    /// Fallback for responses without a body status:
    /// 202 is in progress, 200/201/204 succeeded, everything else failed.
    pub fn from_status_code(status_code: u16) -> Self {
        match status_code {
            202 => OperationStatus::InProgress,
            200 | 201 | 204 => OperationStatus::Succeeded,
            _ => OperationStatus::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperationStatus::Succeeded | OperationStatus::Failed | OperationStatus::Canceled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationStatus::NotStarted => "NotStarted",
            OperationStatus::InProgress => "InProgress",
            OperationStatus::Succeeded => "Succeeded",
            OperationStatus::Failed => "Failed",
            OperationStatus::Canceled => "Canceled",
        }
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
