use serde::{Deserialize, Serialize};

/// Resource operation being attempted.
///
/// Policies only care whether an operation is *safe* (read-only). The mapping
/// from HTTP verbs lives in the API layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
}

impl Operation {
    /// Read-only operations are allowed for every principal that reaches the resource.
    pub fn is_safe(self) -> bool {
        matches!(self, Operation::List | Operation::Retrieve)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Retrieve => "retrieve",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::PartialUpdate => "partial_update",
            Operation::Destroy => "destroy",
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
