use crate::domain::user::{Caller, UserRole};
use crate::error::{Result, WorkflowError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Submit,
    Approve,
    Reject,
}

/// One row of the batch input: a workflow operation performed by a user.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct WorkflowCommand {
    pub op: CommandKind,
    pub user: i64,
    pub role: UserRole,
    #[serde(default)]
    pub expense: Option<i64>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl WorkflowCommand {
    /// The identity this row acts as. Batch input carries no emails, so a
    /// synthetic one is attached.
    pub fn caller(&self) -> Caller {
        Caller::new(self.user, format!("user{}@batch.local", self.user), self.role)
    }
}

/// Reads workflow commands from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<WorkflowCommand>`. It handles whitespace trimming and flexible
/// record lengths automatically.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes commands,
    /// so large batches stream without loading the whole file.
    pub fn commands(self) -> impl Iterator<Item = Result<WorkflowCommand>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(WorkflowError::from))
    }
}
