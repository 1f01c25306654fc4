use crate::domain::expense::{AuditLogEntry, Expense, ExpenseApproval, ExpenseStatus};
use crate::domain::ports::{ExpenseFilter, ExpenseStore};
use crate::error::{Result, WorkflowError};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Column Family for expense records.
pub const CF_EXPENSES: &str = "expenses";
/// Column Family for approval decision records.
pub const CF_APPROVALS: &str = "approvals";
/// Column Family for the append-only audit trail.
pub const CF_AUDIT_LOGS: &str = "audit_logs";
/// Column Family for store metadata (id allocation).
pub const CF_META: &str = "meta";

const NEXT_ID_KEY: &[u8] = b"next_expense_id";

/// A persistent expense store backed by RocksDB.
///
/// Expenses, approvals and audit entries live in separate column families
/// with JSON-encoded values. Multi-record operations (`record_approval`)
/// go through a single `WriteBatch`, and every mutation serializes on an
/// in-process mutex, so a crash can never leave the status update visible
/// without its approval row.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbExpenseStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbExpenseStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [CF_EXPENSES, CF_APPROVALS, CF_AUDIT_LOGS, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;
        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| WorkflowError::Store(format!("{name} column family not found")))
    }

    fn load_expense(&self, expense_id: i64) -> Result<Expense> {
        let cf = self.cf(CF_EXPENSES)?;
        let bytes = self
            .db
            .get_cf(cf, expense_id.to_be_bytes())?
            .ok_or(WorkflowError::NotFound)?;
        serde_json::from_slice(&bytes)
            .map_err(|err| WorkflowError::Store(format!("corrupt expense record: {err}")))
    }

    fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value)
            .map_err(|err| WorkflowError::Store(format!("serialization error: {err}")))
    }

    /// Entries under `expense_id`'s key prefix, in insertion order.
    fn scan_prefix<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        expense_id: i64,
    ) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let prefix = expense_id.to_be_bytes();
        let mut entries = Vec::new();
        for item in self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward))
        {
            let (key, value) =
                item.map_err(|err| WorkflowError::Store(format!("iteration error: {err}")))?;
            if !key.starts_with(&prefix) {
                break;
            }
            entries.push(serde_json::from_slice(&value).map_err(|err| {
                WorkflowError::Store(format!("corrupt {cf_name} record: {err}"))
            })?);
        }
        Ok(entries)
    }

    /// Next key under the expense's prefix: prefix + sequence number.
    fn next_seq_key(&self, cf_name: &str, expense_id: i64) -> Result<[u8; 16]> {
        let count = self.scan_prefix::<serde_json::Value>(cf_name, expense_id)?.len() as u64;
        let mut key = [0u8; 16];
        key[..8].copy_from_slice(&expense_id.to_be_bytes());
        key[8..].copy_from_slice(&count.to_be_bytes());
        Ok(key)
    }
}

#[async_trait]
impl ExpenseStore for RocksDbExpenseStore {
    async fn create_expense(&self, mut expense: Expense) -> Result<Expense> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let meta = self.cf(CF_META)?;
        let next_id = match self.db.get_cf(meta, NEXT_ID_KEY)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| WorkflowError::Store("corrupt id counter".to_string()))?;
                i64::from_be_bytes(raw)
            }
            None => 1,
        };

        expense.id = next_id;
        expense.submitted_at = Utc::now();

        let mut batch = WriteBatch::default();
        batch.put_cf(meta, NEXT_ID_KEY, (next_id + 1).to_be_bytes());
        batch.put_cf(
            self.cf(CF_EXPENSES)?,
            next_id.to_be_bytes(),
            Self::encode(&expense)?,
        );
        self.db.write(batch)?;

        Ok(expense)
    }

    async fn record_approval(
        &self,
        expense_id: i64,
        approver_id: i64,
        status: ExpenseStatus,
        notes: &str,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut expense = self.load_expense(expense_id)?;
        expense.transition(status, Utc::now())?;

        let approval = ExpenseApproval {
            expense_id,
            approver_id,
            status,
            notes: notes.to_string(),
            created_at: Utc::now(),
        };

        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_EXPENSES)?,
            expense_id.to_be_bytes(),
            Self::encode(&expense)?,
        );
        batch.put_cf(
            self.cf(CF_APPROVALS)?,
            self.next_seq_key(CF_APPROVALS, expense_id)?,
            Self::encode(&approval)?,
        );
        self.db.write(batch)?;
        Ok(())
    }

    async fn update_status(&self, expense_id: i64, status: ExpenseStatus) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut expense = self.load_expense(expense_id)?;
        expense.transition(status, Utc::now())?;
        self.db.put_cf(
            self.cf(CF_EXPENSES)?,
            expense_id.to_be_bytes(),
            Self::encode(&expense)?,
        )?;
        Ok(())
    }

    async fn get_by_id(&self, expense_id: i64) -> Result<Expense> {
        self.load_expense(expense_id)
    }

    async fn list_paginated(&self, filter: &ExpenseFilter) -> Result<(Vec<Expense>, u64)> {
        let cf = self.cf(CF_EXPENSES)?;
        let mut matching = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) =
                item.map_err(|err| WorkflowError::Store(format!("iteration error: {err}")))?;
            let expense: Expense = serde_json::from_slice(&value)
                .map_err(|err| WorkflowError::Store(format!("corrupt expense record: {err}")))?;
            if filter.user_id.is_none_or(|user_id| expense.user_id == user_id)
                && filter.status.is_none_or(|status| expense.status == status)
            {
                matching.push(expense);
            }
        }
        matching.sort_by(|a, b| b.id.cmp(&a.id));

        let total = matching.len() as u64;
        let page = filter.page.max(1) as usize;
        let page_size = filter.page_size.max(1) as usize;
        let start = (page - 1) * page_size;
        let items = if start >= matching.len() {
            Vec::new()
        } else {
            matching[start..(start + page_size).min(matching.len())].to_vec()
        };
        Ok((items, total))
    }

    async fn write_audit_log(&self, entry: AuditLogEntry) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.db.put_cf(
            self.cf(CF_AUDIT_LOGS)?,
            self.next_seq_key(CF_AUDIT_LOGS, entry.expense_id)?,
            Self::encode(&entry)?,
        )?;
        Ok(())
    }

    async fn audit_trail(&self, expense_id: i64) -> Result<Vec<AuditLogEntry>> {
        self.scan_prefix(CF_AUDIT_LOGS, expense_id)
    }

    async fn approvals(&self, expense_id: i64) -> Result<Vec<ExpenseApproval>> {
        self.scan_prefix(CF_APPROVALS, expense_id)
    }

    async fn ping(&self) -> Result<()> {
        self.cf(CF_EXPENSES).map(|_| ())
    }
}
