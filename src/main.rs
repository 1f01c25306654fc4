use clap::Parser;
use expenseflow::application::engine::ExpenseEngine;
use expenseflow::application::views::{ExpenseView, SubmitExpense};
use expenseflow::domain::policy::ApprovalPolicy;
use expenseflow::domain::ports::{ExpenseFilter, ExpenseStoreRef};
use expenseflow::domain::user::{Caller, UserRole};
use expenseflow::error::WorkflowError;
use expenseflow::infrastructure::channel::settlement_channel;
use expenseflow::infrastructure::gateway::RecordingGateway;
use expenseflow::infrastructure::in_memory::InMemoryExpenseStore;
#[cfg(feature = "storage-rocksdb")]
use expenseflow::infrastructure::rocksdb::RocksDbExpenseStore;
use expenseflow::interfaces::csv::command_reader::{CommandKind, CommandReader, WorkflowCommand};
use expenseflow::interfaces::csv::expense_writer::ExpenseWriter;
use expenseflow::interfaces::messaging;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input workflow commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Minimum accepted expense amount
    #[arg(long, env = "MIN_EXPENSE_AMOUNT", default_value = "10000")]
    min_amount: Decimal,

    /// Maximum accepted expense amount
    #[arg(long, env = "MAX_EXPENSE_AMOUNT", default_value = "50000000")]
    max_amount: Decimal,

    /// Amounts strictly below this skip manager review
    #[arg(long, env = "APPROVAL_THRESHOLD", default_value = "1000000")]
    auto_approve_below: Decimal,

    /// Allow admins to approve and reject in addition to managers
    #[arg(long, env = "ADMINS_CAN_APPROVE")]
    admins_can_approve: bool,

    /// Deliveries per settlement message before dead-lettering
    #[arg(long, default_value_t = 5)]
    max_redeliveries: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let policy = ApprovalPolicy {
        min_amount: cli.min_amount,
        max_amount: cli.max_amount,
        auto_approve_below: cli.auto_approve_below,
        admins_can_approve: cli.admins_can_approve,
    };

    let store = build_store(&cli)?;
    let gateway = Arc::new(RecordingGateway::new());
    let (publisher, mut consumer) = settlement_channel(cli.max_redeliveries);
    let engine = Arc::new(ExpenseEngine::new(
        store,
        gateway,
        Arc::new(publisher),
        policy,
    ));

    // Refuse to start against a dead store.
    engine.health_check().await.into_diagnostic()?;

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for command_result in reader.commands() {
        match command_result {
            Ok(command) => {
                if let Err(err) = apply_command(&engine, &command).await {
                    warn!(error = %err, "command failed");
                    eprintln!("Error applying command: {err}");
                }
            }
            Err(err) => {
                eprintln!("Error reading command: {err}");
            }
        }
    }

    // Settle whatever the replay queued.
    messaging::drain_settlements(&engine, &mut consumer).await;

    let report = collect_report(&engine).await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = ExpenseWriter::new(stdout.lock());
    writer.write_expenses(&report).into_diagnostic()?;

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn build_store(cli: &Cli) -> Result<ExpenseStoreRef> {
    if let Some(db_path) = &cli.db_path {
        let store = RocksDbExpenseStore::open(db_path).into_diagnostic()?;
        return Ok(Arc::new(store));
    }
    Ok(Arc::new(InMemoryExpenseStore::new()))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn build_store(_cli: &Cli) -> Result<ExpenseStoreRef> {
    Ok(Arc::new(InMemoryExpenseStore::new()))
}

async fn apply_command(
    engine: &ExpenseEngine,
    command: &WorkflowCommand,
) -> expenseflow::error::Result<()> {
    let caller = command.caller();
    match command.op {
        CommandKind::Submit => {
            let amount = command.amount.ok_or_else(|| {
                WorkflowError::Validation("submit requires an amount".to_string())
            })?;
            engine
                .submit_expense(
                    Some(&caller),
                    SubmitExpense {
                        amount,
                        description: command.description.clone().unwrap_or_default(),
                        receipt_url: command.receipt.clone(),
                    },
                )
                .await?;
        }
        CommandKind::Approve => {
            let expense_id = expense_id(command)?;
            engine
                .approve_expense(Some(&caller), expense_id, notes(command))
                .await?;
        }
        CommandKind::Reject => {
            let expense_id = expense_id(command)?;
            engine
                .reject_expense(Some(&caller), expense_id, notes(command))
                .await?;
        }
    }
    Ok(())
}

fn expense_id(command: &WorkflowCommand) -> expenseflow::error::Result<i64> {
    command.expense.ok_or_else(|| {
        WorkflowError::Validation("approval commands require an expense id".to_string())
    })
}

fn notes(command: &WorkflowCommand) -> &str {
    command.notes.as_deref().unwrap_or_default()
}

/// Pages through the full expense table with a reporting identity so the
/// final state comes out the same way any client would read it.
async fn collect_report(engine: &ExpenseEngine) -> expenseflow::error::Result<Vec<ExpenseView>> {
    let reporter = Caller::new(0, "report@batch.local", UserRole::Manager);
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let listing = engine
            .list_expenses(
                Some(&reporter),
                ExpenseFilter {
                    page,
                    page_size: 50,
                    ..Default::default()
                },
            )
            .await?;
        if listing.expenses.is_empty() {
            break;
        }
        all.extend(listing.expenses);
        if all.len() as u64 >= listing.total {
            break;
        }
        page += 1;
    }
    Ok(all)
}
