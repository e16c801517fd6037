//! Loan Ledger - replay runner
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────────┐    ┌──────────┐
//! │  Config  │───▶│ Fixtures │───▶│ LoanMachine  │───▶│  Output  │
//! │  (YAML)  │    │  (CSV)   │    │  (dispatch)  │    │(CSV/JSON)│
//! └──────────┘    └──────────┘    └──────────────┘    └──────────┘
//! ```
//!
//! Commands are applied one at a time, in file order. A rejected command
//! is logged and counted; the run continues.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use loan_ledger::config::AppConfig;
use loan_ledger::csv_io::{
    BALANCES_FINAL_CSV, BALANCES_INIT_CSV, COMMANDS_CSV, EVENTS_JSONL, LEDGER_CSV,
    LOANS_FINAL_CSV, dump_balances, dump_events, dump_loans, load_balances_and_mint,
    load_commands,
};
use loan_ledger::ledger::{LedgerEntry, LedgerWriter};
use loan_ledger::loan::LoanStore;
use loan_ledger::logging::init_logging;
use loan_ledger::{BlockContext, LoanMachine, LoanState, MemoryBank, MemoryLoanStore};

// ============================================================
// ARGUMENTS
// ============================================================

fn get_arg(names: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if names.contains(&args[i].as_str()) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

fn get_env() -> String {
    get_arg(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string())
}

// ============================================================
// MAIN
// ============================================================

fn main() -> Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env)?;
    let _log_guard = init_logging(&config);

    let input_dir = PathBuf::from(get_arg(&["--input"]).unwrap_or(config.replay.input_dir.clone()));
    let output_dir =
        PathBuf::from(get_arg(&["--output"]).unwrap_or(config.replay.output_dir.clone()));
    let prefix = config.replay.address_prefix.as_str();

    info!(
        env = %env,
        input = %input_dir.display(),
        output = %output_dir.display(),
        "Starting loan replay"
    );

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut bank = MemoryBank::new();
    let minted = load_balances_and_mint(input_dir.join(BALANCES_INIT_CSV), prefix, &mut bank)?;
    info!(rows = minted, "Genesis balances loaded");

    let commands = load_commands(input_dir.join(COMMANDS_CSV), prefix)?;
    info!(commands = commands.len(), "Commands loaded");

    run(commands, bank, &output_dir)
}

fn run(
    commands: Vec<loan_ledger::csv_io::Command>,
    bank: MemoryBank,
    output_dir: &Path,
) -> Result<()> {
    let mut machine = LoanMachine::new(MemoryLoanStore::new(), bank);
    let mut ledger = LedgerWriter::new(output_dir.join(LEDGER_CSV))?;
    let mut events = Vec::new();
    let mut accepted = 0u64;
    let mut rejected = 0u64;
    let mut corrupt = 0u64;

    let start = Instant::now();
    for (seq, cmd) in commands.into_iter().enumerate() {
        let action = cmd.msg.action();
        let caller = cmd.msg.creator().clone();
        let ctx = BlockContext::at(cmd.height);

        match machine.dispatch(&ctx, cmd.msg) {
            Ok(resp) => {
                accepted += 1;
                debug!(line = cmd.line, action = %action, ?resp, "Command applied");
            }
            Err(e) => {
                rejected += 1;
                if e.is_invariant_violation() {
                    corrupt += 1;
                }
                debug!(
                    line = cmd.line,
                    action = %action,
                    caller = %caller,
                    code = e.code(),
                    "Command rejected"
                );
            }
        }

        for movement in machine.ledger_mut().take_movements() {
            ledger.write_entry(&LedgerEntry {
                seq: seq as u64 + 1,
                height: cmd.height,
                action: action.as_str(),
                movement,
            })?;
        }
        events.extend(machine.take_events());
    }
    ledger.flush()?;
    let elapsed = start.elapsed();

    let (store, bank) = machine.into_parts();
    let loans = store.list();
    let open_loans = loans
        .iter()
        .filter(|l| LoanState::from_str_opt(&l.state).is_some_and(|s| !s.is_terminal()))
        .count();
    dump_loans(output_dir.join(LOANS_FINAL_CSV), &loans)?;
    dump_balances(output_dir.join(BALANCES_FINAL_CSV), &bank)?;
    dump_events(output_dir.join(EVENTS_JSONL), &events)?;

    if corrupt > 0 {
        error!(corrupt, "Replay hit corrupt loan records");
    }
    info!(
        accepted,
        rejected,
        open_loans,
        ledger_entries = ledger.entry_count(),
        events = events.len(),
        elapsed_us = elapsed.as_micros() as u64,
        "Replay complete"
    );
    println!(
        "Replay complete: {} accepted, {} rejected, {} ledger entries -> {}",
        accepted,
        rejected,
        ledger.entry_count(),
        output_dir.display()
    );
    Ok(())
}
