//! CSV I/O - Load fixtures and save snapshots
//!
//! Multi-denomination values inside a CSV field use `;` between coins
//! (`100coin;5stake`), since `,` is the column separator.

use anyhow::{Context, Result, bail, ensure};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::bank::MemoryBank;
use crate::coins::parse_coins;
use crate::core_types::{Address, BlockHeight};
use crate::loan::{LoanAction, LoanEvent, LoanMsg, LoanRequest, StoredLoan};

// ============================================================
// Constants for file names
// ============================================================

pub const BALANCES_INIT_CSV: &str = "balances_init.csv";
pub const COMMANDS_CSV: &str = "commands.csv";
pub const LEDGER_CSV: &str = "ledger.csv";
pub const LOANS_FINAL_CSV: &str = "loans_final.csv";
pub const BALANCES_FINAL_CSV: &str = "balances_final.csv";
pub const EVENTS_JSONL: &str = "events.jsonl";

/// One scripted command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// 1-based line in the source file
    pub line: usize,
    pub height: BlockHeight,
    pub msg: LoanMsg,
}

// ============================================================
// Loading
// ============================================================

fn parse_address(raw: &str, prefix: &str, line: usize) -> Result<Address> {
    let addr = Address::parse(raw.trim())
        .with_context(|| format!("Invalid address '{}' at line {}", raw, line))?;
    ensure!(
        addr.prefix() == prefix,
        "Address '{}' at line {} does not use prefix '{}'",
        addr,
        line,
        prefix
    );
    Ok(addr)
}

fn coin_field(raw: &str) -> String {
    raw.trim().replace(';', ",")
}

/// Load genesis balances (`address,denom,amount`) and mint them.
///
/// Returns the number of rows applied.
pub fn load_balances_and_mint(
    path: impl AsRef<Path>,
    prefix: &str,
    bank: &mut MemoryBank,
) -> Result<usize> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut count = 0;

    for (idx, line) in reader.lines().enumerate().skip(1) {
        let line = line?;
        let line_num = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split(',').collect();
        ensure!(parts.len() == 3, "Expected 3 columns at line {}", line_num);

        let addr = parse_address(parts[0], prefix, line_num)?;
        let coins = parse_coins(&format!("{}{}", parts[2].trim(), parts[1].trim()))
            .with_context(|| format!("Invalid balance at line {}", line_num))?;
        bank.mint(&addr, &coins)
            .with_context(|| format!("Mint failed at line {}", line_num))?;
        count += 1;
    }
    Ok(count)
}

/// Load the command script.
///
/// Columns: `height,action,caller,id,amount,fee,collateral,deadline`.
/// `id` is empty for `request`; the terms are empty for the others.
/// Heights must be non-decreasing.
pub fn load_commands(path: impl AsRef<Path>, prefix: &str) -> Result<Vec<Command>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut commands = Vec::new();
    let mut last_height: BlockHeight = 0;

    for (idx, line) in reader.lines().enumerate().skip(1) {
        let line = line?;
        let line_num = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split(',').collect();
        ensure!(parts.len() == 8, "Expected 8 columns at line {}", line_num);

        let height: BlockHeight = parts[0]
            .trim()
            .parse()
            .with_context(|| format!("Invalid height at line {}", line_num))?;
        ensure!(
            height >= last_height,
            "Height goes backwards at line {} ({} < {})",
            line_num,
            height,
            last_height
        );
        last_height = height;

        let action = LoanAction::from_str_opt(parts[1].trim())
            .with_context(|| format!("Unknown action '{}' at line {}", parts[1], line_num))?;
        let creator = parse_address(parts[2], prefix, line_num)?;

        let msg = if action == LoanAction::Request {
            let request = LoanRequest::parse(
                &coin_field(parts[4]),
                &coin_field(parts[5]),
                &coin_field(parts[6]),
                parts[7],
            )
            .with_context(|| format!("Invalid loan terms at line {}", line_num))?;
            LoanMsg::Request { creator, request }
        } else {
            let id = parts[3]
                .trim()
                .parse()
                .with_context(|| format!("Invalid loan id at line {}", line_num))?;
            match action {
                LoanAction::Approve => LoanMsg::Approve { creator, id },
                LoanAction::Cancel => LoanMsg::Cancel { creator, id },
                LoanAction::Liquidate => LoanMsg::Liquidate { creator, id },
                LoanAction::Repay => LoanMsg::Repay { creator, id },
                LoanAction::Request => bail!("unreachable request at line {}", line_num),
            }
        };

        commands.push(Command {
            line: line_num,
            height,
            msg,
        });
    }
    Ok(commands)
}

// ============================================================
// Output
// ============================================================

/// Dump all loan records in storage form
pub fn dump_loans(path: impl AsRef<Path>, loans: &[StoredLoan]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "id,state,borrower,lender,amount,fee,collateral,deadline")?;
    for loan in loans {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            loan.id,
            loan.state,
            loan.borrower,
            loan.lender,
            loan.amount.replace(',', ";"),
            loan.fee.replace(',', ";"),
            loan.collateral.replace(',', ";"),
            loan.deadline
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Dump every non-empty balance as `account,denom,amount`
pub fn dump_balances(path: impl AsRef<Path>, bank: &MemoryBank) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "account,denom,amount")?;
    for (account, coins) in bank.accounts() {
        for (denom, amount) in coins.iter() {
            writeln!(out, "{},{},{}", account, denom, amount)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Append events as JSON lines
pub fn dump_events(path: impl AsRef<Path>, events: &[LoanEvent]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for event in events {
        serde_json::to_writer(&mut out, event)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::{Account, AccountLedger};

    fn write_tmp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}_{}", std::process::id(), name));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_balances() {
        let path = write_tmp(
            "balances.csv",
            "address,denom,amount\nloan1alice,coin,100\nloan1alice,stake,5\n\n",
        );
        let mut bank = MemoryBank::new();
        let n = load_balances_and_mint(&path, "loan", &mut bank).unwrap();
        assert_eq!(n, 2);
        let alice = Address::parse("loan1alice").unwrap();
        assert_eq!(bank.balance(&Account::user(&alice)).to_string(), "100coin,5stake");

        let mut bank = MemoryBank::new();
        assert!(load_balances_and_mint(&path, "cosmos", &mut bank).is_err());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_load_commands() {
        let path = write_tmp(
            "commands.csv",
            "height,action,caller,id,amount,fee,collateral,deadline\n\
             1,request,loan1bob,,100coin,5coin,50stake;10atom,20\n\
             2,approve,loan1alice,0,,,,\n\
             30,liquidate,loan1alice,0,,,,\n",
        );
        let commands = load_commands(&path, "loan").unwrap();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].line, 2);
        match &commands[0].msg {
            LoanMsg::Request { request, .. } => {
                assert_eq!(request.collateral.to_string(), "10atom,50stake");
                assert_eq!(request.deadline, 20);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(commands[2].height, 30);
        assert_eq!(commands[2].msg.action(), LoanAction::Liquidate);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_load_commands_rejects_backwards_height() {
        let path = write_tmp(
            "backwards.csv",
            "height,action,caller,id,amount,fee,collateral,deadline\n\
             5,approve,loan1alice,0,,,,\n\
             4,approve,loan1alice,1,,,,\n",
        );
        assert!(load_commands(&path, "loan").is_err());
        let _ = std::fs::remove_file(path);
    }
}
