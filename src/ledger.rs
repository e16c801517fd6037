//! Ledger - Movement audit log
//!
//! Records every balance change for complete auditability. One line per
//! account per denomination per transfer.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::bank::Movement;
use crate::core_types::{BlockHeight, SeqNum};

/// Ledger entry for audit
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub seq: SeqNum,
    pub height: BlockHeight,
    pub action: &'static str,
    pub movement: Movement,
}

/// Writes ledger entries to CSV file
pub struct LedgerWriter {
    out: BufWriter<File>,
    entry_count: u64,
}

impl LedgerWriter {
    pub const HEADER: &'static str = "seq,height,action,account,denom,op,delta,balance_after";

    /// Create a new ledger writer at the given path
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "{}", Self::HEADER)?;
        Ok(LedgerWriter {
            out,
            entry_count: 0,
        })
    }

    /// Write a single ledger entry
    pub fn write_entry(&mut self, entry: &LedgerEntry) -> io::Result<()> {
        let m = &entry.movement;
        writeln!(
            self.out,
            "{},{},{},{},{},{},{},{}",
            entry.seq,
            entry.height,
            entry.action,
            m.account,
            m.denom,
            m.op.as_str(),
            m.delta,
            m.balance_after
        )?;
        self.entry_count += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Get total number of entries written
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }
}
