//! Loan Ledger - peer-to-peer collateralized loans
//!
//! A deterministic state machine for loans executed against an account
//! ledger: a borrower requests a loan with collateral, a lender funds it,
//! and the loan ends in repayment, liquidation after the deadline, or
//! cancellation before approval.
//!
//! # Modules
//!
//! - [`core_types`] - Core type definitions (LoanId, BlockHeight, Address)
//! - [`coins`] - Multi-denomination amounts and their text encoding
//! - [`bank`] - Account Ledger trait and in-memory bank
//! - [`loan`] - Loan records, store, state machine and dispatcher
//! - [`ledger`] - Movement audit log
//! - [`csv_io`] - Fixture loading and snapshot dumps
//! - [`config`] / [`logging`] - Process configuration and tracing setup

// Core types - must be first!
pub mod core_types;

// Money
pub mod bank;
pub mod coins;
pub mod ledger;

// Loans
pub mod loan;

// Process plumbing
pub mod config;
pub mod csv_io;
pub mod logging;

// Convenient re-exports at crate root
pub use bank::{Account, AccountLedger, LedgerError, MemoryBank};
pub use coins::{Coins, CoinsError, parse_coins};
pub use core_types::{Address, AddressError, BlockHeight, LoanId};
pub use loan::{
    BlockContext, Loan, LoanAction, LoanError, LoanEvent, LoanMachine, LoanMsg, LoanRequest,
    LoanResponse, LoanState, LoanStore, MemoryLoanStore, StoredLoan,
};
