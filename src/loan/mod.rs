//! Peer-to-peer collateralized loans
//!
//! # State Machine
//!
//! ```text
//! requested --approve--> approved --repay--> repayed
//!     |                      |
//!     |                      +--liquidate (height >= deadline)--> liquidated
//!     +--cancel--> cancelled
//! ```
//!
//! # Money Movements
//!
//! | Transition | Legs |
//! |---|---|
//! | request   | borrower → escrow: collateral |
//! | approve   | caller → borrower: amount |
//! | cancel    | escrow → borrower: collateral |
//! | liquidate | escrow → lender: collateral |
//! | repay     | borrower → lender: amount, fee; escrow → borrower: collateral |
//!
//! # Safety Invariants
//!
//! 1. **Stage-Then-Commit**: all legs validate before any applies
//! 2. **State Guard**: each transition requires an exact source state, so
//!    collateral leaves escrow at most once per loan
//! 3. **Lender Presence**: lender empty in `requested`/`cancelled`, set otherwise

pub mod error;
pub mod machine;
pub mod msg;
pub mod staging;
pub mod state;
pub mod store;
pub mod types;

pub use error::LoanError;
pub use machine::{BlockContext, LoanMachine};
pub use msg::{LoanEvent, LoanMsg, LoanResponse};
pub use state::LoanState;
pub use store::{LoanStore, MemoryLoanStore};
pub use types::{Loan, LoanAction, LoanRequest, StoredLoan};
