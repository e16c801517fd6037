use loan_ledger::{
    Account, AccountLedger, Address, BlockContext, LoanError, LoanMachine, LoanRequest,
    LoanState, LoanStore, MemoryBank, MemoryLoanStore, StoredLoan, parse_coins,
};

type Machine = LoanMachine<MemoryLoanStore, MemoryBank>;

fn addr(s: &str) -> Address {
    Address::parse(s).unwrap()
}

fn borrower() -> Address {
    addr("loan1borrower")
}

fn lender() -> Address {
    addr("loan1lender")
}

fn bal(m: &Machine, who: &Address, denom: &str) -> u128 {
    m.ledger().balance(&Account::user(who)).amount_of(denom)
}

fn escrow(m: &Machine, denom: &str) -> u128 {
    m.ledger().balance(&Account::Escrow).amount_of(denom)
}

/// Borrower holds 1000coin + 200stake, lender holds 1000coin.
/// Loan 0: amount 100coin, fee 5coin, collateral 50coin, deadline 1000.
fn setup() -> (Machine, u64) {
    let mut bank = MemoryBank::new();
    bank.mint(&borrower(), &parse_coins("1000coin,200stake").unwrap())
        .unwrap();
    bank.mint(&lender(), &parse_coins("1000coin").unwrap())
        .unwrap();
    let mut m = LoanMachine::new(MemoryLoanStore::new(), bank);

    let req = LoanRequest::parse("100coin", "5coin", "50coin", "1000").unwrap();
    let id = m.request(&BlockContext::at(1), &borrower(), req).unwrap();
    (m, id)
}

fn approved() -> (Machine, u64) {
    let (mut m, id) = setup();
    m.approve(&BlockContext::at(2), id, &lender()).unwrap();
    (m, id)
}

#[test]
fn test_request_escrows_collateral() {
    let (m, id) = setup();
    assert_eq!(bal(&m, &borrower(), "coin"), 950);
    assert_eq!(escrow(&m, "coin"), 50);

    let loan = m.get_loan(id).unwrap();
    assert_eq!(loan.state, LoanState::Requested);
    assert!(loan.lender.is_none());
    assert_eq!(m.store().get(id).unwrap().lender, "");
}

#[test]
fn test_approve_scenario() {
    let (mut m, id) = setup();
    m.approve(&BlockContext::at(2), id, &lender()).unwrap();

    assert_eq!(bal(&m, &lender(), "coin"), 900);
    assert_eq!(bal(&m, &borrower(), "coin"), 1050);

    let loan = m.get_loan(id).unwrap();
    assert_eq!(loan.state, LoanState::Approved);
    assert_eq!(loan.lender, Some(lender()));
    // Collateral untouched
    assert_eq!(escrow(&m, "coin"), 50);
}

#[test]
fn test_approve_not_found() {
    let (mut m, _) = setup();
    assert_eq!(
        m.approve(&BlockContext::at(2), 99, &lender()),
        Err(LoanError::NotFound(99))
    );
}

#[test]
fn test_cancel_returns_collateral_once() {
    let (mut m, id) = setup();
    m.cancel(&BlockContext::at(2), id, &borrower()).unwrap();

    assert_eq!(bal(&m, &borrower(), "coin"), 1000);
    assert_eq!(escrow(&m, "coin"), 0);
    assert_eq!(m.get_loan(id).unwrap().state, LoanState::Cancelled);

    // Second cancel: InvalidState, no second release
    let err = m.cancel(&BlockContext::at(3), id, &borrower()).unwrap_err();
    assert!(matches!(
        err,
        LoanError::InvalidState {
            state: LoanState::Cancelled,
            ..
        }
    ));
    assert_eq!(bal(&m, &borrower(), "coin"), 1000);
}

#[test]
fn test_cancel_by_stranger_is_unauthorized() {
    let (mut m, id) = setup();
    let err = m.cancel(&BlockContext::at(2), id, &lender()).unwrap_err();
    assert_eq!(err.code(), "UNAUTHORIZED");
    assert_eq!(escrow(&m, "coin"), 50);
}

#[test]
fn test_cancel_wrong_state_scenario() {
    let (mut m, id) = approved();
    let before_b = bal(&m, &borrower(), "coin");
    let before_l = bal(&m, &lender(), "coin");

    let err = m.cancel(&BlockContext::at(3), id, &borrower()).unwrap_err();
    assert!(matches!(
        err,
        LoanError::InvalidState {
            state: LoanState::Approved,
            ..
        }
    ));
    assert_eq!(bal(&m, &borrower(), "coin"), before_b);
    assert_eq!(bal(&m, &lender(), "coin"), before_l);
    assert_eq!(escrow(&m, "coin"), 50);
}

#[test]
fn test_liquidate_before_deadline_scenario() {
    let (mut m, id) = approved();
    let err = m.liquidate(&BlockContext::at(500), id, &lender()).unwrap_err();
    assert_eq!(
        err,
        LoanError::DeadlineNotReached {
            deadline: 1000,
            height: 500
        }
    );
    assert_eq!(m.get_loan(id).unwrap().state, LoanState::Approved);
    assert_eq!(escrow(&m, "coin"), 50);
}

#[test]
fn test_liquidate_at_deadline() {
    let (mut m, id) = approved();
    m.liquidate(&BlockContext::at(1000), id, &lender()).unwrap();

    assert_eq!(bal(&m, &lender(), "coin"), 950);
    assert_eq!(escrow(&m, "coin"), 0);
    assert_eq!(m.get_loan(id).unwrap().state, LoanState::Liquidated);

    // No double payout
    let err = m.liquidate(&BlockContext::at(1001), id, &lender()).unwrap_err();
    assert_eq!(err.code(), "INVALID_STATE");
    assert_eq!(bal(&m, &lender(), "coin"), 950);
}

#[test]
fn test_liquidate_by_borrower_is_unauthorized() {
    let (mut m, id) = approved();
    let err = m
        .liquidate(&BlockContext::at(2000), id, &borrower())
        .unwrap_err();
    assert_eq!(err.code(), "UNAUTHORIZED");
}

#[test]
fn test_repay_scenario() {
    let (mut m, id) = approved();
    let b0 = bal(&m, &borrower(), "coin");
    let l0 = bal(&m, &lender(), "coin");

    m.repay(&BlockContext::at(10), id, &borrower()).unwrap();

    // Lender +105, borrower -105 +50 collateral
    assert_eq!(bal(&m, &lender(), "coin"), l0 + 105);
    assert_eq!(bal(&m, &borrower(), "coin"), b0 - 105 + 50);
    assert_eq!(escrow(&m, "coin"), 0);
    assert_eq!(m.get_loan(id).unwrap().state, LoanState::Repayed);

    // Second repay: InvalidState, balances unchanged
    let err = m.repay(&BlockContext::at(11), id, &borrower()).unwrap_err();
    assert_eq!(err.code(), "INVALID_STATE");
    assert_eq!(bal(&m, &lender(), "coin"), l0 + 105);
    assert_eq!(bal(&m, &borrower(), "coin"), b0 - 55);
}

#[test]
fn test_repay_after_deadline_still_allowed() {
    let (mut m, id) = approved();
    m.repay(&BlockContext::at(5000), id, &borrower()).unwrap();
    let err = m.liquidate(&BlockContext::at(5001), id, &lender()).unwrap_err();
    assert_eq!(err.code(), "INVALID_STATE");
}

#[test]
fn test_approve_twice_is_invalid_state() {
    let (mut m, id) = approved();
    let other = addr("loan1other");
    m.ledger_mut()
        .transfer(&lender(), &other, &parse_coins("500coin").unwrap())
        .unwrap();

    let err = m.approve(&BlockContext::at(3), id, &other).unwrap_err();
    assert_eq!(err.code(), "INVALID_STATE");
    assert_eq!(bal(&m, &other, "coin"), 500);
    assert_eq!(m.get_loan(id).unwrap().lender, Some(lender()));
}

#[test]
fn test_non_interference_between_loans() {
    let (mut m, a) = approved();
    let req = LoanRequest::parse("10coin", "1coin", "30stake", "2000").unwrap();
    let b = m.request(&BlockContext::at(3), &borrower(), req).unwrap();
    let b_before = m.store().get(b).unwrap();

    m.liquidate(&BlockContext::at(1000), a, &lender()).unwrap();

    // Loan B's record and escrowed collateral are untouched
    assert_eq!(m.store().get(b).unwrap(), b_before);
    assert_eq!(escrow(&m, "stake"), 30);
    m.cancel(&BlockContext::at(1001), b, &borrower()).unwrap();
    assert_eq!(bal(&m, &borrower(), "stake"), 200);
}

#[test]
fn test_pooled_escrow_cannot_overpay() {
    // A corrupt record claiming more collateral than the pool holds
    let mut store = MemoryLoanStore::new();
    store.put(StoredLoan {
        id: 0,
        amount: "10coin".into(),
        fee: String::new(),
        collateral: "999coin".into(),
        deadline: "5".into(),
        state: "requested".into(),
        borrower: "loan1borrower".into(),
        lender: String::new(),
    });
    let mut m = LoanMachine::new(store, MemoryBank::new());

    let err = m.cancel(&BlockContext::at(1), 0, &borrower()).unwrap_err();
    assert!(matches!(err, LoanError::LedgerTransferFailed(_)));
    assert_eq!(m.get_loan(0).unwrap().state, LoanState::Requested);
}

#[test]
fn test_event_trail() {
    let (mut m, id) = approved();
    m.repay(&BlockContext::at(10), id, &borrower()).unwrap();

    let kinds: Vec<String> = m
        .take_events()
        .iter()
        .map(|e| serde_json::to_value(e).unwrap()["type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["requested", "approved", "repayed"]);
}

#[test]
fn test_repay_by_non_borrower_on_approved_loan() {
    let (mut m, id) = approved();
    let b0 = bal(&m, &borrower(), "coin");
    let l0 = bal(&m, &lender(), "coin");

    for caller in [lender(), addr("loan1stranger")] {
        let err = m.repay(&BlockContext::at(10), id, &caller).unwrap_err();
        assert!(matches!(err, LoanError::Unauthorized { role: "borrower", .. }));
    }

    assert_eq!(bal(&m, &borrower(), "coin"), b0);
    assert_eq!(bal(&m, &lender(), "coin"), l0);
    assert_eq!(escrow(&m, "coin"), 50);
    assert_eq!(m.get_loan(id).unwrap().state, LoanState::Approved);
}

#[test]
fn test_repay_self_funded_loan() {
    let mut bank = MemoryBank::new();
    bank.mint(&borrower(), &parse_coins("100coin,50stake").unwrap())
        .unwrap();
    let mut m = LoanMachine::new(MemoryLoanStore::new(), bank);

    let req = LoanRequest::parse("100coin", "5coin", "50stake", "100").unwrap();
    let id = m.request(&BlockContext::at(1), &borrower(), req).unwrap();
    m.approve(&BlockContext::at(2), id, &borrower()).unwrap();
    assert_eq!(bal(&m, &borrower(), "coin"), 100);

    // Amount and fee are covered leg by leg even though 100 < 105
    m.repay(&BlockContext::at(3), id, &borrower()).unwrap();

    assert_eq!(bal(&m, &borrower(), "coin"), 100);
    assert_eq!(bal(&m, &borrower(), "stake"), 50);
    assert!(m.ledger().balance(&Account::Escrow).is_empty());
    assert_eq!(m.get_loan(id).unwrap().state, LoanState::Repayed);
}

#[test]
fn test_multi_denom_approve_and_repay() {
    let mut bank = MemoryBank::new();
    bank.mint(&borrower(), &parse_coins("1000coin,200stake").unwrap())
        .unwrap();
    bank.mint(&lender(), &parse_coins("1000coin,50atom").unwrap())
        .unwrap();
    bank.mint(&addr("loan1nosatom"), &parse_coins("500coin").unwrap())
        .unwrap();
    let mut m = LoanMachine::new(MemoryLoanStore::new(), bank);

    let req = LoanRequest::parse("100coin,10atom", "5coin,1atom", "50stake", "1000").unwrap();
    let id = m.request(&BlockContext::at(1), &borrower(), req).unwrap();

    // Covers coin but not atom: nothing moves
    let poor = addr("loan1nosatom");
    let err = m.approve(&BlockContext::at(2), id, &poor).unwrap_err();
    assert!(matches!(err, LoanError::LedgerTransferFailed(_)));
    assert_eq!(bal(&m, &poor, "coin"), 500);
    assert_eq!(bal(&m, &borrower(), "coin"), 1000);
    assert_eq!(m.get_loan(id).unwrap().state, LoanState::Requested);

    m.approve(&BlockContext::at(3), id, &lender()).unwrap();
    assert_eq!(bal(&m, &borrower(), "coin"), 1100);
    assert_eq!(bal(&m, &borrower(), "atom"), 10);
    assert_eq!(bal(&m, &lender(), "atom"), 40);

    // 11atom owed, 10atom held: rejected without a partial payment
    let err = m.repay(&BlockContext::at(4), id, &borrower()).unwrap_err();
    assert!(matches!(err, LoanError::LedgerTransferFailed(_)));
    assert_eq!(bal(&m, &borrower(), "coin"), 1100);
    assert_eq!(bal(&m, &lender(), "coin"), 900);
    assert_eq!(escrow(&m, "stake"), 50);

    m.ledger_mut()
        .mint(&borrower(), &parse_coins("1atom").unwrap())
        .unwrap();
    m.repay(&BlockContext::at(5), id, &borrower()).unwrap();

    assert_eq!(bal(&m, &lender(), "coin"), 1005);
    assert_eq!(bal(&m, &lender(), "atom"), 51);
    assert_eq!(bal(&m, &borrower(), "coin"), 995);
    assert_eq!(bal(&m, &borrower(), "atom"), 0);
    assert_eq!(bal(&m, &borrower(), "stake"), 200);
    assert!(m.ledger().balance(&Account::Escrow).is_empty());
}
