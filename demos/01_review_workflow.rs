/// review workflow - every failure a reviewer can hit
use loan_desk_rs::{DeskConfig, DeskError, LoanDesk, LoanFilter, LoanRequest, LoanStatus, MemoryStore, Money, Uuid};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== review workflow ===\n");

    let mut desk = LoanDesk::open(MemoryStore::new(), DeskConfig::demo())?;

    desk.authenticate("borrower@example.com", "password")?;
    let first = desk.apply_for_loan(LoanRequest::new(Money::from_major(100_000), "Payment not going through"))?;
    let second = desk.apply_for_loan(LoanRequest::new(Money::from_major(150_000), "Referral Bonus"))?;

    match desk.apply_for_loan(LoanRequest::new(Money::ZERO, "Nothing")) {
        Err(e @ DeskError::ValidationError { .. }) => println!("zero amount:        {e}"),
        other => println!("unexpected: {other:?}"),
    }
    match desk.verify(first.id) {
        Err(e @ DeskError::Forbidden { .. }) => println!("borrower verifies:  {e}"),
        other => println!("unexpected: {other:?}"),
    }

    desk.authenticate("verifier@example.com", "password")?;
    desk.verify(first.id)?;
    desk.reject(second.id)?;
    match desk.reject(first.id) {
        Err(e @ DeskError::Forbidden { .. }) => println!("verifier rejects a verified loan: {e}"),
        other => println!("unexpected: {other:?}"),
    }
    match desk.verify(Uuid::new_v4()) {
        Err(e @ DeskError::NotFound { .. }) => println!("unknown loan:       {e}"),
        other => println!("unexpected: {other:?}"),
    }

    desk.authenticate("admin@example.com", "password")?;
    desk.approve(first.id)?;
    match desk.reject(first.id) {
        Err(e @ DeskError::InvalidTransition { .. }) => println!("reject approved:    {e}"),
        other => println!("unexpected: {other:?}"),
    }

    println!();
    for status in LoanStatus::ALL {
        let count = desk.list_loans(&LoanFilter::new().status(status)).len();
        println!("{status:>9}: {count}");
    }

    println!("\nchange events:");
    for event in desk.take_events() {
        println!("  {event:?}");
    }

    Ok(())
}
