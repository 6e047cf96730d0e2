/// quick start - sign in, apply, review
use loan_desk_rs::{DeskConfig, LoanDesk, LoanRequest, LoanType, MemoryStore, Money};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut desk = LoanDesk::open(MemoryStore::new(), DeskConfig::demo())?;

    desk.authenticate("borrower@example.com", "password")?;
    let loan = desk.apply_for_loan(
        LoanRequest::new(Money::from_major(50_000), "Rent")
            .loan_type(LoanType::Other)
            .description("Deposit and first month"),
    )?;
    println!("applied:  {} {} ({})", loan.id, loan.amount, loan.status);

    desk.authenticate("verifier@example.com", "password")?;
    let loan = desk.verify(loan.id)?;
    println!("verified: {}", loan.status);

    desk.authenticate("admin@example.com", "password")?;
    let loan = desk.approve(loan.id)?;
    println!("approved: {}", loan.status);

    Ok(())
}
