/// dashboard - stat cards, charts and the recent loans table
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use loan_desk_rs::{
    DeskConfig, LoanDesk, LoanFilter, LoanRequest, LoanType, MemoryStore, Money, SafeTimeProvider,
    SeriesMetric, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== dashboard ===\n");

    let time = Arc::new(SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap(),
    )));
    let control = time.test_control().unwrap();
    let mut desk = LoanDesk::open_with_time(MemoryStore::new(), DeskConfig::demo(), Arc::clone(&time))?;

    let purposes = ["Contact Email not Linked", "Referral Bonus", "Downtime since last week"];
    let types = [LoanType::DebtNet, LoanType::CreditNet, LoanType::FullyPaid, LoanType::Other];

    desk.authenticate("borrower@example.com", "password")?;
    let mut ids = Vec::new();
    for i in 0..12_i64 {
        let request = LoanRequest::new(Money::from_major((i % 4 + 1) * 50_000), purposes[i as usize % 3])
            .loan_type(types[i as usize % 4]);
        ids.push(desk.apply_for_loan(request)?.id);
        control.advance(Duration::days(9));
    }

    desk.authenticate("admin@example.com", "password")?;
    for (i, id) in ids.iter().enumerate() {
        match i % 4 {
            0 => {
                desk.verify(*id)?;
                desk.approve(*id)?;
            }
            1 => {
                desk.reject(*id)?;
            }
            2 => {
                desk.verify(*id)?;
            }
            _ => {}
        }
    }

    let stats = desk.dashboard();
    println!("active users   {}", stats.active_users);
    println!("borrowers      {}", stats.borrowers);
    println!("cash disbursed {}", stats.cash_disbursed.to_grouped_string());
    println!("loans          {}", stats.total_loans);
    println!("approval rate  {}", stats.approval_rate);

    println!("\nloans applied per month (2024):");
    for point in desk.monthly_series(2024, SeriesMetric::Applications) {
        println!("  {:>2} {}", point.label, "#".repeat(point.value.to_string().parse::<usize>().unwrap_or(0)));
    }

    println!("\nrecent loans:");
    for view in desk.loan_views(&LoanFilter::new(), 1) {
        println!(
            "  {:<26} {:<12} {:>8} {} {}",
            view.purpose, view.applicant.name, view.amount_display, view.date_applied, view.status
        );
    }

    Ok(())
}
