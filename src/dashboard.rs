//! Figures behind the dashboard's stat cards and charts.

use chrono::Datelike;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::identity::Identity;
use crate::lifecycle::LoanApplication;
use crate::types::{LoanStatus, Role};

/// stat card figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub active_users: usize,
    pub admins: usize,
    pub verifiers: usize,
    pub borrowers: usize,
    pub total_loans: usize,
    pub pending_loans: usize,
    pub verified_loans: usize,
    pub approved_loans: usize,
    pub rejected_loans: usize,
    pub amount_requested: Money,
    /// sum of approved amounts
    pub cash_disbursed: Money,
    /// amounts still waiting for a decision (pending + verified)
    pub amount_under_review: Money,
    /// approved / (approved + rejected)
    pub approval_rate: Rate,
    /// rejected / (approved + rejected)
    pub rejection_rate: Rate,
}

impl DashboardStats {
    pub fn compute(identities: &[Identity], loans: &[LoanApplication]) -> Self {
        let role_count = |role: Role| identities.iter().filter(|i| i.role == role).count();
        let status_count = |status: LoanStatus| loans.iter().filter(|l| l.status == status).count();
        let amount_where = |pred: &dyn Fn(LoanStatus) -> bool| -> Money {
            loans.iter().filter(|l| pred(l.status)).map(|l| l.amount).sum()
        };

        let approved = status_count(LoanStatus::Approved);
        let rejected = status_count(LoanStatus::Rejected);
        let decided = approved + rejected;

        Self {
            active_users: identities.len(),
            admins: role_count(Role::Admin),
            verifiers: role_count(Role::Verifier),
            borrowers: role_count(Role::Borrower),
            total_loans: loans.len(),
            pending_loans: status_count(LoanStatus::Pending),
            verified_loans: status_count(LoanStatus::Verified),
            approved_loans: approved,
            rejected_loans: rejected,
            amount_requested: amount_where(&|_| true),
            cash_disbursed: amount_where(&|s| s == LoanStatus::Approved),
            amount_under_review: amount_where(&|s| !s.is_terminal()),
            approval_rate: Rate::from_ratio(approved, decided),
            rejection_rate: Rate::from_ratio(rejected, decided),
        }
    }
}

/// what a monthly chart plots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesMetric {
    /// number of applications, by month applied
    Applications,
    /// requested amounts, by month applied
    AmountApplied,
    /// approved amounts, by month of the approval
    AmountApproved,
}

/// one bar or point of a chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: Decimal,
}

/// twelve points labelled "1" to "12" for `year`
pub fn monthly_series(loans: &[LoanApplication], year: i32, metric: SeriesMetric) -> Vec<ChartPoint> {
    let mut buckets = [Decimal::ZERO; 12];

    for loan in loans {
        let (when, value) = match metric {
            SeriesMetric::Applications => (loan.created_at, Decimal::ONE),
            SeriesMetric::AmountApplied => (loan.created_at, loan.amount.as_decimal()),
            SeriesMetric::AmountApproved if loan.status == LoanStatus::Approved => {
                (loan.updated_at, loan.amount.as_decimal())
            }
            SeriesMetric::AmountApproved => continue,
        };
        if when.year() == year {
            buckets[when.month0() as usize] += value;
        }
    }

    buckets
        .iter()
        .enumerate()
        .map(|(i, value)| ChartPoint {
            label: (i + 1).to_string(),
            value: *value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::NewIdentity;
    use crate::lifecycle::{LoanBook, LoanRequest};
    use chrono::{TimeZone, Utc};
    use hourglass_rs::{SafeTimeProvider, TimeSource};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn identity(role: Role) -> Identity {
        let email = format!("{}-{}@example.com", role, Uuid::new_v4());
        Identity::from_new(Uuid::new_v4(), NewIdentity::new("Someone", email, role))
    }

    #[test]
    fn test_empty_dashboard() {
        let stats = DashboardStats::compute(&[], &[]);
        assert_eq!(stats.total_loans, 0);
        assert_eq!(stats.cash_disbursed, Money::ZERO);
        assert_eq!(stats.approval_rate, Rate::ZERO);
    }

    #[test]
    fn test_stats_from_book() {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
        ));
        let control = time.test_control().unwrap();
        let admin = Some(identity(Role::Admin));
        let borrower = identity(Role::Borrower);
        let mut book = LoanBook::default();

        let amounts = [50_000, 100_000, 150_000, 200_000];
        let ids: Vec<_> = amounts
            .iter()
            .map(|a| book.apply(&borrower, LoanRequest::new(Money::from_major(*a), "Working capital"), &time).unwrap().id)
            .collect();

        // march: approve the first two, reject the third, leave the fourth pending
        control.advance(chrono::Duration::days(50));
        for id in &ids[..3] {
            book.verify(&admin, *id, &time).unwrap();
        }
        book.approve(&admin, ids[0], &time).unwrap();
        book.approve(&admin, ids[1], &time).unwrap();
        book.reject(&admin, ids[2], &time).unwrap();

        let identities = vec![admin.clone().unwrap(), borrower.clone(), identity(Role::Verifier)];
        let stats = DashboardStats::compute(&identities, book.all());

        assert_eq!(stats.active_users, 3);
        assert_eq!((stats.admins, stats.verifiers, stats.borrowers), (1, 1, 1));
        assert_eq!(stats.total_loans, 4);
        assert_eq!((stats.pending_loans, stats.verified_loans), (1, 0));
        assert_eq!((stats.approved_loans, stats.rejected_loans), (2, 1));
        assert_eq!(stats.amount_requested, Money::from_major(500_000));
        assert_eq!(stats.cash_disbursed, Money::from_major(150_000));
        assert_eq!(stats.amount_under_review, Money::from_major(200_000));
        assert_eq!(stats.approval_rate.as_percentage(), dec!(66.67));
        assert_eq!(stats.rejection_rate.as_percentage(), dec!(33.33));

        let applied = monthly_series(book.all(), 2024, SeriesMetric::Applications);
        assert_eq!(applied.len(), 12);
        assert_eq!(applied[0].label, "1");
        assert_eq!(applied[0].value, dec!(4));
        assert_eq!(applied[11].label, "12");

        let approved = monthly_series(book.all(), 2024, SeriesMetric::AmountApproved);
        assert_eq!(approved[0].value, Decimal::ZERO);
        assert_eq!(approved[2].value, dec!(150000));

        let requested = monthly_series(book.all(), 2024, SeriesMetric::AmountApplied);
        assert_eq!(requested[0].value, dec!(500000));

        let other_year = monthly_series(book.all(), 2023, SeriesMetric::Applications);
        assert!(other_year.iter().all(|p| p.value.is_zero()));
    }
}
