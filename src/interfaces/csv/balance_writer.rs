use crate::domain::UserId;
use crate::domain::user::{User, UserRole};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// One line of the final report.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct BalanceRow {
    pub user: UserId,
    pub role: UserRole,
    pub balance: Decimal,
}

impl BalanceRow {
    pub fn new(user: &User) -> Self {
        Self {
            user: user.id,
            role: user.role,
            balance: user.balance.value().normalize(),
        }
    }
}

/// Writes balance rows as CSV with a `user,role,balance` header.
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes `rows` sorted by user id and flushes.
    pub fn write_balances(&mut self, mut rows: Vec<BalanceRow>) -> Result<()> {
        rows.sort_by_key(|row| row.user);
        for row in rows {
            self.writer.serialize(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
