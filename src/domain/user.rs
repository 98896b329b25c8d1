use super::money::{Amount, Balance};
use super::UserId;
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Client,
    Developer,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Client => "client",
            UserRole::Developer => "developer",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A marketplace participant and the owner of a ledger balance.
///
/// `balance` only changes through [`User::credit`] and [`User::debit`], both of
/// which bump `version`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: UserRole,
    pub balance: Balance,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, role: UserRole, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            balance: Balance::ZERO,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds funds to the balance, refusing a total that would overflow.
    pub fn credit(&mut self, amount: Amount, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(EngineError::InvalidAmount(amount.value()))?;
        self.version += 1;
        self.updated_at = now;
        Ok(())
    }

    /// Removes funds from the balance if sufficient.
    pub fn debit(&mut self, amount: Amount, now: DateTime<Utc>) -> Result<(), EngineError> {
        match self.balance.checked_sub(amount) {
            Some(remaining) => {
                self.balance = remaining;
                self.version += 1;
                self.updated_at = now;
                Ok(())
            }
            None => Err(EngineError::InsufficientBalance {
                user_id: self.id,
                requested: amount.value(),
                available: self.balance.value(),
            }),
        }
    }
}
