//! Bill-number strategies.
//!
//! Bill numbers are generated once, when a bill is first written, inside the ledger's
//! transaction. Two strategies ship: a per-restaurant counter kept in `system_state`, and a
//! dated random code checked against existing bills.

use crate::{
    config::{BillingSettings, NumberingScheme},
    entities::{SystemState, Transaction, system_state, transaction},
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::Utc;
use rand::{Rng, distributions::Alphanumeric};
use sea_orm::{DatabaseTransaction, PaginatorTrait, Set, prelude::*, sea_query::Expr};
use std::sync::Arc;
use tracing::debug;

const RANDOM_SUFFIX_LEN: usize = 6;

/// Produces the human-readable number of a new bill.
#[async_trait]
pub trait BillNumbering: Send + Sync {
    /// Returns a number no existing bill uses.
    async fn next_bill_number(&self, txn: &DatabaseTransaction, restaurant_id: i64)
    -> Result<String>;
}

/// Builds the strategy selected in configuration.
#[must_use]
pub fn from_settings(settings: &BillingSettings) -> Arc<dyn BillNumbering> {
    match settings.numbering {
        NumberingScheme::Sequential => Arc::new(SequentialBillNumbers::new(&settings.prefix)),
        NumberingScheme::Random => Arc::new(RandomBillNumbers::new(
            &settings.prefix,
            settings.max_attempts,
        )),
    }
}

/// `PREFIX-<restaurant>-<000001>`, counting per restaurant.
#[derive(Debug, Clone)]
pub struct SequentialBillNumbers {
    prefix: String,
}

impl SequentialBillNumbers {
    /// Creates the strategy with the given prefix.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }
}

fn sequence_key(restaurant_id: i64) -> String {
    format!("bill_seq:{restaurant_id}")
}

/// Advances the restaurant's counter and returns the new value.
///
/// The counter row is touched before it is read so concurrent bills queue on its lock.
async fn next_sequence_value(txn: &DatabaseTransaction, restaurant_id: i64) -> Result<u64> {
    let key = sequence_key(restaurant_id);
    let now = Utc::now().naive_utc();

    SystemState::update_many()
        .col_expr(system_state::Column::UpdatedAt, Expr::value(now))
        .filter(system_state::Column::Key.eq(key.as_str()))
        .exec(txn)
        .await?;

    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(key.as_str()))
        .one(txn)
        .await?;

    if let Some(state) = existing {
        let current: u64 = state.value.parse().map_err(|e| Error::Config {
            message: format!("Corrupt bill sequence '{}': {e}", state.value),
        })?;
        let next = current + 1;
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(next.to_string());
        active_model.updated_at = Set(now);
        active_model.update(txn).await?;
        Ok(next)
    } else {
        let new_state = system_state::ActiveModel {
            key: Set(key),
            value: Set("1".to_string()),
            updated_at: Set(now),
            ..Default::default()
        };
        new_state.insert(txn).await?;
        Ok(1)
    }
}

#[async_trait]
impl BillNumbering for SequentialBillNumbers {
    async fn next_bill_number(
        &self,
        txn: &DatabaseTransaction,
        restaurant_id: i64,
    ) -> Result<String> {
        let value = next_sequence_value(txn, restaurant_id).await?;
        Ok(format!("{}-{restaurant_id}-{value:06}", self.prefix))
    }
}

/// `PREFIX-<yyyymmdd>-<XXXXXX>` with a collision check against existing bills.
#[derive(Debug, Clone)]
pub struct RandomBillNumbers {
    prefix: String,
    max_attempts: u32,
}

impl RandomBillNumbers {
    /// Creates the strategy; `max_attempts` is raised to at least 1.
    #[must_use]
    pub fn new(prefix: &str, max_attempts: u32) -> Self {
        Self {
            prefix: prefix.to_string(),
            max_attempts: max_attempts.max(1),
        }
    }

    fn candidate(&self) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(RANDOM_SUFFIX_LEN)
            .map(|b| char::from(b).to_ascii_uppercase())
            .collect();
        format!("{}-{}-{suffix}", self.prefix, Utc::now().format("%Y%m%d"))
    }
}

#[async_trait]
impl BillNumbering for RandomBillNumbers {
    async fn next_bill_number(
        &self,
        txn: &DatabaseTransaction,
        restaurant_id: i64,
    ) -> Result<String> {
        for attempt in 1..=self.max_attempts {
            let candidate = self.candidate();
            let taken = Transaction::find()
                .filter(transaction::Column::BillNumber.eq(candidate.as_str()))
                .count(txn)
                .await?;
            if taken == 0 {
                return Ok(candidate);
            }
            debug!(
                "Bill number {} taken (restaurant {}, attempt {})",
                candidate, restaurant_id, attempt
            );
        }
        Err(Error::BillNumberExhausted {
            attempts: self.max_attempts,
        })
    }
}
