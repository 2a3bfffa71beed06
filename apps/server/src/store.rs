//! Purchase transaction storage.

use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;
use uuid::Uuid;

/// A stored purchase; the amount is already normalized to cents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub id: Uuid,
    pub description: String,
    pub transaction_date: NaiveDate,
    pub purchase_amount_usd: Decimal,
}

/// Input to [`TransactionStore::insert`].
#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub description: String,
    pub transaction_date: NaiveDate,
    pub purchase_amount_usd: Decimal,
}

pub trait TransactionStore: Send + Sync {
    /// Persist a transaction and return it with its assigned id.
    fn insert(&self, new: NewTransaction) -> Transaction;

    fn get(&self, id: Uuid) -> Option<Transaction>;
}

/// Process-local store; contents are lost on restart.
#[derive(Default)]
pub struct InMemoryTransactionStore {
    transactions: DashMap<Uuid, Transaction>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl TransactionStore for InMemoryTransactionStore {
    fn insert(&self, new: NewTransaction) -> Transaction {
        let transaction = Transaction {
            id: Uuid::new_v4(),
            description: new.description,
            transaction_date: new.transaction_date,
            purchase_amount_usd: new.purchase_amount_usd,
        };
        self.transactions
            .insert(transaction.id, transaction.clone());
        transaction
    }

    fn get(&self, id: Uuid) -> Option<Transaction> {
        self.transactions.get(&id).map(|entry| entry.value().clone())
    }
}
