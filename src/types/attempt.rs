use alloy::primitives::{Address, B256, U256};
use serde::Serialize;

/// Status of a locally submitted transfer as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransferStatus {
    /// Handed to the signer, no hash yet.
    Submitted,
    /// Hash known, waiting for a receipt.
    Pending,
    Confirmed,
    Failed,
}

/// One locally tracked transfer.
///
/// Only the lifecycle tracker mutates an attempt; everyone else sees
/// snapshots through the accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferAttempt {
    hash: Option<B256>,
    from: Address,
    to: Address,
    #[serde(serialize_with = "serialize_u256")]
    requested_amount: U256,
    entered_amount: String,
    status: TransferStatus,
    block_number: Option<u64>,
    gas_used: Option<u64>,
    gas_price: Option<u128>,
    failure: Option<String>,
}

fn serialize_u256<S: serde::Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

impl TransferAttempt {
    pub(crate) fn submitted(
        from: Address,
        to: Address,
        requested_amount: U256,
        entered_amount: impl Into<String>,
    ) -> Self {
        Self {
            hash: None,
            from,
            to,
            requested_amount,
            entered_amount: entered_amount.into(),
            status: TransferStatus::Submitted,
            block_number: None,
            gas_used: None,
            gas_price: None,
            failure: None,
        }
    }

    pub(crate) fn mark_pending(&mut self, hash: B256) {
        self.hash = Some(hash);
        self.status = TransferStatus::Pending;
    }

    pub(crate) fn mark_confirmed(
        &mut self,
        block_number: Option<u64>,
        gas_used: u64,
        gas_price: u128,
    ) {
        self.status = TransferStatus::Confirmed;
        self.block_number = block_number;
        self.gas_used = Some(gas_used);
        self.gas_price = Some(gas_price);
    }

    /// Receipt-backed failure (reverted transaction).
    pub(crate) fn mark_reverted(
        &mut self,
        block_number: Option<u64>,
        gas_used: u64,
        gas_price: u128,
    ) {
        self.status = TransferStatus::Failed;
        self.block_number = block_number;
        self.gas_used = Some(gas_used);
        self.gas_price = Some(gas_price);
        self.failure = Some("transaction reverted".to_string());
    }

    pub(crate) fn mark_failed(&mut self, cause: impl Into<String>) {
        self.status = TransferStatus::Failed;
        self.failure = Some(cause.into());
    }

    pub fn hash(&self) -> Option<B256> {
        self.hash
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn to(&self) -> Address {
        self.to
    }

    pub fn requested_amount(&self) -> U256 {
        self.requested_amount
    }

    /// The amount as the user typed it.
    pub fn entered_amount(&self) -> &str {
        &self.entered_amount
    }

    pub fn status(&self) -> TransferStatus {
        self.status
    }

    pub fn block_number(&self) -> Option<u64> {
        self.block_number
    }

    pub fn gas_used(&self) -> Option<u64> {
        self.gas_used
    }

    pub fn gas_price(&self) -> Option<u128> {
        self.gas_price
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}
