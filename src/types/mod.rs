pub mod attempt;
pub mod config;
pub mod row;
pub mod validation;

pub use attempt::{TransferAttempt, TransferStatus};
pub use row::{
    chain_row_id, tx_from_entity_id, CanonicalRow, Denomination, RowAmount, RowKind, RowSource,
};
pub use validation::ValidationError;
