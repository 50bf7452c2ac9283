pub mod event_parsing;
pub mod logs;

pub use event_parsing::{EventParam, ParsedEvent, SchemaError, ERC20_TRANSFER_SIGNATURE};
pub use logs::{decode_log, decode_transfer, DecodeError, DecodedEvent, DecodedValue, TransferEvent};
