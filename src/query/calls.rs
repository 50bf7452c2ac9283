use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{keccak256, Bytes};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallError {
    #[error("Invalid function signature: {0}")]
    InvalidSignature(String),

    #[error("Failed to decode call output: {0}")]
    Decode(String),
}

/// A read-only contract function described as `name(inputs)(outputs)`,
/// e.g. `decimals()(uint8)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub signature: String,
    pub selector: [u8; 4],
    pub output: DynSolType,
}

impl FunctionCall {
    pub fn parse(sig: &str) -> Result<Self, CallError> {
        let sig = sig.trim();
        let (input_sig, output_sig) = sig
            .split_once(")(")
            .and_then(|(input, output)| Some((format!("{})", input), output.strip_suffix(')')?)))
            .ok_or_else(|| {
                CallError::InvalidSignature(format!("missing output type: {}", sig))
            })?;

        if !input_sig.contains('(') {
            return Err(CallError::InvalidSignature(sig.to_string()));
        }

        let output = DynSolType::parse(&format!("({})", output_sig))
            .map_err(|e| CallError::InvalidSignature(format!("{}: {}", sig, e)))?;

        let hash = keccak256(input_sig.as_bytes());
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&hash[..4]);

        Ok(Self {
            signature: input_sig,
            selector,
            output,
        })
    }

    pub fn calldata(&self, params: &[DynSolValue]) -> Bytes {
        let mut calldata = self.selector.to_vec();
        if !params.is_empty() {
            calldata.extend(DynSolValue::Tuple(params.to_vec()).abi_encode_params());
        }
        Bytes::from(calldata)
    }

    /// Decodes the return data. Outputs always come back as a tuple.
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<DynSolValue>, CallError> {
        match self.output.abi_decode_sequence(data) {
            Ok(DynSolValue::Tuple(values)) => Ok(values),
            Ok(other) => Err(CallError::Decode(format!("expected a tuple, got {:?}", other))),
            Err(e) => Err(CallError::Decode(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    #[test]
    fn test_decimals_selector() {
        let call = FunctionCall::parse("decimals()(uint8)").unwrap();
        assert_eq!(call.signature, "decimals()");
        assert_eq!(hex::encode(call.selector), "313ce567");
        assert_eq!(call.calldata(&[]).as_ref(), &call.selector[..]);
    }

    #[test]
    fn test_decode_output() {
        let call = FunctionCall::parse("decimals()(uint8)").unwrap();
        let word = U256::from(6u8).to_be_bytes::<32>();

        let values = call.decode_output(&word).unwrap();
        assert_eq!(values, vec![DynSolValue::Uint(U256::from(6u8), 8)]);

        assert!(matches!(call.decode_output(&[]), Err(CallError::Decode(_))));
    }

    #[test]
    fn test_calldata_with_params() {
        let call = FunctionCall::parse("balanceOf(address)(uint256)").unwrap();
        assert_eq!(hex::encode(call.selector), "70a08231");

        let data = call.calldata(&[DynSolValue::Address(Default::default())]);
        assert_eq!(data.len(), 4 + 32);
    }

    #[test]
    fn test_rejects_missing_output() {
        assert!(matches!(
            FunctionCall::parse("decimals()"),
            Err(CallError::InvalidSignature(_))
        ));
        assert!(matches!(
            FunctionCall::parse("decimals()(notatype)"),
            Err(CallError::InvalidSignature(_))
        ));
    }
}
