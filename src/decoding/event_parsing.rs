use alloy::dyn_abi::DynSolType;
use alloy::primitives::{keccak256, B256};
use thiserror::Error;

/// Human-readable signature of the ERC-20 `Transfer` event.
pub const ERC20_TRANSFER_SIGNATURE: &str =
    "Transfer(address indexed from, address indexed to, uint256 value)";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Invalid event signature: {0}")]
    InvalidSignature(String),
    #[error("Failed to parse type '{0}': {1}")]
    TypeParse(String, String),
    #[error("Missing closing parenthesis")]
    MissingCloseParen,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventParam {
    pub name: String,
    pub param_type: DynSolType,
    pub type_string: String,
    pub indexed: bool,
}

/// An event schema: ordered parameters plus the topic0 that identifies it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEvent {
    pub name: String,
    pub signature: String,
    pub canonical_signature: String,
    pub topic0: B256,
    pub params: Vec<EventParam>,
}

impl ParsedEvent {
    /// Parse a full ABI signature like
    /// "Transfer(address indexed from, address indexed to, uint256 value)"
    pub fn from_signature(signature: &str) -> Result<Self, SchemaError> {
        let signature = signature.trim();

        let open_paren = signature
            .find('(')
            .ok_or_else(|| SchemaError::InvalidSignature(signature.to_string()))?;

        let name = signature[..open_paren].trim().to_string();
        if name.is_empty() {
            return Err(SchemaError::InvalidSignature("Empty event name".to_string()));
        }

        let close_paren = signature.rfind(')').ok_or(SchemaError::MissingCloseParen)?;
        if close_paren < open_paren {
            return Err(SchemaError::MissingCloseParen);
        }

        let params = parse_params(&signature[open_paren + 1..close_paren])?;

        // Types only, no names and no "indexed"
        let type_strings: Vec<String> = params
            .iter()
            .map(|p| p.param_type.sol_type_name().into_owned())
            .collect();
        let canonical_signature = format!("{}({})", name, type_strings.join(","));
        let topic0 = keccak256(canonical_signature.as_bytes());

        Ok(ParsedEvent {
            name,
            signature: signature.to_string(),
            canonical_signature,
            topic0,
            params,
        })
    }

    /// The ERC-20 `Transfer` schema.
    pub fn erc20_transfer() -> Self {
        match Self::from_signature(ERC20_TRANSFER_SIGNATURE) {
            Ok(event) => event,
            Err(e) => unreachable!("ERC-20 Transfer signature must parse: {}", e),
        }
    }

    pub fn indexed_params(&self) -> Vec<&EventParam> {
        self.params.iter().filter(|p| p.indexed).collect()
    }

    pub fn data_params(&self) -> Vec<&EventParam> {
        self.params.iter().filter(|p| !p.indexed).collect()
    }
}

fn parse_params(params_str: &str) -> Result<Vec<EventParam>, SchemaError> {
    let params_str = params_str.trim();
    if params_str.is_empty() {
        return Ok(Vec::new());
    }

    let mut params = Vec::new();
    let mut current = String::new();
    let mut paren_depth = 0i32;

    // Split on top-level commas so tuple types stay whole
    for c in params_str.chars() {
        match c {
            '(' => {
                paren_depth += 1;
                current.push(c);
            }
            ')' => {
                paren_depth -= 1;
                current.push(c);
            }
            ',' if paren_depth == 0 => {
                params.push(parse_single_param(current.trim())?);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    params.push(parse_single_param(current.trim())?);

    Ok(params)
}

/// Parse a single parameter like "address indexed from" or "uint256 value"
fn parse_single_param(param_str: &str) -> Result<EventParam, SchemaError> {
    let parts: Vec<&str> = param_str.split_whitespace().collect();

    let (type_string, indexed, name) = match parts.as_slice() {
        [] => {
            return Err(SchemaError::InvalidSignature(
                "Empty parameter".to_string(),
            ))
        }
        [ty] => (*ty, false, ""),
        [ty, "indexed"] => (*ty, true, ""),
        [ty, name] => (*ty, false, *name),
        [ty, "indexed", name] => (*ty, true, *name),
        _ => {
            return Err(SchemaError::InvalidSignature(format!(
                "Invalid parameter format: {}",
                param_str
            )))
        }
    };

    let param_type = DynSolType::parse(type_string)
        .map_err(|e| SchemaError::TypeParse(type_string.to_string(), e.to_string()))?;

    Ok(EventParam {
        name: name.to_string(),
        param_type,
        type_string: type_string.to_string(),
        indexed,
    })
}
