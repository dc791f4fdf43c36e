use alloy::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier, Word};
use alloy::json_abi::{Function, JsonAbi, Param, StateMutability};
use alloy::primitives::{Bytes, Sign, I256, U256};
use serde_json::{Map, Value};

use crate::ethereum::utils;
use crate::error::{WalletError, WalletResult};

/// Parse a caller-supplied ABI: a JSON array of items, or a string holding one.
pub fn parse_abi(abi: &Value) -> WalletResult<JsonAbi> {
    let parsed = match abi {
        Value::String(s) => serde_json::from_str(s),
        other => serde_json::from_value(other.clone()),
    };
    parsed.map_err(|e| WalletError::Abi(format!("Failed to parse ABI JSON: {}", e)))
}

/// Resolve a method by name. When several overloads share the name, the one
/// declared first in the ABI is used.
pub fn resolve_function<'a>(abi: &'a JsonAbi, name: &str) -> WalletResult<&'a Function> {
    utils::validate_function_name(name)?;

    abi.function(name)
        .and_then(|overloads| overloads.first())
        .ok_or_else(|| {
            let available: Vec<String> = abi.functions().map(|f| f.name.clone()).collect();
            if available.is_empty() {
                WalletError::Abi(format!(
                    "Function '{}' not found. The contract ABI contains no functions.",
                    name
                ))
            } else {
                WalletError::Abi(format!(
                    "Function '{}' not found in contract ABI. Available functions: {}",
                    name,
                    available.join(", ")
                ))
            }
        })
}

pub fn is_payable(function: &Function) -> bool {
    function.state_mutability == StateMutability::Payable
}

/// ABI-encode `function(args)` including the 4-byte selector.
pub fn encode_call(function: &Function, args: &[Value]) -> WalletResult<Bytes> {
    if args.len() != function.inputs.len() {
        let expected: Vec<String> = function
            .inputs
            .iter()
            .map(|input| format!("{} {}", input.ty, input.name))
            .collect();
        return Err(WalletError::Abi(format!(
            "Parameter count mismatch for function '{}': expected {} parameters, got {}. Expected parameters: [{}]",
            function.name,
            function.inputs.len(),
            args.len(),
            expected.join(", ")
        )));
    }

    let mut values = Vec::with_capacity(args.len());
    for (i, (arg, input)) in args.iter().zip(&function.inputs).enumerate() {
        let value = coerce_param(arg, input).map_err(|e| {
            WalletError::Abi(format!(
                "Invalid parameter #{} ('{}' of type '{}'): {}",
                i + 1,
                input.name,
                input.ty,
                e
            ))
        })?;
        values.push(value);
    }

    let encoded = function
        .abi_encode_input(&values)
        .map_err(|e| WalletError::Abi(format!("Failed to encode function inputs: {}", e)))?;

    Ok(encoded.into())
}

/// Decode return data per the declared outputs.
///
/// Every integer comes back as a decimal string, so values past 2^53 survive
/// JSON consumers intact.
pub fn decode_output(function: &Function, data: &[u8]) -> WalletResult<Value> {
    if function.outputs.is_empty() {
        return Ok(Value::Null);
    }
    if data.is_empty() {
        return Err(WalletError::Abi(format!(
            "Function '{}' returned no data; is the address a contract?",
            function.name
        )));
    }

    let decoded = function
        .abi_decode_output(data, false)
        .map_err(|e| WalletError::Abi(format!("Failed to decode output: {}", e)))?;

    if decoded.len() == 1 {
        return Ok(to_json(&decoded[0], &function.outputs[0].components));
    }
    Ok(group_to_json(&decoded, &function.outputs))
}

fn coerce_param(value: &Value, param: &Param) -> Result<DynSolValue, String> {
    let ty = param.resolve().map_err(|e| e.to_string())?;
    coerce(value, &ty, &param.components)
}

/// Convert JSON into a value of the declared type. `components` carries the
/// tuple field names, if any.
fn coerce(value: &Value, ty: &DynSolType, components: &[Param]) -> Result<DynSolValue, String> {
    match ty {
        DynSolType::Address => {
            let s = value.as_str().ok_or("Address must be a string")?;
            let address = utils::validate_address(s).map_err(|e| e.to_string())?;
            Ok(DynSolValue::Address(address))
        }
        DynSolType::Bool => match value {
            Value::Bool(b) => Ok(DynSolValue::Bool(*b)),
            Value::String(s) if s == "true" => Ok(DynSolValue::Bool(true)),
            Value::String(s) if s == "false" => Ok(DynSolValue::Bool(false)),
            _ => Err("Bool parameter must be a boolean".to_string()),
        },
        DynSolType::Uint(bits) => {
            let num = match value {
                Value::Number(n) => n
                    .as_u64()
                    .map(U256::from)
                    .ok_or_else(|| format!("Invalid uint value: {}", n))?,
                Value::String(s) => utils::parse_quantity(s).map_err(|e| e.to_string())?,
                _ => return Err("Uint must be a number or string".to_string()),
            };
            if *bits < 256 && num >= (U256::from(1u8) << *bits) {
                return Err(format!("Value {} does not fit in uint{}", num, bits));
            }
            Ok(DynSolValue::Uint(num, *bits))
        }
        DynSolType::Int(bits) => {
            let num = match value {
                Value::Number(n) => n
                    .as_i64()
                    .map(I256::try_from)
                    .and_then(Result::ok)
                    .ok_or_else(|| format!("Invalid int value: {}", n))?,
                Value::String(s) => parse_signed(s)?,
                _ => return Err("Int must be a number or string".to_string()),
            };
            if !fits_signed(num, *bits) {
                return Err(format!("Value {} does not fit in int{}", num, bits));
            }
            Ok(DynSolValue::Int(num, *bits))
        }
        DynSolType::String => match value {
            Value::String(s) => Ok(DynSolValue::String(s.clone())),
            Value::Number(n) => Ok(DynSolValue::String(n.to_string())),
            _ => Err("String parameter must be a string".to_string()),
        },
        DynSolType::Bytes => {
            let s = value.as_str().ok_or("Bytes must be a hex string")?;
            let bytes = utils::decode_hex_data(s).map_err(|e| e.to_string())?;
            Ok(DynSolValue::Bytes(bytes))
        }
        DynSolType::FixedBytes(size) => {
            let s = value.as_str().ok_or("Bytes must be a hex string")?;
            let bytes = utils::decode_hex_data(s).map_err(|e| e.to_string())?;
            if bytes.len() > *size {
                return Err(format!(
                    "Expected at most {} bytes, got {}",
                    size,
                    bytes.len()
                ));
            }
            let mut word = [0u8; 32];
            word[..bytes.len()].copy_from_slice(&bytes);
            Ok(DynSolValue::FixedBytes(Word::from(word), *size))
        }
        DynSolType::Array(inner) => {
            let items = value.as_array().ok_or("Array parameter must be an array")?;
            let values = items
                .iter()
                .map(|item| coerce(item, inner, components))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DynSolValue::Array(values))
        }
        DynSolType::FixedArray(inner, len) => {
            let items = value.as_array().ok_or("Array parameter must be an array")?;
            if items.len() != *len {
                return Err(format!("Expected {} elements, got {}", len, items.len()));
            }
            let values = items
                .iter()
                .map(|item| coerce(item, inner, components))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DynSolValue::FixedArray(values))
        }
        DynSolType::Tuple(types) => {
            let fields: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                Value::Object(obj) => components
                    .iter()
                    .map(|c| {
                        obj.get(&c.name)
                            .ok_or_else(|| format!("Missing tuple field '{}'", c.name))
                    })
                    .collect::<Result<_, _>>()?,
                _ => return Err("Tuple parameter must be an array or object".to_string()),
            };
            if fields.len() != types.len() {
                return Err(format!(
                    "Expected {} tuple fields, got {}",
                    types.len(),
                    fields.len()
                ));
            }
            let values = fields
                .into_iter()
                .zip(types)
                .enumerate()
                .map(|(i, (field, field_ty))| {
                    let nested = components.get(i).map(|c| c.components.as_slice()).unwrap_or(&[]);
                    coerce(field, field_ty, nested)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DynSolValue::Tuple(values))
        }
        other => Err(format!("Unsupported Solidity type: {}", other)),
    }
}

fn parse_signed(s: &str) -> Result<I256, String> {
    let s = s.trim();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (Sign::Negative, rest),
        None => (Sign::Positive, s),
    };
    let magnitude = utils::parse_quantity(digits).map_err(|e| e.to_string())?;
    I256::checked_from_sign_and_abs(sign, magnitude)
        .ok_or_else(|| format!("Invalid int value: {}", s))
}

/// `-2^(bits-1) <= num < 2^(bits-1)`
fn fits_signed(num: I256, bits: usize) -> bool {
    if bits >= 256 {
        return true;
    }
    let bound = U256::from(1u8) << (bits - 1);
    if num.is_negative() {
        num.unsigned_abs() <= bound
    } else {
        num.into_raw() < bound
    }
}

fn group_to_json(values: &[DynSolValue], params: &[Param]) -> Value {
    let named = params.len() == values.len() && params.iter().all(|p| !p.name.is_empty());
    if named {
        let mut object = Map::new();
        for (value, param) in values.iter().zip(params) {
            object.insert(param.name.clone(), to_json(value, &param.components));
        }
        Value::Object(object)
    } else {
        Value::Array(
            values
                .iter()
                .enumerate()
                .map(|(i, value)| {
                    let nested = params.get(i).map(|p| p.components.as_slice()).unwrap_or(&[]);
                    to_json(value, nested)
                })
                .collect(),
        )
    }
}

fn to_json(value: &DynSolValue, components: &[Param]) -> Value {
    match value {
        DynSolValue::Address(addr) => Value::String(addr.to_checksum(None)),
        DynSolValue::Uint(num, _) => Value::String(num.to_string()),
        DynSolValue::Int(num, _) => Value::String(num.to_string()),
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Bytes(bytes) => Value::String(format!("0x{}", hex::encode(bytes))),
        DynSolValue::FixedBytes(word, size) => {
            Value::String(format!("0x{}", hex::encode(&word[..*size])))
        }
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
            Value::Array(items.iter().map(|item| to_json(item, components)).collect())
        }
        DynSolValue::Tuple(fields) => group_to_json(fields, components),
        other => Value::String(format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn erc20_like() -> JsonAbi {
        parse_abi(&json!([
            {
                "type": "function",
                "name": "balanceOf",
                "stateMutability": "view",
                "inputs": [{ "name": "owner", "type": "address" }],
                "outputs": [{ "name": "balance", "type": "uint256" }]
            },
            {
                "type": "function",
                "name": "transfer",
                "stateMutability": "nonpayable",
                "inputs": [
                    { "name": "to", "type": "address" },
                    { "name": "value", "type": "uint256" }
                ],
                "outputs": [{ "name": "", "type": "bool" }]
            },
            {
                "type": "function",
                "name": "tokenInfo",
                "stateMutability": "view",
                "inputs": [{ "name": "tokenId", "type": "uint256" }],
                "outputs": [{
                    "name": "info",
                    "type": "tuple",
                    "components": [
                        { "name": "owner", "type": "address" },
                        { "name": "price", "type": "uint256" },
                        { "name": "onSale", "type": "bool" }
                    ]
                }]
            },
            {
                "type": "function",
                "name": "buy",
                "stateMutability": "payable",
                "inputs": [{ "name": "tokenId", "type": "uint256" }],
                "outputs": []
            },
            {
                "type": "event",
                "name": "Transfer",
                "anonymous": false,
                "inputs": [
                    { "name": "from", "type": "address", "indexed": true },
                    { "name": "to", "type": "address", "indexed": true },
                    { "name": "value", "type": "uint256", "indexed": false }
                ]
            }
        ]))
        .unwrap()
    }

    #[test]
    fn test_parse_abi_from_string() {
        let abi = parse_abi(&Value::String(
            r#"[{"type":"function","name":"decimals","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"uint8"}]}]"#.into(),
        ))
        .unwrap();
        assert!(resolve_function(&abi, "decimals").is_ok());
        assert!(parse_abi(&json!({"not": "an abi"})).is_err());
    }

    #[test]
    fn test_resolve_function() {
        let abi = erc20_like();
        assert_eq!(resolve_function(&abi, "transfer").unwrap().inputs.len(), 2);
        assert!(is_payable(resolve_function(&abi, "buy").unwrap()));
        assert!(!is_payable(resolve_function(&abi, "transfer").unwrap()));

        let err = resolve_function(&abi, "mint").unwrap_err().to_string();
        assert!(err.contains("Available functions"));
        assert!(resolve_function(&abi, "bad-name").is_err());
    }

    #[test]
    fn test_first_overload_wins() {
        let abi = parse_abi(&json!([
            {
                "type": "function", "name": "safeTransferFrom", "stateMutability": "nonpayable",
                "inputs": [
                    { "name": "from", "type": "address" },
                    { "name": "to", "type": "address" },
                    { "name": "tokenId", "type": "uint256" }
                ],
                "outputs": []
            },
            {
                "type": "function", "name": "safeTransferFrom", "stateMutability": "nonpayable",
                "inputs": [
                    { "name": "from", "type": "address" },
                    { "name": "to", "type": "address" },
                    { "name": "tokenId", "type": "uint256" },
                    { "name": "data", "type": "bytes" }
                ],
                "outputs": []
            }
        ]))
        .unwrap();

        assert_eq!(resolve_function(&abi, "safeTransferFrom").unwrap().inputs.len(), 3);
    }

    #[test]
    fn test_encode_transfer_matches_selector() {
        let abi = erc20_like();
        let transfer = resolve_function(&abi, "transfer").unwrap();
        let data = encode_call(
            transfer,
            &[
                json!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
                json!("1000000000000000000"),
            ],
        )
        .unwrap();

        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(
            hex::encode(&data[4..36]),
            "00000000000000000000000070997970c51812dc3a010c7d01b50e0d17dc79c8"
        );
        assert_eq!(
            hex::encode(&data[36..]),
            "0000000000000000000000000000000000000000000000000de0b6b3a7640000"
        );
    }

    #[test]
    fn test_numbers_and_strings_encode_identically() {
        let abi = erc20_like();
        let transfer = resolve_function(&abi, "transfer").unwrap();
        let to = json!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
        let from_number = encode_call(transfer, &[to.clone(), json!(1000)]).unwrap();
        let from_decimal = encode_call(transfer, &[to.clone(), json!("1000")]).unwrap();
        let from_hex = encode_call(transfer, &[to, json!("0x3e8")]).unwrap();
        assert_eq!(from_number, from_decimal);
        assert_eq!(from_decimal, from_hex);
    }

    #[test]
    fn test_encode_argument_errors() {
        let abi = erc20_like();
        let transfer = resolve_function(&abi, "transfer").unwrap();

        let err = encode_call(transfer, &[json!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8")])
            .unwrap_err()
            .to_string();
        assert!(err.contains("Parameter count mismatch"));

        let err = encode_call(transfer, &[json!("0x123"), json!("1")])
            .unwrap_err()
            .to_string();
        assert!(err.contains("Invalid parameter #1"));

        let err = encode_call(
            transfer,
            &[json!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"), json!(-5)],
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("Invalid parameter #2"));
    }

    #[test]
    fn test_coerce_nested_types() {
        let tuple_param: Param = serde_json::from_value(json!({
            "name": "order",
            "type": "tuple",
            "components": [
                { "name": "maker", "type": "address" },
                { "name": "amounts", "type": "uint128[2]" },
                { "name": "delta", "type": "int64" },
                { "name": "tag", "type": "bytes4" }
            ]
        }))
        .unwrap();

        let by_name = coerce_param(
            &json!({
                "maker": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
                "amounts": ["1", 2],
                "delta": "-7",
                "tag": "0xa9059cbb"
            }),
            &tuple_param,
        )
        .unwrap();
        let by_position = coerce_param(
            &json!([
                "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
                [1, "0x2"],
                -7,
                "0xa9059cbb"
            ]),
            &tuple_param,
        )
        .unwrap();
        assert_eq!(by_name, by_position);

        let short_array = coerce_param(
            &json!({
                "maker": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
                "amounts": ["1"],
                "delta": 0,
                "tag": "0x00"
            }),
            &tuple_param,
        );
        assert!(short_array.is_err());
    }

    #[test]
    fn test_uint_width_is_checked() {
        let param: Param = serde_json::from_value(json!({ "name": "d", "type": "uint8" })).unwrap();
        assert!(coerce_param(&json!(255), &param).is_ok());
        assert!(coerce_param(&json!(256), &param).is_err());
    }

    #[test]
    fn test_int_width_is_checked() {
        let param: Param = serde_json::from_value(json!({ "name": "d", "type": "int8" })).unwrap();
        assert!(coerce_param(&json!(127), &param).is_ok());
        assert!(coerce_param(&json!(-128), &param).is_ok());
        assert!(coerce_param(&json!("-128"), &param).is_ok());
        assert!(coerce_param(&json!(128), &param).is_err());
        assert!(coerce_param(&json!(-129), &param).is_err());

        let err = coerce_param(&json!(300), &param).unwrap_err();
        assert!(err.contains("does not fit in int8"));

        let abi = parse_abi(&json!([{
            "type": "function", "name": "f", "stateMutability": "nonpayable",
            "inputs": [{ "name": "x", "type": "int8" }], "outputs": []
        }]))
        .unwrap();
        let f = resolve_function(&abi, "f").unwrap();
        assert!(encode_call(f, &[json!(300)]).is_err());
    }

    #[test]
    fn test_int256_bounds() {
        let param: Param = serde_json::from_value(json!({ "name": "d", "type": "int256" })).unwrap();
        let min = "-57896044618658097711785492504343953926634992332820282019728792003956564819968";
        let max = "57896044618658097711785492504343953926634992332820282019728792003956564819967";
        let below = "-57896044618658097711785492504343953926634992332820282019728792003956564819969";
        let above = "57896044618658097711785492504343953926634992332820282019728792003956564819968";

        assert_eq!(coerce_param(&json!(min), &param).unwrap(), DynSolValue::Int(I256::MIN, 256));
        assert_eq!(coerce_param(&json!(max), &param).unwrap(), DynSolValue::Int(I256::MAX, 256));
        assert!(coerce_param(&json!(below), &param).is_err());
        assert!(coerce_param(&json!(above), &param).is_err());
    }

    #[test]
    fn test_decode_large_balance_as_string() {
        let abi = erc20_like();
        let balance_of = resolve_function(&abi, "balanceOf").unwrap();
        let amount = U256::from_str_radix("123456789012345678901234567890", 10).unwrap();
        let data = amount.to_be_bytes::<32>();

        let decoded = decode_output(balance_of, &data).unwrap();
        assert_eq!(decoded, json!("123456789012345678901234567890"));
    }

    #[test]
    fn test_decode_named_tuple_as_object() {
        let abi = erc20_like();
        let token_info = resolve_function(&abi, "tokenInfo").unwrap();
        let encoded = DynSolValue::Tuple(vec![
            DynSolValue::Address("0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse().unwrap()),
            DynSolValue::Uint(U256::from(10u64).pow(U256::from(20u64)), 256),
            DynSolValue::Bool(true),
        ])
        .abi_encode();

        let decoded = decode_output(token_info, &encoded).unwrap();
        assert_eq!(
            decoded,
            json!({
                "owner": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
                "price": "100000000000000000000",
                "onSale": true
            })
        );
    }

    #[test]
    fn test_decode_empty_outputs() {
        let abi = erc20_like();
        let buy = resolve_function(&abi, "buy").unwrap();
        assert_eq!(decode_output(buy, &[]).unwrap(), Value::Null);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let abi = erc20_like();
        let balance_of = resolve_function(&abi, "balanceOf").unwrap();
        assert!(decode_output(balance_of, &[0x01, 0x02]).is_err());
        assert!(decode_output(balance_of, &[]).is_err());
    }
}
