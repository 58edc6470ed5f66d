//! DynamoDB JSON request adapter
//!
//! Reads just enough of a DynamoDB call to route it: the action from
//! `X-Amz-Target`, and `TableName`, `Key`, `Item`, `KeySchema` and any
//! condition from the body. Everything else in the body is left alone.

use alb_types::{AttributeValue, KeySchemaElement, KeyValues, Operation, TypesError, TypesResult};
use serde_json::{Map, Value};

/// Prefix of every DynamoDB `X-Amz-Target` value
pub const TARGET_PREFIX: &str = "DynamoDB_20120810.";

/// Action name of a target header, without the API version prefix
pub fn action_name(target: &str) -> TypesResult<&str> {
    let action = target.strip_prefix(TARGET_PREFIX).unwrap_or(target);
    if action.is_empty() || action.contains(char::is_whitespace) {
        return Err(TypesError::UnknownOperation(target.to_string()));
    }
    Ok(action)
}

/// Build a routable [`Operation`] from a target header and JSON body
pub fn parse_request(target: &str, body: &[u8]) -> TypesResult<Operation> {
    let action = action_name(target)?;
    let body: Value = if body.is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_slice(body).map_err(|e| TypesError::MalformedRequest(e.to_string()))?
    };
    let body = body
        .as_object()
        .ok_or_else(|| TypesError::MalformedRequest("request body is not a JSON object".to_string()))?;

    let table = body.get("TableName").and_then(Value::as_str).unwrap_or_default();
    let require_table = || {
        if table.is_empty() {
            Err(TypesError::MalformedRequest(format!("{} without TableName", action)))
        } else {
            Ok(table)
        }
    };

    let op = match action {
        "CreateTable" => {
            let schema = match body.get("KeySchema") {
                Some(v) => serde_json::from_value::<Vec<KeySchemaElement>>(v.clone())
                    .map_err(|e| TypesError::MalformedRequest(format!("KeySchema: {}", e)))?,
                None => Vec::new(),
            };
            Operation::create_table(require_table()?, schema)
        }
        "GetItem" => Operation::get_item(require_table()?, attribute_map(body, "Key")?),
        "PutItem" => Operation::put_item(require_table()?, attribute_map(body, "Item")?),
        "UpdateItem" => Operation::update_item(require_table()?, attribute_map(body, "Key")?),
        "DeleteItem" => Operation::delete_item(require_table()?, attribute_map(body, "Key")?),
        _ => return Ok(Operation::other(table)),
    };

    Ok(if has_condition(body) { op.conditional() } else { op })
}

fn has_condition(body: &Map<String, Value>) -> bool {
    ["ConditionExpression", "Expected"]
        .iter()
        .any(|field| matches!(body.get(*field), Some(v) if !v.is_null()))
}

/// Key-typed attributes of `body[field]`; other attribute types are skipped
fn attribute_map(body: &Map<String, Value>, field: &str) -> TypesResult<KeyValues> {
    let Some(value) = body.get(field) else {
        return Ok(KeyValues::new());
    };
    let map = value
        .as_object()
        .ok_or_else(|| TypesError::MalformedRequest(format!("{} is not an object", field)))?;

    let mut out = KeyValues::new();
    for (name, v) in map {
        if let Some(attr) = AttributeValue::from_json(v)? {
            out.insert(name.clone(), attr);
        }
    }
    Ok(out)
}
