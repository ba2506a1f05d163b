//! Commit-time evaluation of staged writes.
//!
//! Backends call [`render_set`] with the document's previous content to turn
//! a staged [`FieldMap`] into the JSON that gets stored.

use super::error::StoreError;
use crate::models::{FieldMap, FieldTransform, FieldValue};
use serde_json::{Map, Number, Value};

/// Renders a `set` write against the previous document content.
///
/// `now` is the commit time substituted for server timestamps.
///
/// # Errors
///
/// Returns [`StoreError::Transform`] if a transform cannot be applied.
pub fn render_set(
    doc_path: &str,
    previous: Option<&Map<String, Value>>,
    data: &FieldMap,
    now: &str,
) -> Result<Map<String, Value>, StoreError> {
    let ctx = RenderContext { doc_path, now };
    render_map(&ctx, previous, data, "")
}

/// Current time in the format stored for server timestamps.
#[must_use]
pub fn commit_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

struct RenderContext<'a> {
    doc_path: &'a str,
    now: &'a str,
}

impl RenderContext<'_> {
    fn error(&self, field: &str, transform: &FieldTransform, cause: impl Into<String>) -> StoreError {
        StoreError::Transform {
            path: self.doc_path.to_string(),
            field: field.to_string(),
            transform: transform.name(),
            cause: cause.into(),
        }
    }
}

fn render_map(
    ctx: &RenderContext<'_>,
    previous: Option<&Map<String, Value>>,
    fields: &FieldMap,
    prefix: &str,
) -> Result<Map<String, Value>, StoreError> {
    let mut out = Map::new();
    for (key, value) in fields {
        let field = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        let prior = previous.and_then(|m| m.get(key));
        if let Some(rendered) = render_value(ctx, prior, value, &field)? {
            out.insert(key.clone(), rendered);
        }
    }
    Ok(out)
}

fn render_value(
    ctx: &RenderContext<'_>,
    previous: Option<&Value>,
    value: &FieldValue,
    field: &str,
) -> Result<Option<Value>, StoreError> {
    let rendered = match value {
        FieldValue::Map(fields) => Value::Object(render_map(
            ctx,
            previous.and_then(Value::as_object),
            fields,
            field,
        )?),
        FieldValue::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| render_array_item(ctx, item, &format!("{field}[{i}]")))
                .collect::<Result<_, _>>()?,
        ),
        FieldValue::Transform(transform) => {
            return apply_transform(ctx, previous, transform, field);
        },
        plain => plain.to_plain().unwrap_or(Value::Null),
    };
    Ok(Some(rendered))
}

fn render_array_item(
    ctx: &RenderContext<'_>,
    item: &FieldValue,
    field: &str,
) -> Result<Value, StoreError> {
    if let FieldValue::Transform(transform) = item {
        return Err(ctx.error(field, transform, "transforms are not allowed inside arrays"));
    }
    Ok(render_value(ctx, None, item, field)?.unwrap_or(Value::Null))
}

fn apply_transform(
    ctx: &RenderContext<'_>,
    previous: Option<&Value>,
    transform: &FieldTransform,
    field: &str,
) -> Result<Option<Value>, StoreError> {
    let value = match transform {
        FieldTransform::DeleteField => return Ok(None),
        FieldTransform::ServerTimestamp => Value::String(ctx.now.to_string()),
        FieldTransform::Increment(operand) => {
            let base = previous.and_then(Value::as_number);
            Value::Number(
                add_numbers(base, operand)
                    .ok_or_else(|| ctx.error(field, transform, "result is not a finite number"))?,
            )
        },
        FieldTransform::ArrayUnion(elements) => {
            let mut items = previous_array(previous);
            for element in elements {
                if !items.contains(element) {
                    items.push(element.clone());
                }
            }
            Value::Array(items)
        },
        FieldTransform::ArrayRemove(elements) => {
            let mut items = previous_array(previous);
            items.retain(|item| !elements.contains(item));
            Value::Array(items)
        },
    };
    Ok(Some(value))
}

/// Non-numeric or missing previous values count as zero.
fn add_numbers(base: Option<&Number>, operand: &Number) -> Option<Number> {
    let Some(base) = base else {
        return Some(operand.clone());
    };
    if let (Some(a), Some(b)) = (base.as_i64(), operand.as_i64())
        && let Some(sum) = a.checked_add(b)
    {
        return Some(Number::from(sum));
    }
    let sum = base.as_f64()? + operand.as_f64()?;
    Number::from_f64(sum)
}

fn previous_array(previous: Option<&Value>) -> Vec<Value> {
    previous
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: &str = "2024-01-01T00:00:00.000000Z";

    fn transform(t: FieldTransform) -> FieldValue {
        FieldValue::Transform(t)
    }

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_plain_set_replaces_document() {
        let previous = obj(json!({"old": 1}));
        let data = crate::models::value::map_from_json(obj(json!({"new": {"nested": [1, 2]}})));
        let out = render_set("c/d", Some(&previous), &data, NOW).unwrap();
        assert_eq!(Value::Object(out), json!({"new": {"nested": [1, 2]}}));
    }

    #[test]
    fn test_server_timestamp_and_delete() {
        let data = FieldMap::from([
            ("at".to_string(), transform(FieldTransform::ServerTimestamp)),
            ("gone".to_string(), transform(FieldTransform::DeleteField)),
        ]);
        let out = render_set("c/d", None, &data, NOW).unwrap();
        assert_eq!(Value::Object(out), json!({"at": NOW}));
    }

    #[test]
    fn test_increment_keeps_integers() {
        let previous = obj(json!({"n": 5, "f": 1.5, "s": "x"}));
        let data = FieldMap::from([
            ("n".to_string(), transform(FieldTransform::Increment(Number::from(-2)))),
            ("f".to_string(), transform(FieldTransform::Increment(Number::from(1)))),
            ("s".to_string(), transform(FieldTransform::Increment(Number::from(3)))),
            ("m".to_string(), transform(FieldTransform::Increment(Number::from(7)))),
        ]);
        let out = render_set("c/d", Some(&previous), &data, NOW).unwrap();
        assert_eq!(Value::Object(out), json!({"n": 3, "f": 2.5, "s": 3, "m": 7}));
    }

    #[test]
    fn test_array_union_and_remove() {
        let previous = obj(json!({"tags": ["a", "b", "a"], "other": ["x"]}));
        let data = FieldMap::from([
            (
                "tags".to_string(),
                transform(FieldTransform::ArrayRemove(vec![json!("a")])),
            ),
            (
                "other".to_string(),
                transform(FieldTransform::ArrayUnion(vec![json!("x"), json!("y")])),
            ),
        ]);
        let out = render_set("c/d", Some(&previous), &data, NOW).unwrap();
        assert_eq!(Value::Object(out), json!({"tags": ["b"], "other": ["x", "y"]}));
    }

    #[test]
    fn test_nested_transform_uses_nested_previous() {
        let previous = obj(json!({"stats": {"views": 10}}));
        let data = FieldMap::from([(
            "stats".to_string(),
            FieldValue::Map(FieldMap::from([(
                "views".to_string(),
                transform(FieldTransform::Increment(Number::from(1))),
            )])),
        )]);
        let out = render_set("c/d", Some(&previous), &data, NOW).unwrap();
        assert_eq!(Value::Object(out), json!({"stats": {"views": 11}}));
    }

    #[test]
    fn test_transform_inside_array_rejected() {
        let data = FieldMap::from([(
            "list".to_string(),
            FieldValue::Array(vec![transform(FieldTransform::ServerTimestamp)]),
        )]);
        let err = render_set("c/d", None, &data, NOW).unwrap_err();
        match err {
            StoreError::Transform { field, .. } => assert_eq!(field, "list[0]"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
