//! Built-in local tools.

use crate::descriptor::{HandlerResult, ToolDescriptor};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Deserialize)]
struct SumInput {
    a: serde_json::Number,
    b: serde_json::Number,
}

#[derive(Deserialize)]
struct EchoInput {
    text: String,
}

/// `sumar`: adds two numbers. Integers stay integers unless the sum
/// overflows.
pub fn sum_tool() -> ToolDescriptor {
    ToolDescriptor::local_async(
        "sumar",
        "Add two numbers and return the sum.",
        json!({
            "type": "object",
            "properties": {
                "a": {"type": "number", "description": "First addend"},
                "b": {"type": "number", "description": "Second addend"}
            },
            "required": ["a", "b"]
        }),
        |args| async move { sum(args) },
    )
}

/// `echo`: returns its `text` argument.
pub fn echo_tool() -> ToolDescriptor {
    ToolDescriptor::local(
        "echo",
        "Return the given text unchanged.",
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "Text to echo back"}
            },
            "required": ["text"]
        }),
        |args| {
            let input: EchoInput = serde_json::from_value(args)?;
            Ok(Value::String(input.text))
        },
    )
}

fn sum(args: Value) -> HandlerResult {
    let SumInput { a, b } = serde_json::from_value(args)?;

    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(total) = x.checked_add(y) {
            return Ok(json!(total));
        }
    }

    let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) else {
        return Err(format!("cannot add {a} and {b}").into());
    };
    serde_json::Number::from_f64(x + y)
        .map(Value::Number)
        .ok_or_else(|| "sum is not a finite number".into())
}
