use indexmap::IndexMap;
use loom_common::{ScriptError, ScriptResult, Value};

/// Names callable from expressions
pub const BUILTINS: &[&str] = &[
    "len", "range", "str", "upper", "lower", "join", "enumerate", "items", "keys", "values",
];

pub fn call_builtin(name: &str, args: Vec<Value>) -> ScriptResult<Value> {
    match name {
        "len" => {
            let [value] = exactly::<1>(name, args)?;
            let len = match &value {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                other => {
                    return Err(ScriptError::type_error(format!(
                        "len() of {}",
                        other.type_name()
                    )))
                }
            };
            Ok(Value::from(len))
        }
        "range" => range(args),
        "str" => {
            let [value] = exactly::<1>(name, args)?;
            Ok(Value::String(value.to_string()))
        }
        "upper" => {
            let [value] = exactly::<1>(name, args)?;
            Ok(Value::String(value.to_string().to_uppercase()))
        }
        "lower" => {
            let [value] = exactly::<1>(name, args)?;
            Ok(Value::String(value.to_string().to_lowercase()))
        }
        "join" => {
            if args.is_empty() || args.len() > 2 {
                return Err(arity(name, "1 or 2", args.len()));
            }
            let mut args = args.into_iter();
            let list = args.next().unwrap_or(Value::Null);
            let separator = args.next().map(|s| s.to_string()).unwrap_or_default();
            let items = as_array(name, list)?;
            Ok(Value::String(
                items
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(&separator),
            ))
        }
        "enumerate" => {
            let [list] = exactly::<1>(name, args)?;
            let items = as_array(name, list)?;
            Ok(Value::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| Value::Array(vec![Value::from(i), item]))
                    .collect(),
            ))
        }
        "items" => {
            let [object] = exactly::<1>(name, args)?;
            let map = as_object(name, object)?;
            Ok(Value::Array(
                map.into_iter()
                    .map(|(k, v)| Value::Array(vec![Value::String(k), v]))
                    .collect(),
            ))
        }
        "keys" => {
            let [object] = exactly::<1>(name, args)?;
            let map = as_object(name, object)?;
            Ok(Value::Array(map.into_keys().map(Value::String).collect()))
        }
        "values" => {
            let [object] = exactly::<1>(name, args)?;
            let map = as_object(name, object)?;
            Ok(Value::Array(map.into_values().collect()))
        }
        _ => Err(ScriptError::UnknownFunction {
            name: name.to_string(),
        }),
    }
}

fn range(args: Vec<Value>) -> ScriptResult<Value> {
    let numbers = args
        .iter()
        .map(|arg| {
            arg.as_number().ok_or_else(|| {
                ScriptError::type_error(format!("range() expects numbers, got {}", arg.type_name()))
            })
        })
        .collect::<ScriptResult<Vec<f64>>>()?;

    let (start, end, step) = match numbers.as_slice() {
        [end] => (0.0, *end, 1.0),
        [start, end] => (*start, *end, 1.0),
        [start, end, step] => (*start, *end, *step),
        _ => return Err(arity("range", "1 to 3", numbers.len())),
    };
    if step == 0.0 {
        return Err(ScriptError::type_error("range() step must not be zero"));
    }

    let mut items = Vec::new();
    let mut current = start;
    while (step > 0.0 && current < end) || (step < 0.0 && current > end) {
        items.push(Value::Number(current));
        current += step;
    }
    Ok(Value::Array(items))
}

fn exactly<const N: usize>(name: &str, args: Vec<Value>) -> ScriptResult<[Value; N]> {
    let found = args.len();
    args.try_into()
        .map_err(|_| arity(name, &N.to_string(), found))
}

fn arity(function: &str, expected: &str, found: usize) -> ScriptError {
    ScriptError::Arity {
        function: function.to_string(),
        expected: expected.to_string(),
        found,
    }
}

fn as_array(function: &str, value: Value) -> ScriptResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(ScriptError::type_error(format!(
            "{}() expects an array, got {}",
            function,
            other.type_name()
        ))),
    }
}

fn as_object(function: &str, value: Value) -> ScriptResult<IndexMap<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ScriptError::type_error(format!(
            "{}() expects an object, got {}",
            function,
            other.type_name()
        ))),
    }
}
