//! Built-in operator library

use crate::registry::{Operator, OperatorFactory, OperatorMetadata, OperatorRegistry, PortValues};
use std::collections::HashMap;
use std::sync::Arc;
use wormcore::{EngineError, Value};

/// Register every built-in operator with a registry
pub fn register_all(registry: &mut OperatorRegistry) {
    registry.register(Arc::new(PassFactory));
    registry.register(Arc::new(ArithmeticFactory(Arithmetic::Add)));
    registry.register(Arc::new(ArithmeticFactory(Arithmetic::Subtract)));
    registry.register(Arc::new(ArithmeticFactory(Arithmetic::Multiply)));
    registry.register(Arc::new(ScaleFactory));
    registry.register(Arc::new(ListSumFactory));
    registry.register(Arc::new(ListLengthFactory));
    registry.register(Arc::new(ListReverseFactory));
    registry.register(Arc::new(TextConcatFactory));
}

fn port<'a>(inputs: &'a PortValues, name: &str) -> &'a [Value] {
    inputs.get(name).map(Vec::as_slice).unwrap_or(&[])
}

fn single_output(port: &str, values: Vec<Value>) -> PortValues {
    let mut out = HashMap::new();
    out.insert(port.to_string(), values);
    out
}

fn number(value: &Value) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("expected number, got {}", value.type_name()))
}

/// Pair two lists element-wise, repeating the last item of the shorter one
fn longest_list<'a>(a: &'a [Value], b: &'a [Value]) -> Vec<(&'a Value, &'a Value)> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let n = a.len().max(b.len());
    (0..n)
        .map(|i| (&a[i.min(a.len() - 1)], &b[i.min(b.len() - 1)]))
        .collect()
}

/// Forwards its input untouched
pub struct PassOperator;

impl Operator for PassOperator {
    fn op_type(&self) -> &str {
        "core.pass"
    }

    fn input_ports(&self) -> &[&'static str] {
        &["value"]
    }

    fn output_ports(&self) -> &[&'static str] {
        &["value"]
    }

    fn apply(&self, inputs: &PortValues) -> Result<PortValues, String> {
        Ok(single_output("value", port(inputs, "value").to_vec()))
    }
}

pub struct PassFactory;

impl OperatorFactory for PassFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Operator>, EngineError> {
        Ok(Box::new(PassOperator))
    }

    fn op_type(&self) -> &str {
        "core.pass"
    }

    fn metadata(&self) -> OperatorMetadata {
        OperatorMetadata {
            description: "Forward values unchanged".to_string(),
            category: "core".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Arithmetic {
    Add,
    Subtract,
    Multiply,
}

impl Arithmetic {
    fn op_type(self) -> &'static str {
        match self {
            Arithmetic::Add => "math.add",
            Arithmetic::Subtract => "math.subtract",
            Arithmetic::Multiply => "math.multiply",
        }
    }

    fn integers(self, a: i64, b: i64) -> Option<i64> {
        match self {
            Arithmetic::Add => a.checked_add(b),
            Arithmetic::Subtract => a.checked_sub(b),
            Arithmetic::Multiply => a.checked_mul(b),
        }
    }

    fn floats(self, a: f64, b: f64) -> f64 {
        match self {
            Arithmetic::Add => a + b,
            Arithmetic::Subtract => a - b,
            Arithmetic::Multiply => a * b,
        }
    }

    fn eval(self, a: &Value, b: &Value) -> Result<Value, String> {
        if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
            if let Some(result) = self.integers(x, y) {
                return Ok(Value::Integer(result));
            }
        }
        Ok(Value::Number(self.floats(number(a)?, number(b)?)))
    }
}

/// Element-wise binary arithmetic on ports `a` and `b`
pub struct ArithmeticOperator(Arithmetic);

impl Operator for ArithmeticOperator {
    fn op_type(&self) -> &str {
        self.0.op_type()
    }

    fn input_ports(&self) -> &[&'static str] {
        &["a", "b"]
    }

    fn output_ports(&self) -> &[&'static str] {
        &["result"]
    }

    fn apply(&self, inputs: &PortValues) -> Result<PortValues, String> {
        let results = longest_list(port(inputs, "a"), port(inputs, "b"))
            .into_iter()
            .map(|(a, b)| self.0.eval(a, b))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(single_output("result", results))
    }
}

struct ArithmeticFactory(Arithmetic);

impl OperatorFactory for ArithmeticFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Operator>, EngineError> {
        Ok(Box::new(ArithmeticOperator(self.0)))
    }

    fn op_type(&self) -> &str {
        self.0.op_type()
    }

    fn metadata(&self) -> OperatorMetadata {
        let description = match self.0 {
            Arithmetic::Add => "Add a and b element-wise",
            Arithmetic::Subtract => "Subtract b from a element-wise",
            Arithmetic::Multiply => "Multiply a and b element-wise",
        };
        OperatorMetadata {
            description: description.to_string(),
            category: "math".to_string(),
        }
    }
}

/// Multiply every value by a configured factor
pub struct ScaleOperator {
    factor: f64,
}

impl Operator for ScaleOperator {
    fn op_type(&self) -> &str {
        "math.scale"
    }

    fn input_ports(&self) -> &[&'static str] {
        &["value"]
    }

    fn output_ports(&self) -> &[&'static str] {
        &["result"]
    }

    fn apply(&self, inputs: &PortValues) -> Result<PortValues, String> {
        let results = port(inputs, "value")
            .iter()
            .map(|v| number(v).map(|n| Value::Number(n * self.factor)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(single_output("result", results))
    }
}

pub struct ScaleFactory;

impl OperatorFactory for ScaleFactory {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn Operator>, EngineError> {
        let factor = match config.get("factor") {
            None => 1.0,
            Some(v) => v.as_f64().ok_or_else(|| {
                EngineError::Parse(format!("math.scale factor must be a number, got {}", v.type_name()))
            })?,
        };
        Ok(Box::new(ScaleOperator { factor }))
    }

    fn op_type(&self) -> &str {
        "math.scale"
    }

    fn metadata(&self) -> OperatorMetadata {
        OperatorMetadata {
            description: "Multiply values by the configured factor".to_string(),
            category: "math".to_string(),
        }
    }
}

/// Sum a list into a single value
pub struct ListSumOperator;

impl Operator for ListSumOperator {
    fn op_type(&self) -> &str {
        "list.sum"
    }

    fn input_ports(&self) -> &[&'static str] {
        &["values"]
    }

    fn output_ports(&self) -> &[&'static str] {
        &["sum"]
    }

    fn apply(&self, inputs: &PortValues) -> Result<PortValues, String> {
        let mut total = Value::Integer(0);
        for value in port(inputs, "values") {
            total = Arithmetic::Add.eval(&total, value)?;
        }
        Ok(single_output("sum", vec![total]))
    }
}

pub struct ListSumFactory;

impl OperatorFactory for ListSumFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Operator>, EngineError> {
        Ok(Box::new(ListSumOperator))
    }

    fn op_type(&self) -> &str {
        "list.sum"
    }

    fn metadata(&self) -> OperatorMetadata {
        OperatorMetadata {
            description: "Sum all values of a list".to_string(),
            category: "list".to_string(),
        }
    }
}

pub struct ListLengthOperator;

impl Operator for ListLengthOperator {
    fn op_type(&self) -> &str {
        "list.length"
    }

    fn input_ports(&self) -> &[&'static str] {
        &["list"]
    }

    fn output_ports(&self) -> &[&'static str] {
        &["length"]
    }

    fn apply(&self, inputs: &PortValues) -> Result<PortValues, String> {
        let length = port(inputs, "list").len() as i64;
        Ok(single_output("length", vec![Value::Integer(length)]))
    }
}

pub struct ListLengthFactory;

impl OperatorFactory for ListLengthFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Operator>, EngineError> {
        Ok(Box::new(ListLengthOperator))
    }

    fn op_type(&self) -> &str {
        "list.length"
    }

    fn metadata(&self) -> OperatorMetadata {
        OperatorMetadata {
            description: "Count the items of a list".to_string(),
            category: "list".to_string(),
        }
    }
}

pub struct ListReverseOperator;

impl Operator for ListReverseOperator {
    fn op_type(&self) -> &str {
        "list.reverse"
    }

    fn input_ports(&self) -> &[&'static str] {
        &["list"]
    }

    fn output_ports(&self) -> &[&'static str] {
        &["list"]
    }

    fn apply(&self, inputs: &PortValues) -> Result<PortValues, String> {
        let mut values = port(inputs, "list").to_vec();
        values.reverse();
        Ok(single_output("list", values))
    }
}

pub struct ListReverseFactory;

impl OperatorFactory for ListReverseFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Operator>, EngineError> {
        Ok(Box::new(ListReverseOperator))
    }

    fn op_type(&self) -> &str {
        "list.reverse"
    }
}

/// Concatenate the text form of `a` and `b` element-wise
pub struct TextConcatOperator;

impl Operator for TextConcatOperator {
    fn op_type(&self) -> &str {
        "text.concat"
    }

    fn input_ports(&self) -> &[&'static str] {
        &["a", "b"]
    }

    fn output_ports(&self) -> &[&'static str] {
        &["result"]
    }

    fn apply(&self, inputs: &PortValues) -> Result<PortValues, String> {
        let results = longest_list(port(inputs, "a"), port(inputs, "b"))
            .into_iter()
            .map(|(a, b)| Value::Text(format!("{}{}", a, b)))
            .collect();
        Ok(single_output("result", results))
    }
}

pub struct TextConcatFactory;

impl OperatorFactory for TextConcatFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Operator>, EngineError> {
        Ok(Box::new(TextConcatOperator))
    }

    fn op_type(&self) -> &str {
        "text.concat"
    }

    fn metadata(&self) -> OperatorMetadata {
        OperatorMetadata {
            description: "Join two texts".to_string(),
            category: "text".to_string(),
        }
    }
}
