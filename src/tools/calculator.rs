use crate::tools::registry::Tool;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde_json::{Value, json};

pub struct Calculator;

#[async_trait]
impl Tool for Calculator {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Perform basic arithmetic operations"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["add", "subtract", "multiply", "divide"]
                },
                "a": { "type": "number" },
                "b": { "type": "number" }
            },
            "required": ["operation", "a", "b"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let op = args["operation"]
            .as_str()
            .ok_or_else(|| AppError::InvalidInput("missing operation".to_string()))?;
        let a = args["a"]
            .as_f64()
            .ok_or_else(|| AppError::InvalidInput("missing operand a".to_string()))?;
        let b = args["b"]
            .as_f64()
            .ok_or_else(|| AppError::InvalidInput("missing operand b".to_string()))?;

        let result = match op {
            "add" => a + b,
            "subtract" => a - b,
            "multiply" => a * b,
            "divide" => {
                if b == 0.0 {
                    return Err(AppError::InvalidInput("division by zero".to_string()));
                }
                a / b
            }
            other => {
                return Err(AppError::InvalidInput(format!(
                    "unknown operation: {}",
                    other
                )));
            }
        };

        Ok(json!({ "result": result }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_operations() {
        let calc = Calculator;
        let run = |op: &str, a: f64, b: f64| {
            json!({ "operation": op, "a": a, "b": b })
        };

        assert_eq!(calc.execute(run("add", 2.0, 3.0)).await.unwrap()["result"], 5.0);
        assert_eq!(
            calc.execute(run("subtract", 2.0, 3.0)).await.unwrap()["result"],
            -1.0
        );
        assert_eq!(
            calc.execute(run("multiply", 4.0, 2.5)).await.unwrap()["result"],
            10.0
        );
        assert_eq!(calc.execute(run("divide", 9.0, 3.0)).await.unwrap()["result"], 3.0);
    }

    #[tokio::test]
    async fn test_divide_by_zero_is_an_error() {
        let calc = Calculator;
        let args = json!({ "operation": "divide", "a": 1.0, "b": 0.0 });
        assert!(calc.execute(args).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_args_rejected() {
        let calc = Calculator;
        assert!(calc.execute(json!({})).await.is_err());
        assert!(
            calc.execute(json!({ "operation": "modulo", "a": 1.0, "b": 2.0 }))
                .await
                .is_err()
        );
    }
}
