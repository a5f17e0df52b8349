use crate::tools::registry::Tool;
use crate::types::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};

pub struct CurrentTime;

#[async_trait]
impl Tool for CurrentTime {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time in UTC"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _args: Value) -> Result<Value> {
        let now = Utc::now();
        Ok(json!({
            "iso": now.to_rfc3339(),
            "date": now.format("%Y-%m-%d").to_string(),
            "time": now.format("%H:%M:%S").to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_iso_timestamp() {
        let result = CurrentTime.execute(json!({})).await.unwrap();
        let iso = result["iso"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(iso).is_ok());
    }
}
