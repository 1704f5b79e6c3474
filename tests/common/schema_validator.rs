use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

fn schema_path(schema_name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/schemas")
        .join(format!("{}.json", schema_name))
}

/// Load a schema from the tests/schemas directory
pub fn load_test_schema(schema_name: &str) -> JSONSchema {
    let path = schema_path(schema_name);
    let schema_content = fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Failed to read schema file: {}", path.display()));

    let schema_json: Value = serde_json::from_str(&schema_content)
        .unwrap_or_else(|_| panic!("Failed to parse schema JSON: {}", path.display()));

    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema_json)
        .expect("Failed to compile schema")
}

/// Validate a JSON value against a schema
pub fn validate_against_schema(data: &Value, schema: &JSONSchema) -> Result<(), Vec<String>> {
    schema.validate(data).map_err(|errors| {
        errors
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect()
    })
}

/// Panic with every violation if `data` does not match the named schema
pub fn assert_matches_schema(data: &Value, schema_name: &str) {
    let schema = load_test_schema(schema_name);
    if let Err(errors) = validate_against_schema(data, &schema) {
        eprintln!("✗ {} schema validation failed:", schema_name);
        for error in &errors {
            eprintln!("  - {}", error);
        }
        eprintln!(
            "\nActual response:\n{}",
            serde_json::to_string_pretty(data).unwrap()
        );
        panic!("Schema validation failed with {} errors", errors.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_card_schema_validation() {
        let schema_json = json!({
            "type": "object",
            "properties": {
                "id": {"type": "string"},
                "username": {"type": "string"},
                "followers_count": {"type": "integer"}
            },
            "required": ["id", "username"]
        });

        let schema = JSONSchema::compile(&schema_json).expect("Invalid schema");

        let valid_data = json!({"id": "01H", "username": "alice", "followers_count": 2});
        assert!(validate_against_schema(&valid_data, &schema).is_ok());

        let invalid_data = json!({"username": "alice", "followers_count": "two"});
        let errors = validate_against_schema(&invalid_data, &schema).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
