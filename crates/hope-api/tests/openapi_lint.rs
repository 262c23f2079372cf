use hope_api::openapi::openapi_v1_spec;
use hope_api::ApiErrorCode;
use serde_json::Value;
use std::path::PathBuf;

#[test]
fn openapi_paths_and_component_schemas_are_lexicographically_sorted() {
    let spec = openapi_v1_spec();
    assert_sorted_object(spec.get("paths").expect("paths"));
    let schemas = spec
        .get("components")
        .and_then(|v| v.get("schemas"))
        .expect("components.schemas");
    assert_sorted_object(schemas);
}

#[test]
fn openapi_schema_lint_rules_hold() {
    let spec = openapi_v1_spec();
    assert_eq!(spec["openapi"], "3.0.3");
    assert_eq!(spec["info"]["version"], "v1");

    let api_error = &spec["components"]["schemas"]["ApiError"];
    assert_eq!(api_error["additionalProperties"], Value::Bool(false));
    let codes = spec["components"]["schemas"]["ApiErrorCode"]["enum"]
        .as_array()
        .expect("enum array")
        .len();
    assert_eq!(codes, ApiErrorCode::ALL.len());
}

#[test]
fn admin_routes_declare_bearer_security_and_403() {
    let spec = openapi_v1_spec();
    let paths = spec["paths"].as_object().expect("paths object");
    for (path, item) in paths.iter().filter(|(p, _)| p.starts_with("/admin")) {
        for (method, op) in item.as_object().expect("path item") {
            assert!(op.get("security").is_some(), "{method} {path} lacks security");
            assert!(op["responses"].get("403").is_some(), "{method} {path} lacks 403");
        }
    }
}

#[test]
fn api_crate_dependency_guardrails() {
    let cargo =
        std::fs::read_to_string(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml"))
            .expect("read Cargo.toml");

    for forbidden in ["tokio", "reqwest", "rusqlite", "axum", "hope-server"] {
        assert!(
            !cargo.contains(forbidden),
            "forbidden dependency in api crate: {forbidden}"
        );
    }
}

fn assert_sorted_object(value: &Value) {
    let object = value.as_object().expect("json object");
    let observed = object.keys().map(String::as_str).collect::<Vec<_>>();
    let mut sorted = observed.clone();
    sorted.sort_unstable();
    assert_eq!(observed, sorted);
}
