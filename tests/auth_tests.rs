use docforge::auth::{AuthField, AuthSpec};
use spectral::assert_that;

#[test]
fn bearer_token_matches_platform_wire_shape() {
    let value = serde_json::to_value(AuthSpec::bearer_token()).expect("Expected serialization.");

    assert_that(&value.pointer("/type").and_then(|v| v.as_str()))
        .is_equal_to(Some("bearerToken"));
    assert_that(&value.pointer("/details/access_token/type").and_then(|v| v.as_str()))
        .is_equal_to(Some("password"));
    assert_that(&value.pointer("/details/access_token/required").and_then(|v| v.as_bool()))
        .is_equal_to(Some(true));
    assert_that(&value.pointer("/details/expires_in/hidden").and_then(|v| v.as_bool()))
        .is_equal_to(Some(true));
    assert_that(&value.pointer("/details/expires_in/default").and_then(|v| v.as_i64()))
        .is_equal_to(Some(100_000));
}

#[test]
fn api_key_matches_platform_wire_shape() {
    let value = serde_json::to_value(AuthSpec::api_key()).expect("Expected serialization.");

    assert_that(&value.pointer("/type").and_then(|v| v.as_str())).is_equal_to(Some("apiKey"));
    assert_that(&value.pointer("/details/apiKeyName/default").and_then(|v| v.as_str()))
        .is_equal_to(Some("key"));
    assert_that(&value.pointer("/details/apiKeyValue/type").and_then(|v| v.as_str()))
        .is_equal_to(Some("password"));
}

#[test]
fn basic_auth_matches_platform_wire_shape() {
    let value = serde_json::to_value(AuthSpec::basic()).expect("Expected serialization.");

    assert_that(&value.pointer("/type").and_then(|v| v.as_str())).is_equal_to(Some("basic"));
    assert_that(&value.pointer("/details/userName/required").and_then(|v| v.as_bool()))
        .is_equal_to(Some(true));
    assert_that(&value.pointer("/details/password/type").and_then(|v| v.as_str()))
        .is_equal_to(Some("password"));
}

#[test]
fn custom_input_fields_flattened_with_expires_in_stub() {
    let spec = AuthSpec::custom_input([
        (
            "instanceName".to_string(),
            AuthField::required("Instance name"),
        ),
        (
            "password".to_string(),
            AuthField::required("Password").password(),
        ),
    ]);
    let value = serde_json::to_value(&spec).expect("Expected serialization.");

    assert_that(&value.pointer("/type").and_then(|v| v.as_str())).is_equal_to(Some("customInput"));
    assert_that(&value.pointer("/details/instanceName/description").and_then(|v| v.as_str()))
        .is_equal_to(Some("Instance name"));
    assert_that(&value.pointer("/details/expires_in/disabled").and_then(|v| v.as_bool()))
        .is_equal_to(Some(true));
    assert_that(&spec.validate().is_ok()).is_equal_to(true);
}

#[test]
fn empty_custom_input_violates_invariant() {
    let spec: AuthSpec = serde_json::from_str(r#"{"type": "customInput", "details": {}}"#)
        .expect("Expected deserialization.");

    assert_that(&spec.validate().is_err()).is_equal_to(true);
}

#[test]
fn platform_example_round_trips() {
    let raw = r#"{
        "type": "bearerToken",
        "details": {
            "expires_in": {"type": "number", "hidden": true, "default": 100000, "disabled": true},
            "access_token": {"type": "password", "required": true, "description": "Token"}
        }
    }"#;

    let spec: AuthSpec = serde_json::from_str(raw).expect("Expected deserialization.");

    assert_that(&spec).is_equal_to(AuthSpec::bearer_token());
}
