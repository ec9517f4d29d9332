use crate::extract_extras::StubLlmProvider;
use spectral::assert_that;

mod extract_extras;

const VALID: &str = r#"[{"name": "getUser", "curl": "curl -X GET 'https://api.example.com/users/<<url.userId>>'"}]"#;

assert_extractions![
    bare_array_accepted:
        response => VALID,
        accepted => 1, rejected => 0,
    fenced_array_accepted:
        response => format!("```json\n{VALID}\n```"),
        accepted => 1, rejected => 0,
    commands_wrapper_accepted:
        response => format!("{{\"commands\": {VALID}}}"),
        accepted => 1, rejected => 0,
    think_block_stripped:
        response => format!("<think>reasoning about endpoints</think>\n{VALID}"),
        accepted => 1, rejected => 0,
    malformed_json_yields_empty:
        response => "The documentation describes no endpoints.",
        accepted => 0, rejected => 0,
    empty_array_yields_empty:
        response => "[]",
        accepted => 0, rejected => 0,
    braced_path_candidate_repaired:
        response => r#"[{"name": "getUser", "curl": "curl -X GET 'https://api.example.com/users/{id}'"}]"#,
        accepted => 1, rejected => 0,
    braced_host_candidate_rejected:
        response => r#"[{"name": "listItems", "curl": "curl -X GET 'https://{domain}/api/v1/items'"}]"#,
        accepted => 0, rejected => 1,
    mixed_candidates_split:
        response => r#"[
            {"name": "getUser", "curl": "curl -X GET 'https://api.example.com/users/<<url.userId>>'"},
            {"name": "badAuth", "curl": "curl -X GET 'https://api.example.com/items/<<auth.itemId>>'"}
        ]"#,
        accepted => 1, rejected => 1,
];
