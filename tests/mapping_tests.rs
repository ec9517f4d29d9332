use docforge::mapping::{CommandCandidate, Rejection, normalize};
use spectral::assert_that;

fn candidate(curl: &str) -> CommandCandidate {
    CommandCandidate {
        name: "testEndpoint".to_string(),
        curl: curl.to_string(),
    }
}

#[test]
fn path_params_mapped_query_untouched() {
    let accepted = normalize(&candidate(
        "curl -X GET \"https://api.example.com/users/{id}/items?limit=10\"",
    ))
    .expect("Expected the command to normalize.");

    assert_that(&accepted.curl.as_str())
        .is_equal_to("curl -X GET 'https://api.example.com/users/<<url.id>>/items?limit=10'");
    assert_that(&accepted.method.as_str()).is_equal_to("GET");
    assert_that(&accepted.url.as_str())
        .is_equal_to("https://api.example.com/users/<<url.id>>/items?limit=10");
}

#[test]
fn multiple_path_params_mapped() {
    let accepted = normalize(&candidate(
        "curl -X DELETE 'https://api.example.com/orders/{orderId}/items/{itemId}'",
    ))
    .expect("Expected the command to normalize.");

    assert_that(&accepted.url.as_str())
        .is_equal_to("https://api.example.com/orders/<<url.orderId>>/items/<<url.itemId>>");
}

#[test]
fn braced_host_is_surfaced_not_guessed() {
    // Whether a host is tenant-specific is a judgment call; a leftover
    // {domain} must come back as a rejection, never as <<url.baseUrl>>.
    let rejection = normalize(&candidate("curl -X GET 'https://{domain}/api/v1/items'"))
        .expect_err("Expected a rejection.");

    assert_that(&rejection).is_equal_to(Rejection::CurlyPlaceholder {
        token: "{domain}".to_string(),
    });
}

#[test]
fn curly_in_query_rejected() {
    let rejection = normalize(&candidate(
        "curl -X GET 'https://api.example.com/items?limit={limit}'",
    ))
    .expect_err("Expected a rejection.");

    assert_that(&rejection).is_equal_to(Rejection::CurlyPlaceholder {
        token: "{limit}".to_string(),
    });
}

#[test]
fn auth_placeholder_in_path_rejected() {
    let rejection = normalize(&candidate(
        "curl -X GET 'https://api.example.com/items/<<auth.itemId>>'",
    ))
    .expect_err("Expected a rejection.");

    assert_that(&rejection).is_equal_to(Rejection::AuthInUrl {
        token: "<<auth.itemId>>".to_string(),
    });
}

#[test]
fn templated_query_rejected() {
    let rejection = normalize(&candidate(
        "curl -X GET 'https://api.example.com/items?limit=<<url.limit>>'",
    ))
    .expect_err("Expected a rejection.");

    assert_that(&rejection).is_equal_to(Rejection::TemplatedQuery {
        token: "<<url.limit>>".to_string(),
    });
}

#[test]
fn templated_body_rejected() {
    let rejection = normalize(&candidate(
        "curl -X POST 'https://api.example.com/items' -d '{\"name\": \"<<url.name>>\"}'",
    ))
    .expect_err("Expected a rejection.");

    assert_that(&rejection).is_equal_to(Rejection::TemplatedBody {
        token: "<<url.name>>".to_string(),
    });
}

#[test]
fn unknown_namespace_rejected() {
    let rejection = normalize(&candidate(
        "curl -X GET 'https://api.example.com/items/<<id>>'",
    ))
    .expect_err("Expected a rejection.");

    assert_that(&rejection).is_equal_to(Rejection::MalformedPlaceholder {
        token: "<<id>>".to_string(),
    });
}

#[test]
fn dangling_placeholder_rejected() {
    let rejection = normalize(&candidate(
        "curl -X GET 'https://api.example.com/items/<<url.id'",
    ))
    .expect_err("Expected a rejection.");

    assert_that(&rejection).is_equal_to(Rejection::MalformedPlaceholder {
        token: "<<".to_string(),
    });
}

#[test]
fn missing_method_rejected() {
    let rejection = normalize(&candidate("curl 'https://api.example.com/items'"))
        .expect_err("Expected a rejection.");

    assert_that(&rejection).is_equal_to(Rejection::MissingMethod);
}

#[test]
fn empty_url_rejected() {
    let rejection = normalize(&candidate("curl -X GET")).expect_err("Expected a rejection.");

    assert_that(&rejection).is_equal_to(Rejection::EmptyUrl);
}

#[test]
fn auth_headers_stripped() {
    let accepted = normalize(&candidate(
        "curl -X GET 'https://api.example.com/me' \
         -H 'Authorization: Bearer SECRET' \
         -H 'X-Api-Key: SECRET' \
         -H 'Content-Type: application/json'",
    ))
    .expect("Expected the command to normalize.");

    assert_that(&accepted.curl.contains("Authorization")).is_equal_to(false);
    assert_that(&accepted.curl.contains("X-Api-Key")).is_equal_to(false);
    assert_that(&accepted.curl.contains("SECRET")).is_equal_to(false);
    assert_that(&accepted.curl.contains("Content-Type: application/json")).is_equal_to(true);
}

#[test]
fn bearer_value_stripped_regardless_of_header_name() {
    let accepted = normalize(&candidate(
        "curl -X GET 'https://api.example.com/me' -H 'X-Custom-Token: Bearer SECRET'",
    ))
    .expect("Expected the command to normalize.");

    assert_that(&accepted.curl.contains("SECRET")).is_equal_to(false);
}

#[test]
fn custom_auth_header_placeholder_kept() {
    let accepted = normalize(&candidate(
        "curl -X GET 'https://api.example.com/items' -H 'X-Correlation-Id: <<auth.correlationId>>'",
    ))
    .expect("Expected the command to normalize.");

    assert_that(&accepted.curl.contains("X-Correlation-Id: <<auth.correlationId>>"))
        .is_equal_to(true);
}

#[test]
fn tenant_base_url_mapping_accepted_when_given() {
    let accepted = normalize(&candidate(
        "curl -X GET 'https://<<url.storeName>>.myshopify.com/admin/api/2025-07/products.json'",
    ))
    .expect("Expected the command to normalize.");

    assert_that(&accepted.url.contains("<<url.storeName>>")).is_equal_to(true);
}

#[test]
fn static_body_and_quotes_canonicalized() {
    let accepted = normalize(&candidate(
        "curl -X POST \"https://api.example.com/v1/completions\" \
         -H \"Content-Type: application/json\" \
         -d \"{\\\"prompt\\\": \\\"Hello world\\\"}\"",
    ))
    .expect("Expected the command to normalize.");

    assert_that(&accepted.curl.as_str()).is_equal_to(
        "curl -X POST 'https://api.example.com/v1/completions' \
         -H 'Content-Type: application/json' \
         -d '{\"prompt\": \"Hello world\"}'",
    );
}

#[test]
fn multiline_continuations_parsed() {
    let accepted = normalize(&candidate(
        "curl -X GET 'https://api.example.com/users/{userId}' \\\n-H 'Accept: application/json'",
    ))
    .expect("Expected the command to normalize.");

    assert_that(&accepted.url.as_str()).is_equal_to("https://api.example.com/users/<<url.userId>>");
    assert_that(&accepted.curl.contains("Accept: application/json")).is_equal_to(true);
}

#[test]
fn normalized_commands_satisfy_grammar() {
    let commands = [
        "curl -X GET \"https://api.example.com/users/{id}/items?limit=10\"",
        "curl -X POST 'https://api.example.com/items' -d '{\"name\": \"item1\"}'",
        "curl -X GET 'https://<<url.baseUrl>>/api/v1/items' -H 'Authorization: Bearer X'",
    ];

    for raw in commands {
        let accepted = normalize(&candidate(raw)).expect("Expected the command to normalize.");
        let url_has_auth = accepted.url.contains("<<auth.");
        let curly_left = accepted.curl.contains('{') && !accepted.curl.contains("{\"");

        assert_that(&url_has_auth).is_equal_to(false);
        assert_that(&curly_left).is_equal_to(false);
    }
}
