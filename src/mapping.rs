//! The mapping module validates and canonicalizes LLM-proposed cURL
//! commands against the `<<namespace.name>>` placeholder grammar:
//! per-user URL segments map under `url.*`, credential-derived values
//! under `auth.*`, query strings and bodies stay literal, and curly
//! braces are not a placeholder syntax. Violations come back as typed
//! rejection reasons so the caller can re-prompt or escalate to a human
//! instead of receiving a generic error.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// `{identifier}` inside a URL path; mechanically rewritten to
/// `<<url.identifier>>`.
static PATH_BRACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Failed to compile PATH_BRACE regex")
});

/// Anything that still looks like a curly-brace placeholder after the
/// path rewrite. Quotes, colons and whitespace between the braces mean
/// JSON, not a placeholder.
static CURLY_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\{[^{}"':\s]+\}"#).expect("Failed to compile CURLY_PLACEHOLDER regex")
});

/// A double-angle-bracket placeholder, well formed or not.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<<([^<>]*)>>").expect("Failed to compile PLACEHOLDER regex"));

/// The only admissible placeholder interior.
static WELL_FORMED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(url|auth)\.[A-Za-z_][A-Za-z0-9_]*$").expect("Failed to compile WELL_FORMED regex")
});

const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Headers the platform injects from the connector group's auth
/// configuration; they are stripped from every command.
const AUTH_HEADER_NAMES: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "x-api-key",
    "api-key",
    "apikey",
    "x-auth-token",
    "x-access-token",
    "x-api-token",
];

/// One LLM-proposed API operation, exactly as extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandCandidate {
    pub name: String,
    pub curl: String,
}

/// A candidate that passed the grammar and was rebuilt canonically:
/// explicit method, single-quoted arguments, auth headers removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedCommand {
    pub name: String,
    pub method: String,
    pub url: String,
    pub curl: String,
}

/// Why a candidate was rejected. Each variant carries the offending
/// token so the caller can decide to retry extraction or flag the
/// command for human review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No explicit `-X <verb>` or the verb is not an HTTP method.
    MissingMethod,
    EmptyUrl,
    /// Curly braces are not a placeholder syntax.
    CurlyPlaceholder { token: String },
    /// A `<<...>>` token outside the `<<(url|auth).name>>` grammar.
    MalformedPlaceholder { token: String },
    /// `auth.*` must never appear inside a URL.
    AuthInUrl { token: String },
    /// Query parameters stay literal.
    TemplatedQuery { token: String },
    /// Body payloads stay literal.
    TemplatedBody { token: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMethod => write!(formatter, "missing explicit HTTP method"),
            Self::EmptyUrl => write!(formatter, "empty or missing URL"),
            Self::CurlyPlaceholder { token } => {
                write!(formatter, "curly-brace placeholder {token} is not normalized")
            }
            Self::MalformedPlaceholder { token } => {
                write!(formatter, "malformed placeholder {token}")
            }
            Self::AuthInUrl { token } => {
                write!(formatter, "auth placeholder {token} inside URL")
            }
            Self::TemplatedQuery { token } => {
                write!(formatter, "templated query parameter {token}")
            }
            Self::TemplatedBody { token } => {
                write!(formatter, "templated body value {token}")
            }
        }
    }
}

/// Pieces of a tokenized cURL command.
#[derive(Debug, Default)]
struct ParsedCurl {
    method: Option<String>,
    url: Option<String>,
    headers: Vec<(String, String)>,
    body: Option<String>,
}

/// Validates a candidate against the placeholder grammar and rebuilds
/// it canonically.
///
/// The only mechanical rewrite applied is `{identifier}` path segments
/// to `<<url.identifier>>`. Whether a host is tenant-specific (and so
/// deserves `<<url.baseUrl>>`) is a judgment call the extraction step
/// must have made; a leftover curly host placeholder is rejected here
/// rather than silently resolved.
///
/// # Errors
///
/// Returns a [`Rejection`] describing the first grammar violation
/// found: missing method, empty URL, curly placeholders, malformed
/// `<<...>>` tokens, `auth.*` in the URL, or templated query/body
/// values.
pub fn normalize(candidate: &CommandCandidate) -> Result<NormalizedCommand, Rejection> {
    let parsed = parse_curl(&candidate.curl);

    let method = parsed
        .method
        .as_deref()
        .map(str::to_uppercase)
        .filter(|method| HTTP_METHODS.contains(&method.as_str()))
        .ok_or(Rejection::MissingMethod)?;

    let raw_url = parsed.url.unwrap_or_default();
    if raw_url.trim().is_empty() {
        return Err(Rejection::EmptyUrl);
    }

    let url = rewrite_path_params(&raw_url);

    check_curly(&url)?;
    for (_, value) in &parsed.headers {
        check_curly(value)?;
    }
    if let Some(body) = &parsed.body {
        check_curly(body)?;
    }

    validate_placeholders(&url)?;
    for (_, value) in &parsed.headers {
        validate_placeholders(value)?;
    }

    if let Some(token) = find_placeholder(&url, "auth.") {
        return Err(Rejection::AuthInUrl { token });
    }
    if let Some((_, query)) = url.split_once('?')
        && let Some(found) = PLACEHOLDER.find(query)
    {
        return Err(Rejection::TemplatedQuery {
            token: found.as_str().to_string(),
        });
    }
    if let Some(body) = &parsed.body {
        if let Some(found) = PLACEHOLDER.find(body) {
            return Err(Rejection::TemplatedBody {
                token: found.as_str().to_string(),
            });
        }
        validate_placeholders(body)?;
    }

    let headers: Vec<(String, String)> = parsed
        .headers
        .into_iter()
        .filter(|(name, value)| !is_auth_header(name, value))
        .collect();

    let rebuilt = rebuild(&method, &url, &headers, parsed.body.as_deref());

    Ok(NormalizedCommand {
        name: candidate.name.trim().to_string(),
        method,
        url,
        curl: rebuilt,
    })
}

/// Splits a command into shell-style tokens, honoring single and double
/// quotes, backslash escapes and backslash-newline continuations.
fn shell_tokens(command: &str) -> Vec<String> {
    let unwrapped = command.replace("\\\r\n", " ").replace("\\\n", " ");
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = unwrapped.chars();

    while let Some(character) = chars.next() {
        match quote {
            Some(open) if character == open => quote = None,
            Some('"') if character == '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            Some(_) => current.push(character),
            None => match character {
                '\'' | '"' => {
                    quote = Some(character);
                    in_token = true;
                }
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                        in_token = true;
                    }
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                other => {
                    current.push(other);
                    in_token = true;
                }
            },
        }
    }
    if in_token {
        tokens.push(current);
    }

    tokens
}

fn parse_curl(command: &str) -> ParsedCurl {
    let mut parsed = ParsedCurl::default();
    let mut tokens = shell_tokens(command).into_iter();

    while let Some(token) = tokens.next() {
        match token.as_str() {
            "curl" => {}
            "-X" | "--request" => parsed.method = tokens.next(),
            "-H" | "--header" => {
                if let Some(header) = tokens.next() {
                    parsed.headers.push(split_header(&header));
                }
            }
            "-d" | "--data" | "--data-raw" | "--data-binary" => parsed.body = tokens.next(),
            // Basic credentials are auth material; the platform injects
            // them.
            "-u" | "--user" => {
                tokens.next();
            }
            other => {
                if parsed.url.is_none()
                    && (other.starts_with("http://") || other.starts_with("https://"))
                {
                    parsed.url = Some(other.to_string());
                }
            }
        }
    }

    parsed
}

fn split_header(raw: &str) -> (String, String) {
    match raw.split_once(':') {
        Some((name, value)) => (name.trim().to_string(), value.trim().to_string()),
        None => (raw.trim().to_string(), String::new()),
    }
}

/// Rewrites `{identifier}` segments in the URL path to
/// `<<url.identifier>>`. The host and the query string are left alone:
/// a braced host is a tenant judgment, a braced query value is a
/// grammar violation, and both are surfaced by the later checks.
fn rewrite_path_params(url: &str) -> String {
    let authority_start = url.find("://").map(|found| found + 3).unwrap_or(0);
    let path_start = url
        .get(authority_start..)
        .and_then(|rest| rest.find('/'))
        .map(|found| authority_start + found);

    let Some(path_start) = path_start else {
        return url.to_string();
    };

    let (head, tail) = url.split_at(path_start);
    let (path, query) = match tail.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (tail, None),
    };

    let mut rewritten = String::from(head);
    rewritten.push_str(&PATH_BRACE.replace_all(path, "<<url.$1>>"));
    if let Some(query) = query {
        rewritten.push('?');
        rewritten.push_str(query);
    }
    rewritten
}

fn check_curly(text: &str) -> Result<(), Rejection> {
    match CURLY_PLACEHOLDER.find(text) {
        Some(found) => Err(Rejection::CurlyPlaceholder {
            token: found.as_str().to_string(),
        }),
        None => Ok(()),
    }
}

/// Every `<<...>>` token must match the grammar, and every `<<` must
/// belong to a complete token.
fn validate_placeholders(text: &str) -> Result<(), Rejection> {
    let mut complete = 0_usize;
    for captures in PLACEHOLDER.captures_iter(text) {
        complete += 1;
        let interior = captures.get(1).map(|found| found.as_str()).unwrap_or("");
        if !WELL_FORMED.is_match(interior) {
            let token = captures
                .get(0)
                .map(|found| found.as_str().to_string())
                .unwrap_or_default();
            return Err(Rejection::MalformedPlaceholder { token });
        }
    }

    if text.matches("<<").count() != complete {
        return Err(Rejection::MalformedPlaceholder {
            token: "<<".to_string(),
        });
    }

    Ok(())
}

fn find_placeholder(text: &str, namespace_prefix: &str) -> Option<String> {
    PLACEHOLDER.captures_iter(text).find_map(|captures| {
        let interior = captures.get(1).map(|found| found.as_str())?;
        if interior.starts_with(namespace_prefix) {
            captures.get(0).map(|found| found.as_str().to_string())
        } else {
            None
        }
    })
}

fn is_auth_header(name: &str, value: &str) -> bool {
    AUTH_HEADER_NAMES.contains(&name.to_lowercase().as_str())
        || value.to_lowercase().starts_with("bearer ")
}

/// Rebuilds the command in canonical form: explicit method, single
/// quotes everywhere, headers before body.
fn rebuild(method: &str, url: &str, headers: &[(String, String)], body: Option<&str>) -> String {
    let mut command = format!("curl -X {method} {}", single_quote(url));
    for (name, value) in headers {
        command.push_str(&format!(" -H {}", single_quote(&format!("{name}: {value}"))));
    }
    if let Some(body) = body {
        command.push_str(&format!(" -d {}", single_quote(body)));
    }
    command
}

fn single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
