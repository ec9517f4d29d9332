pub const MODEL_API_KEY_ENV_NAME: &str = "DOCFORGE_MODEL_API_KEY";
pub const PLATFORM_TOKEN_ENV_NAME: &str = "DOCFORGE_PLATFORM_TOKEN";
pub const PLATFORM_HOST_ENV_NAME: &str = "DOCFORGE_PLATFORM_HOST";
pub const PLATFORM_SPACE_ID_ENV_NAME: &str = "DOCFORGE_PLATFORM_SPACE_ID";

pub(crate) const THINK_STRIPPER: &str = r"<think>[\s\S]*</think>\s*";

/// Version tag for the extraction prompt below. Bump when the template changes
/// so stored results can be traced back to the prompt that produced them.
pub const EXTRACTION_PROMPT_VERSION: &str = "2";

pub(crate) const DEFAULT_EXTRACTION_PROMPT: &str = r#"
You will see a digest of an API documentation page from {url}.
Extract every API endpoint the digest describes as a JSON array of
objects with two fields: "name" (a camelCase identifier describing the
action, e.g. "listOrganizationMembers") and "curl" (a complete cURL
command using single quotes).

Mapping rules for the cURL commands:
- Use -X with an explicit HTTP method in every command.
- Placeholders use double angle brackets: <<url.name>> or <<auth.name>>.
- Path parameters are mapped: /users/{id} becomes /users/<<url.userId>>.
- Map the host to <<url.baseUrl>> ONLY when the documentation shows it
  varies per user (custom domain, region, instance). Universal hosts
  such as api.openai.com stay literal.
- Query parameters stay static, exactly as documented. Never template them.
- Bodies stay static JSON. Never template inside a body.
- Never use curly braces as placeholders and never put auth.* inside a URL.
- Include non-auth headers from the documentation; authorization headers
  are injected by the platform and may be omitted.

Answer with the JSON array only, no commentary. Return [] if the digest
describes no endpoints.
Digest to mine:"#;
