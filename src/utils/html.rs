/// Clean authored HTML (lesson bodies, question prompts) using ammonia.
///
/// Whitelist-based sanitization: safe formatting tags survive, script tags
/// and event-handler attributes are stripped. This is the fail-safe against
/// stored XSS from the authoring endpoints.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
