//! Shared effect-detection helpers used by every language backend.
//!
//! No teacher counterpart exists for this — canopy has no side-effect model
//! at all — so this is new logic, written in the same plain-function,
//! no-I/O style as the rest of the parsers.

use devac_core::SendType;

const HTTP_VERBS: &[&str] = &["get", "post", "put", "patch", "delete", "head", "options"];

fn verb_name(method: &str) -> &'static str {
    match method {
        "get" => "GET",
        "post" => "POST",
        "put" => "PUT",
        "patch" => "PATCH",
        "delete" => "DELETE",
        "head" => "HEAD",
        "options" => "OPTIONS",
        _ => "GET",
    }
}

/// Recognized HTTP client call shapes: `fetch(url, …)` and `axios.<verb>(url, …)`.
/// Returns `(send_type, method, is_third_party)`.
pub fn classify_send(dotted_callee: &str) -> Option<(SendType, &'static str, bool)> {
    if dotted_callee == "fetch" {
        return Some((SendType::Http, "GET", true));
    }
    if let Some((receiver, method)) = dotted_callee.rsplit_once('.') {
        if receiver == "axios" && HTTP_VERBS.contains(&method) {
            return Some((SendType::Http, verb_name(method), true));
        }
        let lower = receiver.to_ascii_lowercase();
        if (lower.ends_with("client") || lower.ends_with("m2m")) && HTTP_VERBS.contains(&method) {
            return Some((SendType::M2m, verb_name(method), false));
        }
    }
    None
}

/// Extract the M2M service name from a URL template: a path segment matching
/// `<service>-endpoints`.
pub fn service_name_from_url(url: &str) -> Option<String> {
    url.split(['/', '?'])
        .find_map(|segment| segment.strip_suffix("-endpoints").filter(|s| !s.is_empty()))
        .map(str::to_string)
}

/// Recognized routing-decorator names, used to detect `Request` effects.
/// Not exhaustive — a small per-language table, per §4.2.
pub const ROUTE_CLASS_DECORATORS: &[&str] = &["Controller", "Route"];
pub const ROUTE_METHOD_DECORATORS: &[(&str, &str)] = &[
    ("Get", "GET"),
    ("Post", "POST"),
    ("Put", "PUT"),
    ("Patch", "PATCH"),
    ("Delete", "DELETE"),
];

/// Python's `@app.route("/path", methods=["POST"])` convention.
pub fn python_route_decorator(decorator_text: &str) -> bool {
    decorator_text.contains(".route(") || decorator_text.contains(".get(")
        || decorator_text.contains(".post(")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_fetch() {
        assert_eq!(classify_send("fetch"), Some((SendType::Http, "GET", true)));
    }

    #[test]
    fn recognizes_axios_verb() {
        assert_eq!(classify_send("axios.post"), Some((SendType::Http, "POST", true)));
    }

    #[test]
    fn recognizes_m2m_client() {
        assert_eq!(classify_send("m2mClient.post"), Some((SendType::M2m, "POST", false)));
        assert_eq!(classify_send("userServiceClient.get"), Some((SendType::M2m, "GET", false)));
    }

    #[test]
    fn ignores_unrelated_calls() {
        assert_eq!(classify_send("console.log"), None);
    }

    #[test]
    fn extracts_service_name_from_endpoints_segment() {
        assert_eq!(
            service_name_from_url("https://host/stage/users-endpoints/123"),
            Some("users".to_string())
        );
        assert_eq!(service_name_from_url("https://host/no-match"), None);
    }
}
