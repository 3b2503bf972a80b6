use std::collections::HashSet;

use heck::ToPascalCase;

use crate::types::TypeName;

/// Canonical component name for a declared type: PascalCase namespace
/// followed by the sanitized type name.
///
/// Examples:
/// - `openapi3_test` + `PathParamAndBody` → `Openapi3TestPathParamAndBody`
/// - `billing::v2` + `Invoice` → `BillingV2Invoice`
/// - `Page<User>` (no namespace) → `PageUser`
pub fn component_name(name: &TypeName, strip_namespace: bool) -> String {
    let base = sanitize_component_name(&name.name);
    match &name.namespace {
        Some(ns) if !strip_namespace => {
            let prefix = ns.replace("::", "_").replace(['.', '/', '-'], "_");
            format!("{}{}", prefix.to_pascal_case(), base)
        }
        _ => base,
    }
}

/// Reduce a type name to the component name charset `[A-Za-z0-9._-]`.
/// Runs of other characters are dropped and the following chunk is
/// capitalized, so `Page<user>` becomes `PageUser`.
fn sanitize_component_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut capitalize_next = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            if capitalize_next {
                result.push(ch.to_ascii_uppercase());
            } else {
                result.push(ch);
            }
            capitalize_next = false;
        } else {
            capitalize_next = !result.is_empty();
        }
    }

    if result.is_empty() {
        return "Unnamed".to_string();
    }

    result
}

/// Claim `base`, appending numeric suffixes `2, 3, ...` when it is taken.
pub fn unique_name(base: &str, used_names: &mut HashSet<String>) -> String {
    if used_names.insert(base.to_string()) {
        return base.to_string();
    }
    let mut i = 2;
    loop {
        let candidate = format!("{}{}", base, i);
        if used_names.insert(candidate.clone()) {
            return candidate;
        }
        i += 1;
    }
}

/// Reason phrase used as the description of a response.
pub fn status_text(status: u16) -> String {
    let text = match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        other => return format!("Status {other}"),
    };
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_name() {
        let name = TypeName::new("openapi3_test", "PathParamAndBody");
        assert_eq!(component_name(&name, false), "Openapi3TestPathParamAndBody");
    }

    #[test]
    fn test_type_name_case_is_kept() {
        let name = TypeName::new("openapi3_test", "UUID");
        assert_eq!(component_name(&name, false), "Openapi3TestUUID");
    }

    #[test]
    fn test_rust_module_path_namespace() {
        let name = TypeName::new("billing::v2", "Invoice");
        assert_eq!(component_name(&name, false), "BillingV2Invoice");
    }

    #[test]
    fn test_strip_namespace() {
        let name = TypeName::new("billing", "Invoice");
        assert_eq!(component_name(&name, true), "Invoice");
    }

    #[test]
    fn test_generic_name_is_sanitized() {
        assert_eq!(component_name(&TypeName::local("Page<user>"), false), "PageUser");
        assert_eq!(
            component_name(&TypeName::local("Pair<A, b>"), false),
            "PairAB"
        );
        assert_eq!(component_name(&TypeName::local("v1.Pet-Item"), false), "v1.Pet-Item");
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(component_name(&TypeName::local("<>"), false), "Unnamed");
    }

    #[test]
    fn test_unique_name_suffixes() {
        let mut used = HashSet::new();
        assert_eq!(unique_name("Pet", &mut used), "Pet");
        assert_eq!(unique_name("Pet", &mut used), "Pet2");
        assert_eq!(unique_name("Pet", &mut used), "Pet3");
        assert_eq!(unique_name("Owner", &mut used), "Owner");
    }

    #[test]
    fn test_status_text() {
        assert_eq!(status_text(200), "OK");
        assert_eq!(status_text(409), "Conflict");
        assert_eq!(status_text(299), "Status 299");
    }
}
