use crate::types::ParsedMessage;

/// Serialize a [`ParsedMessage`] to a JSON string.
///
/// When `pretty` is `true` the output is indented for readability.
pub fn format_json(message: &ParsedMessage, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(message).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    } else {
        serde_json::to_string(message).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

/// Render a [`ParsedMessage`] in a human-readable debug format.
pub fn format_debug(message: &ParsedMessage) -> String {
    let mut out = String::with_capacity(256);

    out.push_str("=== HTTP Message ===\n");
    if let Some(method) = &message.method {
        out.push_str(&format!("Method:  {method}\n"));
    }
    if let Some(uri) = &message.uri {
        out.push_str(&format!("URI:     {uri}\n"));
    }
    if let Some(status) = message.status_code {
        out.push_str(&format!("Status:  {status}\n"));
    }
    if let Some(reason) = &message.reason {
        out.push_str(&format!("Reason:  {reason}\n"));
    }
    if let Some(version) = message.version {
        out.push_str(&format!("Version: {version}\n"));
    }

    out.push_str(&format!("\n--- Headers ({}) ---\n", message.headers.len()));
    for header in &message.headers {
        out.push_str(&format!("  {}: {}\n", header.name, header.value));
    }

    if message.body.is_empty() {
        out.push_str("\n--- No Body ---\n");
    } else {
        out.push_str(&format!("\n--- Body ({} bytes) ---\n", message.body.len()));
        match message.body_as_str() {
            Some(s) => out.push_str(s),
            None => out.push_str(&format!("<binary data: {} bytes>", message.body.len())),
        }
        out.push('\n');
    }

    out.push_str("====================\n");
    out
}

/// Render only the start line and headers (no body).
pub fn format_headers_only(message: &ParsedMessage) -> String {
    let mut out = String::with_capacity(64 + message.headers.len() * 40);

    if let (Some(method), Some(uri), Some(version)) =
        (&message.method, &message.uri, message.version)
    {
        out.push_str(&format!("{method} {uri} {version}\n"));
    } else if let (Some(version), Some(status)) = (message.version, message.status_code) {
        let reason = message.reason.as_deref().unwrap_or("");
        out.push_str(&format!("{version} {status} {reason}\n"));
    }

    for header in &message.headers {
        out.push_str(&format!("{}: {}\n", header.name, header.value));
    }

    out
}
