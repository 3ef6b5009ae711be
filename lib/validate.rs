//! Request validation for the pybox server.
//!
//! This module turns a raw JSON payload into a validated [`ExecutionRequest`]
//! before anything touches disk. Validation is total: a single invalid file
//! rejects the whole request rather than silently dropping it.
//!
//! Filename sanitization strips any directory component, then requires a
//! restricted character set, no hidden files, and an allowlisted extension,
//! so a sanitized name always resolves to a sibling of the entry point.

use serde_json::Value;

use crate::{config::Limits, error::ValidationError};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A validated request, ready to be materialized into a workspace
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// The main code, always executed as the entry point
    pub code: String,

    /// Auxiliary files placed next to the entry point
    pub files: Vec<SanitizedFile>,
}

/// An auxiliary file whose name and content have passed validation
#[derive(Debug, Clone)]
pub struct SanitizedFile {
    /// Sanitized base name, a single path component
    pub name: String,

    /// File content, within the per-file size ceiling
    pub content: String,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Parse and validate a raw execute payload.
///
/// Fails fast with the first violated constraint; never touches the
/// filesystem.
pub fn parse_request(payload: &Value, limits: &Limits) -> Result<ExecutionRequest, ValidationError> {
    let code = match payload.get("code").and_then(Value::as_str) {
        Some(code) if !code.is_empty() => code,
        _ => return Err(ValidationError::NoCode),
    };

    if code.len() > limits.max_code_bytes {
        return Err(ValidationError::CodeTooLarge(limits.max_code_bytes / 1024));
    }

    let mut files = Vec::new();
    match payload.get("files") {
        None | Some(Value::Null) => {}
        Some(Value::Array(entries)) => {
            if entries.len() > limits.max_files {
                return Err(ValidationError::TooManyFiles(limits.max_files));
            }

            for entry in entries {
                let entry = entry.as_object().ok_or(ValidationError::InvalidFileObject)?;

                let name = entry.get("name").and_then(Value::as_str).unwrap_or("");
                let content = entry.get("content").and_then(Value::as_str).unwrap_or("");
                if name.is_empty() || content.is_empty() {
                    return Err(ValidationError::MissingNameOrContent);
                }

                let sanitized = sanitize_filename(name, &limits.allowed_extensions)
                    .ok_or_else(|| ValidationError::InvalidFilename {
                        name: name.to_string(),
                        allowed: limits.allowed_extensions.join(", "),
                    })?;

                if content.len() > limits.max_file_bytes {
                    return Err(ValidationError::FileTooLarge(
                        name.to_string(),
                        limits.max_file_bytes / 1024,
                    ));
                }

                files.push(SanitizedFile {
                    name: sanitized,
                    content: content.to_string(),
                });
            }
        }
        Some(_) => return Err(ValidationError::FilesNotArray),
    }

    Ok(ExecutionRequest {
        code: code.to_string(),
        files,
    })
}

/// Validate and sanitize a client-supplied filename.
///
/// Strips any directory component, then rejects empty names, `.` and `..`,
/// names with characters outside `[A-Za-z0-9._-]`, hidden files, and names
/// without an allowlisted extension. Returns the sanitized base name.
pub fn sanitize_filename(name: &str, allowed_extensions: &[String]) -> Option<String> {
    // Strip directory components, keeping only the base name
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");

    if base.is_empty() || base == "." || base == ".." {
        return None;
    }

    if !base
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return None;
    }

    // No hidden files
    if base.starts_with('.') {
        return None;
    }

    if !allowed_extensions.iter().any(|ext| base.ends_with(ext.as_str())) {
        return None;
    }

    Some(base.to_string())
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn limits() -> Limits {
        Limits::default()
    }

    #[test]
    fn test_sanitize_filename_accepts_simple_names() {
        let exts = limits().allowed_extensions;
        assert_eq!(
            sanitize_filename("helper.py", &exts),
            Some("helper.py".to_string())
        );
        assert_eq!(
            sanitize_filename("data_2024-01.csv", &exts),
            Some("data_2024-01.csv".to_string())
        );
    }

    #[test]
    fn test_sanitize_filename_strips_directory_components() {
        let exts = limits().allowed_extensions;
        // Traversal prefixes are stripped; the base name must still pass
        assert_eq!(
            sanitize_filename("../helper.py", &exts),
            Some("helper.py".to_string())
        );
        assert_eq!(
            sanitize_filename("/etc/passwd.txt", &exts),
            Some("passwd.txt".to_string())
        );
        assert_eq!(sanitize_filename("a/b/..", &exts), None);
    }

    #[test]
    fn test_sanitize_filename_rejects_bad_names() {
        let exts = limits().allowed_extensions;
        assert_eq!(sanitize_filename("", &exts), None);
        assert_eq!(sanitize_filename(".", &exts), None);
        assert_eq!(sanitize_filename("..", &exts), None);
        assert_eq!(sanitize_filename(".hidden.py", &exts), None);
        assert_eq!(sanitize_filename("no_extension", &exts), None);
        assert_eq!(sanitize_filename("script.sh", &exts), None);
        assert_eq!(sanitize_filename("bad name.py", &exts), None);
        assert_eq!(sanitize_filename("semi;colon.py", &exts), None);
    }

    #[test]
    fn test_parse_request_requires_code() {
        assert_eq!(
            parse_request(&json!({}), &limits()).unwrap_err(),
            ValidationError::NoCode
        );
        assert_eq!(
            parse_request(&json!({ "code": "" }), &limits()).unwrap_err(),
            ValidationError::NoCode
        );
        assert_eq!(
            parse_request(&json!({ "code": 42 }), &limits()).unwrap_err(),
            ValidationError::NoCode
        );
    }

    #[test]
    fn test_parse_request_rejects_oversized_code() {
        let max = limits().max_code_bytes;
        let payload = json!({ "code": "x".repeat(max + 1) });
        assert_eq!(
            parse_request(&payload, &limits()).unwrap_err(),
            ValidationError::CodeTooLarge(max / 1024)
        );
    }

    #[test]
    fn test_parse_request_rejects_bad_files_shapes() {
        let l = limits();
        assert_eq!(
            parse_request(&json!({ "code": "print(1)", "files": "nope" }), &l).unwrap_err(),
            ValidationError::FilesNotArray
        );
        assert_eq!(
            parse_request(&json!({ "code": "print(1)", "files": [1] }), &l).unwrap_err(),
            ValidationError::InvalidFileObject
        );
        assert_eq!(
            parse_request(&json!({ "code": "print(1)", "files": [{ "name": "a.py" }] }), &l)
                .unwrap_err(),
            ValidationError::MissingNameOrContent
        );
    }

    #[test]
    fn test_parse_request_rejects_too_many_files() {
        let entries: Vec<_> = (0..limits().max_files + 1)
            .map(|i| json!({ "name": format!("f{}.py", i), "content": "x = 1" }))
            .collect();
        assert_eq!(
            parse_request(&json!({ "code": "print(1)", "files": entries }), &limits())
                .unwrap_err(),
            ValidationError::TooManyFiles(limits().max_files)
        );
    }

    #[test]
    fn test_parse_request_fails_closed_on_single_bad_file() {
        // One invalid file rejects the whole request, valid siblings included
        let payload = json!({
            "code": "print(1)",
            "files": [
                { "name": "good.py", "content": "x = 1" },
                { "name": "evil.sh", "content": "rm -rf /" },
            ]
        });
        assert!(matches!(
            parse_request(&payload, &limits()).unwrap_err(),
            ValidationError::InvalidFilename { name, .. } if name == "evil.sh"
        ));
    }

    #[test]
    fn test_parse_request_rejects_oversized_file() {
        let l = limits();
        let payload = json!({
            "code": "print(1)",
            "files": [{ "name": "big.txt", "content": "x".repeat(l.max_file_bytes + 1) }]
        });
        assert_eq!(
            parse_request(&payload, &l).unwrap_err(),
            ValidationError::FileTooLarge("big.txt".to_string(), l.max_file_bytes / 1024)
        );
    }

    #[test]
    fn test_parse_request_happy_path() {
        let payload = json!({
            "code": "import helper\nhelper.greet()",
            "files": [{ "name": "helper.py", "content": "def greet():\n    print('hi')\n" }]
        });
        let request = parse_request(&payload, &limits()).unwrap();
        assert_eq!(request.code, "import helper\nhelper.greet()");
        assert_eq!(request.files.len(), 1);
        assert_eq!(request.files[0].name, "helper.py");
    }
}
