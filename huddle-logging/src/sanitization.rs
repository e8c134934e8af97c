//! Log sanitization
//!
//! Scrubs OAuth credentials (client secrets, authorization codes, PKCE
//! verifiers, access and refresh tokens, `Authorization` header values) out
//! of free-form log messages and structured JSON context before they leave
//! the process.

use regex::Regex;
use std::sync::OnceLock;

/// `key=value` / `"key": "value"` pairs whose value is a credential
static CREDENTIAL_PARAM_REGEX: OnceLock<Regex> = OnceLock::new();
/// `Bearer <token>` and `Basic <credentials>`
static AUTH_SCHEME_REGEX: OnceLock<Regex> = OnceLock::new();
static IP_REGEX: OnceLock<Regex> = OnceLock::new();

fn credential_param_regex() -> &'static Regex {
    CREDENTIAL_PARAM_REGEX.get_or_init(|| {
        Regex::new(
            r#"(?i)(["']?\b(?:client_secret|code_verifier|access_token|refresh_token|code|token|password)["']?\s*[=:]\s*["']?)([^"'\s&,;}]+)"#,
        )
        .expect("Invalid credential regex")
    })
}

fn auth_scheme_regex() -> &'static Regex {
    AUTH_SCHEME_REGEX.get_or_init(|| {
        Regex::new(r"(?i)(\b(?:bearer|basic)\s+)([A-Za-z0-9._~+/=-]+)")
            .expect("Invalid auth scheme regex")
    })
}

fn ip_regex() -> &'static Regex {
    IP_REGEX.get_or_init(|| {
        Regex::new(r"\b(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\b")
            .expect("Invalid IP regex")
    })
}

/// Sanitization configuration
#[derive(Debug, Clone)]
pub struct SanitizationConfig {
    /// Enable sanitization
    pub enabled: bool,

    /// Keep client IP addresses in logs
    pub preserve_ips: bool,

    /// Replacement string for sensitive data
    pub replacement: String,
}

impl Default for SanitizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            preserve_ips: true,
            replacement: "[REDACTED]".to_string(),
        }
    }
}

/// Log sanitizer for removing credentials
#[derive(Debug)]
pub struct LogSanitizer {
    config: SanitizationConfig,
}

impl LogSanitizer {
    pub fn new() -> Self {
        Self::with_config(SanitizationConfig::default())
    }

    pub fn with_config(config: SanitizationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SanitizationConfig {
        &self.config
    }

    /// Redact credential values in a log message, keeping the parameter names
    pub fn sanitize(&self, message: &str) -> String {
        if !self.config.enabled {
            return message.to_string();
        }

        let replacement = self.config.replacement.as_str();

        let sanitized = credential_param_regex().replace_all(message, |caps: &regex::Captures| {
            format!("{}{}", &caps[1], replacement)
        });
        let mut sanitized = auth_scheme_regex()
            .replace_all(&sanitized, |caps: &regex::Captures| {
                format!("{}{}", &caps[1], replacement)
            })
            .into_owned();

        if !self.config.preserve_ips {
            sanitized = ip_regex()
                .replace_all(&sanitized, "[IP_REDACTED]")
                .into_owned();
        }

        sanitized
    }

    /// Sanitize an error's display text
    pub fn sanitize_error(&self, error: &dyn std::error::Error) -> String {
        self.sanitize(&error.to_string())
    }

    /// Sanitize structured logging context
    ///
    /// Values under sensitive keys are replaced outright; every other string
    /// goes through [`LogSanitizer::sanitize`].
    pub fn sanitize_context(&self, context: &serde_json::Value) -> serde_json::Value {
        if !self.config.enabled {
            return context.clone();
        }

        match context {
            serde_json::Value::Object(map) => {
                let sanitized_map = map
                    .iter()
                    .map(|(key, value)| {
                        let value = if Self::is_sensitive_field(key) && !value.is_null() {
                            serde_json::Value::String(self.config.replacement.clone())
                        } else {
                            self.sanitize_context(value)
                        };
                        (key.clone(), value)
                    })
                    .collect();
                serde_json::Value::Object(sanitized_map)
            }
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(|v| self.sanitize_context(v)).collect())
            }
            serde_json::Value::String(s) => serde_json::Value::String(self.sanitize(s)),
            other => other.clone(),
        }
    }

    /// Check if a field name holds a credential
    pub fn is_sensitive_field(field_name: &str) -> bool {
        let lower_name = field_name.to_ascii_lowercase();
        if matches!(
            lower_name.as_str(),
            "code" | "authorization" | "password" | "client_secret" | "code_verifier"
        ) {
            return true;
        }

        // `token_type` and `token_type_hint` describe a token, they are not one
        if lower_name.starts_with("token_type") {
            return false;
        }

        lower_name.contains("token") || lower_name.contains("secret")
    }
}

impl Default for LogSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_SANITIZER: OnceLock<LogSanitizer> = OnceLock::new();

/// Get the global sanitizer instance
pub fn get_sanitizer() -> &'static LogSanitizer {
    GLOBAL_SANITIZER.get_or_init(LogSanitizer::new)
}

/// Initialize the global sanitizer with custom configuration
///
/// Has no effect once the global sanitizer has been used.
pub fn init_sanitizer(config: SanitizationConfig) {
    let _ = GLOBAL_SANITIZER.set(LogSanitizer::with_config(config));
}
