//! Utility functions for authentication.

use rand::Rng;

use crate::constants::UNKNOWN_DEVICE_LABEL;

/// Generate a numeric one-time code of `len` digits.
///
/// Each digit is drawn independently from the thread-local CSPRNG, so
/// leading zeros are possible and expected.
///
/// # Examples
///
/// ```
/// use trustgate_auth::utils::generate_numeric_code;
///
/// let code = generate_numeric_code(6);
/// assert_eq!(code.len(), 6);
/// assert!(code.chars().all(|c| c.is_ascii_digit()));
/// ```
#[must_use]
pub fn generate_numeric_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Generate a 16 byte random salt, hex encoded.
#[must_use]
pub fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}

/// Trim a value, treating blank input as absent.
///
/// # Examples
///
/// ```
/// use trustgate_auth::utils::non_blank;
///
/// assert_eq!(non_blank(Some("  fp-1 ")), Some("fp-1"));
/// assert_eq!(non_blank(Some("   ")), None);
/// assert_eq!(non_blank(None), None);
/// ```
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Label used for a device in mails and alerts.
///
/// # Examples
///
/// ```
/// use trustgate_auth::utils::device_label;
///
/// assert_eq!(device_label(Some("Work laptop")), "Work laptop");
/// assert_eq!(device_label(Some("  ")), "Unknown device");
/// assert_eq!(device_label(None), "Unknown device");
/// ```
#[must_use]
pub fn device_label(device_name: Option<&str>) -> String {
    non_blank(device_name)
        .unwrap_or(UNKNOWN_DEVICE_LABEL)
        .to_string()
}

/// Parse device type from user agent string.
///
/// Returns one of: "mobile", "tablet", "desktop"
///
/// # Examples
///
/// ```
/// use trustgate_auth::utils::parse_device_type;
///
/// assert_eq!(parse_device_type("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)"), "mobile");
/// assert_eq!(parse_device_type("Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X)"), "tablet");
/// assert_eq!(parse_device_type("Mozilla/5.0 (Windows NT 10.0; Win64; x64)"), "desktop");
/// ```
#[must_use]
pub fn parse_device_type(user_agent: &str) -> &'static str {
    let ua = user_agent.to_lowercase();

    if ua.contains("ipad") || ua.contains("tablet") {
        return "tablet";
    }
    if ua.contains("iphone") || ua.contains("android") || ua.contains("mobile") {
        return "mobile";
    }
    "desktop"
}

/// Resolve the device type stored for a login.
///
/// An explicit client value wins; otherwise it is inferred from the user
/// agent.
#[must_use]
pub fn resolve_device_type(device_type: Option<&str>, user_agent: &str) -> String {
    non_blank(device_type)
        .map_or_else(|| parse_device_type(user_agent).to_string(), str::to_string)
}

/// Basic email shape check: one `@`, non-empty local part, dotted domain.
///
/// # Examples
///
/// ```
/// use trustgate_auth::utils::is_valid_email;
///
/// assert!(is_valid_email("user@example.com"));
/// assert!(!is_valid_email("user@"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return false;
    }

    let local_ok = local
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_'));
    let domain_ok = domain
        .split('.')
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_alphanumeric() || c == '-'));

    local_ok && domain_ok
}
