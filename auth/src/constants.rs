//! Authentication constants.
//!
//! Key layouts and fixed policy values shared by the stores, the device trust
//! engine and the orchestrator.

/// Redis keyspace.
pub mod keys {
    /// Forward session key prefix: `refresh_token:user:<user_id>` → token.
    pub const REFRESH_BY_USER: &str = "refresh_token:user:";

    /// Reverse session key prefix: `refresh_token:token:<token>` → user id.
    pub const REFRESH_BY_TOKEN: &str = "refresh_token:token:";

    /// Revoked access token prefix: `blacklist:access_token:<token>` → user id.
    pub const REVOKED_ACCESS_TOKEN: &str = "blacklist:access_token:";

    /// One-time code prefix: `verification_code:<key>` → code.
    pub const VERIFICATION_CODE: &str = "verification_code:";

    /// Rate limit counter prefix: `rate_limit:<scope>` → count.
    pub const RATE_LIMIT: &str = "rate_limit:";
}

/// Namespaces for one-time code keys.
pub mod code_keys {
    /// Prefix for password reset codes (`reset:<email>`).
    pub const RESET_PREFIX: &str = "reset:";

    /// Key for a password reset code.
    #[must_use]
    pub fn reset(email: &str) -> String {
        format!("{RESET_PREFIX}{email}")
    }
}

/// Rate limit scopes.
pub mod scopes {
    /// Scope for per-IP code issuance limits.
    #[must_use]
    pub fn ip(client_ip: &str) -> String {
        format!("ip:{client_ip}")
    }
}

/// Number of digits in verification codes.
pub const CODE_LENGTH: usize = 6;

/// Rate limit window in seconds (24 hours).
pub const RATE_LIMIT_WINDOW_SECS: u64 = 86_400;

/// Token type claim values.
pub mod token_types {
    /// Short-lived access token.
    pub const ACCESS: &str = "access";

    /// Long-lived refresh token.
    pub const REFRESH: &str = "refresh";
}

/// Label used in device mails when the client sent no device name.
pub const UNKNOWN_DEVICE_LABEL: &str = "Unknown device";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_key_namespacing() {
        assert_eq!(code_keys::reset("a@b.c"), "reset:a@b.c");
        assert_eq!(scopes::ip("10.0.0.1"), "ip:10.0.0.1");
    }

    #[test]
    fn test_full_keys() {
        let scope = scopes::ip("127.0.0.1");
        assert_eq!(format!("{}{scope}", keys::RATE_LIMIT), "rate_limit:ip:127.0.0.1");
        assert_eq!(
            format!("{}{}", keys::VERIFICATION_CODE, code_keys::reset("x@y.z")),
            "verification_code:reset:x@y.z"
        );
    }
}
