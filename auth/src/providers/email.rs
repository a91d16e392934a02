//! Mail dispatcher trait.

use crate::error::Result;

/// Outbound mail.
///
/// This trait abstracts over mail delivery (SMTP relay, transactional mail
/// APIs, or the console in development). Message wording and templates are
/// the adapter's concern.
pub trait MailDispatcher: Send + Sync {
    /// Send a registration or activation code.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The address is invalid
    /// - Delivery fails
    fn send_verification_code(
        &self,
        to: &str,
        code: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Send a password reset code.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The address is invalid
    /// - Delivery fails
    fn send_reset_password_code(
        &self,
        to: &str,
        code: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Send a device verification code for a login from an unrecognized device.
    ///
    /// # Arguments
    ///
    /// - `to`: Account email
    /// - `code`: Six digit code
    /// - `device_label`: Device name shown to the user
    /// - `ip`: Login IP
    /// - `user_agent`: Login user agent
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The address is invalid
    /// - Delivery fails
    fn send_device_verification_code(
        &self,
        to: &str,
        code: &str,
        device_label: &str,
        ip: &str,
        user_agent: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Send a security alert.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The address is invalid
    /// - Delivery fails
    fn send_security_alert(
        &self,
        to: &str,
        subject: &str,
        message: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
