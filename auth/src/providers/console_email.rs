//! Console mail dispatcher for development and testing.

use crate::error::Result;
use crate::providers::MailDispatcher;
use tracing::{info, warn};

/// Console mail dispatcher.
///
/// Logs mails instead of sending them. Codes are printed in the clear, so
/// this dispatcher must never be wired into production.
///
/// # Examples
///
/// ```
/// use trustgate_auth::providers::{ConsoleMailDispatcher, MailDispatcher};
///
/// # tokio_test::block_on(async {
/// let mail = ConsoleMailDispatcher::new();
/// mail.send_verification_code("user@example.com", "123456").await.unwrap();
/// # });
/// ```
#[derive(Clone, Debug, Default)]
pub struct ConsoleMailDispatcher;

impl ConsoleMailDispatcher {
    /// Create a new console mail dispatcher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn print_box(title: &str, to: &str, lines: &[String]) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║ {title:<61}║");
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!("║ To: {to:<57}║");
        println!("╠══════════════════════════════════════════════════════════════╣");
        for line in lines {
            for chunk in line.as_bytes().chunks(60) {
                println!("║ {:<61}║", String::from_utf8_lossy(chunk));
            }
        }
        println!("╚══════════════════════════════════════════════════════════════╝\n");
    }
}

impl MailDispatcher for ConsoleMailDispatcher {
    async fn send_verification_code(&self, to: &str, code: &str) -> Result<()> {
        info!(to = %to, code = %code, "📧 Verification code (development mode)");
        Self::print_box(
            "VERIFICATION CODE",
            to,
            &[format!("Your verification code is {code}. It expires in 5 minutes.")],
        );
        Ok(())
    }

    async fn send_reset_password_code(&self, to: &str, code: &str) -> Result<()> {
        info!(to = %to, code = %code, "📧 Password reset code (development mode)");
        Self::print_box(
            "PASSWORD RESET CODE",
            to,
            &[format!("Your password reset code is {code}. It expires in 5 minutes.")],
        );
        Ok(())
    }

    async fn send_device_verification_code(
        &self,
        to: &str,
        code: &str,
        device_label: &str,
        ip: &str,
        user_agent: &str,
    ) -> Result<()> {
        info!(
            to = %to,
            code = %code,
            device = %device_label,
            ip = %ip,
            "📧 Device verification code (development mode)"
        );
        Self::print_box(
            "NEW DEVICE SIGN-IN",
            to,
            &[
                format!("Device: {device_label}"),
                format!("IP: {ip}"),
                format!("User agent: {user_agent}"),
                format!("Code: {code}"),
            ],
        );
        Ok(())
    }

    async fn send_security_alert(&self, to: &str, subject: &str, message: &str) -> Result<()> {
        warn!(to = %to, subject = %subject, "🚨 Security alert (development mode)");
        let lines: Vec<String> = message.lines().map(str::to_string).collect();
        Self::print_box(subject, to, &lines);
        Ok(())
    }
}
