//! SMTP mail dispatcher using Lettre.

use crate::error::{AuthError, Result};
use crate::providers::MailDispatcher;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// SMTP connection settings.
#[derive(Clone)]
pub struct SmtpSettings {
    /// SMTP server host (e.g. "smtp.example.com").
    pub host: String,

    /// SMTP server port (usually 465 or 587).
    pub port: u16,

    /// Authentication username.
    pub username: String,

    /// Authentication password.
    pub password: String,

    /// `From` header, e.g. `Example <noreply@example.com>`.
    pub from: String,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password_set", &!self.password.is_empty())
            .field("from", &self.from)
            .finish()
    }
}

/// SMTP mail dispatcher.
///
/// Sends HTML mails through an authenticated TLS relay.
///
/// # Examples
///
/// ```no_run
/// use trustgate_auth::providers::SmtpMailDispatcher;
/// use trustgate_auth::providers::smtp_email::SmtpSettings;
///
/// let mail = SmtpMailDispatcher::new(SmtpSettings {
///     host: "smtp.example.com".into(),
///     port: 465,
///     username: "mailer".into(),
///     password: "secret".into(),
///     from: "Example <noreply@example.com>".into(),
/// })?;
/// # Ok::<(), trustgate_auth::AuthError>(())
/// ```
#[derive(Clone)]
pub struct SmtpMailDispatcher {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: lettre::message::Mailbox,
}

impl SmtpMailDispatcher {
    /// Create a new SMTP mail dispatcher.
    ///
    /// No connection is opened until the first mail is sent.
    ///
    /// # Errors
    ///
    /// Returns error if the relay host or `from` address is invalid.
    pub fn new(settings: SmtpSettings) -> Result<Self> {
        let from = settings.from.parse().map_err(|e| {
            AuthError::EmailDeliveryFailed(format!("Invalid from address: {e}"))
        })?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|e| AuthError::EmailDeliveryFailed(format!("SMTP relay error: {e}")))?
            .port(settings.port)
            .credentials(Credentials::new(settings.username.clone(), settings.password))
            .build();

        tracing::info!(
            host = %settings.host,
            port = settings.port,
            username = %settings.username,
            "Initialized SMTP mail dispatcher"
        );

        Ok(Self { transport, from })
    }

    async fn send_html(&self, to: &str, subject: &str, html_body: String) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(to
                .parse()
                .map_err(|e| AuthError::EmailDeliveryFailed(format!("Invalid to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body)
            .map_err(|e| AuthError::EmailDeliveryFailed(format!("Failed to build email: {e}")))?;

        self.transport.send(email).await.map_err(|e| {
            tracing::error!(to = %to, subject = %subject, error = %e, "SMTP delivery failed");
            AuthError::EmailDeliveryFailed(format!("Failed to send email: {e}"))
        })?;

        tracing::info!(to = %to, subject = %subject, "Mail sent");
        Ok(())
    }
}

fn layout(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2563eb;">{title}</h2>
        {content}
        <p style="color: #666; font-size: 14px;">
            If you didn't request this, you can safely ignore this email.
        </p>
    </div>
</body>
</html>"#
    )
}

fn code_block(code: &str) -> String {
    format!(
        r#"<p style="font-size: 28px; font-weight: bold; letter-spacing: 6px; margin: 30px 0;">{code}</p>
        <p>The code expires in 5 minutes.</p>"#
    )
}

/// Escape text interpolated into HTML bodies.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

impl MailDispatcher for SmtpMailDispatcher {
    async fn send_verification_code(&self, to: &str, code: &str) -> Result<()> {
        let body = layout(
            "Your verification code",
            &format!("<p>Use this code to confirm your email address:</p>{}", code_block(code)),
        );
        self.send_html(to, "Your verification code", body).await
    }

    async fn send_reset_password_code(&self, to: &str, code: &str) -> Result<()> {
        let body = layout(
            "Reset your password",
            &format!("<p>Use this code to reset your password:</p>{}", code_block(code)),
        );
        self.send_html(to, "Your password reset code", body).await
    }

    async fn send_device_verification_code(
        &self,
        to: &str,
        code: &str,
        device_label: &str,
        ip: &str,
        user_agent: &str,
    ) -> Result<()> {
        let details = format!(
            r"<p>A sign-in was attempted from a device we don't recognize.</p>
        <ul>
            <li>Device: {}</li>
            <li>IP address: {}</li>
            <li>Browser: {}</li>
        </ul>
        <p>If this was you, enter this code to finish signing in:</p>{}",
            escape_html(device_label),
            escape_html(ip),
            escape_html(user_agent),
            code_block(code),
        );
        let body = layout("New device sign-in", &details);
        self.send_html(to, "Device sign-in verification code", body).await
    }

    async fn send_security_alert(&self, to: &str, subject: &str, message: &str) -> Result<()> {
        let content = format!(
            r#"<div style="background-color: #fef2f2; border-left: 4px solid #dc2626; padding: 15px; margin: 20px 0;">
            <p style="margin: 0;">{}</p>
        </div>"#,
            escape_html(message)
        );
        let body = layout("Security alert", &content);
        self.send_html(to, subject, body).await
    }
}
