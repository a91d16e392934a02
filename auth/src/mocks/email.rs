//! Mock mail dispatcher for testing.

use crate::error::{AuthError, Result};
use crate::mocks::lock;
use crate::providers::MailDispatcher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A mail captured by [`MockMailDispatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMail {
    /// Registration or activation code.
    VerificationCode {
        /// Recipient
        to: String,
        /// Code
        code: String,
    },
    /// Password reset code.
    ResetPasswordCode {
        /// Recipient
        to: String,
        /// Code
        code: String,
    },
    /// New device challenge code.
    DeviceVerificationCode {
        /// Recipient
        to: String,
        /// Code
        code: String,
        /// Device label shown to the user
        device_label: String,
        /// Requesting IP
        ip: String,
        /// Requesting user agent
        user_agent: String,
    },
    /// Security notification.
    SecurityAlert {
        /// Recipient
        to: String,
        /// Subject
        subject: String,
        /// Body
        message: String,
    },
}

impl SentMail {
    /// Recipient address.
    #[must_use]
    pub fn to(&self) -> &str {
        match self {
            Self::VerificationCode { to, .. }
            | Self::ResetPasswordCode { to, .. }
            | Self::DeviceVerificationCode { to, .. }
            | Self::SecurityAlert { to, .. } => to,
        }
    }

    /// Code carried by the mail, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::VerificationCode { code, .. }
            | Self::ResetPasswordCode { code, .. }
            | Self::DeviceVerificationCode { code, .. } => Some(code),
            Self::SecurityAlert { .. } => None,
        }
    }
}

/// Mock mail dispatcher.
///
/// Records every mail instead of delivering it. Can be switched to fail
/// delivery.
#[derive(Debug, Clone, Default)]
pub struct MockMailDispatcher {
    sent: Arc<Mutex<Vec<SentMail>>>,
    failing: Arc<AtomicBool>,
}

impl MockMailDispatcher {
    /// Create a new mock dispatcher that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail with `EmailDeliveryFailed`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every mail sent so far.
    ///
    /// # Errors
    ///
    /// Returns error if the internal lock is poisoned.
    pub fn sent(&self) -> Result<Vec<SentMail>> {
        Ok(lock(&self.sent)?.clone())
    }

    /// Number of mails sent so far.
    ///
    /// # Errors
    ///
    /// Returns error if the internal lock is poisoned.
    pub fn count(&self) -> Result<usize> {
        Ok(lock(&self.sent)?.len())
    }

    /// Code from the most recent code-bearing mail to `to`.
    ///
    /// # Errors
    ///
    /// Returns error if the internal lock is poisoned.
    pub fn last_code_for(&self, to: &str) -> Result<Option<String>> {
        Ok(lock(&self.sent)?
            .iter()
            .rev()
            .filter(|m| m.to() == to)
            .find_map(|m| m.code().map(str::to_string)))
    }

    /// Security alerts sent so far.
    ///
    /// # Errors
    ///
    /// Returns error if the internal lock is poisoned.
    pub fn alerts(&self) -> Result<Vec<SentMail>> {
        Ok(lock(&self.sent)?
            .iter()
            .filter(|m| matches!(m, SentMail::SecurityAlert { .. }))
            .cloned()
            .collect())
    }

    fn record(&self, mail: SentMail) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::EmailDeliveryFailed(format!(
                "mock delivery to {} failed",
                mail.to()
            )));
        }
        lock(&self.sent)?.push(mail);
        Ok(())
    }
}

impl MailDispatcher for MockMailDispatcher {
    async fn send_verification_code(&self, to: &str, code: &str) -> Result<()> {
        self.record(SentMail::VerificationCode {
            to: to.to_string(),
            code: code.to_string(),
        })
    }

    async fn send_reset_password_code(&self, to: &str, code: &str) -> Result<()> {
        self.record(SentMail::ResetPasswordCode {
            to: to.to_string(),
            code: code.to_string(),
        })
    }

    async fn send_device_verification_code(
        &self,
        to: &str,
        code: &str,
        device_label: &str,
        ip: &str,
        user_agent: &str,
    ) -> Result<()> {
        self.record(SentMail::DeviceVerificationCode {
            to: to.to_string(),
            code: code.to_string(),
            device_label: device_label.to_string(),
            ip: ip.to_string(),
            user_agent: user_agent.to_string(),
        })
    }

    async fn send_security_alert(&self, to: &str, subject: &str, message: &str) -> Result<()> {
        self.record(SentMail::SecurityAlert {
            to: to.to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
        })
    }
}
