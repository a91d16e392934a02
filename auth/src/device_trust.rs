//! Device trust evaluation for password logins.
//!
//! Every `(user, fingerprint)` pair moves through
//! `unknown → pending-verification → trusted`. A login is allowed to issue
//! tokens only once the presented device is trusted. An account that has
//! never logged in skips the challenge entirely and trusts whatever device it
//! presents.
//!
//! ```text
//!   first login ──────────────────────────────► trusted
//!   unknown ──(code mailed)──► pending ──(code ok)──► trusted
//!                                 │
//!                                 └─(expired / 5 wrong)──► new challenge
//! ```

use chrono::{Duration, Utc};
use constant_time_eq::constant_time_eq;

use crate::config::AuthConfig;
use crate::constants::CODE_LENGTH;
use crate::error::{AuthError, Result};
use crate::providers::{DeviceRepository, MailDispatcher};
use crate::state::{
    Credential, DeviceChallenge, DeviceId, DeviceMeta, DeviceRecord, DeviceUpsert, UserId,
};
use crate::utils::{device_label, generate_numeric_code, non_blank, resolve_device_type};

/// Result of evaluating the presented device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceDecision {
    /// The device is trusted; tokens may be issued.
    Proceed,

    /// A challenge code was mailed; no tokens yet.
    VerificationRequired,
}

/// Step-up verification for unrecognised devices.
#[derive(Debug, Clone)]
pub struct DeviceTrustEngine<D, M>
where
    D: DeviceRepository + Clone,
    M: MailDispatcher + Clone + 'static,
{
    devices: D,
    mail: M,
    challenge_ttl: Duration,
    max_attempts: u32,
}

impl<D, M> DeviceTrustEngine<D, M>
where
    D: DeviceRepository + Clone,
    M: MailDispatcher + Clone + 'static,
{
    /// Create an engine over a device repository and mail dispatcher.
    #[must_use]
    pub const fn new(devices: D, mail: M, config: &AuthConfig) -> Self {
        Self {
            devices,
            mail,
            challenge_ttl: config.device_challenge_ttl,
            max_attempts: config.max_device_challenge_attempts,
        }
    }

    /// Decide whether `credential` may be issued tokens from `device`.
    ///
    /// `credential` must already have passed password and status checks.
    ///
    /// # Errors
    ///
    /// - [`AuthError::DeviceFingerprintRequired`] when a returning user sends
    ///   no fingerprint
    /// - [`AuthError::DeviceChallengeExpired`],
    ///   [`AuthError::DeviceChallengeAttemptsExceeded`] or
    ///   [`AuthError::WrongVerificationCode`] when a submitted code is rejected
    /// - repository and mail errors
    pub async fn evaluate(
        &self,
        credential: &Credential,
        device: &DeviceMeta,
        submitted_code: Option<&str>,
    ) -> Result<DeviceDecision> {
        let fingerprint = non_blank(device.fingerprint.as_deref());

        if credential.is_first_login() {
            if let Some(fingerprint) = fingerprint {
                self.trust(credential.user_id, fingerprint, device).await?;
            }
            tracing::info!(user_id = %credential.user_id, "First login, device trusted without challenge");
            return Ok(DeviceDecision::Proceed);
        }

        let fingerprint = fingerprint.ok_or(AuthError::DeviceFingerprintRequired)?;

        let known = self.devices.find_device(credential.user_id, fingerprint).await?;
        if known.as_ref().is_some_and(|d| d.trusted) {
            self.trust(credential.user_id, fingerprint, device).await?;
            tracing::debug!(user_id = %credential.user_id, "Trusted device recognised");
            return Ok(DeviceDecision::Proceed);
        }

        match non_blank(submitted_code) {
            Some(code) => {
                self.verify_challenge(credential, fingerprint, device, code)
                    .await?;
                Ok(DeviceDecision::Proceed)
            }
            None => {
                self.issue_challenge(credential, fingerprint, device).await?;
                Ok(DeviceDecision::VerificationRequired)
            }
        }
    }

    async fn verify_challenge(
        &self,
        credential: &Credential,
        fingerprint: &str,
        device: &DeviceMeta,
        code: &str,
    ) -> Result<()> {
        let user_id = credential.user_id;
        let now = Utc::now();

        let challenge = self
            .devices
            .latest_pending_challenge(user_id, fingerprint, now)
            .await?
            .filter(|c| c.is_pending(now))
            .ok_or(AuthError::DeviceChallengeExpired)?;

        let Some(attempt) = self
            .devices
            .reserve_challenge_attempt(challenge.id, self.max_attempts, now)
            .await?
        else {
            tracing::warn!(
                user_id = %user_id,
                challenge_id = %challenge.id,
                max_attempts = self.max_attempts,
                "Device challenge locked out"
            );
            return Err(AuthError::DeviceChallengeAttemptsExceeded);
        };

        if !constant_time_eq(challenge.code.as_bytes(), code.as_bytes()) {
            tracing::info!(user_id = %user_id, challenge_id = %challenge.id, attempt, "Wrong device code");
            return Err(AuthError::WrongVerificationCode);
        }

        if !self.devices.mark_challenge_verified(challenge.id, now).await? {
            // Lost a race with a concurrent submission of the same code.
            return Err(AuthError::DeviceChallengeExpired);
        }

        let record = self.trust(user_id, fingerprint, device).await?;
        tracing::info!(user_id = %user_id, device_id = %record.id, "Device verified and trusted");

        self.spawn_new_device_alert(credential.email.clone(), &record);
        Ok(())
    }

    async fn issue_challenge(
        &self,
        credential: &Credential,
        fingerprint: &str,
        device: &DeviceMeta,
    ) -> Result<()> {
        let now = Utc::now();
        let challenge = DeviceChallenge {
            id: uuid::Uuid::new_v4(),
            user_id: credential.user_id,
            fingerprint: fingerprint.to_string(),
            code: generate_numeric_code(CODE_LENGTH),
            attempt_count: 0,
            ip_address: device.ip.clone(),
            user_agent: device.user_agent.clone(),
            is_verified: false,
            expires_at: now + self.challenge_ttl,
            verified_at: None,
            created_at: now,
        };

        self.devices.create_challenge(&challenge).await?;

        self.mail
            .send_device_verification_code(
                &credential.email,
                &challenge.code,
                &device_label(device.device_name.as_deref()),
                &device.ip,
                &device.user_agent,
            )
            .await
            .inspect_err(|e| {
                tracing::error!(user_id = %credential.user_id, error = %e, "Device code mail failed");
            })?;

        tracing::info!(
            user_id = %credential.user_id,
            challenge_id = %challenge.id,
            ip = %device.ip,
            "Device challenge issued"
        );
        Ok(())
    }

    async fn trust(&self, user_id: UserId, fingerprint: &str, device: &DeviceMeta) -> Result<DeviceRecord> {
        self.devices
            .upsert_device(DeviceUpsert {
                user_id,
                fingerprint: fingerprint.to_string(),
                trusted: true,
                device_name: non_blank(device.device_name.as_deref())
                    .unwrap_or_default()
                    .to_string(),
                device_type: resolve_device_type(device.device_type.as_deref(), &device.user_agent),
                ip: device.ip.clone(),
                user_agent: device.user_agent.clone(),
                login_at: Utc::now(),
            })
            .await
    }

    fn spawn_new_device_alert(&self, to: String, record: &DeviceRecord) {
        let mail = self.mail.clone();
        let device_id = record.id;
        let message = format!(
            "A new device was verified and can now sign in to your account.\n\nDevice: {}\nIP address: {}\nUser agent: {}\n\nIf this was not you, change your password and remove the device.",
            device_label(Some(&record.device_name)),
            record.last_ip,
            record.last_user_agent,
        );

        tokio::spawn(async move {
            if let Err(e) = mail
                .send_security_alert(&to, "New device signed in", &message)
                .await
            {
                tracing::warn!(device_id = %device_id, error = %e, "New device alert not delivered");
            }
        });
    }

    /// A user's live devices, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns repository errors.
    pub async fn list_devices(&self, user_id: UserId) -> Result<Vec<DeviceRecord>> {
        self.devices.list_devices(user_id).await
    }

    /// Forget a device. Its next login needs a fresh challenge.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ResourceNotFound`] if the device is not the
    /// user's, or repository errors.
    pub async fn remove_device(&self, user_id: UserId, device_id: DeviceId) -> Result<()> {
        self.devices.remove_device(user_id, device_id).await?;
        tracing::info!(user_id = %user_id, device_id = %device_id, "Device removed");
        Ok(())
    }

    /// Delete challenges that expired before now.
    ///
    /// # Errors
    ///
    /// Returns repository errors.
    pub async fn purge_expired_challenges(&self) -> Result<u64> {
        let purged = self.devices.purge_expired_challenges(Utc::now()).await?;
        tracing::debug!(purged, "Expired device challenges purged");
        Ok(purged)
    }
}
