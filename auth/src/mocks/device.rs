//! Mock device repository for testing.

use crate::error::{AuthError, Result};
use crate::mocks::lock;
use crate::providers::DeviceRepository;
use crate::state::{DeviceChallenge, DeviceId, DeviceRecord, DeviceUpsert, UserId};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct StoredDevice {
    record: DeviceRecord,
    removed: bool,
}

#[derive(Debug, Default)]
struct Inner {
    devices: Vec<StoredDevice>,
    challenges: Vec<DeviceChallenge>,
}

/// In-memory device registry and challenge log.
///
/// Upserts follow the Postgres adapter: trust sticks on live rows, a removed
/// row is brought back untrusted unless the upsert trusts it, and blank
/// name/type values keep what was stored.
#[derive(Debug, Clone, Default)]
pub struct MockDeviceRepository {
    inner: Arc<Mutex<Inner>>,
}

impl MockDeviceRepository {
    /// Create a new mock device repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every challenge recorded for a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the internal lock is poisoned.
    pub fn challenges_for(&self, user_id: UserId) -> Result<Vec<DeviceChallenge>> {
        Ok(lock(&self.inner)?
            .challenges
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    /// Rewrite a stored challenge, e.g. to move its expiry into the past.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ResourceNotFound`] for an unknown challenge id.
    pub fn update_challenge<F>(&self, challenge_id: uuid::Uuid, apply: F) -> Result<()>
    where
        F: FnOnce(&mut DeviceChallenge),
    {
        let mut inner = lock(&self.inner)?;
        let challenge = inner
            .challenges
            .iter_mut()
            .find(|c| c.id == challenge_id)
            .ok_or(AuthError::ResourceNotFound)?;
        apply(challenge);
        Ok(())
    }
}

impl DeviceRepository for MockDeviceRepository {
    async fn find_device(&self, user_id: UserId, fingerprint: &str) -> Result<Option<DeviceRecord>> {
        Ok(lock(&self.inner)?
            .devices
            .iter()
            .find(|d| !d.removed && d.record.user_id == user_id && d.record.fingerprint == fingerprint)
            .map(|d| d.record.clone()))
    }

    async fn upsert_device(&self, device: DeviceUpsert) -> Result<DeviceRecord> {
        let mut inner = lock(&self.inner)?;
        let existing = inner
            .devices
            .iter_mut()
            .find(|d| d.record.user_id == device.user_id && d.record.fingerprint == device.fingerprint);

        if let Some(stored) = existing {
            let record = &mut stored.record;
            record.trusted = device.trusted || (record.trusted && !stored.removed);
            if !device.device_name.is_empty() {
                record.device_name = device.device_name;
            }
            if !device.device_type.is_empty() {
                record.device_type = device.device_type;
            }
            record.last_ip = device.ip;
            record.last_user_agent = device.user_agent;
            record.last_login_at = Some(device.login_at);
            record.updated_at = device.login_at;
            stored.removed = false;
            return Ok(record.clone());
        }

        let record = DeviceRecord {
            id: DeviceId::new(),
            user_id: device.user_id,
            fingerprint: device.fingerprint,
            trusted: device.trusted,
            device_name: device.device_name,
            device_type: device.device_type,
            last_ip: device.ip,
            last_user_agent: device.user_agent,
            last_login_at: Some(device.login_at),
            created_at: device.login_at,
            updated_at: device.login_at,
        };
        inner.devices.push(StoredDevice {
            record: record.clone(),
            removed: false,
        });
        Ok(record)
    }

    async fn list_devices(&self, user_id: UserId) -> Result<Vec<DeviceRecord>> {
        let mut devices: Vec<DeviceRecord> = lock(&self.inner)?
            .devices
            .iter()
            .filter(|d| !d.removed && d.record.user_id == user_id)
            .map(|d| d.record.clone())
            .collect();
        devices.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(devices)
    }

    async fn remove_device(&self, user_id: UserId, device_id: DeviceId) -> Result<()> {
        let mut inner = lock(&self.inner)?;
        let stored = inner
            .devices
            .iter_mut()
            .find(|d| !d.removed && d.record.user_id == user_id && d.record.id == device_id)
            .ok_or(AuthError::ResourceNotFound)?;
        stored.removed = true;
        stored.record.trusted = false;
        Ok(())
    }

    async fn create_challenge(&self, challenge: &DeviceChallenge) -> Result<()> {
        lock(&self.inner)?.challenges.push(challenge.clone());
        Ok(())
    }

    async fn latest_pending_challenge(
        &self,
        user_id: UserId,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DeviceChallenge>> {
        Ok(lock(&self.inner)?
            .challenges
            .iter()
            .filter(|c| c.user_id == user_id && c.fingerprint == fingerprint && c.is_pending(now))
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn reserve_challenge_attempt(
        &self,
        challenge_id: uuid::Uuid,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<u32>> {
        let mut inner = lock(&self.inner)?;
        Ok(inner
            .challenges
            .iter_mut()
            .find(|c| c.id == challenge_id && c.is_pending(now) && c.attempt_count < max_attempts)
            .map(|c| {
                c.attempt_count += 1;
                c.attempt_count
            }))
    }

    async fn mark_challenge_verified(&self, challenge_id: uuid::Uuid, at: DateTime<Utc>) -> Result<bool> {
        let mut inner = lock(&self.inner)?;
        let Some(challenge) = inner
            .challenges
            .iter_mut()
            .find(|c| c.id == challenge_id && !c.is_verified)
        else {
            return Ok(false);
        };
        challenge.is_verified = true;
        challenge.verified_at = Some(at);
        Ok(true)
    }

    async fn purge_expired_challenges(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut inner = lock(&self.inner)?;
        let before = inner.challenges.len();
        inner.challenges.retain(|c| c.expires_at >= now);
        Ok((before - inner.challenges.len()) as u64)
    }
}
