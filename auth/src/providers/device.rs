//! Device registry and device challenge repository trait.

use crate::error::Result;
use crate::state::{DeviceChallenge, DeviceId, DeviceRecord, DeviceUpsert, UserId};
use chrono::{DateTime, Utc};

/// Durable storage behind [`crate::device_trust::DeviceTrustEngine`].
///
/// Two tables: the device registry (unique per user and fingerprint, soft
/// deletable) and the challenge log.
///
/// # Implementation Notes
///
/// - `upsert_device` must be a single atomic statement keyed on
///   `(user_id, fingerprint)`; it resurrects soft-deleted rows and never
///   downgrades trust
/// - `reserve_challenge_attempt` must check and increment in one conditional
///   statement so concurrent submissions can never exceed the attempt limit
pub trait DeviceRepository: Send + Sync {
    /// Find a live (not deleted) device.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn find_device(
        &self,
        user_id: UserId,
        fingerprint: &str,
    ) -> impl std::future::Future<Output = Result<Option<DeviceRecord>>> + Send;

    /// Insert or update a device.
    ///
    /// Empty `device_name` / `device_type` keep the stored values.
    ///
    /// # Errors
    ///
    /// Returns error if the database write fails.
    fn upsert_device(
        &self,
        device: DeviceUpsert,
    ) -> impl std::future::Future<Output = Result<DeviceRecord>> + Send;

    /// Live devices of a user, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn list_devices(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Vec<DeviceRecord>>> + Send;

    /// Soft delete a device.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::ResourceNotFound`] if the user has no such
    /// live device, or a database error.
    fn remove_device(
        &self,
        user_id: UserId,
        device_id: DeviceId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Record a new challenge.
    ///
    /// # Errors
    ///
    /// Returns error if the database write fails.
    fn create_challenge(
        &self,
        challenge: &DeviceChallenge,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// The most recent unverified challenge that expires after `now`.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn latest_pending_challenge(
        &self,
        user_id: UserId,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Option<DeviceChallenge>>> + Send;

    /// Reserve one submission against a pending challenge.
    ///
    /// Increments `attempt_count` only while the challenge is unverified,
    /// unexpired at `now` and below `max_attempts`. Returns the new count, or
    /// `None` when no attempt could be reserved.
    ///
    /// # Errors
    ///
    /// Returns error if the database update fails.
    fn reserve_challenge_attempt(
        &self,
        challenge_id: uuid::Uuid,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Option<u32>>> + Send;

    /// Consume a challenge.
    ///
    /// Returns `false` if the challenge was already verified, so two
    /// concurrent correct submissions cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns error if the database update fails.
    fn mark_challenge_verified(
        &self,
        challenge_id: uuid::Uuid,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Delete challenges that expired before `now`. Returns rows removed.
    ///
    /// # Errors
    ///
    /// Returns error if the database delete fails.
    fn purge_expired_challenges(
        &self,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;
}
