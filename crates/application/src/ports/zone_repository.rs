use async_trait::async_trait;
use music_domain::{DnskeyData, FsmStatus, MusicError, Zone};

/// Durable zone state.
///
/// Implementations funnel all writes through a single writer task, so two
/// calls for the same zone execute in call order. `state_transition` is
/// the only compare-and-set operation; everything else is last-write-wins.
#[async_trait]
pub trait ZoneRepository: Send + Sync {
    async fn add_zone(&self, zone: &Zone) -> Result<(), MusicError>;

    async fn get_zone(&self, name: &str) -> Result<Option<Zone>, MusicError>;

    async fn list_zones(&self) -> Result<Vec<Zone>, MusicError>;

    /// Zones with `fsm_mode = auto`, the population of the periodic
    /// engine sweeps.
    async fn list_auto_zones(&self) -> Result<Vec<Zone>, MusicError>;

    async fn update_zone(&self, zone: &Zone) -> Result<(), MusicError>;

    async fn delete_zone(&self, name: &str) -> Result<(), MusicError>;

    /// Bind the zone to `process` in `initial_state`.
    ///
    /// # Errors
    ///
    /// * `MusicError::AlreadyAttached` - if the zone is already in a
    ///   process and `preempt` is false
    /// * `MusicError::ZoneNotFound` - if the zone does not exist
    async fn attach_fsm(
        &self,
        zone: &str,
        process: &str,
        initial_state: &str,
        preempt: bool,
    ) -> Result<(), MusicError>;

    /// Clear the zone's process and state.
    ///
    /// # Errors
    ///
    /// * `MusicError::NotAttached` - if the zone is not attached to
    ///   `process`
    async fn detach_fsm(&self, zone: &str, process: &str) -> Result<(), MusicError>;

    /// Atomically move the zone from `from` to `to`, clearing the
    /// stop-reason and refreshing the state timestamp.
    ///
    /// # Errors
    ///
    /// * `MusicError::StateMismatch` - if the current state is not `from`
    ///   (a concurrent evaluation won the race)
    async fn state_transition(&self, zone: &str, from: &str, to: &str)
        -> Result<(), MusicError>;

    async fn set_fsm_status(&self, zone: &str, status: FsmStatus) -> Result<(), MusicError>;

    /// Record why the zone is blocked. Visible to same-process readers as
    /// soon as this returns; the durable write follows on the writer
    /// channel and also flips `fsm_status` to blocked.
    async fn set_stop_reason(&self, zone: &str, reason: &str) -> Result<(), MusicError>;

    async fn get_stop_reason(&self, zone: &str) -> Result<Option<String>, MusicError>;

    /// Bind the zone to a signer group.
    ///
    /// # Errors
    ///
    /// * `MusicError::GroupLocked` - if the group is running a process
    async fn zone_join_group(&self, zone: &str, group: &str) -> Result<(), MusicError>;

    async fn zone_leave_group(&self, zone: &str, group: &str) -> Result<(), MusicError>;

    async fn get_meta(&self, zone: &str, key: &str) -> Result<Option<String>, MusicError>;

    async fn set_meta(&self, zone: &str, key: &str, value: &str) -> Result<(), MusicError>;

    /// Per-signer NS contribution recorded before the first sync, used by
    /// remove-signer to know what to retract.
    async fn set_zone_nses(
        &self,
        zone: &str,
        signer: &str,
        nses: &[String],
    ) -> Result<(), MusicError>;

    async fn get_zone_nses(&self, zone: &str, signer: &str) -> Result<Vec<String>, MusicError>;

    /// Per-signer DNSKEY contribution, same role as `set_zone_nses`.
    async fn set_zone_dnskeys(
        &self,
        zone: &str,
        signer: &str,
        keys: &[DnskeyData],
    ) -> Result<(), MusicError>;

    async fn get_zone_dnskeys(
        &self,
        zone: &str,
        signer: &str,
    ) -> Result<Vec<DnskeyData>, MusicError>;
}
