use async_trait::async_trait;
use music_domain::{MusicError, RecordType, Rrset, Signer};
use tokio::sync::oneshot;

/// The request half of the envelope travelling through a rate-limited
/// queue towards one signer.
#[derive(Debug)]
pub enum SignerOpKind {
    Fetch {
        rtype: RecordType,
    },
    Update {
        inserts: Vec<Rrset>,
        removes: Vec<Rrset>,
    },
}

/// The reply: an RRset for fetches, a backend response string for
/// diagnostics, or the error that ended the operation.
#[derive(Debug)]
pub struct SignerOpReply {
    pub rrset: Option<Rrset>,
    pub response: String,
    pub error: Option<MusicError>,
}

impl SignerOpReply {
    pub fn fetched(rrset: Rrset, response: String) -> Self {
        Self {
            rrset: Some(rrset),
            response,
            error: None,
        }
    }

    pub fn updated(response: String) -> Self {
        Self {
            rrset: None,
            response,
            error: None,
        }
    }

    pub fn failed(error: MusicError) -> Self {
        Self {
            rrset: None,
            response: String::new(),
            error: Some(error),
        }
    }

    pub fn into_result(self) -> Result<Option<Rrset>, MusicError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.rrset),
        }
    }
}

/// One queued operation against one signer.
#[derive(Debug)]
pub struct SignerOp {
    pub signer: Signer,
    pub zone: String,
    pub owner: String,
    pub kind: SignerOpKind,
    pub reply: oneshot::Sender<SignerOpReply>,
}

/// The per-signer update primitive, selected by the signer's method tag.
///
/// Implementations talk to exactly one backend kind (DNS UPDATE with
/// TSIG, or a REST API). They are always invoked from a rate-limited
/// queue dispatcher, never directly by the FSM.
#[async_trait]
pub trait SignerUpdater: Send + Sync {
    /// Retrieve the RRset `owner`/`rtype` as served by this signer. A
    /// name or type with no records yields an empty RRset, not an error.
    async fn fetch_rrset(
        &self,
        signer: &Signer,
        zone: &str,
        owner: &str,
        rtype: RecordType,
    ) -> Result<Rrset, MusicError>;

    /// Atomically add and remove RRsets in the signer's copy of the zone.
    /// Within each element all records share owner and type. A remove
    /// element with no records deletes the whole RRset of its type.
    async fn update_rrsets(
        &self,
        signer: &Signer,
        zone: &str,
        owner: &str,
        inserts: &[Rrset],
        removes: &[Rrset],
    ) -> Result<(), MusicError>;

    /// Convenience wrapper over `update_rrsets` with no inserts.
    async fn remove_rrset(
        &self,
        signer: &Signer,
        zone: &str,
        owner: &str,
        rtype: RecordType,
    ) -> Result<(), MusicError> {
        let rrset = Rrset::new(owner.to_string(), rtype, 0);
        self.update_rrsets(signer, zone, owner, &[], std::slice::from_ref(&rrset))
            .await
    }
}

/// What the FSM calls. The production implementation enqueues into the
/// per-method rate-limited queues and awaits the reply channel, making
/// rate limiting transparent to transitions.
#[async_trait]
pub trait SignerOps: Send + Sync {
    async fn fetch_rrset(
        &self,
        signer: &Signer,
        zone: &str,
        owner: &str,
        rtype: RecordType,
    ) -> Result<Rrset, MusicError>;

    async fn update_rrsets(
        &self,
        signer: &Signer,
        zone: &str,
        owner: &str,
        inserts: &[Rrset],
        removes: &[Rrset],
    ) -> Result<(), MusicError>;

    async fn remove_rrset(
        &self,
        signer: &Signer,
        zone: &str,
        owner: &str,
        rtype: RecordType,
    ) -> Result<(), MusicError> {
        let rrset = Rrset::new(owner.to_string(), rtype, 0);
        self.update_rrsets(signer, zone, owner, &[], std::slice::from_ref(&rrset))
            .await
    }
}
