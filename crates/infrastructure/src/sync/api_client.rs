//! HTTPS client towards peer sidecars, authenticated both ways: their
//! certificate must match their DNSSEC-published TLSA record, ours is
//! presented so their CN check can map us back to a known identity.

use dashmap::DashMap;
use music_application::services::{BeatMsg, BeatResponse, FullBeatMsg, HelloMsg, HelloResponse};
use music_domain::{MusicError, Sidecar, SidecarApiDetails};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, instrument};

use super::tls;

pub struct SidecarApiClient {
    identity: String,
    cert_path: Option<String>,
    key_path: Option<String>,
    /// One client per peer identity; reconnecting per beat would defeat
    /// connection reuse.
    clients: DashMap<String, reqwest::Client>,
}

impl SidecarApiClient {
    pub fn new(identity: String, cert_path: Option<String>, key_path: Option<String>) -> Self {
        Self {
            identity,
            cert_path,
            key_path,
            clients: DashMap::new(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    fn identity_material(
        &self,
    ) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), MusicError> {
        let (Some(cert_path), Some(key_path)) = (&self.cert_path, &self.key_path) else {
            return Err(MusicError::Config(
                "sidecar.api.cert_file/key_file not configured".to_string(),
            ));
        };
        Ok((tls::load_certs(cert_path)?, tls::load_private_key(key_path)?))
    }

    fn api_details<'p>(peer: &'p Sidecar) -> Result<&'p SidecarApiDetails, MusicError> {
        peer.api.as_ref().ok_or_else(|| MusicError::PeerVerification {
            identity: peer.identity.clone(),
            detail: "peer has no API method details".to_string(),
        })
    }

    fn client_for(&self, peer: &Sidecar) -> Result<reqwest::Client, MusicError> {
        if let Some(client) = self.clients.get(&peer.identity) {
            return Ok(client.clone());
        }

        let api = Self::api_details(peer)?;
        let Some(tlsa) = &api.tlsa else {
            // A peer without a TLSA binding never gets a connection.
            return Err(MusicError::PeerVerification {
                identity: peer.identity.clone(),
                detail: "no TLSA record for peer API endpoint".to_string(),
            });
        };

        let (certs, key) = self.identity_material()?;
        let tls_config = tls::client_config_for_peer(tlsa, certs, key)?;

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(3))
            .use_preconfigured_tls(tls_config);

        // Dial the discovered addresses, not whatever public DNS thinks
        // of the peer's name right now.
        let host = peer.identity.trim_end_matches('.').to_string();
        if let Some(addr) = api.addresses.first() {
            builder = builder.resolve(&host, SocketAddr::new(*addr, api.port));
        }

        let client = builder
            .build()
            .map_err(|e| MusicError::Config(format!("cannot build peer HTTP client: {}", e)))?;
        self.clients.insert(peer.identity.clone(), client.clone());
        Ok(client)
    }

    /// Drop the cached client, e.g. after a refresh changed addresses or
    /// TLSA.
    pub fn invalidate(&self, identity: &str) {
        self.clients.remove(identity);
    }

    async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        peer: &Sidecar,
        endpoint: &str,
        body: &Req,
    ) -> Result<Resp, MusicError> {
        let api = Self::api_details(peer)?;
        let url = format!("{}/{}", api.base_url(&peer.identity), endpoint);
        let client = self.client_for(peer)?;

        debug!(peer = %peer.identity, url = %url, "POST to peer sidecar");
        let response = client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| MusicError::PeerVerification {
                identity: peer.identity.clone(),
                detail: format!("POST {}: {}", url, e),
            })?;

        if !response.status().is_success() {
            return Err(MusicError::PeerVerification {
                identity: peer.identity.clone(),
                detail: format!("POST {} answered {}", url, response.status()),
            });
        }

        response
            .json()
            .await
            .map_err(|e| MusicError::PeerVerification {
                identity: peer.identity.clone(),
                detail: format!("cannot parse response from {}: {}", url, e),
            })
    }

    #[instrument(skip(self, peer, hello), fields(peer = %peer.identity))]
    pub async fn send_hello(
        &self,
        peer: &Sidecar,
        hello: &HelloMsg,
    ) -> Result<HelloResponse, MusicError> {
        self.post(peer, "hello", hello).await
    }

    #[instrument(skip(self, peer, beat), fields(peer = %peer.identity))]
    pub async fn send_beat(&self, peer: &Sidecar, beat: &BeatMsg) -> Result<BeatResponse, MusicError> {
        self.post(peer, "beat", beat).await
    }

    #[instrument(skip(self, peer, beat), fields(peer = %peer.identity))]
    pub async fn send_full_beat(
        &self,
        peer: &Sidecar,
        beat: &FullBeatMsg,
    ) -> Result<BeatResponse, MusicError> {
        self.post(peer, "beat", beat).await
    }

    #[instrument(skip(self, peer), fields(peer = %peer.identity))]
    pub async fn ping(&self, peer: &Sidecar) -> Result<BeatResponse, MusicError> {
        let beat = BeatMsg {
            identity: self.identity.clone(),
            shared_zone_count: 0,
        };
        self.post(peer, "ping", &beat).await
    }
}
