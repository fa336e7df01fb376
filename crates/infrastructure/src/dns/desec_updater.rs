//! REST implementation of the signer-updater contract for deSEC-style
//! API backends.
//!
//! An HTTP 429 surfaces as `MusicError::RateLimited` so the rate-limited
//! queue can sleep the announced interval and retry the same request; it
//! never reaches the caller.

use async_trait::async_trait;
use music_application::ports::SignerUpdater;
use music_domain::{MusicError, RecordType, Rrset, Signer};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use super::presentation::{data_to_presentation, parse_presentation};

#[derive(Debug, Serialize, Deserialize)]
struct ApiRrset {
    subname: String,
    #[serde(rename = "type")]
    rtype: String,
    ttl: u32,
    records: Vec<String>,
}

pub struct DesecApiUpdater {
    client: reqwest::Client,
}

impl DesecApiUpdater {
    pub fn new() -> Result<Self, MusicError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .use_rustls_tls()
            .build()
            .map_err(|e| MusicError::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn base_url(signer: &Signer, zone: &str) -> String {
        let zone = zone.trim_end_matches('.');
        format!(
            "https://{}:{}/api/v1/domains/{}/rrsets/",
            signer.address, signer.port, zone
        )
    }

    fn subname(zone: &str, owner: &str) -> String {
        let zone = zone.trim_end_matches('.');
        let owner = owner.trim_end_matches('.');
        owner
            .strip_suffix(zone)
            .map(|s| s.trim_end_matches('.').to_string())
            .unwrap_or_default()
    }

    fn auth_header(signer: &Signer) -> Result<String, MusicError> {
        let token = signer.api_token().ok_or_else(|| {
            MusicError::Config(format!("signer '{}' has no API token", signer.name))
        })?;
        Ok(format!("Token {}", token))
    }

    /// "Expected available in N second." from the 429 body, falling back
    /// to the Retry-After header.
    fn retry_after(headers: &reqwest::header::HeaderMap, body: &str) -> u64 {
        if let Some(rest) = body.split("available in ").nth(1) {
            if let Some(number) = rest.split_whitespace().next() {
                if let Ok(seconds) = number.parse::<u64>() {
                    return seconds;
                }
            }
        }
        headers
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(1)
    }
}

#[async_trait]
impl SignerUpdater for DesecApiUpdater {
    #[instrument(skip(self, signer), fields(signer = %signer.name))]
    async fn fetch_rrset(
        &self,
        signer: &Signer,
        zone: &str,
        owner: &str,
        rtype: RecordType,
    ) -> Result<Rrset, MusicError> {
        let subname = Self::subname(zone, owner);
        // The apex RRset is addressed as "@" on this API.
        let subname = if subname.is_empty() { "@".to_string() } else { subname };
        let url = format!("{}{}/{}/", Self::base_url(signer, zone), subname, rtype);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, Self::auth_header(signer)?)
            .send()
            .await
            .map_err(|e| MusicError::SignerOpFailed {
                signer: signer.name.clone(),
                detail: format!("GET {}: {}", url, e),
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(Rrset::new(owner.to_string(), rtype, 0)),
            StatusCode::TOO_MANY_REQUESTS => {
                let headers = response.headers().clone();
                let body = response.text().await.unwrap_or_default();
                return Err(MusicError::RateLimited {
                    seconds: Self::retry_after(&headers, &body),
                });
            }
            status if !status.is_success() => {
                return Err(MusicError::SignerOpFailed {
                    signer: signer.name.clone(),
                    detail: format!("GET {} answered {}", url, status),
                });
            }
            _ => {}
        }

        let api_rrset: ApiRrset = response.json().await.map_err(|e| {
            MusicError::SignerOpFailed {
                signer: signer.name.clone(),
                detail: format!("cannot parse RRset response: {}", e),
            }
        })?;

        let mut rrset = Rrset::new(owner.to_string(), rtype, api_rrset.ttl);
        for text in &api_rrset.records {
            rrset.records.push(parse_presentation(rtype, text)?);
        }
        debug!(owner = %owner, rtype = %rtype, records = rrset.len(), "Fetched RRset via API");
        Ok(rrset)
    }

    #[instrument(skip(self, signer, inserts, removes), fields(signer = %signer.name))]
    async fn update_rrsets(
        &self,
        signer: &Signer,
        zone: &str,
        owner: &str,
        inserts: &[Rrset],
        removes: &[Rrset],
    ) -> Result<(), MusicError> {
        // The deSEC bulk endpoint replaces whole RRsets, so merge each
        // insert with what the signer currently serves and drop removed
        // records on the way.
        let mut payload: Vec<ApiRrset> = Vec::new();

        for insert in inserts {
            let mut merged = self
                .fetch_rrset(signer, zone, &insert.owner, insert.rtype)
                .await?;
            merged.absorb(&insert.records);
            if let Some(remove) = removes
                .iter()
                .find(|r| r.rtype == insert.rtype && r.owner == insert.owner)
            {
                merged.records.retain(|r| !remove.records.contains(r));
            }
            payload.push(ApiRrset {
                subname: Self::subname(zone, &merged.owner),
                rtype: merged.rtype.to_string(),
                ttl: if insert.ttl == 0 { 3600 } else { insert.ttl },
                records: merged.records.iter().map(data_to_presentation).collect(),
            });
        }

        for remove in removes {
            if payload
                .iter()
                .any(|p| p.rtype == remove.rtype.to_string() && p.subname == Self::subname(zone, &remove.owner))
            {
                continue;
            }
            let records = if remove.records.is_empty() {
                // Empty record list deletes the whole RRset.
                Vec::new()
            } else {
                let mut current = self
                    .fetch_rrset(signer, zone, &remove.owner, remove.rtype)
                    .await?;
                current.records.retain(|r| !remove.records.contains(r));
                current.records.iter().map(data_to_presentation).collect()
            };
            payload.push(ApiRrset {
                subname: Self::subname(zone, &remove.owner),
                rtype: remove.rtype.to_string(),
                ttl: 3600,
                records,
            });
        }

        let url = Self::base_url(signer, zone);
        let response = self
            .client
            .put(&url)
            .header(reqwest::header::AUTHORIZATION, Self::auth_header(signer)?)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MusicError::SignerOpFailed {
                signer: signer.name.clone(),
                detail: format!("PUT {}: {}", url, e),
            })?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                let headers = response.headers().clone();
                let body = response.text().await.unwrap_or_default();
                Err(MusicError::RateLimited {
                    seconds: Self::retry_after(&headers, &body),
                })
            }
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(MusicError::SignerOpFailed {
                    signer: signer.name.clone(),
                    detail: format!("PUT {} answered {}: {}", url, status, body),
                })
            }
            _ => {
                debug!(zone = %zone, rrsets = payload.len(), "RRsets updated via API");
                Ok(())
            }
        }
    }
}
