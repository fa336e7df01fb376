//! DNS exchange against the recursive resolver and individual signers.
//!
//! UDP first with a bounded timeout, TCP retry when the answer comes
//! back truncated.

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, RecordType as HickoryRecordType};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use music_application::ports::DnsLookup;
use music_domain::{MusicError, RecordType, Rrset};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tracing::{debug, warn};

/// Maximum UDP DNS response size with EDNS(0).
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

pub(crate) fn serialize_message(message: &Message) -> Result<Vec<u8>, MusicError> {
    let mut buf = Vec::with_capacity(512);
    let mut encoder = BinEncoder::new(&mut buf);
    message
        .emit(&mut encoder)
        .map_err(|e| MusicError::DnsProtocol(format!("cannot serialize DNS message: {}", e)))?;
    Ok(buf)
}

pub(crate) fn build_query(name: &str, rtype: RecordType, recursion: bool) -> Result<Message, MusicError> {
    let name = Name::from_str(name)
        .map_err(|e| MusicError::InvalidZoneName(format!("{}: {}", name, e)))?;

    let mut query = Query::new();
    query.set_name(name);
    query.set_query_type(HickoryRecordType::from(rtype.code()));
    query.set_query_class(DNSClass::IN);

    let mut message = Message::new(fastrand::u16(..), MessageType::Query, OpCode::Query);
    message.set_recursion_desired(recursion);
    message.add_query(query);
    Ok(message)
}

async fn exchange_udp(
    bytes: &[u8],
    server: SocketAddr,
    timeout: Duration,
) -> Result<Vec<u8>, MusicError> {
    let bind = if server.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let socket = UdpSocket::bind(bind)
        .await
        .map_err(|e| MusicError::Io(format!("cannot bind UDP socket: {}", e)))?;

    tokio::time::timeout(timeout, socket.send_to(bytes, server))
        .await
        .map_err(|_| MusicError::Timeout(format!("UDP send to {}", server)))?
        .map_err(|e| MusicError::Io(format!("UDP send to {}: {}", server, e)))?;

    let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
    let (received, from) = tokio::time::timeout(timeout, socket.recv_from(&mut buf))
        .await
        .map_err(|_| MusicError::Timeout(format!("UDP response from {}", server)))?
        .map_err(|e| MusicError::Io(format!("UDP recv from {}: {}", server, e)))?;

    if from.ip() != server.ip() {
        warn!(expected = %server, received_from = %from, "UDP response from unexpected source");
    }
    buf.truncate(received);
    Ok(buf)
}

async fn exchange_tcp(
    bytes: &[u8],
    server: SocketAddr,
    timeout: Duration,
) -> Result<Vec<u8>, MusicError> {
    let mut stream = tokio::time::timeout(timeout, TcpStream::connect(server))
        .await
        .map_err(|_| MusicError::Timeout(format!("TCP connect to {}", server)))?
        .map_err(|e| MusicError::Io(format!("TCP connect to {}: {}", server, e)))?;

    let mut framed = Vec::with_capacity(bytes.len() + 2);
    framed.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
    framed.extend_from_slice(bytes);
    stream
        .write_all(&framed)
        .await
        .map_err(|e| MusicError::Io(format!("TCP send to {}: {}", server, e)))?;

    let mut len_buf = [0u8; 2];
    tokio::time::timeout(timeout, stream.read_exact(&mut len_buf))
        .await
        .map_err(|_| MusicError::Timeout(format!("TCP response from {}", server)))?
        .map_err(|e| MusicError::Io(format!("TCP recv from {}: {}", server, e)))?;
    let len = u16::from_be_bytes(len_buf) as usize;

    let mut buf = vec![0u8; len];
    tokio::time::timeout(timeout, stream.read_exact(&mut buf))
        .await
        .map_err(|_| MusicError::Timeout(format!("TCP response from {}", server)))?
        .map_err(|e| MusicError::Io(format!("TCP recv from {}: {}", server, e)))?;
    Ok(buf)
}

/// Send a message, retrying over TCP when the UDP answer is truncated.
pub(crate) async fn exchange(
    message: &Message,
    server: SocketAddr,
    timeout: Duration,
) -> Result<Message, MusicError> {
    let bytes = serialize_message(message)?;

    let response_bytes = exchange_udp(&bytes, server, timeout).await?;
    let response = Message::from_vec(&response_bytes)
        .map_err(|e| MusicError::DnsProtocol(format!("cannot parse DNS response: {}", e)))?;

    if response.truncated() {
        debug!(server = %server, "Truncated UDP answer, retrying over TCP");
        let response_bytes = exchange_tcp(&bytes, server, timeout).await?;
        return Message::from_vec(&response_bytes)
            .map_err(|e| MusicError::DnsProtocol(format!("cannot parse DNS response: {}", e)));
    }

    if response.id() != message.id() {
        return Err(MusicError::DnsProtocol("response id mismatch".into()));
    }
    Ok(response)
}

pub(crate) fn parse_server(server: &str) -> Result<SocketAddr, MusicError> {
    let with_port = if server.contains(':') && server.parse::<SocketAddr>().is_ok() {
        server.to_string()
    } else {
        format!("{}:53", server)
    };
    with_port
        .parse()
        .map_err(|_| MusicError::Config(format!("'{}' is not a resolvable server address", server)))
}

/// The `DnsLookup` port against the configured recursive resolver.
pub struct HickoryDnsLookup {
    resolver: SocketAddr,
    timeout: Duration,
}

impl HickoryDnsLookup {
    pub fn new(resolver: SocketAddr) -> Self {
        Self {
            resolver,
            timeout: Duration::from_secs(1),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn lookup(
        &self,
        server: SocketAddr,
        name: &str,
        rtype: RecordType,
        recursion: bool,
    ) -> Result<Rrset, MusicError> {
        let query = build_query(name, rtype, recursion)?;
        let response = exchange(&query, server, self.timeout).await?;

        match response.response_code() {
            ResponseCode::NoError => {}
            // Absent data polls as an empty set; wait predicates rely on
            // this.
            ResponseCode::NXDomain => return Ok(Rrset::new(name.to_string(), rtype, 0)),
            code => {
                return Err(MusicError::DnsProtocol(format!(
                    "query {}/{} answered {}",
                    name, rtype, code
                )))
            }
        }

        super::records::answers_to_rrset(response.answers(), name, rtype)
    }
}

#[async_trait]
impl DnsLookup for HickoryDnsLookup {
    async fn query(&self, name: &str, rtype: RecordType) -> Result<Rrset, MusicError> {
        self.lookup(self.resolver, name, rtype, true).await
    }

    async fn query_at(
        &self,
        server: &str,
        name: &str,
        rtype: RecordType,
    ) -> Result<Rrset, MusicError> {
        let server = parse_server(server)?;
        self.lookup(server, name, rtype, false).await
    }
}
