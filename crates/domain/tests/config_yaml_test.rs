use music_domain::config::{CliOverrides, Config};
use music_domain::{SignerAuth, UpdateMethod};

const SAMPLE: &str = r#"
apiserver:
  address: 0.0.0.0
  port: 8453
  api_key: sekrit

db:
  path: /var/lib/music/music.db

common:
  log_level: debug

fsmengine:
  intervals:
    target: 45
    minimum: 15
    maximum: 300
    complete: 1800

signers:
  - name: signer1
    method: ddns
    address: 10.0.0.1
    port: 53
    auth:
      kind: tsig
      key_name: music-key.
      algorithm: hmac-sha256
      secret: dGVzdC1zZWNyZXQ=
    fetch_limit: 10
    update_limit: 2
  - name: signer2
    method: desec-api
    address: api.desec.example
    port: 443
    auth:
      kind: token
      token: abc123

sidecar:
  identity: msa1.example.
  api:
    addresses: ["192.0.2.1"]
    port: 8453
    cert_file: /etc/music/tls/cert.pem
    key_file: /etc/music/tls/key.pem

resolver:
  address: 127.0.0.1:53

syncengine:
  intervals:
    heartbeat: 30
    fullbeat: 120
    helloeval: 600
"#;

fn write_sample() -> tempfile_path::TempPath {
    tempfile_path::write(SAMPLE)
}

// Minimal tempfile helper so the domain crate stays dependency-light.
mod tempfile_path {
    use std::io::Write;
    use std::path::PathBuf;

    pub struct TempPath(pub PathBuf);

    impl Drop for TempPath {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    pub fn write(contents: &str) -> TempPath {
        let mut path = std::env::temp_dir();
        path.push(format!("music-config-test-{}.yaml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        TempPath(path)
    }
}

#[test]
fn full_yaml_round_trip() {
    let tmp = write_sample();
    let config = Config::load(Some(tmp.0.to_str().unwrap()), CliOverrides::default()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.apiserver.port, 8453);
    assert_eq!(config.apiserver.api_key.as_deref(), Some("sekrit"));
    assert_eq!(config.db.path, "/var/lib/music/music.db");
    assert_eq!(config.common.log_level, "debug");

    assert_eq!(config.fsmengine.intervals.target, 45);
    assert_eq!(config.fsmengine.intervals.complete, 1800);

    assert_eq!(config.signers.len(), 2);
    let ddns = &config.signers[0];
    assert_eq!(ddns.method, UpdateMethod::Ddns);
    assert_eq!(ddns.update_limit, 2);
    assert!(matches!(ddns.auth, SignerAuth::Tsig { .. }));
    let desec = &config.signers[1];
    assert_eq!(desec.method, UpdateMethod::DesecApi);
    assert_eq!(desec.api_token(), Some("abc123"));

    assert_eq!(config.sidecar.identity, "msa1.example.");
    assert!(config.sidecar.api.is_some());
    assert_eq!(config.syncengine.intervals.heartbeat, 30);
}

#[test]
fn intervals_are_clamped_on_load() {
    let yaml = r#"
syncengine:
  intervals:
    heartbeat: 1
    fullbeat: 999999
    helloeval: 10
"#;
    let tmp = {
        use std::io::Write;
        let mut path = std::env::temp_dir();
        path.push(format!("music-clamp-test-{}.yaml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        path
    };
    let config = Config::load(Some(tmp.to_str().unwrap()), CliOverrides::default()).unwrap();
    let _ = std::fs::remove_file(&tmp);

    assert_eq!(config.syncengine.intervals.heartbeat, 15);
    assert_eq!(config.syncengine.intervals.fullbeat, 3600);
    assert_eq!(config.syncengine.intervals.helloeval, 300);
}
