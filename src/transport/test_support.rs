//! Self-signed certificate plumbing for TLS unit tests.

use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio_rustls::TlsAcceptor;

use crate::config::{ServerConfig, TlsConfig};
use crate::transport::tls::TrustContext;

pub struct TestPki {
    cert_der: Vec<u8>,
    key_der: Vec<u8>,
    ca_file: NamedTempFile,
}

impl TestPki {
    pub fn new() -> Self {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let mut ca_file = NamedTempFile::new().unwrap();
        ca_file
            .write_all(cert.serialize_pem().unwrap().as_bytes())
            .unwrap();

        Self {
            cert_der: cert.serialize_der().unwrap(),
            key_der: cert.serialize_private_key_der(),
            ca_file,
        }
    }

    pub fn acceptor(&self) -> TlsAcceptor {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = rustls::ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(
                vec![CertificateDer::from(self.cert_der.clone())],
                PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key_der.clone())),
            )
            .unwrap();
        TlsAcceptor::from(Arc::new(config))
    }

    /// Trusts the test certificate, verified as `localhost`.
    pub fn trust(&self) -> TrustContext {
        let tls = TlsConfig {
            server_name: Some("localhost".into()),
            ca_file: Some(self.ca_file.path().to_string_lossy().to_string()),
            relaxed_security: false,
        };
        TrustContext::from_config(&ServerConfig::default(), &tls).unwrap()
    }

    /// Web PKI roots only.
    pub fn untrusting(&self) -> TrustContext {
        let tls = TlsConfig {
            server_name: Some("localhost".into()),
            ..TlsConfig::default()
        };
        TrustContext::from_config(&ServerConfig::default(), &tls).unwrap()
    }
}
