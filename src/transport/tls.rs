//! Trust context
//!
//! One TLS client configuration, built once and shared by the control
//! channel and every data channel. Sharing the same `rustls::ClientConfig`
//! also shares its session cache, so data channels resume the control
//! channel's TLS session (servers like vsftpd with `require_ssl_reuse`
//! refuse data connections that do not).

use log::{debug, warn};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::config::{ServerConfig, TlsConfig};
use crate::error::{FtpClientError, FtpResult};
use crate::utils::network::with_timeout;

/// Shared TLS configuration plus the name the server is verified against
#[derive(Clone)]
pub struct TrustContext {
    connector: TlsConnector,
    server_name: ServerName<'static>,
    relaxed: bool,
}

impl TrustContext {
    /// Builds the trust context from the server and TLS settings.
    pub fn from_config(server: &ServerConfig, tls: &TlsConfig) -> FtpResult<Self> {
        let mut root_store = RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        if let Some(ca_file) = &tls.ca_file {
            let added = add_ca_file(&mut root_store, ca_file)?;
            debug!("Loaded {} CA certificate(s) from {}", added, ca_file);
        }

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut client_config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| FtpClientError::Config(format!("TLS protocol versions: {}", e)))?
            .with_root_certificates(root_store)
            .with_no_client_auth();

        if tls.relaxed_security {
            warn!("TLS certificate verification disabled (tls.relaxed_security) - insecure!");
            client_config
                .dangerous()
                .set_certificate_verifier(Arc::new(AcceptAnyCertificate));
        }

        let name = tls.server_name.as_deref().unwrap_or(&server.host);
        let server_name = ServerName::try_from(name.to_string())
            .map_err(|e| FtpClientError::Config(format!("Invalid TLS server name {}: {}", name, e)))?;

        Ok(Self {
            connector: TlsConnector::from(Arc::new(client_config)),
            server_name,
            relaxed: tls.relaxed_security,
        })
    }

    pub fn server_name(&self) -> &ServerName<'static> {
        &self.server_name
    }

    /// Whether certificate verification is switched off
    pub fn is_relaxed(&self) -> bool {
        self.relaxed
    }

    /// Runs a client handshake over `stream`.
    pub async fn handshake<S>(&self, stream: S, limit: Option<Duration>) -> FtpResult<TlsStream<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        with_timeout(limit, async {
            self.connector
                .connect(self.server_name.clone(), stream)
                .await
                .map_err(|e| FtpClientError::TlsHandshake(e.to_string()))
        })
        .await
    }
}

fn add_ca_file(root_store: &mut RootCertStore, ca_file: &str) -> FtpResult<usize> {
    let pem = std::fs::read(ca_file)
        .map_err(|e| FtpClientError::Config(format!("Failed to read CA file {}: {}", ca_file, e)))?;

    let mut added = 0;
    for cert in rustls_pemfile::certs(&mut Cursor::new(pem)) {
        let cert = cert
            .map_err(|e| FtpClientError::Config(format!("Bad certificate in {}: {}", ca_file, e)))?;
        root_store
            .add(cert)
            .map_err(|e| FtpClientError::Config(format!("Rejected CA in {}: {}", ca_file, e)))?;
        added += 1;
    }

    if added == 0 {
        return Err(FtpClientError::Config(format!(
            "No certificates found in {}",
            ca_file
        )));
    }
    Ok(added)
}

/// Certificate verifier that accepts every server certificate
#[derive(Debug)]
struct AcceptAnyCertificate;

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}
