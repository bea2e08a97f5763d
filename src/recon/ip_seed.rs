//! IP 侦察的附加种子来源
//!
//! 除 PTR 反查外，再从目标 IP 443 端口出示的证书（SAN + CN）取名字，
//! 然后在这些名字的基础域名下试探常见虚拟主机，只保留解析回目标 IP 的那些。

use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, Error as RustlsError, SignatureScheme};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use x509_parser::prelude::*;

use crate::dns::{BatchResolution, HostResolution};
use crate::recon::target::base_domain;

/// 证书名字的来源名
pub const TLS_CERT_SOURCE: &str = "tls-cert";
/// 常见虚拟主机命中的来源名
pub const VHOST_SOURCE: &str = "vhost";

pub const COMMON_VHOSTS: &[&str] = &["www", "mail", "webmail", "smtp", "pop", "ftp", "dns", "ns1", "ns2"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CertificateError {
    #[error("connect to {0} failed: {1}")]
    Connect(SocketAddr, String),

    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("no certificate presented")]
    NoCertificate,
}

/// 取某个 IP 上服务出示的证书名字
#[async_trait]
pub trait CertificateSource: Send + Sync {
    async fn names(&self, ip: IpAddr) -> Result<Vec<String>, CertificateError>;
}

/// 只为读取证书内容，不校验信任链
#[derive(Debug)]
struct AcceptAnyCertVerifier;

impl ServerCertVerifier for AcceptAnyCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
            SignatureScheme::ED448,
        ]
    }
}

/// 直连 IP:port 做一次 TLS 握手，读取叶子证书
#[derive(Clone, Debug)]
pub struct TlsCertificateSource {
    port: u16,
    timeout: Duration,
}

impl TlsCertificateSource {
    pub fn new(port: u16, timeout: Duration) -> Self {
        let _ = rustls::crypto::ring::default_provider().install_default();
        Self { port, timeout }
    }
}

#[async_trait]
impl CertificateSource for TlsCertificateSource {
    async fn names(&self, ip: IpAddr) -> Result<Vec<String>, CertificateError> {
        let config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertVerifier))
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(config));

        let addr = SocketAddr::new(ip, self.port);
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| CertificateError::Timeout(self.timeout))?
            .map_err(|e| CertificateError::Connect(addr, e.to_string()))?;
        let tls = tokio::time::timeout(self.timeout, connector.connect(ServerName::from(ip), stream))
            .await
            .map_err(|_| CertificateError::Timeout(self.timeout))?
            .map_err(|e| CertificateError::Handshake(e.to_string()))?;

        let (_, connection) = tls.get_ref();
        let leaf = connection
            .peer_certificates()
            .and_then(|chain| chain.first())
            .ok_or(CertificateError::NoCertificate)?;
        let names = certificate_names(leaf.as_ref());
        tracing::debug!(ip = %ip, port = self.port, names = names.len(), "certificate names collected");
        Ok(names)
    }
}

/// 证书 DER 中的 CN 与 SAN DNS 名（去重，只保留含点的名字）；无法解析时为空
pub fn certificate_names(der: &[u8]) -> Vec<String> {
    let Ok((_, cert)) = parse_x509_certificate(der) else {
        return Vec::new();
    };
    let mut names = BTreeSet::new();
    for cn in cert.subject().iter_common_name() {
        if let Ok(value) = cn.as_str() {
            names.insert(value.to_string());
        }
    }
    if let Ok(Some(san)) = cert.subject_alternative_name() {
        for name in &san.value.general_names {
            if let GeneralName::DNSName(dns) = name {
                names.insert(dns.to_string());
            }
        }
    }
    names.into_iter().filter(|n| n.contains('.')).collect()
}

/// 已知名字的基础域名下的常见虚拟主机（names 须已规范化）
pub fn vhost_candidates<'a>(names: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let bases: BTreeSet<&str> = names
        .into_iter()
        .map(|n| base_domain(n))
        .filter(|b| b.contains('.'))
        .collect();
    bases
        .into_iter()
        .flat_map(|base| COMMON_VHOSTS.iter().map(move |label| format!("{label}.{base}")))
        .collect()
}

/// 批量结果中解析到 ip 的名字（有序）
pub fn resolving_to(batch: &BatchResolution, ip: IpAddr) -> Vec<String> {
    let hits: BTreeSet<&String> = batch
        .iter()
        .filter(|(_, res)| matches!(res, HostResolution::Addresses(addrs) if addrs.contains(&ip)))
        .map(|(name, _)| name)
        .collect();
    hits.into_iter().cloned().collect()
}
