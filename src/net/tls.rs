//! TLS configuration and certificate loading.
//!
//! # Responsibilities
//! - Build the client config used for TLS dials (destinations and HTTPS proxies)
//! - Load the certificate the listener presents when it terminates TLS
//!
//! # Design Decisions
//! - The ring provider is selected explicitly so feature unification in a
//!   larger build cannot make the default provider ambiguous
//! - Client sessions only offer `http/1.1`: an upgrade handshake cannot run
//!   over HTTP/2

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore, ServerConfig};

use crate::config::TlsClientConfig;

/// Errors building a TLS configuration.
#[derive(Debug, thiserror::Error)]
pub enum TlsSetupError {
    #[error("file not found: {0:?}")]
    NotFound(std::path::PathBuf),

    #[error("failed to read {path:?}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no private key in {0:?}")]
    MissingKey(std::path::PathBuf),

    #[error("no usable trust roots")]
    NoRoots,

    #[error(transparent)]
    Rustls(#[from] rustls::Error),
}

/// The crypto provider every config in this crate is built with.
pub fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Build a client config from an explicit root store.
pub fn client_config_with_roots(roots: RootCertStore) -> Result<Arc<ClientConfig>, TlsSetupError> {
    let mut config = ClientConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(Arc::new(config))
}

/// Build the client config for destination dials from configuration.
pub fn build_client_config(config: &TlsClientConfig) -> Result<Arc<ClientConfig>, TlsSetupError> {
    let mut roots = RootCertStore::empty();

    if config.use_native_roots {
        let native = rustls_native_certs::load_native_certs();
        if !native.errors.is_empty() {
            tracing::warn!(
                errors = native.errors.len(),
                "Native certificate loading reported issues; continuing with available roots"
            );
        }
        let (added, ignored) = roots.add_parsable_certificates(native.certs);
        tracing::debug!(added, ignored, "Loaded native trust roots");
    }

    if config.use_webpki_roots {
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    for path in &config.extra_ca_paths {
        for cert in read_certs(Path::new(path))? {
            roots.add(cert)?;
        }
    }

    if roots.is_empty() {
        return Err(TlsSetupError::NoRoots);
    }

    tracing::info!(roots = roots.len(), "TLS client configuration ready");
    client_config_with_roots(roots)
}

/// Load the listener's certificate chain and key from PEM files.
pub fn load_server_config(cert_path: &Path, key_path: &Path) -> Result<Arc<ServerConfig>, TlsSetupError> {
    let certs = read_certs(cert_path)?;
    let key = read_key(key_path)?;
    let mut config = ServerConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(Arc::new(config))
}

fn open(path: &Path) -> Result<BufReader<File>, TlsSetupError> {
    if !path.exists() {
        return Err(TlsSetupError::NotFound(path.to_path_buf()));
    }
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsSetupError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn read_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsSetupError> {
    let mut reader = open(path)?;
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsSetupError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn read_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsSetupError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| TlsSetupError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| TlsSetupError::MissingKey(path.to_path_buf()))
}
