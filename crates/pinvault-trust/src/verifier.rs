// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// rustls adapter: lets a TLS client consult a `TrustPolicy` instead of a
// WebPKI root store.  Certificate acceptance is decided purely by pinning;
// handshake signatures are still checked with the ring provider.

use std::sync::Arc;

use pinvault_core::error::PinvaultError;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, SignatureScheme};
use tracing::{debug, warn};

use crate::policy::TrustPolicy;

/// Server certificate verifier backed by a pinning [`TrustPolicy`].
#[derive(Debug)]
pub struct PinnedServerVerifier {
    policy: Arc<TrustPolicy>,
    provider: Arc<CryptoProvider>,
}

impl PinnedServerVerifier {
    pub fn new(policy: Arc<TrustPolicy>) -> Self {
        Self {
            policy,
            provider: Arc::new(rustls::crypto::ring::default_provider()),
        }
    }

    pub fn policy(&self) -> &TrustPolicy {
        &self.policy
    }
}

impl ServerCertVerifier for PinnedServerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let chain: Vec<&[u8]> = std::iter::once(end_entity.as_ref())
            .chain(intermediates.iter().map(|c| c.as_ref()))
            .collect();

        if self.policy.is_chain_trusted(&chain) {
            debug!(?server_name, "server certificate matches a pin");
            Ok(ServerCertVerified::assertion())
        } else {
            warn!(?server_name, "server certificate is not pinned");
            Err(rustls::Error::InvalidCertificate(
                CertificateError::UnknownIssuer,
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// A `rustls` client configuration that trusts exactly what `policy` pins.
pub fn client_config(policy: Arc<TrustPolicy>) -> Result<ClientConfig, PinvaultError> {
    let verifier = Arc::new(PinnedServerVerifier::new(policy));
    let config = ClientConfig::builder_with_provider(Arc::clone(&verifier.provider))
        .with_safe_default_protocol_versions()
        .map_err(|e| PinvaultError::Tls(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();
    Ok(config)
}
