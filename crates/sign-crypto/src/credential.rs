//! PKCS#12 credential extraction and detached CMS signing

use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::x509::X509;

use crate::error::CryptoError;

/// A signing credential extracted from a PKCS#12 bundle.
///
/// Owned by exactly one signing invocation. Key material stays in memory
/// and is released when the credential is dropped, so failure paths need
/// no cleanup of their own.
pub struct SigningCredential {
    pkey: PKey<Private>,
    cert: X509,
    chain: Vec<X509>,
}

impl SigningCredential {
    /// Decrypt a PKCS#12 container and extract key, leaf certificate and
    /// any additional chain certificates.
    ///
    /// A wrong password and a malformed bundle are indistinguishable to
    /// the decryption step; both surface as `InvalidCredential`.
    pub fn from_pkcs12(bundle: &[u8], password: &str) -> Result<Self, CryptoError> {
        let pkcs12 = Pkcs12::from_der(bundle).map_err(|e| {
            tracing::debug!("PKCS#12 parse failed: {}", e);
            CryptoError::InvalidCredential
        })?;

        let parsed = pkcs12.parse2(password).map_err(|e| {
            tracing::debug!("PKCS#12 decrypt failed: {}", e);
            CryptoError::InvalidCredential
        })?;

        let pkey = parsed.pkey.ok_or(CryptoError::InvalidCredential)?;
        let cert = parsed.cert.ok_or(CryptoError::InvalidCredential)?;
        let chain = parsed
            .ca
            .map(|stack| stack.into_iter().collect())
            .unwrap_or_default();

        Ok(Self { pkey, cert, chain })
    }

    /// Display name of the signer, taken from the certificate subject CN.
    pub fn signer_name(&self) -> String {
        self.cert
            .subject_name()
            .entries_by_nid(Nid::COMMONNAME)
            .next()
            .and_then(|entry| std::str::from_utf8(entry.data().as_slice()).ok())
            .map(|cn| cn.to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// DER bytes of the leaf certificate.
    pub fn certificate_der(&self) -> Result<Vec<u8>, CryptoError> {
        self.cert
            .to_der()
            .map_err(|e| CryptoError::Signing(e.to_string()))
    }

    /// Create a detached PKCS#7 signature over `data`, returned as DER.
    ///
    /// The chain certificates are embedded so verifiers can rebuild the
    /// path; S/MIME capability attributes are stripped (not used in PDF).
    pub fn sign_detached(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut certs = Stack::new().map_err(|e| CryptoError::Signing(e.to_string()))?;
        for cert in &self.chain {
            certs
                .push(cert.clone())
                .map_err(|e| CryptoError::Signing(e.to_string()))?;
        }

        let flags = Pkcs7Flags::DETACHED | Pkcs7Flags::BINARY | Pkcs7Flags::NOSMIMECAP;
        let pkcs7 = Pkcs7::sign(&self.cert, &self.pkey, &certs, data, flags)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;

        pkcs7
            .to_der()
            .map_err(|e| CryptoError::Signing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::asn1::Asn1Time;
    use openssl::bn::{BigNum, MsbOption};
    use openssl::hash::MessageDigest;
    use openssl::rsa::Rsa;
    use openssl::x509::store::X509StoreBuilder;
    use openssl::x509::X509NameBuilder;
    use pretty_assertions::assert_eq;

    /// Self-signed RSA certificate wrapped in a PKCS#12 bundle.
    fn test_bundle(cn: &str, password: &str) -> Vec<u8> {
        let rsa = Rsa::generate(2048).unwrap();
        let pkey = PKey::from_rsa(rsa).unwrap();

        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_nid(Nid::COMMONNAME, cn).unwrap();
        let name = name.build();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        let serial = {
            let mut bn = BigNum::new().unwrap();
            bn.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();
            bn.to_asn1_integer().unwrap()
        };
        builder.set_serial_number(&serial).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&pkey).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(365).unwrap())
            .unwrap();
        builder.sign(&pkey, MessageDigest::sha256()).unwrap();
        let cert = builder.build();

        Pkcs12::builder()
            .name("test")
            .pkey(&pkey)
            .cert(&cert)
            .build2(password)
            .unwrap()
            .to_der()
            .unwrap()
    }

    #[test]
    fn extracts_credential_from_valid_bundle() {
        let bundle = test_bundle("Jane Signer", "secret");
        let credential = SigningCredential::from_pkcs12(&bundle, "secret").unwrap();
        assert_eq!(credential.signer_name(), "Jane Signer");
    }

    #[test]
    fn signer_name_handles_a_utf8_common_name() {
        let bundle = test_bundle("José Peña", "secret");
        let credential = SigningCredential::from_pkcs12(&bundle, "secret").unwrap();
        assert_eq!(credential.signer_name(), "José Peña");
    }

    #[test]
    fn extraction_is_deterministic() {
        let bundle = test_bundle("Jane Signer", "secret");
        let a = SigningCredential::from_pkcs12(&bundle, "secret").unwrap();
        let b = SigningCredential::from_pkcs12(&bundle, "secret").unwrap();
        assert_eq!(a.certificate_der().unwrap(), b.certificate_der().unwrap());
    }

    // The credential carries key material and has no Debug impl, so
    // these match on the Result instead of unwrapping the error out.
    #[test]
    fn wrong_password_is_invalid_credential() {
        let bundle = test_bundle("Jane Signer", "secret");
        assert!(matches!(
            SigningCredential::from_pkcs12(&bundle, "wrong"),
            Err(CryptoError::InvalidCredential)
        ));
    }

    #[test]
    fn garbage_bundle_is_invalid_credential() {
        assert!(matches!(
            SigningCredential::from_pkcs12(b"not a pkcs12 container", "secret"),
            Err(CryptoError::InvalidCredential)
        ));
    }

    #[test]
    fn detached_signature_verifies_over_signed_bytes() {
        let bundle = test_bundle("Jane Signer", "secret");
        let credential = SigningCredential::from_pkcs12(&bundle, "secret").unwrap();

        let data = b"covered byte ranges of one revision";
        let der = credential.sign_detached(data).unwrap();

        let pkcs7 = Pkcs7::from_der(&der).unwrap();
        let store = X509StoreBuilder::new().unwrap().build();
        let certs = Stack::new().unwrap();
        let mut out = Vec::new();
        pkcs7
            .verify(
                &certs,
                &store,
                Some(data),
                Some(&mut out),
                Pkcs7Flags::NOVERIFY,
            )
            .unwrap();
    }

    #[test]
    fn detached_signature_rejects_tampered_bytes() {
        let bundle = test_bundle("Jane Signer", "secret");
        let credential = SigningCredential::from_pkcs12(&bundle, "secret").unwrap();

        let der = credential.sign_detached(b"original bytes").unwrap();

        let pkcs7 = Pkcs7::from_der(&der).unwrap();
        let store = X509StoreBuilder::new().unwrap().build();
        let certs = Stack::new().unwrap();
        let result = pkcs7.verify(
            &certs,
            &store,
            Some(b"tampered bytes"),
            None,
            Pkcs7Flags::NOVERIFY,
        );
        assert!(result.is_err());
    }
}
