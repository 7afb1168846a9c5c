//! X.509 parsing and key-pair validation for Secret source objects.
//!
//! Secrets arrive as in-memory PEM bytes from the source cache, not files, so
//! this walks the same ASN.1 structure the teacher crate walks for
//! file-backed certificates but never touches the filesystem.

use anyhow::anyhow;
use chrono::{DateTime, TimeZone, Utc};
use ring::{
    rand::SystemRandom,
    signature::{
        EcdsaKeyPair, Ed25519KeyPair, KeyPair, RsaKeyPair, ECDSA_P256_SHA256_ASN1_SIGNING,
        ECDSA_P384_SHA384_ASN1_SIGNING,
    },
};
use rustls::pki_types::{pem::PemObject, CertificateDer, PrivateKeyDer};
use simple_asn1::{ASN1Block, ASN1Class, BigInt, OID};

use crate::errors::TlsError;

/// Metadata extracted from the leaf certificate.
#[derive(Debug, Clone)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// Validated certificate materials for a single Secret source object.
#[derive(Debug)]
pub struct CertificateBundle {
    pub leaf: CertificateDer<'static>,
    pub intermediates: Vec<CertificateDer<'static>>,
    pub private_key: PrivateKeyDer<'static>,
    pub info: CertificateInfo,
    pub public_key_algorithm: String,
    pub public_key_data: Vec<u8>,
}

/// Parse and validate a cert-chain + private-key PEM pair. `secret` is a
/// `namespace/name` identity used only for error context.
pub fn load_certificate_bundle(
    secret: &str,
    cert_pem: &[u8],
    key_pem: &[u8],
) -> Result<CertificateBundle, TlsError> {
    let mut leaf_chain: Vec<CertificateDer<'static>> = CertificateDer::pem_slice_iter(cert_pem)
        .map(|result| {
            result.map_err(|err| TlsError::InvalidCertificatePem {
                secret: secret.to_string(),
                source: anyhow!(err),
            })
        })
        .collect::<Result<_, _>>()?;

    if leaf_chain.is_empty() {
        return Err(TlsError::EmptyCertificateChain { secret: secret.to_string() });
    }

    let leaf = leaf_chain.remove(0);
    let intermediates = leaf_chain;

    let private_key = PrivateKeyDer::from_pem_slice(key_pem).map_err(|err| {
        TlsError::InvalidPrivateKey { secret: secret.to_string(), source: Some(anyhow!(err)) }
    })?;

    let parsed = parse_certificate_metadata(&leaf, secret)?;

    validate_certificate_dates(&parsed.info, secret)?;
    validate_key_pair(&parsed, &private_key, secret)?;

    Ok(CertificateBundle {
        leaf,
        intermediates,
        private_key,
        info: parsed.info,
        public_key_algorithm: parsed.algorithm_oid,
        public_key_data: parsed.public_key,
    })
}

/// Validate an opaque CA bundle (no private key) used only for upstream or
/// downstream client validation.
pub fn load_ca_bundle(secret: &str, ca_pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let chain: Vec<CertificateDer<'static>> = CertificateDer::pem_slice_iter(ca_pem)
        .map(|result| {
            result.map_err(|err| TlsError::InvalidCertificatePem {
                secret: secret.to_string(),
                source: anyhow!(err),
            })
        })
        .collect::<Result<_, _>>()?;

    if chain.is_empty() {
        return Err(TlsError::EmptyCertificateChain { secret: secret.to_string() });
    }
    Ok(chain)
}

struct ParsedCertificate {
    info: CertificateInfo,
    algorithm_oid: String,
    public_key: Vec<u8>,
}

fn parse_certificate_metadata(
    cert: &CertificateDer<'static>,
    secret: &str,
) -> Result<ParsedCertificate, TlsError> {
    let blocks = simple_asn1::from_der(cert.as_ref())
        .map_err(|err| TlsError::CertificateMetadata { secret: secret.to_string(), source: anyhow!(err) })?;

    let cert_seq = match blocks.first() {
        Some(ASN1Block::Sequence(_, items)) => items,
        _ => {
            return Err(TlsError::CertificateMetadata {
                secret: secret.to_string(),
                source: anyhow!("certificate missing outer sequence"),
            })
        }
    };

    let tbs_seq = match cert_seq.first() {
        Some(ASN1Block::Sequence(_, items)) => items,
        _ => {
            return Err(TlsError::CertificateMetadata {
                secret: secret.to_string(),
                source: anyhow!("certificate missing tbsCertificate"),
            })
        }
    };

    let mut fields = tbs_seq.iter();

    // Optional version field [0] EXPLICIT Version
    if let Some(ASN1Block::Explicit(ASN1Class::ContextSpecific, _, tag, _)) = fields.next() {
        if tag != &0u8.into() {
            return Err(TlsError::CertificateMetadata {
                secret: secret.to_string(),
                source: anyhow!("unexpected context-specific field before serial number"),
            });
        }
    }

    fields.next(); // serial number
    fields.next(); // signature algorithm

    let issuer_block = fields.next().ok_or_else(|| TlsError::CertificateMetadata {
        secret: secret.to_string(),
        source: anyhow!("certificate missing issuer"),
    })?;

    let validity_block = fields.next().ok_or_else(|| TlsError::CertificateMetadata {
        secret: secret.to_string(),
        source: anyhow!("certificate missing validity"),
    })?;

    let subject_block = fields.next().ok_or_else(|| TlsError::CertificateMetadata {
        secret: secret.to_string(),
        source: anyhow!("certificate missing subject"),
    })?;

    let spki_block = fields.next().ok_or_else(|| TlsError::CertificateMetadata {
        secret: secret.to_string(),
        source: anyhow!("certificate missing subjectPublicKeyInfo"),
    })?;

    let issuer = parse_name(issuer_block, secret)?;
    let subject = parse_name(subject_block, secret)?;
    let (not_before, not_after) = parse_validity(validity_block, secret)?;
    let public_info = parse_public_key_info(spki_block, secret)?;

    Ok(ParsedCertificate {
        info: CertificateInfo { subject, issuer, not_before, not_after },
        algorithm_oid: public_info.algorithm_oid,
        public_key: public_info.public_key,
    })
}

struct PublicKeyInfo {
    algorithm_oid: String,
    public_key: Vec<u8>,
}

fn parse_public_key_info(block: &ASN1Block, secret: &str) -> Result<PublicKeyInfo, TlsError> {
    let items = match block {
        ASN1Block::Sequence(_, items) => items,
        _ => {
            return Err(TlsError::CertificateMetadata {
                secret: secret.to_string(),
                source: anyhow!("subjectPublicKeyInfo is not a sequence"),
            })
        }
    };

    if items.len() < 2 {
        return Err(TlsError::CertificateMetadata {
            secret: secret.to_string(),
            source: anyhow!("subjectPublicKeyInfo missing fields"),
        });
    }

    let algorithm_seq = match &items[0] {
        ASN1Block::Sequence(_, seq) => seq,
        _ => {
            return Err(TlsError::CertificateMetadata {
                secret: secret.to_string(),
                source: anyhow!("algorithm identifier missing"),
            })
        }
    };

    let algorithm_oid = match algorithm_seq.first() {
        Some(ASN1Block::ObjectIdentifier(_, oid)) => oid_to_string(oid),
        _ => {
            return Err(TlsError::CertificateMetadata {
                secret: secret.to_string(),
                source: anyhow!("algorithm identifier missing OID"),
            })
        }
    };

    let (bit_len, public_key) = match &items[1] {
        ASN1Block::BitString(_, nbits, bytes) => (*nbits, bytes.clone()),
        _ => {
            return Err(TlsError::CertificateMetadata {
                secret: secret.to_string(),
                source: anyhow!("subject public key is not a bit string"),
            })
        }
    };

    if bit_len % 8 != 0 || public_key.len() * 8 != bit_len {
        return Err(TlsError::CertificateMetadata {
            secret: secret.to_string(),
            source: anyhow!("subject public key contains unused bits"),
        });
    }

    Ok(PublicKeyInfo { algorithm_oid, public_key })
}

fn parse_name(block: &ASN1Block, secret: &str) -> Result<String, TlsError> {
    let rdns = match block {
        ASN1Block::Sequence(_, items) => items,
        _ => {
            return Err(TlsError::CertificateMetadata {
                secret: secret.to_string(),
                source: anyhow!("name is not a sequence"),
            })
        }
    };

    let mut components = Vec::new();
    for rdn in rdns {
        let set_items = match rdn {
            ASN1Block::Set(_, items) => items,
            _ => continue,
        };

        for attr in set_items {
            if let ASN1Block::Sequence(_, attr_items) = attr {
                if attr_items.len() < 2 {
                    continue;
                }
                if let ASN1Block::ObjectIdentifier(_, oid) = &attr_items[0] {
                    if let Some(value) = extract_string_value(&attr_items[1]) {
                        let oid_string = oid_to_string(oid);
                        let short = match oid_string.as_str() {
                            "2.5.4.3" => "CN",
                            "2.5.4.6" => "C",
                            "2.5.4.7" => "L",
                            "2.5.4.8" => "ST",
                            "2.5.4.10" => "O",
                            "2.5.4.11" => "OU",
                            other => other,
                        };
                        components.push(format!("{short}={value}"));
                    }
                }
            }
        }
    }

    Ok(components.join(", "))
}

fn extract_string_value(block: &ASN1Block) -> Option<String> {
    match block {
        ASN1Block::UTF8String(_, value)
        | ASN1Block::PrintableString(_, value)
        | ASN1Block::IA5String(_, value)
        | ASN1Block::TeletexString(_, value)
        | ASN1Block::UniversalString(_, value)
        | ASN1Block::BMPString(_, value) => Some(value.clone()),
        _ => None,
    }
}

fn parse_validity(block: &ASN1Block, secret: &str) -> Result<(DateTime<Utc>, DateTime<Utc>), TlsError> {
    let entries = match block {
        ASN1Block::Sequence(_, items) => items,
        _ => {
            return Err(TlsError::CertificateMetadata {
                secret: secret.to_string(),
                source: anyhow!("validity is not a sequence"),
            })
        }
    };

    if entries.len() < 2 {
        return Err(TlsError::CertificateMetadata {
            secret: secret.to_string(),
            source: anyhow!("validity sequence missing entries"),
        });
    }

    let not_before = time_block_to_chrono(&entries[0], secret)?;
    let not_after = time_block_to_chrono(&entries[1], secret)?;

    Ok((not_before, not_after))
}

fn time_block_to_chrono(block: &ASN1Block, secret: &str) -> Result<DateTime<Utc>, TlsError> {
    let primitive = match block {
        ASN1Block::UTCTime(_, value) | ASN1Block::GeneralizedTime(_, value) => value,
        _ => {
            return Err(TlsError::CertificateMetadata {
                secret: secret.to_string(),
                source: anyhow!("time value not in expected format"),
            })
        }
    };

    let dt = primitive.assume_utc();
    let timestamp = dt.unix_timestamp();
    let nanos = dt.nanosecond();

    Utc.timestamp_opt(timestamp, nanos).single().ok_or_else(|| TlsError::CertificateMetadata {
        secret: secret.to_string(),
        source: anyhow!("failed to convert certificate time"),
    })
}

fn validate_certificate_dates(info: &CertificateInfo, secret: &str) -> Result<(), TlsError> {
    let now = current_time();
    if info.not_before > now {
        return Err(TlsError::CertificateNotYetValid {
            secret: secret.to_string(),
            not_before: info.not_before,
        });
    }
    if info.not_after <= now {
        return Err(TlsError::CertificateExpired { secret: secret.to_string(), not_after: info.not_after });
    }
    Ok(())
}

fn validate_key_pair(
    certificate: &ParsedCertificate,
    private_key: &PrivateKeyDer<'static>,
    secret: &str,
) -> Result<(), TlsError> {
    enforce_public_key_match(&certificate.algorithm_oid, &certificate.public_key, private_key, secret)
}

fn enforce_public_key_match(
    algorithm_oid: &str,
    public_key: &[u8],
    private_key: &PrivateKeyDer<'static>,
    secret: &str,
) -> Result<(), TlsError> {
    let key_bytes = private_key.secret_der();

    match algorithm_oid {
        "1.3.101.112" => {
            let key_pair = Ed25519KeyPair::from_pkcs8(key_bytes)
                .map_err(|_| TlsError::CertificateKeyMismatch { secret: secret.to_string() })?;
            if key_pair.public_key().as_ref() == public_key {
                Ok(())
            } else {
                Err(TlsError::CertificateKeyMismatch { secret: secret.to_string() })
            }
        }
        "1.2.840.10045.2.1" => {
            let rng = SystemRandom::new();
            if let Ok(key_pair) =
                EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, key_bytes, &rng)
            {
                return compare_bytes(key_pair.public_key().as_ref(), public_key, secret);
            }

            let rng = SystemRandom::new();
            if let Ok(key_pair) =
                EcdsaKeyPair::from_pkcs8(&ECDSA_P384_SHA384_ASN1_SIGNING, key_bytes, &rng)
            {
                return compare_bytes(key_pair.public_key().as_ref(), public_key, secret);
            }

            Err(TlsError::CertificateKeyMismatch { secret: secret.to_string() })
        }
        "1.2.840.113549.1.1.1" => {
            if let Ok(key_pair) = RsaKeyPair::from_pkcs8(key_bytes) {
                return compare_rsa_public_key(&key_pair, public_key)
                    .map_err(|_| TlsError::CertificateKeyMismatch { secret: secret.to_string() });
            }
            if let Ok(key_pair) = RsaKeyPair::from_der(key_bytes) {
                return compare_rsa_public_key(&key_pair, public_key)
                    .map_err(|_| TlsError::CertificateKeyMismatch { secret: secret.to_string() });
            }
            Err(TlsError::InvalidPrivateKey { secret: secret.to_string(), source: None })
        }
        _ => Ok(()),
    }
}

fn compare_bytes(expected: &[u8], actual: &[u8], secret: &str) -> Result<(), TlsError> {
    if expected == actual {
        Ok(())
    } else {
        Err(TlsError::CertificateKeyMismatch { secret: secret.to_string() })
    }
}

fn compare_rsa_public_key(key_pair: &RsaKeyPair, public_key: &[u8]) -> Result<(), anyhow::Error> {
    let subject_blocks = simple_asn1::from_der(public_key)?;
    let subject_seq = match subject_blocks.first() {
        Some(ASN1Block::Sequence(_, items)) => items,
        _ => return Err(anyhow!("RSA public key is not a sequence")),
    };

    if subject_seq.len() < 2 {
        return Err(anyhow!("RSA public key missing modulus/exponent"));
    }

    let subject_modulus = match &subject_seq[0] {
        ASN1Block::Integer(_, value) => bigint_to_bytes(value),
        _ => return Err(anyhow!("RSA modulus missing")),
    };

    let subject_exponent = match &subject_seq[1] {
        ASN1Block::Integer(_, value) => bigint_to_bytes(value),
        _ => return Err(anyhow!("RSA exponent missing")),
    };

    let key_blocks = simple_asn1::from_der(key_pair.public().as_ref())?;
    let key_seq = match key_blocks.first() {
        Some(ASN1Block::Sequence(_, items)) => items,
        _ => return Err(anyhow!("RSA key is not a sequence")),
    };

    if key_seq.len() < 2 {
        return Err(anyhow!("RSA key missing modulus/exponent"));
    }

    let key_modulus = match &key_seq[0] {
        ASN1Block::Integer(_, value) => bigint_to_bytes(value),
        _ => return Err(anyhow!("RSA key modulus missing")),
    };

    let key_exponent = match &key_seq[1] {
        ASN1Block::Integer(_, value) => bigint_to_bytes(value),
        _ => return Err(anyhow!("RSA key exponent missing")),
    };

    if subject_modulus == key_modulus && subject_exponent == key_exponent {
        Ok(())
    } else {
        Err(anyhow!("RSA key mismatch"))
    }
}

fn bigint_to_bytes(value: &BigInt) -> Vec<u8> {
    value.to_biguint().map_or_else(Vec::new, |v| v.to_bytes_be())
}

fn oid_to_string(oid: &OID) -> String {
    oid.as_vec::<u64>()
        .map(|components| components.into_iter().map(|n| n.to_string()).collect::<Vec<_>>().join("."))
        .unwrap_or_else(|_| "unknown".to_string())
}

fn current_time() -> DateTime<Utc> {
    #[cfg(test)]
    {
        if let Some(now) = NOW_OVERRIDE.lock().unwrap().as_ref() {
            return *now;
        }
    }
    Utc::now()
}

#[cfg(test)]
static NOW_OVERRIDE: std::sync::Mutex<Option<DateTime<Utc>>> = std::sync::Mutex::new(None);

#[cfg(test)]
pub fn set_mock_time(moment: Option<DateTime<Utc>>) {
    *NOW_OVERRIDE.lock().unwrap() = moment;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, KeyPair as RcgenKeyPair};

    fn self_signed(alg: &rcgen::SignatureAlgorithm) -> (Vec<u8>, Vec<u8>) {
        let key_pair = RcgenKeyPair::generate_for(alg).unwrap();
        let params = CertificateParams::new(vec!["example.com".to_string()]).unwrap();
        let cert = params.self_signed(&key_pair).unwrap();
        (cert.pem().into_bytes(), key_pair.serialize_pem().into_bytes())
    }

    #[test]
    fn valid_ecdsa_pair_validates() {
        let (cert, key) = self_signed(&rcgen::PKCS_ECDSA_P256_SHA256);
        let bundle = load_certificate_bundle("default/secret", &cert, &key).unwrap();
        assert_eq!(bundle.public_key_algorithm, "1.2.840.10045.2.1");
    }

    #[test]
    fn valid_ed25519_pair_validates() {
        let (cert, key) = self_signed(&rcgen::PKCS_ED25519);
        let bundle = load_certificate_bundle("default/secret", &cert, &key).unwrap();
        assert_eq!(bundle.public_key_algorithm, "1.3.101.112");
    }

    #[test]
    fn mismatched_key_is_rejected() {
        let (cert, _) = self_signed(&rcgen::PKCS_ECDSA_P256_SHA256);
        let (_, other_key) = self_signed(&rcgen::PKCS_ECDSA_P256_SHA256);
        let result = load_certificate_bundle("default/secret", &cert, &other_key);
        assert!(matches!(result, Err(TlsError::CertificateKeyMismatch { .. })));
    }

    #[test]
    fn expired_certificate_is_rejected() {
        let (cert, key) = self_signed(&rcgen::PKCS_ECDSA_P256_SHA256);
        set_mock_time(Some(Utc.with_ymd_and_hms(2999, 1, 1, 0, 0, 0).unwrap()));
        let result = load_certificate_bundle("default/secret", &cert, &key);
        set_mock_time(None);
        assert!(matches!(result, Err(TlsError::CertificateExpired { .. })));
    }

    #[test]
    fn empty_chain_is_rejected() {
        let result = load_certificate_bundle("default/secret", b"", b"");
        assert!(matches!(result, Err(TlsError::InvalidCertificatePem { .. })));
    }
}
