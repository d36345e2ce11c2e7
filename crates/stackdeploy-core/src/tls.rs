//! 自己署名証明書の生成
//!
//! サービス用のTLS証明書を生成し、パスワードなしのPKCS#12として書き出します。

use crate::error::{DeployError, Result};
use chrono::{Duration, Months, Utc};
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::extension::{ExtendedKeyUsage, KeyUsage};
use openssl::x509::{X509, X509NameBuilder};
use std::path::Path;

const RSA_BITS: u32 = 2048;

/// 証明書の有効期間（年）
pub const VALIDITY_YEARS: u32 = 25;

/// 生成した証明書
pub struct GeneratedCert {
    /// 秘密鍵付きPKCS#12（DER）
    pub pkcs12_der: Vec<u8>,
    /// 公開証明書（PEM）
    pub public_pem: String,
}

impl GeneratedCert {
    /// PKCS#12 をファイルに書き出す
    pub fn write_pkcs12(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.pkcs12_der).map_err(|e| DeployError::io(path, e))
    }
}

/// 証明書生成の抽象化（テストでは軽量な実装に差し替える）
pub trait CertificateIssuer: Send + Sync {
    fn issue(&self, common_name: &str) -> Result<GeneratedCert>;
}

/// OpenSSLによる自己署名証明書の生成
#[derive(Debug, Default, Clone, Copy)]
pub struct SelfSignedIssuer;

impl CertificateIssuer for SelfSignedIssuer {
    fn issue(&self, common_name: &str) -> Result<GeneratedCert> {
        generate_self_signed(common_name)
    }
}

/// RSA/SHA-256 の自己署名サーバー証明書を生成
pub fn generate_self_signed(common_name: &str) -> Result<GeneratedCert> {
    tracing::debug!(cn = common_name, "generating self-signed certificate");

    let rsa = Rsa::generate(RSA_BITS)?;
    let key = PKey::from_rsa(rsa)?;

    let mut name = X509NameBuilder::new()?;
    name.append_entry_by_nid(Nid::COMMONNAME, common_name)?;
    let name = name.build();

    let serial = {
        let mut bn = BigNum::new()?;
        bn.rand(128, MsbOption::MAYBE_ZERO, false)?;
        bn.to_asn1_integer()?
    };

    // 時計のずれを考慮して1分前から有効にする
    let now = Utc::now();
    let not_before = now - Duration::minutes(1);
    let not_after = now
        .checked_add_months(Months::new(12 * VALIDITY_YEARS))
        .unwrap_or_else(|| now + Duration::days(365 * i64::from(VALIDITY_YEARS)));
    let not_before = Asn1Time::from_unix(not_before.timestamp())?;
    let not_after = Asn1Time::from_unix(not_after.timestamp())?;

    let mut builder = X509::builder()?;
    builder.set_version(2)?;
    builder.set_serial_number(&serial)?;
    builder.set_subject_name(&name)?;
    builder.set_issuer_name(&name)?;
    builder.set_pubkey(&key)?;
    builder.set_not_before(&not_before)?;
    builder.set_not_after(&not_after)?;
    builder.append_extension(
        KeyUsage::new()
            .digital_signature()
            .key_encipherment()
            .data_encipherment()
            .build()?,
    )?;
    builder.append_extension(ExtendedKeyUsage::new().server_auth().build()?)?;
    builder.sign(&key, MessageDigest::sha256())?;
    let cert = builder.build();

    let pkcs12 = Pkcs12::builder()
        .name(common_name)
        .pkey(&key)
        .cert(&cert)
        .build2("")?;

    let public_pem = String::from_utf8_lossy(&cert.to_pem()?).into_owned();

    Ok(GeneratedCert {
        pkcs12_der: pkcs12.to_der()?,
        public_pem,
    })
}
