/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Per-IRI sidecar records: password hash, private key, arbitrary typed
//! metadata. Stored as compact JSON under the `__meta_data` sub-key, with
//! byte fields carried as base64.

use base64::engine::general_purpose::STANDARD as B64;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use fedi3_vocab::{Iri, PublicKey};

use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::errors::{RepoError, Result};
use crate::paths::{item_path, metadata_key};
use crate::repo::Repo;

mod b64_bytes {
    use super::B64;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        v: &Option<Vec<u8>>,
        s: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match v {
            Some(bytes) => s.serialize_str(&B64.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Option<Vec<u8>>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            None => Ok(None),
            Some(s) => B64
                .decode(s.as_bytes())
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, with = "b64_bytes", skip_serializing_if = "Option::is_none")]
    pub pw: Option<Vec<u8>>,
    #[serde(rename = "key", default, with = "b64_bytes", skip_serializing_if = "Option::is_none")]
    pub private_key: Option<Vec<u8>>,
}

/// A private key in one of the supported families.
#[derive(Debug, Clone)]
pub enum PrivateKey {
    Rsa(RsaPrivateKey),
    Ecdsa(p256::SecretKey),
    Ed25519(ed25519_dalek::SigningKey),
}

impl PrivateKey {
    /// PKCS#8 DER, PEM-wrapped as `PRIVATE KEY`.
    pub fn to_pkcs8_pem(&self) -> Result<String> {
        let pem = match self {
            PrivateKey::Rsa(k) => k.to_pkcs8_pem(LineEnding::LF).map_err(RepoError::encode)?,
            PrivateKey::Ecdsa(k) => k.to_pkcs8_pem(LineEnding::LF).map_err(RepoError::encode)?,
            PrivateKey::Ed25519(k) => {
                k.to_pkcs8_pem(LineEnding::LF).map_err(RepoError::encode)?
            }
        };
        Ok(pem.to_string())
    }

    /// The PKIX/SPKI PEM (`PUBLIC KEY`) of the matching public key.
    pub fn public_key_pem(&self) -> Result<String> {
        match self {
            PrivateKey::Rsa(k) => RsaPublicKey::from(k)
                .to_public_key_pem(LineEnding::LF)
                .map_err(RepoError::encode),
            PrivateKey::Ecdsa(k) => k
                .public_key()
                .to_public_key_pem(LineEnding::LF)
                .map_err(RepoError::encode),
            PrivateKey::Ed25519(k) => k
                .verifying_key()
                .to_public_key_pem(LineEnding::LF)
                .map_err(RepoError::encode),
        }
    }

    /// Parses a PKCS#8 PEM blob, trying each supported family in turn.
    pub fn from_pkcs8_pem(pem: &str) -> Result<PrivateKey> {
        if let Ok(k) = RsaPrivateKey::from_pkcs8_pem(pem) {
            return Ok(PrivateKey::Rsa(k));
        }
        if let Ok(k) = p256::SecretKey::from_pkcs8_pem(pem) {
            return Ok(PrivateKey::Ecdsa(k));
        }
        if let Ok(k) = ed25519_dalek::SigningKey::from_pkcs8_pem(pem) {
            return Ok(PrivateKey::Ed25519(k));
        }
        Err(RepoError::Decode("unsupported private key".into()))
    }
}

impl Repo {
    pub fn save_metadata<M: Serialize>(&self, iri: &Iri, m: &M) -> Result<()> {
        let path = self.metadata_path(iri)?;
        self.engine.update(|_, batch| {
            let raw = serde_json::to_vec(m).map_err(RepoError::encode)?;
            batch.insert(path.clone(), raw);
            Ok(())
        })
    }

    pub fn load_metadata<M: DeserializeOwned>(&self, iri: &Iri) -> Result<M> {
        let path = self.metadata_path(iri)?;
        self.engine.view(|tree| {
            let raw = tree.get(&path)?.ok_or_else(|| RepoError::not_found(&path))?;
            serde_json::from_slice(&raw).map_err(RepoError::decode)
        })
    }

    /// Replaces the stored password hash, preserving any other metadata.
    pub fn password_set(&self, iri: &Iri, pw: &[u8]) -> Result<()> {
        if pw.is_empty() {
            return Err(RepoError::InvalidArgument(
                "could not generate hash for empty pw".into(),
            ));
        }
        let path = self.metadata_path(iri)?;
        self.engine.update(|tree, batch| {
            let mut m = match tree.get(&path)? {
                Some(raw) => serde_json::from_slice::<Metadata>(&raw).map_err(RepoError::decode)?,
                None => Metadata::default(),
            };
            let hashed =
                bcrypt::hash(pw, bcrypt::DEFAULT_COST).map_err(RepoError::encode)?;
            m.pw = Some(hashed.into_bytes());
            let raw = serde_json::to_vec(&m).map_err(RepoError::encode)?;
            batch.insert(path.clone(), raw);
            Ok(())
        })
    }

    pub fn password_check(&self, iri: &Iri, pw: &[u8]) -> Result<()> {
        let m: Metadata = self.load_metadata(iri)?;
        let hashed = m
            .pw
            .ok_or_else(|| RepoError::Unauthorized("no password set".into()))?;
        let hashed = String::from_utf8(hashed)
            .map_err(|_| RepoError::Decode("stored pw hash is not utf-8".into()))?;
        let ok = bcrypt::verify(pw, &hashed)
            .map_err(|e| RepoError::Unauthorized(e.to_string()))?;
        if !ok {
            return Err(RepoError::Unauthorized("invalid pw".into()));
        }
        Ok(())
    }

    /// Stores the private key for the actor at `iri` and returns the public
    /// key descriptor to publish on it.
    pub fn save_key(&self, iri: &Iri, key: &PrivateKey) -> Result<PublicKey> {
        let mut m = match self.load_metadata::<Metadata>(iri) {
            Ok(m) => m,
            Err(RepoError::NotFound(_)) => Metadata::default(),
            Err(e) => return Err(e),
        };
        if m.private_key.is_some() {
            info!(iri = %iri, "actor already has a private key");
        }
        m.private_key = Some(key.to_pkcs8_pem()?.into_bytes());
        self.save_metadata(iri, &m)?;

        Ok(PublicKey {
            id: iri.with_fragment("main"),
            owner: iri.clone(),
            public_key_pem: key.public_key_pem()?,
        })
    }

    /// Loads the private key for the actor at `iri`.
    pub fn load_key(&self, iri: &Iri) -> Result<PrivateKey> {
        let m: Metadata = self.load_metadata(iri)?;
        let pem = m
            .private_key
            .ok_or_else(|| RepoError::NotFound(format!("no private key for {iri}")))?;
        let pem = String::from_utf8(pem)
            .map_err(|_| RepoError::Decode("stored key is not utf-8".into()))?;
        PrivateKey::from_pkcs8_pem(&pem)
    }

    fn metadata_path(&self, iri: &Iri) -> Result<Vec<u8>> {
        let p = item_path(iri);
        if p.is_empty() {
            return Err(RepoError::NotFound(iri.to_string()));
        }
        Ok(metadata_key(&p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{Config, Repo};

    fn mem_repo() -> Repo {
        let mut r = Repo::new(Config::default()).expect("new repo");
        r.open().expect("open");
        r
    }

    fn alice() -> Iri {
        Iri::new("https://example.com/actors/alice")
    }

    #[test]
    fn metadata_round_trip() {
        let r = mem_repo();
        let m = Metadata {
            pw: Some(b"hash".to_vec()),
            private_key: None,
        };
        r.save_metadata(&alice(), &m).expect("save");
        let back: Metadata = r.load_metadata(&alice()).expect("load");
        assert_eq!(back, m);
    }

    #[test]
    fn password_set_and_check() {
        let r = mem_repo();
        r.password_set(&alice(), b"hunter2").expect("set");
        r.password_check(&alice(), b"hunter2").expect("check");

        let err = r.password_check(&alice(), b"wrong");
        assert!(matches!(err, Err(RepoError::Unauthorized(_))));
    }

    #[test]
    fn empty_password_is_rejected() {
        let r = mem_repo();
        let err = r.password_set(&alice(), b"");
        assert!(matches!(err, Err(RepoError::InvalidArgument(_))));
    }

    #[test]
    fn password_check_without_metadata_is_not_found() {
        let r = mem_repo();
        let err = r.password_check(&alice(), b"pw");
        assert!(matches!(err, Err(RepoError::NotFound(_))));
    }

    #[test]
    fn ed25519_key_round_trip() {
        let r = mem_repo();
        let key = PrivateKey::Ed25519(ed25519_dalek::SigningKey::generate(
            &mut rand::rngs::OsRng,
        ));
        let public = r.save_key(&alice(), &key).expect("save key");
        assert_eq!(public.id.as_str(), "https://example.com/actors/alice#main");
        assert_eq!(public.owner, alice());
        assert!(public.public_key_pem.contains("BEGIN PUBLIC KEY"));

        let loaded = r.load_key(&alice()).expect("load key");
        assert!(matches!(loaded, PrivateKey::Ed25519(_)));
        assert_eq!(
            loaded.to_pkcs8_pem().expect("pem"),
            key.to_pkcs8_pem().expect("pem")
        );
    }

    #[test]
    fn rsa_key_round_trip() {
        let r = mem_repo();
        let generated = rsa::RsaPrivateKey::new(&mut rand::rngs::OsRng, 2048)
            .expect("generate rsa key");
        let key = PrivateKey::Rsa(generated);
        let public = r.save_key(&alice(), &key).expect("save key");
        assert!(public.public_key_pem.contains("BEGIN PUBLIC KEY"));

        let loaded = r.load_key(&alice()).expect("load key");
        assert!(matches!(loaded, PrivateKey::Rsa(_)));
    }

    #[test]
    fn ecdsa_key_round_trip() {
        let r = mem_repo();
        let key = PrivateKey::Ecdsa(p256::SecretKey::random(&mut rand::rngs::OsRng));
        let public = r.save_key(&alice(), &key).expect("save key");
        assert!(public.public_key_pem.contains("BEGIN PUBLIC KEY"));

        let loaded = r.load_key(&alice()).expect("load key");
        assert!(matches!(loaded, PrivateKey::Ecdsa(_)));
        assert_eq!(
            loaded.public_key_pem().expect("pem"),
            key.public_key_pem().expect("pem")
        );
    }

    #[test]
    fn password_survives_key_writes() {
        let r = mem_repo();
        r.password_set(&alice(), b"hunter2").expect("set pw");
        let key = PrivateKey::Ed25519(ed25519_dalek::SigningKey::generate(
            &mut rand::rngs::OsRng,
        ));
        r.save_key(&alice(), &key).expect("save key");
        r.password_check(&alice(), b"hunter2").expect("pw still valid");
    }
}
