/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! OAuth2 credential storage: clients, authorization codes, access tokens
//! and refresh pointers, each in its own sub-tree under `oauth/`.
//!
//! `expires_in` is carried as an integer nanosecond duration and checked
//! against the wall clock on load.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::errors::{RepoError, Result};
use crate::paths::{
    oauth_key, oauth_prefix, ACCESS_BUCKET, AUTHORIZE_BUCKET, CLIENTS_BUCKET, REFRESH_BUCKET,
};
use crate::repo::Repo;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub secret: String,
    pub redirect_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Authorize {
    pub client: String,
    pub code: String,
    /// Nanoseconds.
    pub expires_in: i64,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default)]
    pub state: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
    #[serde(default)]
    pub code_challenge: String,
    #[serde(default)]
    pub code_challenge_method: String,
}

impl Authorize {
    pub fn expire_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::nanoseconds(self.expires_in)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Access {
    pub client: String,
    #[serde(default)]
    pub authorize: String,
    #[serde(default)]
    pub previous: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Nanoseconds.
    pub expires_in: i64,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub redirect_uri: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl Access {
    pub fn expire_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::nanoseconds(self.expires_in)
    }
}

/// Pointer record from a refresh token to its access token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Refresh {
    pub access: String,
}

/// An access record with its linked records resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessData {
    pub access: Access,
    pub client: Option<Client>,
    pub authorize: Option<Authorize>,
    /// The previous access record in a refresh chain; fetched without
    /// further dependency chasing.
    pub previous: Option<Box<Access>>,
}

/// An authorize record with its client resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorizeData {
    pub authorize: Authorize,
    pub client: Option<Client>,
}

impl Repo {
    // clients

    /// Upsert; `create_client` and `update_client` share semantics.
    pub fn update_client(&self, c: &Client) -> Result<()> {
        if c.id.is_empty() {
            return Err(RepoError::InvalidArgument("client has no id".into()));
        }
        self.put_record(&oauth_key(CLIENTS_BUCKET, &c.id), c)
    }

    pub fn create_client(&self, c: &Client) -> Result<()> {
        self.update_client(c)
    }

    pub fn get_client(&self, id: &str) -> Result<Client> {
        if id.is_empty() {
            return Err(RepoError::NotFound("empty client id".into()));
        }
        self.get_record(&oauth_key(CLIENTS_BUCKET, id))
    }

    pub fn list_clients(&self) -> Result<Vec<Client>> {
        self.engine.view(|tree| {
            let mut out = Vec::new();
            for entry in tree.scan_prefix(oauth_prefix(CLIENTS_BUCKET)) {
                let (k, v) = entry?;
                match serde_json::from_slice::<Client>(&v) {
                    Ok(c) => out.push(c),
                    Err(e) => {
                        warn!(key = %String::from_utf8_lossy(&k), error = %e, "skipping undecodable client")
                    }
                }
            }
            Ok(out)
        })
    }

    pub fn remove_client(&self, id: &str) -> Result<()> {
        self.remove_record(&oauth_key(CLIENTS_BUCKET, id))
    }

    // authorization codes

    pub fn save_authorize(&self, a: &Authorize) -> Result<()> {
        if a.code.is_empty() {
            return Err(RepoError::InvalidArgument("authorize has no code".into()));
        }
        self.put_record(&oauth_key(AUTHORIZE_BUCKET, &a.code), a)
    }

    /// Loads an authorization code, re-loading its client record whenever
    /// the stored record carries a non-empty client id. Fails `Expired`
    /// past `created_at + expires_in`.
    pub fn load_authorize(&self, code: &str) -> Result<AuthorizeData> {
        if code.is_empty() {
            return Err(RepoError::NotFound("empty authorize code".into()));
        }
        let authorize: Authorize = self.get_record(&oauth_key(AUTHORIZE_BUCKET, code))?;
        if authorize.expire_at() < Utc::now() {
            return Err(RepoError::Expired(authorize.expire_at()));
        }
        let client = self.chase_client(&authorize.client);
        Ok(AuthorizeData { authorize, client })
    }

    pub fn remove_authorize(&self, code: &str) -> Result<()> {
        self.remove_record(&oauth_key(AUTHORIZE_BUCKET, code))
    }

    // access tokens

    /// Stores an access record; a non-empty refresh token writes the
    /// refresh pointer in the same batch.
    pub fn save_access(&self, d: &Access) -> Result<()> {
        if d.client.is_empty() {
            return Err(RepoError::InvalidArgument("access has no client".into()));
        }
        if d.access_token.is_empty() {
            return Err(RepoError::InvalidArgument("access has no token".into()));
        }
        self.engine.update(|_, batch| {
            let raw = serde_json::to_vec(d).map_err(RepoError::encode)?;
            batch.insert(oauth_key(ACCESS_BUCKET, &d.access_token), raw);
            if !d.refresh_token.is_empty() {
                let pointer = Refresh {
                    access: d.access_token.clone(),
                };
                let raw = serde_json::to_vec(&pointer).map_err(RepoError::encode)?;
                batch.insert(oauth_key(REFRESH_BUCKET, &d.refresh_token), raw);
            }
            Ok(())
        })
    }

    /// Loads an access record and chases its linked client, authorize and
    /// previous-access records in the same view.
    pub fn load_access(&self, token: &str) -> Result<AccessData> {
        if token.is_empty() {
            return Err(RepoError::NotFound("empty access token".into()));
        }
        let access: Access = self.get_record(&oauth_key(ACCESS_BUCKET, token))?;
        if access.expire_at() < Utc::now() {
            return Err(RepoError::Expired(access.expire_at()));
        }

        let client = self.chase_client(&access.client);
        let authorize = if access.authorize.is_empty() {
            None
        } else {
            match self.get_record::<Authorize>(&oauth_key(AUTHORIZE_BUCKET, &access.authorize)) {
                Ok(a) => Some(a),
                Err(e) => {
                    warn!(code = %access.authorize, error = %e, "dangling authorize reference");
                    None
                }
            }
        };
        // second level fetched without dependency chasing to break cycles
        let previous = if access.previous.is_empty() {
            None
        } else {
            match self.get_record::<Access>(&oauth_key(ACCESS_BUCKET, &access.previous)) {
                Ok(a) => Some(Box::new(a)),
                Err(e) => {
                    warn!(token = %access.previous, error = %e, "dangling previous access");
                    None
                }
            }
        };

        Ok(AccessData {
            access,
            client,
            authorize,
            previous,
        })
    }

    pub fn remove_access(&self, token: &str) -> Result<()> {
        self.remove_record(&oauth_key(ACCESS_BUCKET, token))
    }

    // refresh tokens

    /// Reads the refresh pointer, then loads the access record it names.
    pub fn load_refresh(&self, token: &str) -> Result<AccessData> {
        if token.is_empty() {
            return Err(RepoError::NotFound("empty refresh token".into()));
        }
        let pointer: Refresh = self.get_record(&oauth_key(REFRESH_BUCKET, token))?;
        self.load_access(&pointer.access)
    }

    pub fn remove_refresh(&self, token: &str) -> Result<()> {
        self.remove_record(&oauth_key(REFRESH_BUCKET, token))
    }

    // plumbing shared by all four buckets

    fn chase_client(&self, id: &str) -> Option<Client> {
        if id.is_empty() {
            return None;
        }
        match self.get_client(id) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(client = id, error = %e, "dangling client reference");
                None
            }
        }
    }

    fn put_record<R: Serialize>(&self, key: &[u8], r: &R) -> Result<()> {
        self.engine.update(|_, batch| {
            let raw = serde_json::to_vec(r).map_err(RepoError::encode)?;
            batch.insert(key.to_vec(), raw);
            Ok(())
        })
    }

    fn get_record<R: DeserializeOwned>(&self, key: &[u8]) -> Result<R> {
        self.engine.view(|tree| {
            let raw = tree.get(key)?.ok_or_else(|| RepoError::not_found(key))?;
            serde_json::from_slice(&raw).map_err(RepoError::decode)
        })
    }

    fn remove_record(&self, key: &[u8]) -> Result<()> {
        self.engine.update(|_, batch| {
            batch.remove(key.to_vec());
            Ok(())
        })
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

    fn client(id: &str) -> Client {
        Client {
            id: id.to_string(),
            secret: "s3cret".to_string(),
            redirect_uri: "https://example.com/cb".to_string(),
            extra: None,
        }
    }

    const HOUR_NS: i64 = 3_600_000_000_000;

    #[test]
    fn client_upsert_and_list() {
        let r = mem_repo();
        r.create_client(&client("c1")).expect("create");
        r.create_client(&client("c2")).expect("create");

        let mut updated = client("c1");
        updated.secret = "rotated".to_string();
        r.update_client(&updated).expect("update");

        assert_eq!(r.get_client("c1").expect("get").secret, "rotated");
        assert_eq!(r.list_clients().expect("list").len(), 2);

        r.remove_client("c1").expect("remove");
        assert!(matches!(r.get_client("c1"), Err(RepoError::NotFound(_))));
    }

    #[test]
    fn missing_records_are_not_found() {
        let r = mem_repo();
        assert!(matches!(r.get_client(""), Err(RepoError::NotFound(_))));
        assert!(matches!(r.load_authorize("nope"), Err(RepoError::NotFound(_))));
        assert!(matches!(r.load_access("nope"), Err(RepoError::NotFound(_))));
        assert!(matches!(r.load_refresh("nope"), Err(RepoError::NotFound(_))));
    }

    #[test]
    fn authorize_round_trip_resolves_client() {
        let r = mem_repo();
        r.create_client(&client("c1")).expect("create client");
        let a = Authorize {
            client: "c1".to_string(),
            code: "a1".to_string(),
            expires_in: HOUR_NS,
            created_at: Utc::now(),
            ..Default::default()
        };
        r.save_authorize(&a).expect("save");

        let loaded = r.load_authorize("a1").expect("load");
        assert_eq!(loaded.authorize.code, "a1");
        assert_eq!(loaded.client.expect("client").id, "c1");
    }

    #[test]
    fn expired_authorize_is_reported() {
        let r = mem_repo();
        let a = Authorize {
            client: "c1".to_string(),
            code: "a1".to_string(),
            expires_in: HOUR_NS,
            created_at: Utc::now() - Duration::hours(2),
            ..Default::default()
        };
        r.save_authorize(&a).expect("save");
        assert!(matches!(r.load_authorize("a1"), Err(RepoError::Expired(_))));
    }

    #[test]
    fn access_round_trip_chases_links() {
        let r = mem_repo();
        r.create_client(&client("c1")).expect("create client");
        let a = Authorize {
            client: "c1".to_string(),
            code: "a1".to_string(),
            expires_in: HOUR_NS,
            created_at: Utc::now(),
            ..Default::default()
        };
        r.save_authorize(&a).expect("save authorize");

        let d = Access {
            client: "c1".to_string(),
            authorize: "a1".to_string(),
            access_token: "t1".to_string(),
            refresh_token: "r1".to_string(),
            expires_in: HOUR_NS,
            created_at: Utc::now(),
            ..Default::default()
        };
        r.save_access(&d).expect("save access");

        let loaded = r.load_access("t1").expect("load access");
        assert_eq!(loaded.access.access_token, "t1");
        assert_eq!(loaded.client.expect("client").id, "c1");
        assert_eq!(loaded.authorize.expect("authorize").code, "a1");

        let via_refresh = r.load_refresh("r1").expect("load refresh");
        assert_eq!(via_refresh.access.access_token, "t1");
    }

    #[test]
    fn save_access_requires_a_client() {
        let r = mem_repo();
        let d = Access {
            access_token: "t1".to_string(),
            expires_in: HOUR_NS,
            created_at: Utc::now(),
            ..Default::default()
        };
        assert!(matches!(r.save_access(&d), Err(RepoError::InvalidArgument(_))));
    }

    #[test]
    fn remove_access_and_refresh() {
        let r = mem_repo();
        r.create_client(&client("c1")).expect("create client");
        let d = Access {
            client: "c1".to_string(),
            access_token: "t1".to_string(),
            refresh_token: "r1".to_string(),
            expires_in: HOUR_NS,
            created_at: Utc::now(),
            ..Default::default()
        };
        r.save_access(&d).expect("save");

        r.remove_refresh("r1").expect("remove refresh");
        assert!(matches!(r.load_refresh("r1"), Err(RepoError::NotFound(_))));

        r.remove_access("t1").expect("remove access");
        assert!(matches!(r.load_access("t1"), Err(RepoError::NotFound(_))));
    }
}
