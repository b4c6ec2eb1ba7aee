use tracing::debug;

use super::key::KeyDeriver;
use crate::store::{DirectoryStore, StoreError};
use crate::types::{normalize_email, Member};

/// What a modification key grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// The key belongs to a stored member; their email is authoritative.
    Existing(Member),
    /// No member holds the key, but it was derived from the claimed email, so a
    /// new member bound to that email may be created.
    Provision { email: String },
}

impl Access {
    pub fn email(&self) -> &str {
        match self {
            Access::Existing(member) => &member.email,
            Access::Provision { email } => email,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("Invalid key")]
    Denied,

    #[error("Email cannot be changed via modify link")]
    EmailMismatch,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Decides what a key may touch. Keys are the only credential: there is no
/// session, expiry or revocation.
#[derive(Debug, Clone)]
pub struct AccessResolver {
    deriver: KeyDeriver,
}

impl AccessResolver {
    pub fn new(deriver: KeyDeriver) -> Self {
        Self { deriver }
    }

    pub fn deriver(&self) -> &KeyDeriver {
        &self.deriver
    }

    /// Scan the store for the key's owner, then apply [`AccessResolver::decide`].
    pub async fn resolve(
        &self,
        store: &dyn DirectoryStore,
        key: &str,
        claimed_email: Option<&str>,
    ) -> Result<Access, AccessError> {
        let found = store.find_by_key(&self.deriver, key).await?;
        self.decide(found, key, claimed_email)
    }

    /// Policy applied to the outcome of the key scan.
    pub fn decide(
        &self,
        found: Option<Member>,
        key: &str,
        claimed_email: Option<&str>,
    ) -> Result<Access, AccessError> {
        let claimed = claimed_email.map(normalize_email).filter(|e| !e.is_empty());

        match (found, claimed) {
            (Some(member), Some(claimed)) if claimed != member.email => {
                debug!(bound = %member.email, claimed = %claimed, "key holder tried to change email");
                Err(AccessError::EmailMismatch)
            }
            (Some(member), _) => Ok(Access::Existing(member)),
            (None, Some(claimed)) if self.deriver.matches(&claimed, key) => {
                Ok(Access::Provision { email: claimed })
            }
            (None, _) => Err(AccessError::Denied),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn resolver() -> AccessResolver {
        AccessResolver::new(KeyDeriver::new("test-secret").unwrap())
    }

    fn member(email: &str) -> Member {
        Member {
            name: "Ann".into(),
            law_firm: "Firm".into(),
            email: email.into(),
            phone: None,
            country: "PL".into(),
            groups: vec!["Tax".into()],
        }
    }

    #[test]
    fn denies_unknown_key_without_claimed_email() {
        let r = resolver();
        assert!(matches!(r.decide(None, "whatever1234", None), Err(AccessError::Denied)));
        assert!(matches!(r.decide(None, "whatever1234", Some("  ")), Err(AccessError::Denied)));
    }

    #[test]
    fn allows_provisioning_when_claimed_email_derives_the_key() {
        let r = resolver();
        let key = r.deriver().derive("new@firm.com");
        let access = r.decide(None, &key, Some(" New@Firm.com ")).unwrap();
        assert_eq!(access, Access::Provision { email: "new@firm.com".into() });
    }

    #[test]
    fn denies_provisioning_for_foreign_key() {
        let r = resolver();
        let key = r.deriver().derive("someone-else@firm.com");
        assert!(matches!(r.decide(None, &key, Some("new@firm.com")), Err(AccessError::Denied)));
    }

    #[test]
    fn existing_member_email_is_authoritative() {
        let r = resolver();
        let key = r.deriver().derive("ann@firm.com");

        let ok = r.decide(Some(member("ann@firm.com")), &key, Some("ANN@firm.com")).unwrap();
        assert_eq!(ok.email(), "ann@firm.com");

        let no_claim = r.decide(Some(member("ann@firm.com")), &key, None).unwrap();
        assert!(matches!(no_claim, Access::Existing(_)));

        let changed = r.decide(Some(member("ann@firm.com")), &key, Some("other@firm.com"));
        assert!(matches!(changed, Err(AccessError::EmailMismatch)));
    }

    #[tokio::test]
    async fn resolve_scans_store_for_key_owner() {
        let r = resolver();
        let store = MemoryStore::with_groups(["Tax"]);
        store.upsert_member(&member("ann@firm.com")).await.unwrap();
        store.upsert_member(&member("bob@firm.com")).await.unwrap();

        let key = r.deriver().derive("bob@firm.com");
        match r.resolve(&store, &key, None).await.unwrap() {
            Access::Existing(m) => assert_eq!(m.email, "bob@firm.com"),
            other => panic!("unexpected access {:?}", other),
        }

        assert!(matches!(r.resolve(&store, "not-a-key-00", None).await, Err(AccessError::Denied)));
    }
}
