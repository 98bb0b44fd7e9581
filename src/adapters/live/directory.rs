//! Live directory adapter backed by the synchronous `ldap3` client.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use ldap3::{LdapConn, LdapConnSettings, LdapError, LdapResult, SearchEntry, SearchResult};
use tracing::debug;

use crate::config::LdapConfig;
use crate::ports::directory::{Attributes, Directory, DirectoryEntry, DirectoryError, Scope};

const RC_SUCCESS: u32 = 0;
const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_ALREADY_EXISTS: u32 = 68;

/// A bound LDAP connection.
pub struct LdapDirectory {
    conn: Mutex<LdapConn>,
}

impl LdapDirectory {
    /// Opens a connection and performs a simple bind when a bind DN is set.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Other`] if the server is unreachable or
    /// rejects the credentials.
    pub fn connect(config: &LdapConfig) -> Result<Self, DirectoryError> {
        let settings =
            LdapConnSettings::new().set_conn_timeout(Duration::from_secs(config.timeout_secs));
        let mut conn = LdapConn::with_settings(settings, &config.url).map_err(other)?;

        if let Some(bind_dn) = &config.bind_dn {
            let password = config.password().unwrap_or_default();
            let result = conn.simple_bind(bind_dn, &password).map_err(other)?;
            check(result)?;
            debug!(url = %config.url, bind_dn = %bind_dn, "bound to directory");
        } else {
            debug!(url = %config.url, "using anonymous directory connection");
        }

        Ok(Self { conn: Mutex::new(conn) })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut LdapConn) -> Result<T, DirectoryError>,
    ) -> Result<T, DirectoryError> {
        let mut conn =
            self.conn.lock().map_err(|_| DirectoryError::Other("connection lock poisoned".into()))?;
        f(&mut conn)
    }
}

impl Directory for LdapDirectory {
    fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &str,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        self.with_conn(|conn| {
            let SearchResult(entries, result) =
                conn.search(base, ldap_scope(scope), filter, vec!["*"]).map_err(other)?;
            check(result)?;
            Ok(entries
                .into_iter()
                .map(|raw| {
                    let entry = SearchEntry::construct(raw);
                    DirectoryEntry { dn: entry.dn, attrs: entry.attrs.into_iter().collect() }
                })
                .collect())
        })
    }

    fn add(&self, dn: &str, attrs: &Attributes) -> Result<(), DirectoryError> {
        let attrs: Vec<(String, HashSet<String>)> = attrs
            .iter()
            .map(|(name, values)| (name.clone(), values.iter().cloned().collect()))
            .collect();
        self.with_conn(|conn| check(conn.add(dn, attrs).map_err(other)?))
    }

    fn delete(&self, dn: &str) -> Result<(), DirectoryError> {
        self.with_conn(|conn| check(conn.delete(dn).map_err(other)?))
    }
}

impl Drop for LdapDirectory {
    fn drop(&mut self) {
        if let Ok(conn) = self.conn.get_mut() {
            let _ = conn.unbind();
        }
    }
}

fn ldap_scope(scope: Scope) -> ldap3::Scope {
    match scope {
        Scope::Base => ldap3::Scope::Base,
        Scope::OneLevel => ldap3::Scope::OneLevel,
        Scope::Subtree => ldap3::Scope::Subtree,
    }
}

fn check(result: LdapResult) -> Result<(), DirectoryError> {
    match result.rc {
        RC_SUCCESS => Ok(()),
        RC_NO_SUCH_OBJECT => Err(DirectoryError::NoSuchObject),
        RC_ALREADY_EXISTS => Err(DirectoryError::AlreadyExists),
        rc => Err(DirectoryError::Other(format!("result code {rc}: {}", result.text))),
    }
}

#[allow(clippy::needless_pass_by_value)]
fn other(err: LdapError) -> DirectoryError {
    DirectoryError::Other(err.to_string())
}
