//! Store operations.
//!
//! [`CredentialStore`] composes validation, encoding, the native API, the
//! ownership guard and decoding into the public read/write/delete/enumerate
//! surface. Every native buffer obtained here is released before the call
//! returns, on success and on failure.

use crate::account;
use crate::attributes::AttributeCodec;
use crate::encode::{validate_filter, validate_target, EncodeLimits, EncodedCredential};
use crate::error::{CredentialError, NativeCall, NativeStatus, Result};
use crate::handle::CredentialHandle;
use crate::native::{MemoryApi, NativeApi, WideString};
use credvault_core::config::StoreConfig;
use credvault_core::{
    AccountName, Credential, CredentialType, NetworkCredential, Persistence, SecretString,
};
use std::sync::Arc;
use tracing::{debug, info};

/// The current user's credential store.
///
/// Holds no locks and keeps no state between calls; concurrent callers are
/// serialized by the platform store itself.
#[derive(Clone)]
pub struct CredentialStore {
    api: Arc<dyn NativeApi>,
    config: StoreConfig,
    codec: AttributeCodec,
    limits: EncodeLimits,
}

impl CredentialStore {
    /// Create a store over any native API implementation.
    pub fn new(api: Arc<dyn NativeApi>, config: StoreConfig) -> Self {
        let codec = AttributeCodec::from_config(&config);
        let limits = EncodeLimits::from_config(&config);
        Self {
            api,
            config,
            codec,
            limits,
        }
    }

    /// Create a store over the platform credential manager.
    #[cfg(windows)]
    pub fn native(config: StoreConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(crate::native::WindowsApi::new()), config))
    }

    /// The platform credential manager is only available on Windows.
    #[cfg(not(windows))]
    pub fn native(_config: StoreConfig) -> Result<Self> {
        Err(CredentialError::Unsupported(format!(
            "no platform credential manager on {}",
            std::env::consts::OS
        )))
    }

    /// Create a store backed by process memory.
    pub fn in_memory(config: StoreConfig) -> Self {
        Self::new(Arc::new(MemoryApi::new()), config)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn codec(&self) -> &AttributeCodec {
        &self.codec
    }

    /// Persist `credential`, overwriting any record with the same target and
    /// type. Returns the credential as written.
    pub fn write(&self, credential: &Credential) -> Result<Credential> {
        let encoded = EncodedCredential::encode(credential, &self.codec, &self.limits)?;

        debug!(
            target_name = %credential.target_name,
            credential_type = %credential.credential_type,
            attributes = credential.attributes.len(),
            "writing credential"
        );
        self.api
            .write(&encoded)
            .map_err(|status| CredentialError::api(NativeCall::Write, status))?;
        drop(encoded);

        info!(target_name = %credential.target_name, "credential written");
        let mut written = credential.clone();
        written.flags = 0;
        written.target_alias = None;
        Ok(written)
    }

    /// Fetch the credential stored under `target_name`, or `None` if there
    /// is none.
    pub fn read(
        &self,
        target_name: &str,
        credential_type: CredentialType,
    ) -> Result<Option<Credential>> {
        validate_target(target_name)?;
        let target = WideString::new(target_name);

        let record = match self.api.read(&target, credential_type.code()) {
            Ok(record) => record,
            Err(NativeStatus::NotFound) => {
                debug!(target_name, "credential not found");
                return Ok(None);
            }
            Err(status) => return Err(CredentialError::api(NativeCall::Read, status)),
        };

        // SAFETY: the record was just returned by this API and is owned by nobody else.
        let handle = unsafe { CredentialHandle::single(self.api.as_ref(), record) }?;
        let credential = handle.decode_one(&self.codec)?;
        drop(handle);

        Ok(Some(credential))
    }

    /// Remove the credential stored under `target_name`.
    ///
    /// A missing target is an error carrying [`NativeStatus::NotFound`].
    pub fn delete(&self, target_name: &str, credential_type: CredentialType) -> Result<()> {
        validate_target(target_name)?;
        let target = WideString::new(target_name);

        self.api
            .delete(&target, credential_type.code())
            .map_err(|status| CredentialError::api(NativeCall::Delete, status))?;
        info!(target_name, "credential deleted");
        Ok(())
    }

    /// Remove the credential if it exists. Returns whether one was removed.
    pub fn delete_if_exists(
        &self,
        target_name: &str,
        credential_type: CredentialType,
    ) -> Result<bool> {
        match self.delete(target_name, credential_type) {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// List credentials whose target matches `filter`, or all of them.
    ///
    /// A trailing `*` in the filter matches any suffix. Returns `None` when
    /// nothing matches.
    pub fn enumerate(&self, filter: Option<&str>) -> Result<Option<Vec<Credential>>> {
        if let Some(filter) = filter {
            validate_filter(filter)?;
        }
        let filter = filter.map(WideString::new);

        let list = match self.api.enumerate(filter.as_ref()) {
            Ok(list) => list,
            Err(NativeStatus::NotFound) => return Ok(None),
            Err(status) => return Err(CredentialError::api(NativeCall::Enumerate, status)),
        };

        // SAFETY: the array was just returned by this API and is owned by nobody else.
        let handle = unsafe { CredentialHandle::array(self.api.as_ref(), list) }?;
        let credentials = handle.decode_all(&self.codec)?;
        drop(handle);

        debug!(count = credentials.len(), "enumerated credentials");
        Ok(Some(credentials))
    }

    /// Split an account name into user and domain.
    pub fn parse_account_name(&self, account: &str) -> Result<AccountName> {
        account::parse_account_name(self.api.as_ref(), account)
    }

    /// Reduce a credential to its user/secret/domain view.
    pub fn to_network(&self, credential: &Credential) -> Result<NetworkCredential> {
        let password = credential.secret.clone().unwrap_or_default();
        match credential.user_name.as_deref() {
            Some(user) if !user.is_empty() => {
                let account = self.parse_account_name(user)?;
                Ok(NetworkCredential::from_account(account, password))
            }
            _ => Ok(NetworkCredential::new("", password, "")),
        }
    }

    /// Store a user/secret/domain triple under `target_name`.
    pub fn save_network(
        &self,
        target_name: &str,
        network: &NetworkCredential,
        credential_type: CredentialType,
        persistence: Persistence,
    ) -> Result<Credential> {
        let mut credential = Credential::from_network(target_name, network);
        credential.credential_type = credential_type;
        credential.persistence = persistence;
        self.write(&credential)
    }

    /// Fetch the user/secret/domain view of a stored credential.
    pub fn get_network(
        &self,
        target_name: &str,
        credential_type: CredentialType,
    ) -> Result<Option<NetworkCredential>> {
        self.read(target_name, credential_type)?
            .map(|credential| self.to_network(&credential))
            .transpose()
    }

    /// Enumerate and reduce every match to its user/secret/domain view.
    pub fn enumerate_network(&self, filter: Option<&str>) -> Result<Option<Vec<NetworkCredential>>> {
        self.enumerate(filter)?
            .map(|credentials| {
                credentials
                    .iter()
                    .map(|credential| self.to_network(credential))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()
    }

    /// Fetch only the secret of a stored credential.
    pub fn read_secret(
        &self,
        target_name: &str,
        credential_type: CredentialType,
    ) -> Result<Option<SecretString>> {
        Ok(self
            .read(target_name, credential_type)?
            .and_then(|credential| credential.secret))
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("config", &self.config)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}
