//! Remediation target resolution.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::remediation::error::TargetError;

/// Namespace (or other resource name) the remediator acts on.
///
/// Validated as an RFC 1123 label since it is interpolated into API paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RemediationTarget(String);

impl RemediationTarget {
    pub fn new(name: impl Into<String>) -> Result<Self, TargetError> {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(TargetError::Empty);
        }
        if !is_dns_label(name) {
            return Err(TargetError::Invalid(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    /// Use `configured` if set, otherwise read the pod's own namespace from `namespace_path`.
    pub fn resolve(configured: &str, namespace_path: &Path) -> Result<Self, TargetError> {
        if !configured.trim().is_empty() {
            return Self::new(configured);
        }

        let contents = fs::read_to_string(namespace_path).map_err(|source| TargetError::Unresolved {
            path: namespace_path.to_path_buf(),
            source,
        })?;
        let target = Self::new(contents)?;
        tracing::info!(namespace = %target, path = ?namespace_path, "Resolved remediation target from service account");
        Ok(target)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemediationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_dns_label(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.len() > 63 {
        return false;
    }
    let valid_char = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-';
    let alnum = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();

    bytes.iter().all(valid_char)
        && bytes.first().is_some_and(alnum)
        && bytes.last().is_some_and(alnum)
}
