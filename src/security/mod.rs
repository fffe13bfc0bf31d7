// src/security/mod.rs
// Named policy boundary: file access, domain access, content analysis.
// The full policy engine lives outside this crate; this module defines the
// boundary every tool calls through, plus a small default implementation.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// A policy refusal. The `id` is a short opaque token the caller can pass to
/// the `security_override` tool to lift the block for this process.
#[derive(Debug, Clone)]
pub struct PolicyDenial {
    pub id: String,
    pub reason: String,
}

impl PolicyDenial {
    pub fn new(subject: &str, reason: impl Into<String>) -> Self {
        let mut hasher = DefaultHasher::new();
        subject.hash(&mut hasher);
        Self {
            id: format!("{:08x}", hasher.finish() as u32),
            reason: reason.into(),
        }
    }
}

/// Access policy consulted before touching files, domains, or content.
pub trait AccessPolicy: Send + Sync {
    fn check_file_access(&self, path: &Path) -> Result<(), PolicyDenial>;
    fn check_domain_access(&self, domain: &str) -> Result<(), PolicyDenial>;
    fn analyse_content(&self, content: &str) -> Result<(), PolicyDenial>;

    /// Lift a previously issued denial. Returns false if the id is unknown.
    fn apply_override(&self, id: &str) -> bool;
}

/// Path components that are never readable without an explicit override.
const DENIED_COMPONENTS: &[&str] = &[".ssh", ".gnupg", ".aws", ".kube"];

/// Default policy: absolute paths only, a small secret-directory deny set,
/// all domains allowed, content analysis is a no-op.
#[derive(Default)]
pub struct DefaultPolicy {
    /// denial id -> subject, so overrides can be validated
    issued: Mutex<HashMap<String, String>>,
    overridden: Mutex<HashMap<String, String>>,
}

impl DefaultPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    fn deny(&self, subject: &str, reason: String) -> PolicyDenial {
        let denial = PolicyDenial::new(subject, reason);
        if let Ok(mut issued) = self.issued.lock() {
            issued.insert(denial.id.clone(), subject.to_string());
        }
        denial
    }

    fn is_overridden(&self, subject: &str) -> bool {
        self.overridden
            .lock()
            .map(|o| o.values().any(|s| s == subject))
            .unwrap_or(false)
    }
}

impl AccessPolicy for DefaultPolicy {
    fn check_file_access(&self, path: &Path) -> Result<(), PolicyDenial> {
        if !path.is_absolute() {
            return Err(self.deny(
                &path.display().to_string(),
                format!("relative path not permitted: {}", path.display()),
            ));
        }
        let subject = path.display().to_string();
        if self.is_overridden(&subject) {
            return Ok(());
        }
        for component in path.components() {
            let name = component.as_os_str().to_string_lossy();
            if DENIED_COMPONENTS.contains(&name.as_ref()) {
                return Err(self.deny(
                    &subject,
                    format!("path contains protected component '{name}'"),
                ));
            }
        }
        Ok(())
    }

    fn check_domain_access(&self, domain: &str) -> Result<(), PolicyDenial> {
        debug!(domain = domain, "domain access check");
        Ok(())
    }

    fn analyse_content(&self, _content: &str) -> Result<(), PolicyDenial> {
        Ok(())
    }

    fn apply_override(&self, id: &str) -> bool {
        let subject = match self.issued.lock() {
            Ok(issued) => issued.get(id).cloned(),
            Err(_) => None,
        };
        match subject {
            Some(subject) => {
                if let Ok(mut overridden) = self.overridden.lock() {
                    overridden.insert(id.to_string(), subject);
                }
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_relative_path_denied() {
        let policy = DefaultPolicy::new();
        let err = policy
            .check_file_access(Path::new("relative/file.py"))
            .unwrap_err();
        assert!(err.reason.contains("relative"));
    }

    #[test]
    fn test_protected_component_denied() {
        let policy = DefaultPolicy::new();
        let err = policy
            .check_file_access(&PathBuf::from("/home/user/.ssh/id_rsa"))
            .unwrap_err();
        assert!(err.reason.contains(".ssh"));
        assert_eq!(err.id.len(), 8);
    }

    #[test]
    fn test_plain_absolute_path_allowed() {
        let policy = DefaultPolicy::new();
        assert!(policy.check_file_access(Path::new("/tmp/a.py")).is_ok());
    }

    #[test]
    fn test_override_lifts_denial() {
        let policy = DefaultPolicy::new();
        let path = PathBuf::from("/home/user/.ssh/known_hosts");
        let denial = policy.check_file_access(&path).unwrap_err();

        assert!(!policy.apply_override("ffffffff"), "unknown id must fail");
        assert!(policy.apply_override(&denial.id));
        assert!(policy.check_file_access(&path).is_ok());
    }

    #[test]
    fn test_domains_open_by_default() {
        let policy = DefaultPolicy::new();
        assert!(policy.check_domain_access("api.github.com").is_ok());
    }
}
