//! critic/plugin.rs
//! Plugin interface a critic must implement (spec §4.2), plus the
//! path-traversal guard plugin loaders are expected to apply before
//! resolving a critic module from disk.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{EjeError, EjeResult};
use crate::model::critic_output::{Priority, Verdict};

/// What a critic hands back before the runner stamps timing/retry metadata
/// onto it (spec §3.2).
#[derive(Debug, Clone)]
pub struct CriticVerdict {
    pub verdict: Verdict,
    pub confidence: f64,
    pub justification: String,
    pub weight: f64,
    pub priority: Option<Priority>,
    pub evidence_sources: Vec<crate::model::critic_output::EvidenceSource>,
    pub config_version: Option<String>,
}

/// A single ethical critic. Concrete critics are out-of-scope plugins
/// (spec §1); this trait is the seam between them and the runner.
#[async_trait]
pub trait Critic: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(&self, text: &str, context: &Value) -> EjeResult<CriticVerdict>;
}

/// Resolve a plugin module path and reject anything that would escape
/// `allowed_root` (spec §7 `PluginSecurityError`). Mirrors the contract
/// loaders elsewhere in the pack that never trust a caller-supplied path
/// without canonicalizing it first.
pub fn resolve_plugin_path(allowed_root: &Path, requested: &Path) -> EjeResult<PathBuf> {
    if requested
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(EjeError::PluginSecurity {
            path: requested.display().to_string(),
            allowed_root: allowed_root.display().to_string(),
        });
    }

    let candidate = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        allowed_root.join(requested)
    };

    if !candidate.starts_with(allowed_root) {
        return Err(EjeError::PluginSecurity {
            path: candidate.display().to_string(),
            allowed_root: allowed_root.display().to_string(),
        });
    }

    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_dir_traversal_rejected() {
        let root = Path::new("/opt/eje/critics");
        let requested = Path::new("../../etc/passwd");
        assert!(resolve_plugin_path(root, requested).is_err());
    }

    #[test]
    fn path_outside_root_rejected() {
        let root = Path::new("/opt/eje/critics");
        let requested = Path::new("/etc/passwd");
        assert!(resolve_plugin_path(root, requested).is_err());
    }

    #[test]
    fn relative_path_inside_root_accepted() {
        let root = Path::new("/opt/eje/critics");
        let requested = Path::new("safety.so");
        let resolved = resolve_plugin_path(root, requested).unwrap();
        assert_eq!(resolved, PathBuf::from("/opt/eje/critics/safety.so"));
    }
}
