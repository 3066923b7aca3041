//! Capture configuration
//!
//! Loaded from a JSON file, every field optional:
//!
//! ```json
//! { "target": "console", "depth": 2, "members": ["log", "warn"] }
//! ```

use crate::capture::Interceptor;
use crate::error::CaptureError;
use crate::scope::{install, Installation, Scope};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Depth bound used when nothing else is configured.
pub const DEFAULT_DEPTH: u32 = 1;

/// Name of the object captured when nothing else is configured.
pub const DEFAULT_TARGET: &str = "console";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    /// Global name of the object to capture
    pub target: String,
    /// Initial depth bound for opaque objects
    pub depth: u32,
    /// Members to wrap; every own member when absent
    pub members: Option<Vec<String>>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            depth: DEFAULT_DEPTH,
            members: None,
        }
    }
}

impl CaptureConfig {
    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        let config: CaptureConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, CaptureError> {
        let json = std::fs::read_to_string(path).map_err(|source| CaptureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        tracing::debug!(
            path = %path.display(),
            target_name = %config.target,
            depth = config.depth,
            "configuration loaded"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), CaptureError> {
        if self.target.is_empty() {
            return Err(CaptureError::Config("target must not be empty".into()));
        }
        if let Some(members) = &self.members {
            if members.is_empty() {
                return Err(CaptureError::Config("members must not be empty".into()));
            }
        }
        Ok(())
    }

    /// An interceptor with a fresh session at the configured depth.
    pub fn interceptor(&self) -> Interceptor {
        Interceptor::new(self.depth)
    }

    /// Install a capture of the configured target from `global` into `page`.
    pub fn install(&self, global: &Scope, page: &mut Scope) -> Result<Installation, CaptureError> {
        self.install_with(&self.interceptor(), global, page)
    }

    /// Like [`CaptureConfig::install`], recording through `interceptor`.
    pub fn install_with(
        &self,
        interceptor: &Interceptor,
        global: &Scope,
        page: &mut Scope,
    ) -> Result<Installation, CaptureError> {
        let members: Option<Vec<&str>> = self
            .members
            .as_ref()
            .map(|names| names.iter().map(String::as_str).collect());
        install(global, page, &self.target, interceptor, members.as_deref())
    }
}
