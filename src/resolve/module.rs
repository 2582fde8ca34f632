//! Module coordinates and declared settings

use crate::error::{KilnError, KilnResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coordinates of a published module (`org:name:rev[:classifier]`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleIdentity {
    pub organization: String,
    pub name: String,
    pub revision: String,
    /// Classifier or configuration tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
}

impl ModuleIdentity {
    /// Create a module identity without a classifier
    pub fn new(
        organization: impl Into<String>,
        name: impl Into<String>,
        revision: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            name: name.into(),
            revision: revision.into(),
            classifier: None,
        }
    }

    /// Attach a classifier
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }
}

impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.organization, self.name, self.revision)?;
        if let Some(ref classifier) = self.classifier {
            write!(f, ":{}", classifier)?;
        }
        Ok(())
    }
}

impl FromStr for ModuleIdentity {
    type Err = KilnError;

    fn from_str(s: &str) -> KilnResult<Self> {
        let invalid = |reason: &str| KilnError::InvalidModule {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.split(':').collect();
        if !(3..=4).contains(&parts.len()) {
            return Err(invalid("expected org:name:rev[:classifier]"));
        }
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid("empty coordinate"));
        }

        let mut module = Self::new(parts[0].trim(), parts[1].trim(), parts[2].trim());
        if let Some(classifier) = parts.get(3) {
            module.classifier = Some(classifier.trim().to_string());
        }
        Ok(module)
    }
}

/// Declared settings of a module handed to a resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSettings {
    /// Dependencies declared inline
    Inline { dependencies: Vec<ModuleIdentity> },
    /// Settings loaded from elsewhere (descriptor file, repository metadata)
    Other,
}

impl ModuleSettings {
    /// Declared dependencies, empty unless declared inline
    pub fn dependencies(&self) -> &[ModuleIdentity] {
        match self {
            Self::Inline { dependencies } => dependencies,
            Self::Other => &[],
        }
    }

    /// Dependency names for log output
    pub fn dependencies_display(&self) -> String {
        match self {
            Self::Inline { dependencies } => dependencies
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            Self::Other => "(declared externally)".to_string(),
        }
    }
}

/// A module together with its declared settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub identity: ModuleIdentity,
    pub settings: ModuleSettings,
}
