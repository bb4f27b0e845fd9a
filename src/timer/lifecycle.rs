//! App foreground/background lifecycle

use std::fmt;

use serde::{Deserialize, Serialize};

/// Foreground state reported by the platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppLifecycle {
    #[default]
    Active,
    Inactive,
    Background,
}

impl AppLifecycle {
    /// True for states in which the countdown is not observable
    pub fn is_suspended(self) -> bool {
        matches!(self, AppLifecycle::Inactive | AppLifecycle::Background)
    }
}

impl fmt::Display for AppLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppLifecycle::Active => "active",
            AppLifecycle::Inactive => "inactive",
            AppLifecycle::Background => "background",
        };
        f.write_str(name)
    }
}
