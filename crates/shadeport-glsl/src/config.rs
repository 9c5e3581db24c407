//! Profile selection.
//!
//! The build configuration supplies two independent switches (profile class and explicit binding
//! model) plus the `TEXTURE_OFFSET` constant. [`ProfileConfig::resolve`] turns them into one
//! immutable [`TranslationConfig`] that is handed to every translation call; nothing is read
//! from ambient state, so several profiles can be translated side by side in one process.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::profile::{Capabilities, TargetProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileClass {
    Mobile,
    #[default]
    Desktop,
}

impl fmt::Display for ProfileClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProfileClass::Mobile => "mobile",
            ProfileClass::Desktop => "desktop",
        })
    }
}

/// Raw configuration switches, as written in a JSON config file or passed on a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    pub class: ProfileClass,
    pub explicit_binding: bool,
    /// Additive base applied to every explicit binding index.
    pub texture_offset: Option<u32>,
}

impl ProfileConfig {
    pub fn mobile() -> Self {
        Self {
            class: ProfileClass::Mobile,
            explicit_binding: false,
            texture_offset: None,
        }
    }

    pub fn desktop() -> Self {
        Self {
            class: ProfileClass::Desktop,
            explicit_binding: false,
            texture_offset: None,
        }
    }

    pub fn desktop_explicit(texture_offset: u32) -> Self {
        Self {
            class: ProfileClass::Desktop,
            explicit_binding: true,
            texture_offset: Some(texture_offset),
        }
    }

    pub fn with_texture_offset(mut self, texture_offset: u32) -> Self {
        self.texture_offset = Some(texture_offset);
        self
    }

    /// Resolve the switches into the active profile.
    pub fn resolve(&self) -> Result<TranslationConfig, ConfigError> {
        let profile = match (self.class, self.explicit_binding) {
            (ProfileClass::Mobile, true) => {
                return Err(ConfigError::ExplicitBindingUnsupported { class: self.class })
            }
            (ProfileClass::Mobile, false) => TargetProfile::MobileConstrained,
            (ProfileClass::Desktop, true) => TargetProfile::DesktopExplicitBinding,
            (ProfileClass::Desktop, false) => TargetProfile::DesktopImplicitBinding,
        };

        if profile.supports(Capabilities::EXPLICIT_BINDING) && self.texture_offset.is_none() {
            return Err(ConfigError::MissingTextureOffset);
        }

        debug!(
            %profile,
            texture_offset = ?self.texture_offset,
            "resolved translation profile"
        );
        Ok(TranslationConfig {
            profile,
            texture_offset: self.texture_offset,
        })
    }
}

/// Immutable per-unit translation settings.
///
/// Only obtainable through [`ProfileConfig::resolve`], so an explicit-binding profile always has
/// a texture offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TranslationConfig {
    profile: TargetProfile,
    texture_offset: Option<u32>,
}

impl TranslationConfig {
    pub fn profile(&self) -> TargetProfile {
        self.profile
    }

    pub fn texture_offset(&self) -> Option<u32> {
        self.texture_offset
    }

    pub fn supports(&self, capability: Capabilities) -> bool {
        self.profile.supports(capability)
    }
}
