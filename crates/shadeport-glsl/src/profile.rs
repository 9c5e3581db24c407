//! Target profiles and the native capabilities each one can express.
//!
//! A profile is fixed once per compilation unit. Every translator consults the capability set
//! rather than the profile name, so adding a profile only means filling in its row here.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Native features a profile can express.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// `layout(binding = N)` on sampler declarations.
        const EXPLICIT_BINDING = 1 << 0;
        /// `sampler2DMS` declarations and `texelFetch` with a sample index.
        const MULTISAMPLE_TEXTURES = 1 << 1;
        /// `samplerCubeArray` declarations and sampling.
        const CUBE_ARRAY_TEXTURES = 1 << 2;
        /// `image2D` storage images accessed with `imageLoad`/`imageStore`.
        const COMPUTE_IMAGES = 1 << 3;
        /// The source must open with default precision qualifiers.
        const PRECISION_QUALIFIERS = 1 << 4;
    }
}

impl Capabilities {
    /// Capabilities that can never be combined with [`Capabilities::PRECISION_QUALIFIERS`].
    ///
    /// Precision qualifiers mark the mobile-constrained dialect, which has no multisample reads,
    /// no cube arrays, no storage images and no explicit sampler bindings.
    pub const DESKTOP_ONLY: Capabilities = Capabilities::EXPLICIT_BINDING
        .union(Capabilities::MULTISAMPLE_TEXTURES)
        .union(Capabilities::CUBE_ARRAY_TEXTURES)
        .union(Capabilities::COMPUTE_IMAGES);

    /// Human readable name of a single capability flag, used in error messages.
    pub fn describe(self) -> &'static str {
        if self == Capabilities::EXPLICIT_BINDING {
            "explicit binding points"
        } else if self == Capabilities::MULTISAMPLE_TEXTURES {
            "multisample textures"
        } else if self == Capabilities::CUBE_ARRAY_TEXTURES {
            "cube-array textures"
        } else if self == Capabilities::COMPUTE_IMAGES {
            "compute storage images"
        } else if self == Capabilities::PRECISION_QUALIFIERS {
            "precision qualifiers"
        } else {
            "a combination of capabilities"
        }
    }
}

const MOBILE_PRECISION_DIRECTIVES: &[&str] =
    &["precision highp float;", "precision highp sampler2DArray;"];

/// Active translation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetProfile {
    /// Mobile-class dialect: precision qualifiers required, no desktop-only resources.
    MobileConstrained,
    /// Desktop dialect where every sampler declaration carries `slot + TEXTURE_OFFSET`.
    DesktopExplicitBinding,
    /// Desktop dialect where sampler slots are assigned at link time.
    DesktopImplicitBinding,
}

impl TargetProfile {
    pub const ALL: [TargetProfile; 3] = [
        TargetProfile::MobileConstrained,
        TargetProfile::DesktopExplicitBinding,
        TargetProfile::DesktopImplicitBinding,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TargetProfile::MobileConstrained => "mobile-constrained",
            TargetProfile::DesktopExplicitBinding => "desktop-explicit-binding",
            TargetProfile::DesktopImplicitBinding => "desktop-implicit-binding",
        }
    }

    pub fn capabilities(self) -> Capabilities {
        match self {
            TargetProfile::MobileConstrained => Capabilities::PRECISION_QUALIFIERS,
            TargetProfile::DesktopExplicitBinding => Capabilities::DESKTOP_ONLY,
            TargetProfile::DesktopImplicitBinding => {
                Capabilities::DESKTOP_ONLY.difference(Capabilities::EXPLICIT_BINDING)
            }
        }
    }

    pub fn supports(self, capability: Capabilities) -> bool {
        self.capabilities().contains(capability)
    }

    /// Default precision declarations that must open every source for this profile.
    pub fn precision_directives(self) -> &'static [&'static str] {
        if self.supports(Capabilities::PRECISION_QUALIFIERS) {
            MOBILE_PRECISION_DIRECTIVES
        } else {
            &[]
        }
    }

    pub fn clip_space(self) -> ClipSpaceConvention {
        match self {
            TargetProfile::MobileConstrained
            | TargetProfile::DesktopExplicitBinding
            | TargetProfile::DesktopImplicitBinding => ClipSpaceConvention::GL,
        }
    }
}

impl fmt::Display for TargetProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Depth range of a profile's native clip space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthRange {
    /// `[-1, 1]`
    Symmetric,
    /// `[0, 1]`
    ZeroToOne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipSpaceConvention {
    pub depth_range: DepthRange,
}

impl ClipSpaceConvention {
    /// Symmetric clip-space depth; NDC x/y are used as-is for ray reconstruction.
    pub const GL: ClipSpaceConvention = ClipSpaceConvention {
        depth_range: DepthRange::Symmetric,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mobile_profile_never_carries_desktop_capabilities() {
        for profile in TargetProfile::ALL {
            let caps = profile.capabilities();
            if caps.contains(Capabilities::PRECISION_QUALIFIERS) {
                assert!(
                    !caps.intersects(Capabilities::DESKTOP_ONLY),
                    "{profile} mixes precision qualifiers with {caps:?}"
                );
            }
        }
    }

    #[test]
    fn only_explicit_profile_emits_binding_points() {
        assert!(TargetProfile::DesktopExplicitBinding.supports(Capabilities::EXPLICIT_BINDING));
        assert!(!TargetProfile::DesktopImplicitBinding.supports(Capabilities::EXPLICIT_BINDING));
        assert!(!TargetProfile::MobileConstrained.supports(Capabilities::EXPLICIT_BINDING));
    }

    #[test]
    fn precision_directives_only_on_mobile() {
        assert_eq!(
            TargetProfile::MobileConstrained.precision_directives(),
            ["precision highp float;", "precision highp sampler2DArray;"]
        );
        assert!(TargetProfile::DesktopExplicitBinding
            .precision_directives()
            .is_empty());
        assert!(TargetProfile::DesktopImplicitBinding
            .precision_directives()
            .is_empty());
    }

    #[test]
    fn all_current_profiles_use_symmetric_depth() {
        for profile in TargetProfile::ALL {
            assert_eq!(profile.clip_space().depth_range, DepthRange::Symmetric);
        }
    }
}
