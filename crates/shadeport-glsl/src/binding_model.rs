//! Binding index arithmetic shared by sampler and storage-image declarations.
//!
//! Shader source addresses every resource by a logical slot. On profiles with an explicit binding
//! model the native index is `slot + TEXTURE_OFFSET`, where the offset is one constant for the
//! whole compilation unit (it lets several shader libraries share one binding space without
//! renumbering their slots). Other profiles emit no index and leave assignment to the linker.
//!
//! Storage images are the exception: image units have no implicit assignment in the native
//! dialect, so image declarations always carry `slot + TEXTURE_OFFSET`.

use crate::config::TranslationConfig;
use crate::error::{ConfigError, TranslateError};
use crate::profile::Capabilities;

/// `slot + texture_offset`, rejecting overflow instead of wrapping.
pub fn explicit_binding_index(slot: u32, texture_offset: u32) -> Result<u32, TranslateError> {
    slot.checked_add(texture_offset)
        .ok_or(TranslateError::BindingOverflow {
            slot,
            offset: texture_offset,
        })
}

/// Binding emitted for a sampled-texture declaration, or `None` when the profile defers slot
/// assignment to link time.
pub fn texture_binding(config: &TranslationConfig, slot: u32) -> Result<Option<u32>, TranslateError> {
    if !config.supports(Capabilities::EXPLICIT_BINDING) {
        return Ok(None);
    }
    let offset = config
        .texture_offset()
        .ok_or(ConfigError::MissingTextureOffset)?;
    explicit_binding_index(slot, offset).map(Some)
}

/// Binding emitted for a storage-image declaration.
pub fn image_binding(
    config: &TranslationConfig,
    slot: u32,
    operation: &'static str,
) -> Result<u32, TranslateError> {
    let offset = config
        .texture_offset()
        .ok_or(ConfigError::ImageBindingWithoutOffset { operation })?;
    explicit_binding_index(slot, offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileConfig;

    #[test]
    fn explicit_profile_adds_offset_to_every_slot() {
        for offset in [0, 1, 4, 16] {
            let config = ProfileConfig::desktop_explicit(offset).resolve().unwrap();
            for slot in 0..32 {
                assert_eq!(texture_binding(&config, slot), Ok(Some(slot + offset)));
            }
        }
    }

    #[test]
    fn implicit_profiles_emit_no_index() {
        let mobile = ProfileConfig::mobile().resolve().unwrap();
        let desktop = ProfileConfig::desktop().with_texture_offset(4).resolve().unwrap();
        for slot in [0, 3, 15] {
            assert_eq!(texture_binding(&mobile, slot), Ok(None));
            assert_eq!(texture_binding(&desktop, slot), Ok(None));
        }
    }

    #[test]
    fn overflowing_index_is_an_error() {
        let config = ProfileConfig::desktop_explicit(2).resolve().unwrap();
        assert_eq!(
            texture_binding(&config, u32::MAX),
            Err(TranslateError::BindingOverflow {
                slot: u32::MAX,
                offset: 2
            })
        );
    }

    #[test]
    fn images_need_an_offset_even_without_explicit_binding() {
        let with_offset = ProfileConfig::desktop().with_texture_offset(8).resolve().unwrap();
        assert_eq!(image_binding(&with_offset, 1, "texture2d_r"), Ok(9));

        let without = ProfileConfig::desktop().resolve().unwrap();
        assert_eq!(
            image_binding(&without, 1, "texture2d_w"),
            Err(TranslateError::Config(
                ConfigError::ImageBindingWithoutOffset {
                    operation: "texture2d_w"
                }
            ))
        );
    }
}
