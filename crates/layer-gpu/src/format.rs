use layer_core::ktx::KtxFormat;
use wgpu::TextureFormat;

/// KTX pixel format → wgpu texture format.
///
/// wgpu has no RGB-only BC1 variant; BC1 RGB data decodes identically as
/// BC1 RGBA with opaque alpha.
pub fn wgpu_format(format: KtxFormat) -> TextureFormat {
    match format {
        KtxFormat::Rgba8Unorm => TextureFormat::Rgba8Unorm,
        KtxFormat::Rgba8UnormSrgb => TextureFormat::Rgba8UnormSrgb,
        KtxFormat::Bc1RgbUnorm | KtxFormat::Bc1RgbaUnorm => TextureFormat::Bc1RgbaUnorm,
        KtxFormat::Bc1RgbUnormSrgb | KtxFormat::Bc1RgbaUnormSrgb => {
            TextureFormat::Bc1RgbaUnormSrgb
        }
        KtxFormat::Bc2Unorm => TextureFormat::Bc2RgbaUnorm,
        KtxFormat::Bc2UnormSrgb => TextureFormat::Bc2RgbaUnormSrgb,
        KtxFormat::Bc3Unorm => TextureFormat::Bc3RgbaUnorm,
        KtxFormat::Bc3UnormSrgb => TextureFormat::Bc3RgbaUnormSrgb,
        KtxFormat::Bc4Unorm => TextureFormat::Bc4RUnorm,
        KtxFormat::Bc4Snorm => TextureFormat::Bc4RSnorm,
        KtxFormat::Bc5Unorm => TextureFormat::Bc5RgUnorm,
        KtxFormat::Bc5Snorm => TextureFormat::Bc5RgSnorm,
        KtxFormat::Bc6hUfloat => TextureFormat::Bc6hRgbUfloat,
        KtxFormat::Bc6hSfloat => TextureFormat::Bc6hRgbFloat,
        KtxFormat::Bc7Unorm => TextureFormat::Bc7RgbaUnorm,
        KtxFormat::Bc7UnormSrgb => TextureFormat::Bc7RgbaUnormSrgb,
    }
}

/// Device features that must be enabled to create a texture of `format`.
pub fn required_features(format: TextureFormat) -> wgpu::Features {
    format.required_features()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba8_needs_no_features() {
        let format = wgpu_format(KtxFormat::Rgba8Unorm);
        assert_eq!(format, TextureFormat::Rgba8Unorm);
        assert!(required_features(format).is_empty());
    }

    #[test]
    fn bc_formats_need_bc_compression() {
        for ktx in [
            KtxFormat::Bc1RgbUnorm,
            KtxFormat::Bc3UnormSrgb,
            KtxFormat::Bc5Snorm,
            KtxFormat::Bc7Unorm,
        ] {
            let format = wgpu_format(ktx);
            assert!(
                required_features(format).contains(wgpu::Features::TEXTURE_COMPRESSION_BC),
                "{ktx:?}"
            );
        }
    }

    #[test]
    fn srgb_flag_survives_mapping() {
        assert!(wgpu_format(KtxFormat::Bc7UnormSrgb).is_srgb());
        assert!(wgpu_format(KtxFormat::Rgba8UnormSrgb).is_srgb());
        assert!(!wgpu_format(KtxFormat::Bc7Unorm).is_srgb());
    }
}
