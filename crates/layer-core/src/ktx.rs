//! KTX 1.1 container reader.
//!
//! Supports 2D textures and 2D texture arrays, with or without mip chains,
//! in 8-bit RGBA or one of the BC (S3TC / RGTC / BPTC) block formats. Cube
//! maps and volume textures are rejected.

use std::path::Path;

use thiserror::Error;

use crate::texture::{mip_extent, MipImage, TextureArray, TextureError};

pub const KTX11_IDENTIFIER: [u8; 12] = [
    0xAB, 0x4B, 0x54, 0x58, 0x20, 0x31, 0x31, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
];

/// Identifier plus thirteen `u32` fields.
pub const HEADER_LEN: usize = 64;

const ENDIANNESS_NATIVE: u32 = 0x0403_0201;
const ENDIANNESS_SWAPPED: u32 = 0x0102_0304;

const GL_UNSIGNED_BYTE: u32 = 0x1401;
const GL_RGBA: u32 = 0x1908;
const GL_RGBA8: u32 = 0x8058;
const GL_SRGB8_ALPHA8: u32 = 0x8C43;

#[derive(Debug, Error)]
pub enum KtxError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("file is {0} bytes, shorter than the 64-byte KTX header")]
    TooShort(usize),

    #[error("identifier does not match the KTX 1.1 identifier")]
    BadIdentifier,

    #[error("unknown endianness marker {0:#010x}")]
    BadEndianness(u32),

    #[error("unsupported texture target: {0}")]
    UnsupportedTarget(&'static str),

    #[error(
        "unsupported format (glType {gl_type:#x}, glFormat {gl_format:#x}, glInternalFormat {gl_internal_format:#x})"
    )]
    UnsupportedFormat {
        gl_type: u32,
        gl_format: u32,
        gl_internal_format: u32,
    },

    #[error("key/value data runs past the end of the file")]
    TruncatedKeyValue,

    #[error("mip level {level} is truncated: needs {needed} bytes, {available} available")]
    TruncatedLevel {
        level: u32,
        needed: usize,
        available: usize,
    },

    #[error("mip level {level} size {size} does not split evenly into {layers} layers")]
    UnevenLayers { level: u32, size: usize, layers: u32 },

    #[error("{0:?} is block-compressed and can only be uploaded to the GPU")]
    Compressed(KtxFormat),

    #[error(transparent)]
    Texture(#[from] TextureError),
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KtxHeader {
    pub endianness: u32,
    pub gl_type: u32,
    pub gl_type_size: u32,
    pub gl_format: u32,
    pub gl_internal_format: u32,
    pub gl_base_internal_format: u32,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub pixel_depth: u32,
    pub number_of_array_elements: u32,
    pub number_of_faces: u32,
    pub number_of_mipmap_levels: u32,
    pub bytes_of_key_value_data: u32,
}

impl KtxHeader {
    /// Decode the header. Returns whether the file's words are byte-swapped
    /// relative to little-endian.
    fn read(data: &[u8]) -> Result<(Self, bool), KtxError> {
        if data.len() < HEADER_LEN {
            return Err(KtxError::TooShort(data.len()));
        }
        if data[..12] != KTX11_IDENTIFIER {
            return Err(KtxError::BadIdentifier);
        }
        let swapped = match read_u32(data, 12, false) {
            ENDIANNESS_NATIVE => false,
            ENDIANNESS_SWAPPED => true,
            other => return Err(KtxError::BadEndianness(other)),
        };
        let word = |i: usize| read_u32(data, 12 + i * 4, swapped);
        let header = Self {
            endianness: ENDIANNESS_NATIVE,
            gl_type: word(1),
            gl_type_size: word(2),
            gl_format: word(3),
            gl_internal_format: word(4),
            gl_base_internal_format: word(5),
            pixel_width: word(6),
            pixel_height: word(7),
            pixel_depth: word(8),
            number_of_array_elements: word(9),
            number_of_faces: word(10),
            number_of_mipmap_levels: word(11),
            bytes_of_key_value_data: word(12),
        };
        Ok((header, swapped))
    }

    fn is_compressed(&self) -> bool {
        self.gl_type == 0 && self.gl_type_size == 1 && self.gl_format == 0
    }
}

fn read_u32(data: &[u8], offset: usize, swapped: bool) -> u32 {
    let bytes = [
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ];
    if swapped {
        u32::from_be_bytes(bytes)
    } else {
        u32::from_le_bytes(bytes)
    }
}

fn pad4(n: usize) -> usize {
    (n + 3) & !3
}

// ---------------------------------------------------------------------------
// Target and format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KtxTarget {
    D1,
    D2,
    D3,
}

impl KtxTarget {
    fn from_header(header: &KtxHeader) -> Self {
        if header.pixel_height == 0 {
            KtxTarget::D1
        } else if header.pixel_depth > 0 {
            KtxTarget::D3
        } else {
            KtxTarget::D2
        }
    }
}

/// Pixel formats this reader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KtxFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bc1RgbUnorm,
    Bc1RgbUnormSrgb,
    Bc1RgbaUnorm,
    Bc1RgbaUnormSrgb,
    Bc2Unorm,
    Bc2UnormSrgb,
    Bc3Unorm,
    Bc3UnormSrgb,
    Bc4Unorm,
    Bc4Snorm,
    Bc5Unorm,
    Bc5Snorm,
    Bc6hUfloat,
    Bc6hSfloat,
    Bc7Unorm,
    Bc7UnormSrgb,
}

impl KtxFormat {
    fn from_header(header: &KtxHeader) -> Result<Self, KtxError> {
        let unsupported = || KtxError::UnsupportedFormat {
            gl_type: header.gl_type,
            gl_format: header.gl_format,
            gl_internal_format: header.gl_internal_format,
        };

        if !header.is_compressed() {
            if header.gl_type != GL_UNSIGNED_BYTE || header.gl_format != GL_RGBA {
                return Err(unsupported());
            }
            return match header.gl_internal_format {
                GL_RGBA8 => Ok(KtxFormat::Rgba8Unorm),
                GL_SRGB8_ALPHA8 => Ok(KtxFormat::Rgba8UnormSrgb),
                _ => Err(unsupported()),
            };
        }

        let format = match header.gl_internal_format {
            // S3TC
            0x83F0 => KtxFormat::Bc1RgbUnorm,
            0x8C4C => KtxFormat::Bc1RgbUnormSrgb,
            0x83F1 => KtxFormat::Bc1RgbaUnorm,
            0x8C4D => KtxFormat::Bc1RgbaUnormSrgb,
            0x83F2 => KtxFormat::Bc2Unorm,
            0x8C4E => KtxFormat::Bc2UnormSrgb,
            0x83F3 => KtxFormat::Bc3Unorm,
            0x8C4F => KtxFormat::Bc3UnormSrgb,
            // RGTC
            0x8DBB => KtxFormat::Bc4Unorm,
            0x8DBC => KtxFormat::Bc4Snorm,
            0x8DBD => KtxFormat::Bc5Unorm,
            0x8DBE => KtxFormat::Bc5Snorm,
            // BPTC
            0x8E8F => KtxFormat::Bc6hUfloat,
            0x8E8E => KtxFormat::Bc6hSfloat,
            0x8E8C => KtxFormat::Bc7Unorm,
            0x8E8D => KtxFormat::Bc7UnormSrgb,
            _ => return Err(unsupported()),
        };
        Ok(format)
    }

    pub fn is_compressed(self) -> bool {
        !matches!(self, KtxFormat::Rgba8Unorm | KtxFormat::Rgba8UnormSrgb)
    }

    pub fn is_srgb(self) -> bool {
        matches!(
            self,
            KtxFormat::Rgba8UnormSrgb
                | KtxFormat::Bc1RgbUnormSrgb
                | KtxFormat::Bc1RgbaUnormSrgb
                | KtxFormat::Bc2UnormSrgb
                | KtxFormat::Bc3UnormSrgb
                | KtxFormat::Bc7UnormSrgb
        )
    }
}

// ---------------------------------------------------------------------------
// KtxFile
// ---------------------------------------------------------------------------

/// Location of one mip level inside [`KtxFile::data`]. `size` covers every
/// array layer of the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KtxLevel {
    pub offset: usize,
    pub size: usize,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct KtxFile {
    pub header: KtxHeader,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,
    pub layer_count: u32,
    pub faces: u32,
    pub target: KtxTarget,
    pub format: KtxFormat,
    pub key_values: Vec<(String, Vec<u8>)>,
    /// Level data with the `imageSize` words and padding stripped.
    pub data: Vec<u8>,
    pub levels: Vec<KtxLevel>,
}

impl KtxFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KtxError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| KtxError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file = Self::parse(&bytes)?;
        log::debug!(
            "loaded {}: {}x{} {:?}, {} layers, {} levels",
            path.display(),
            file.width,
            file.height,
            file.format,
            file.layer_count,
            file.mip_levels
        );
        Ok(file)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, KtxError> {
        let (header, swapped) = KtxHeader::read(bytes)?;

        let target = KtxTarget::from_header(&header);
        let faces = header.number_of_faces.max(1);
        if faces > 1 {
            return Err(KtxError::UnsupportedTarget("cube map"));
        }
        if target == KtxTarget::D3 {
            return Err(KtxError::UnsupportedTarget("3D texture"));
        }
        let format = KtxFormat::from_header(&header)?;

        let kv_end = HEADER_LEN + header.bytes_of_key_value_data as usize;
        if kv_end > bytes.len() {
            return Err(KtxError::TruncatedKeyValue);
        }
        let key_values = parse_key_values(&bytes[HEADER_LEN..kv_end], swapped)?;

        let width = header.pixel_width;
        let height = header.pixel_height.max(1);
        let mip_levels = header.number_of_mipmap_levels.max(1);
        let layer_count = header.number_of_array_elements.max(1);

        let mut data = Vec::new();
        // Every level costs at least its 4-byte size word.
        let max_levels = (bytes.len() - kv_end) / 4;
        let mut levels = Vec::with_capacity((mip_levels as usize).min(max_levels));
        let mut cursor = kv_end;
        for level in 0..mip_levels {
            let available = bytes.len().saturating_sub(cursor);
            if available < 4 {
                return Err(KtxError::TruncatedLevel {
                    level,
                    needed: 4,
                    available,
                });
            }
            let size = read_u32(bytes, cursor, swapped) as usize;
            cursor += 4;

            let available = bytes.len() - cursor;
            if size > available {
                return Err(KtxError::TruncatedLevel {
                    level,
                    needed: size,
                    available,
                });
            }
            if size % layer_count as usize != 0 {
                return Err(KtxError::UnevenLayers {
                    level,
                    size,
                    layers: layer_count,
                });
            }

            levels.push(KtxLevel {
                offset: data.len(),
                size,
                width: mip_extent(width, level),
                height: mip_extent(height, level),
            });
            data.extend_from_slice(&bytes[cursor..cursor + size]);
            cursor += pad4(size);
        }

        Ok(Self {
            header,
            width,
            height,
            depth: header.pixel_depth.max(1),
            mip_levels,
            layer_count,
            faces,
            target,
            format,
            key_values,
            data,
            levels,
        })
    }

    /// Bytes of one array layer of one mip level.
    pub fn layer_data(&self, level: u32, layer: u32) -> Option<&[u8]> {
        if layer >= self.layer_count {
            return None;
        }
        let info = self.levels.get(level as usize)?;
        let per_layer = info.size / self.layer_count as usize;
        let start = info.offset + per_layer * layer as usize;
        self.data.get(start..start + per_layer)
    }

    pub fn key_value(&self, key: &str) -> Option<&[u8]> {
        self.key_values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Decode into a CPU texture array, keeping every mip level.
    pub fn to_texture_array(&self) -> Result<TextureArray, KtxError> {
        if self.format.is_compressed() {
            return Err(KtxError::Compressed(self.format));
        }

        let base: Vec<&[u8]> = (0..self.layer_count)
            .map(|layer| self.layer_data(0, layer).unwrap_or_default())
            .collect();
        let mut array = TextureArray::from_rgba8_layers(self.width, self.height, &base)?;

        for (level, info) in self.levels.iter().enumerate().skip(1) {
            let images = (0..self.layer_count)
                .map(|layer| {
                    let bytes = self.layer_data(level as u32, layer).unwrap_or_default();
                    MipImage::from_rgba8(info.width, info.height, bytes).ok_or(
                        TextureError::DataLength {
                            layer: layer as usize,
                            expected: info.width as usize * info.height as usize * 4,
                            actual: bytes.len(),
                        },
                    )
                })
                .collect::<Result<Vec<_>, _>>()?;
            array.push_level(images)?;
        }
        Ok(array)
    }
}

fn parse_key_values(mut data: &[u8], swapped: bool) -> Result<Vec<(String, Vec<u8>)>, KtxError> {
    let mut out = Vec::new();
    while data.len() >= 4 {
        let len = read_u32(data, 0, swapped) as usize;
        let body = data.get(4..4 + len).ok_or(KtxError::TruncatedKeyValue)?;
        // Key is NUL-terminated UTF-8; the value is whatever follows.
        let split = body.iter().position(|&b| b == 0).unwrap_or(body.len());
        let key = String::from_utf8_lossy(&body[..split]).into_owned();
        let value = body.get(split + 1..).unwrap_or_default().to_vec();
        out.push((key, value));
        data = data.get(4 + pad4(len)..).unwrap_or_default();
    }
    Ok(out)
}

/// Serialize an uncompressed RGBA8 texture array as KTX 1.1. Used to produce
/// fixtures and by the viewer's `--dump` path.
pub fn write_rgba8(array: &TextureArray, srgb: bool) -> Vec<u8> {
    let layer_count = array.layer_count();
    let mut out = Vec::new();
    out.extend_from_slice(&KTX11_IDENTIFIER);
    let words = [
        ENDIANNESS_NATIVE,
        GL_UNSIGNED_BYTE,
        1,
        GL_RGBA,
        if srgb { GL_SRGB8_ALPHA8 } else { GL_RGBA8 },
        GL_RGBA,
        array.width(),
        array.height(),
        0,
        if layer_count > 1 { layer_count } else { 0 },
        1,
        array.mip_level_count(),
        0,
    ];
    for w in words {
        out.extend_from_slice(&w.to_le_bytes());
    }
    for level in 0..array.mip_level_count() {
        let mut level_bytes = Vec::new();
        for layer in 0..layer_count {
            if let Some(image) = array.level(layer, level) {
                level_bytes.extend(image.to_rgba8());
            }
        }
        out.extend_from_slice(&(level_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&level_bytes);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn header_words(words: [u32; 13]) -> Vec<u8> {
        let mut out = KTX11_IDENTIFIER.to_vec();
        for w in words {
            out.extend_from_slice(&w.to_le_bytes());
        }
        out
    }

    /// Header for a `w` x `h` RGBA8 texture with `layers` elements and
    /// `levels` mips, followed by nothing.
    fn rgba8_header(w: u32, h: u32, layers: u32, levels: u32, kv_len: u32) -> Vec<u8> {
        header_words([
            ENDIANNESS_NATIVE,
            GL_UNSIGNED_BYTE,
            1,
            GL_RGBA,
            GL_RGBA8,
            GL_RGBA,
            w,
            h,
            0,
            layers,
            1,
            levels,
            kv_len,
        ])
    }

    #[test]
    fn rejects_short_file() {
        assert!(matches!(
            KtxFile::parse(&[0u8; 10]),
            Err(KtxError::TooShort(10))
        ));
    }

    #[test]
    fn rejects_bad_identifier() {
        let mut bytes = rgba8_header(1, 1, 0, 1, 0);
        bytes[1] = b'X';
        assert!(matches!(KtxFile::parse(&bytes), Err(KtxError::BadIdentifier)));
    }

    #[test]
    fn rejects_bad_endianness() {
        let mut bytes = rgba8_header(1, 1, 0, 1, 0);
        bytes[12..16].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        assert!(matches!(
            KtxFile::parse(&bytes),
            Err(KtxError::BadEndianness(0xDEAD_BEEF))
        ));
    }

    #[test]
    fn rejects_cube_maps() {
        let mut bytes = rgba8_header(1, 1, 0, 1, 0);
        bytes[52..56].copy_from_slice(&6u32.to_le_bytes());
        assert!(matches!(
            KtxFile::parse(&bytes),
            Err(KtxError::UnsupportedTarget("cube map"))
        ));
    }

    #[test]
    fn rejects_uncompressed_non_rgba8() {
        let bytes = header_words([
            ENDIANNESS_NATIVE,
            0x1406, // GL_FLOAT
            4,
            GL_RGBA,
            0x8814, // GL_RGBA32F
            GL_RGBA,
            1,
            1,
            0,
            0,
            1,
            1,
            0,
        ]);
        assert!(matches!(
            KtxFile::parse(&bytes),
            Err(KtxError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn reports_truncated_level() {
        let mut bytes = rgba8_header(2, 2, 0, 1, 0);
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 8]);
        assert!(matches!(
            KtxFile::parse(&bytes),
            Err(KtxError::TruncatedLevel {
                level: 0,
                needed: 16,
                available: 8
            })
        ));
    }

    #[test]
    fn huge_level_count_is_truncation_not_allocation() {
        let bytes = rgba8_header(1, 1, 0, u32::MAX, 0);
        assert!(matches!(
            KtxFile::parse(&bytes),
            Err(KtxError::TruncatedLevel {
                level: 0,
                needed: 4,
                available: 0
            })
        ));
    }

    #[test]
    fn detects_compressed_formats() {
        let mut bytes = header_words([
            ENDIANNESS_NATIVE,
            0,
            1,
            0,
            0x8E8D,
            0x1908,
            4,
            4,
            0,
            2,
            1,
            1,
            0,
        ]);
        bytes.extend_from_slice(&32u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 32]);
        let file = KtxFile::parse(&bytes).unwrap();
        assert_eq!(file.format, KtxFormat::Bc7UnormSrgb);
        assert!(file.format.is_srgb());
        assert_eq!(file.layer_data(0, 1).map(<[u8]>::len), Some(16));
        assert!(matches!(
            file.to_texture_array(),
            Err(KtxError::Compressed(KtxFormat::Bc7UnormSrgb))
        ));
    }

    #[test]
    fn parses_key_values() {
        let mut kv = Vec::new();
        let entry = b"KTXorientation\0S=r,T=d\0";
        kv.extend_from_slice(&(entry.len() as u32).to_le_bytes());
        kv.extend_from_slice(entry);
        while kv.len() % 4 != 0 {
            kv.push(0);
        }
        let mut bytes = rgba8_header(1, 1, 0, 1, kv.len() as u32);
        bytes.extend_from_slice(&kv);
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&[1, 2, 3, 4]);

        let file = KtxFile::parse(&bytes).unwrap();
        assert_eq!(file.key_value("KTXorientation"), Some(&b"S=r,T=d\0"[..]));
        assert_eq!(file.layer_data(0, 0), Some(&[1u8, 2, 3, 4][..]));
    }

    #[test]
    fn reads_big_endian_files() {
        let mut bytes = KTX11_IDENTIFIER.to_vec();
        for w in [
            ENDIANNESS_NATIVE,
            GL_UNSIGNED_BYTE,
            1,
            GL_RGBA,
            GL_RGBA8,
            GL_RGBA,
            1,
            1,
            0,
            0,
            1,
            1,
            0,
        ] {
            bytes.extend_from_slice(&w.to_be_bytes());
        }
        bytes.extend_from_slice(&4u32.to_be_bytes());
        bytes.extend_from_slice(&[9, 8, 7, 6]);
        let file = KtxFile::parse(&bytes).unwrap();
        assert_eq!(file.width, 1);
        assert_eq!(file.layer_data(0, 0), Some(&[9u8, 8, 7, 6][..]));
    }

    #[test]
    fn one_dimensional_height_defaults_to_one() {
        let mut bytes = rgba8_header(2, 0, 0, 1, 0);
        bytes.extend_from_slice(&8u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 8]);
        let file = KtxFile::parse(&bytes).unwrap();
        assert_eq!(file.target, KtxTarget::D1);
        assert_eq!(file.height, 1);
    }

    #[test]
    fn written_array_reads_back_with_mips() {
        let colors = [
            Vec4::new(1.0, 0.0, 0.0, 1.0),
            Vec4::new(0.0, 1.0, 0.0, 1.0),
            Vec4::new(0.0, 0.0, 1.0, 1.0),
        ];
        let mut array = TextureArray::from_solid_layers(4, 2, &colors).unwrap();
        array.generate_mips();

        let file = KtxFile::parse(&write_rgba8(&array, false)).unwrap();
        assert_eq!(file.layer_count, 3);
        assert_eq!(file.mip_levels, 3);
        assert_eq!(file.levels[1].width, 2);
        assert_eq!(file.levels[2].height, 1);

        let decoded = file.to_texture_array().unwrap();
        assert_eq!(decoded, array);
    }
}
