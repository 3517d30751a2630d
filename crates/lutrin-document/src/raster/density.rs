// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Density hints embedded in image files.
//
// PNG carries pixels-per-unit in its pHYs chunk; JPEG carries dots per inch
// or per centimetre in the JFIF APP0 segment, and camera files often only in
// the EXIF XResolution tag. JFIF wins when both are present. Anything else,
// or a file that only records an aspect ratio, yields no hint.

use std::io::Cursor;

use tracing::debug;

const INCH_PER_METRE: f32 = 0.0254;
const CM_PER_INCH: f32 = 2.54;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Horizontal density in dots per inch, if the encoded image declares one.
pub fn read_density_hint(data: &[u8]) -> Option<f32> {
    let hint = if data.starts_with(&PNG_SIGNATURE) {
        png_density(data)
    } else if data.starts_with(&[0xFF, 0xD8]) {
        jpeg_density(data)
    } else {
        None
    };
    debug!(?hint, "Density hint read");
    hint.filter(|dpi| *dpi > 0.0)
}

fn png_density(data: &[u8]) -> Option<f32> {
    let reader = png::Decoder::new(Cursor::new(data)).read_info().ok()?;
    let dims = reader.info().pixel_dims?;
    match dims.unit {
        png::Unit::Meter => Some(dims.xppu as f32 * INCH_PER_METRE),
        png::Unit::Unspecified => None,
    }
}

fn jpeg_density(data: &[u8]) -> Option<f32> {
    let mut exif = None;
    for (marker, payload) in jpeg_segments(data) {
        match marker {
            0xE0 if payload.starts_with(b"JFIF\0") => {
                if let Some(dpi) = jfif_density(payload) {
                    return Some(dpi);
                }
            }
            0xE1 if exif.is_none() => {
                if let Some(tiff) = payload.strip_prefix(b"Exif\0\0") {
                    exif = exif_density(tiff);
                }
            }
            _ => {}
        }
    }
    exif
}

/// Marker segments after SOI, up to the start of scan.
fn jpeg_segments(data: &[u8]) -> impl Iterator<Item = (u8, &[u8])> {
    let mut pos = 2;
    std::iter::from_fn(move || {
        let header = data.get(pos..pos + 4)?;
        if header[0] != 0xFF || header[1] == 0xDA || header[1] == 0xD9 {
            return None;
        }
        let len = usize::from(u16::from_be_bytes([header[2], header[3]]));
        if len < 2 {
            return None;
        }
        let payload = data.get(pos + 4..pos + 2 + len)?;
        pos += 2 + len;
        Some((header[1], payload))
    })
}

fn jfif_density(payload: &[u8]) -> Option<f32> {
    let units = *payload.get(7)?;
    let x_density = f32::from(u16::from_be_bytes([*payload.get(8)?, *payload.get(9)?]));
    match units {
        1 => Some(x_density),
        2 => Some(x_density * CM_PER_INCH),
        _ => None,
    }
}

const TAG_X_RESOLUTION: u16 = 0x011A;
const TAG_RESOLUTION_UNIT: u16 = 0x0128;

/// XResolution from IFD0 of a TIFF-structured EXIF block. ResolutionUnit
/// defaults to inches; unit 3 is centimetres.
fn exif_density(tiff: &[u8]) -> Option<f32> {
    let big_endian = match tiff.get(0..4)? {
        b"MM\0*" => true,
        b"II*\0" => false,
        _ => return None,
    };
    let u16_at = |at: usize| -> Option<u16> {
        let b = tiff.get(at..at + 2)?;
        Some(if big_endian {
            u16::from_be_bytes([b[0], b[1]])
        } else {
            u16::from_le_bytes([b[0], b[1]])
        })
    };
    let u32_at = |at: usize| -> Option<u32> {
        let b = tiff.get(at..at + 4)?;
        Some(if big_endian {
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        } else {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        })
    };

    let ifd = u32_at(4)? as usize;
    let entries = usize::from(u16_at(ifd)?);
    let mut resolution = None;
    let mut unit = 2;
    for i in 0..entries {
        let entry = ifd + 2 + i * 12;
        match u16_at(entry)? {
            TAG_X_RESOLUTION => {
                let at = u32_at(entry + 8)? as usize;
                let (num, den) = (u32_at(at)?, u32_at(at + 4)?);
                if den > 0 {
                    resolution = Some(num as f32 / den as f32);
                }
            }
            TAG_RESOLUTION_UNIT => unit = u16_at(entry + 8)?,
            _ => {}
        }
    }
    match unit {
        2 => resolution,
        3 => resolution.map(|r| r * CM_PER_INCH),
        _ => None,
    }
}
