//! MIME Type Detection Utilities
//!
//! Magic-byte sniffing for image buffers, content inference for encoded
//! audio (via the `infer` crate) and extension-based guessing for files.

use once_cell::sync::Lazy;
use regex::bytes::Regex;

/// Returned when no image signature matches.
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Returned when raw audio bytes carry no recognizable container.
pub const DEFAULT_AUDIO_MIME: &str = "audio/wav";

const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JXL_CONTAINER: &[u8] = &[
    0x00, 0x00, 0x00, 0x0C, 0x4A, 0x58, 0x4C, 0x20, 0x0D, 0x0A, 0x87, 0x0A,
];
const JP2_SIGNATURE: &[u8] = &[
    0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20, 0x0D, 0x0A, 0x87, 0x0A,
];

/// Only this many leading bytes are inspected by the SVG heuristic.
const SVG_SNIFF_WINDOW: usize = 512;

static SVG_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\A(?-u:\xEF\xBB\xBF)?\s*(?:<\?xml|<svg|<!doctype\s+svg)")
        .expect("static regex is valid")
});

/// Brand of an ISO-BMFF (`ftyp`) container.
fn ftyp_brand(bytes: &[u8]) -> Option<&[u8]> {
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        Some(&bytes[8..12])
    } else {
        None
    }
}

fn mime_for_brand(brand: &[u8]) -> Option<&'static str> {
    match brand {
        b"avif" | b"avis" => Some("image/avif"),
        b"heic" | b"heix" | b"hevc" | b"hevx" | b"heim" | b"heis" => Some("image/heic"),
        b"mif1" | b"msf1" | b"heif" => Some("image/heif"),
        _ => None,
    }
}

/// Sniff an image mime type from magic bytes.
///
/// Signatures are checked in priority order: JPEG, PNG, GIF, WebP, BMP, ICO,
/// TIFF (both byte orders), ISO-BMFF brands (AVIF/HEIC/HEIF), JPEG XL (raw
/// codestream and container), JPEG 2000, then a text heuristic for SVG/XML.
/// Falls back to [`DEFAULT_IMAGE_MIME`].
pub fn sniff_image_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }
    if bytes.starts_with(PNG_SIGNATURE) {
        return "image/png";
    }
    if bytes.starts_with(b"GIF8") {
        return "image/gif";
    }
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return "image/webp";
    }
    if bytes.starts_with(b"BM") {
        return "image/bmp";
    }
    if bytes.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
        return "image/x-icon";
    }
    if bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
    {
        return "image/tiff";
    }
    if let Some(mime) = ftyp_brand(bytes).and_then(mime_for_brand) {
        return mime;
    }
    if bytes.starts_with(&[0xFF, 0x0A]) || bytes.starts_with(JXL_CONTAINER) {
        return "image/jxl";
    }
    if bytes.starts_with(JP2_SIGNATURE) {
        return "image/jp2";
    }
    let window = &bytes[..bytes.len().min(SVG_SNIFF_WINDOW)];
    if SVG_PREFIX.is_match(window) {
        return "image/svg+xml";
    }
    DEFAULT_IMAGE_MIME
}

/// Mime type of already-encoded audio bytes.
///
/// Uses content inference when it recognizes an audio container, otherwise
/// assumes WAV.
pub fn guess_audio_mime(bytes: &[u8]) -> String {
    infer::get(bytes)
        .map(|kind| kind.mime_type())
        .filter(|mime| mime.starts_with("audio/"))
        .unwrap_or(DEFAULT_AUDIO_MIME)
        .to_string()
}

/// Guess MIME by file path (extension-based)
pub fn guess_mime_from_path(path: &std::path::Path) -> Option<String> {
    mime_guess::from_path(path)
        .first_raw()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_tail(prefix: &[u8]) -> Vec<u8> {
        let mut bytes = prefix.to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        bytes
    }

    #[test]
    fn sniffs_every_supported_signature() {
        let cases: Vec<(Vec<u8>, &str)> = vec![
            (with_tail(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg"),
            (with_tail(PNG_SIGNATURE), "image/png"),
            (with_tail(b"GIF89a"), "image/gif"),
            (with_tail(b"RIFF\x24\x00\x00\x00WEBPVP8 "), "image/webp"),
            (with_tail(b"BM"), "image/bmp"),
            (with_tail(&[0x00, 0x00, 0x01, 0x00]), "image/x-icon"),
            (with_tail(b"II*\x00"), "image/tiff"),
            (with_tail(b"MM\x00*"), "image/tiff"),
            (with_tail(b"\x00\x00\x00\x1Cftypavif"), "image/avif"),
            (with_tail(b"\x00\x00\x00\x18ftypheic"), "image/heic"),
            (with_tail(b"\x00\x00\x00\x18ftypmif1"), "image/heif"),
            (with_tail(&[0xFF, 0x0A]), "image/jxl"),
            (with_tail(JXL_CONTAINER), "image/jxl"),
            (with_tail(JP2_SIGNATURE), "image/jp2"),
            (b"<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>".to_vec(), "image/svg+xml"),
            (b"  <?xml version=\"1.0\"?><svg/>".to_vec(), "image/svg+xml"),
        ];
        for (bytes, expected) in cases {
            assert_eq!(sniff_image_mime(&bytes), expected, "bytes: {:02X?}", &bytes[..8]);
        }
    }

    #[test]
    fn unknown_bytes_default_to_png() {
        assert_eq!(sniff_image_mime(&[0x01, 0x02, 0x03, 0x04]), "image/png");
        assert_eq!(sniff_image_mime(&[]), "image/png");
        assert_eq!(sniff_image_mime(b"hello world"), "image/png");
    }

    #[test]
    fn unrelated_ftyp_brand_is_not_an_image() {
        // mp4 video brand
        assert_eq!(sniff_image_mime(&with_tail(b"\x00\x00\x00\x18ftypisom")), "image/png");
    }

    #[test]
    fn audio_defaults_to_wav() {
        assert_eq!(guess_audio_mime(&[0u8; 32]), "audio/wav");
        let mut mp3 = b"ID3".to_vec();
        mp3.extend_from_slice(&[0u8; 32]);
        assert_eq!(guess_audio_mime(&mp3), "audio/mpeg");
    }

    #[test]
    fn path_guess_uses_extension() {
        assert_eq!(
            guess_mime_from_path(std::path::Path::new("clip.mp3")).as_deref(),
            Some("audio/mpeg")
        );
        assert_eq!(guess_mime_from_path(std::path::Path::new("noext")), None);
    }
}
