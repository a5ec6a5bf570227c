//! Decoding of base64 image uploads, with or without a
//! `data:image/<type>;base64,` prefix.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::domain::error::DomainError;

const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("png", "png"),
    ("jpeg", "jpg"),
    ("jpg", "jpg"),
    ("gif", "gif"),
    ("webp", "webp"),
];

/// Raw image bytes plus the file extension derived from the declared MIME type
/// or, for bare payloads, from the file signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

fn invalid(message: impl Into<String>) -> DomainError {
    DomainError::validation("image", message)
}

pub fn decode_image(input: &str) -> Result<DecodedImage, DomainError> {
    let input = input.trim();
    let (declared, payload) = match input.strip_prefix("data:") {
        Some(rest) => {
            let (mime, payload) = rest
                .split_once(";base64,")
                .ok_or_else(|| invalid("expected a data:image/<type>;base64,<data> URI"))?;
            let subtype = mime
                .strip_prefix("image/")
                .ok_or_else(|| invalid(format!("unsupported media type '{mime}'")))?
                .to_ascii_lowercase();
            let ext = ALLOWED_TYPES
                .iter()
                .find(|(t, _)| *t == subtype)
                .map(|(_, ext)| *ext)
                .ok_or_else(|| invalid(format!("unsupported image type '{subtype}'")))?;
            (Some(ext), payload)
        }
        None => (None, input),
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| invalid(format!("invalid base64 payload: {e}")))?;
    if bytes.is_empty() {
        return Err(invalid("image is empty"));
    }

    let extension = match declared {
        Some(ext) => ext,
        None => sniff_extension(&bytes)
            .ok_or_else(|| invalid("cannot recognise the image format"))?,
    };
    Ok(DecodedImage { bytes, extension })
}

fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn decodes_png_data_uri() {
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(PNG_HEADER));
        let img = decode_image(&uri).unwrap();
        assert_eq!(img.extension, "png");
        assert_eq!(img.bytes, PNG_HEADER);
    }

    #[test]
    fn jpeg_maps_to_jpg_extension() {
        let uri = format!("data:image/JPEG;base64,{}", STANDARD.encode(b"abc"));
        assert_eq!(decode_image(&uri).unwrap().extension, "jpg");
    }

    #[test]
    fn bare_payload_is_sniffed() {
        let img = decode_image(&STANDARD.encode(PNG_HEADER)).unwrap();
        assert_eq!(img.extension, "png");

        let gif = decode_image(&STANDARD.encode(b"GIF89a....")).unwrap();
        assert_eq!(gif.extension, "gif");
    }

    #[test]
    fn rejects_bad_payloads() {
        assert!(matches!(
            decode_image("not an image"),
            Err(DomainError::Validation { .. })
        ));
        assert!(decode_image(&STANDARD.encode(b"plain text")).is_err());
        assert!(decode_image("data:image/png;base64,@@@").is_err());
        assert!(decode_image("data:image/png;base64,").is_err());
        assert!(decode_image("data:image/tiff;base64,YWJj").is_err());
        assert!(decode_image("data:text/plain;base64,YWJj").is_err());
    }
}
