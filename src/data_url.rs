// src/data_url.rs
// Images move between the browser and the transform client as
// `data:<mime>;base64,<payload>` strings.
use crate::errors::HeadshotError;
use base64::{Engine as _, engine::general_purpose};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUrl<'a> {
    pub mime_type: &'a str,
    pub payload: &'a str,
}

pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    )
}

pub fn parse(data_url: &str) -> Result<DataUrl<'_>, HeadshotError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| HeadshotError::Validation("Not a data URL".to_string()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| HeadshotError::Validation("Data URL has no payload".to_string()))?;

    let header = header.strip_suffix(";base64").ok_or_else(|| {
        HeadshotError::Validation("Only base64 data URLs are supported".to_string())
    })?;

    // Drop parameters such as `;name=selfie.jpg`.
    let mime_type = header.split(';').next().unwrap_or_default().trim();
    if mime_type.is_empty() {
        return Err(HeadshotError::Validation(
            "Data URL has no MIME type".to_string(),
        ));
    }

    Ok(DataUrl { mime_type, payload })
}

/// The base64 part of a data URL, as sent to the transform service.
pub fn payload(data_url: &str) -> Result<&str, HeadshotError> {
    parse(data_url).map(|parsed| parsed.payload)
}

pub fn decode(data_url: &str) -> Result<(String, Vec<u8>), HeadshotError> {
    let parsed = parse(data_url)?;
    let bytes = general_purpose::STANDARD
        .decode(parsed.payload)
        .map_err(|e| HeadshotError::Validation(format!("Invalid base64 payload: {}", e)))?;
    Ok((parsed.mime_type.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_with_mime_prefix() {
        assert_eq!(encode("image/jpeg", b"abc"), "data:image/jpeg;base64,YWJj");
    }

    #[test]
    fn payload_strips_prefix() {
        assert_eq!(payload("data:image/png;base64,iVBORw0K").unwrap(), "iVBORw0K");
    }

    #[test]
    fn parse_ignores_extra_parameters() {
        let parsed = parse("data:image/webp;name=a.webp;base64,AAAA").unwrap();
        assert_eq!(parsed.mime_type, "image/webp");
        assert_eq!(parsed.payload, "AAAA");
    }

    #[test]
    fn rejects_malformed_urls() {
        assert!(parse("https://example.com/a.png").is_err());
        assert!(parse("data:image/png;base64").is_err());
        assert!(parse("data:image/png,rawtext").is_err());
        assert!(parse("data:;base64,AAAA").is_err());
    }

    #[test]
    fn decode_reports_bad_base64() {
        let err = decode("data:image/png;base64,@@@").unwrap_err();
        assert!(err.to_string().starts_with("Invalid base64 payload"));
        assert_eq!(decode("data:image/gif;base64,YWJj").unwrap(), ("image/gif".to_string(), b"abc".to_vec()));
    }
}
