use base64::Engine;

use crate::error::SyncError;

pub fn encode_base64(data: impl AsRef<[u8]>) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Decode base64 to raw bytes. Embedded whitespace is ignored, since
/// forges wrap long base64 payloads.
pub fn decode_base64_bytes(encoded: &str) -> Result<Vec<u8>, SyncError> {
    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();

    base64::engine::general_purpose::STANDARD
        .decode(&cleaned)
        .map_err(|e| SyncError::Parse(format!("base64 decode failed: {e}")))
}

/// Decode base64 to UTF-8 text.
pub fn decode_base64(encoded: &str) -> Result<String, SyncError> {
    let bytes = decode_base64_bytes(encoded)?;
    String::from_utf8(bytes).map_err(|e| SyncError::Parse(format!("invalid UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wrapped_base64() {
        let encoded = "aGVsbG8g\nd29ybGQ=\n";
        assert_eq!(decode_base64(encoded).unwrap(), "hello world");
    }

    #[test]
    fn encode_then_decode_text() {
        let text = "---\ntitle: Héllo\n---\nBody";
        assert_eq!(decode_base64(&encode_base64(text)).unwrap(), text);
    }

    #[test]
    fn empty_input_encodes_to_empty_string() {
        assert_eq!(encode_base64(""), "");
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(matches!(decode_base64("@@@"), Err(SyncError::Parse(_))));
    }

    #[test]
    fn rejects_non_utf8_text() {
        let encoded = encode_base64([0xff, 0xfe, 0x00]);
        assert!(decode_base64(&encoded).is_err());
        assert_eq!(decode_base64_bytes(&encoded).unwrap(), vec![0xff, 0xfe, 0x00]);
    }
}
