//! Multipart response writer for manifest replies.
//!
//! The Expo client expects a `multipart/mixed` document with a single JSON
//! part named `manifest` or `directive`, optionally carrying the signature
//! as a part header. The top-level content type is set explicitly with the
//! writer's boundary.

/// One-part multipart body with an explicit boundary.
pub struct MultipartBody {
    boundary: String,
    bytes: Vec<u8>,
}

impl MultipartBody {
    /// Build a single JSON part named `manifest` or `directive`.
    ///
    /// `signature` becomes an `expo-signature` part header when present.
    #[must_use]
    pub fn single_json_part(name: &str, body: &[u8], signature: Option<&str>) -> Self {
        let boundary = format!("expo-{}", uuid::Uuid::new_v4().simple());

        let mut bytes = Vec::with_capacity(body.len() + 256);
        bytes.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        bytes.extend_from_slice(b"Content-Type: application/json\r\n");
        bytes.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n").as_bytes(),
        );
        if let Some(signature) = signature {
            bytes.extend_from_slice(format!("expo-signature: {signature}\r\n").as_bytes());
        }
        bytes.extend_from_slice(b"\r\n");
        bytes.extend_from_slice(body);
        bytes.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Self { boundary, bytes }
    }

    /// Top-level `Content-Type` header value, `multipart/mixed` with the
    /// writer's boundary.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/mixed; boundary={}", self.boundary)
    }

    /// Consume into the framed body bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_a_directive_part() {
        let body = br#"{"type":"noUpdateAvailable"}"#;
        let multipart = MultipartBody::single_json_part("directive", body, None);
        let content_type = multipart.content_type();
        assert!(content_type.starts_with("multipart/mixed; boundary=expo-"));

        let boundary = content_type.rsplit_once('=').unwrap().1.to_string();
        let text = String::from_utf8(multipart.into_bytes()).unwrap();

        assert!(text.starts_with(&format!("--{boundary}\r\n")));
        assert!(text.contains("Content-Type: application/json\r\n"));
        assert!(text.contains("Content-Disposition: form-data; name=\"directive\"\r\n"));
        assert!(!text.contains("expo-signature"));
        assert!(text.contains("\r\n\r\n{\"type\":\"noUpdateAvailable\"}\r\n"));
        assert!(text.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn signature_lands_in_the_part_headers() {
        let multipart = MultipartBody::single_json_part(
            "manifest",
            b"{}",
            Some(r#"sig="abc+/=", keyid="main""#),
        );
        let text = String::from_utf8(multipart.into_bytes()).unwrap();

        let header_block = text.split("\r\n\r\n").next().unwrap();
        assert!(header_block.contains(r#"expo-signature: sig="abc+/=", keyid="main""#));
    }

    #[test]
    fn boundaries_are_unique_per_reply() {
        let a = MultipartBody::single_json_part("manifest", b"{}", None);
        let b = MultipartBody::single_json_part("manifest", b"{}", None);
        assert_ne!(a.content_type(), b.content_type());
    }
}
