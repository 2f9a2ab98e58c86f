use crate::{
    Result,
    constants::{CARD_FRAME_LEN, CARD_ID_LEN, CARD_ID_OFFSET, MAX_PATH_LEN},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Card identifier (6 printable ASCII characters)
///
/// This is the payload of a card event: it is copied out of a reader frame,
/// moved through the card channel by value and consumed exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardId([u8; CARD_ID_LEN]);

impl CardId {
    /// Create a card identifier from raw bytes.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardId` if the input is not exactly 6 printable
    /// ASCII characters. Space counts as non-printable here: the identifier
    /// is placed verbatim in the request path.
    pub fn new(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; CARD_ID_LEN] = bytes.try_into().map_err(|_| {
            Error::InvalidCardId(format!(
                "expected {CARD_ID_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;

        if !raw.iter().all(u8::is_ascii_graphic) {
            return Err(Error::InvalidCardId(format!(
                "non-printable or space bytes in {raw:02X?}"
            )));
        }

        Ok(CardId(raw))
    }

    /// Extract the identifier from a complete reader frame.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardFrame` if the frame is not exactly 12 bytes,
    /// or `Error::InvalidCardId` if the identifier field is not printable.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardlink_core::CardId;
    ///
    /// let id = CardId::from_frame(b"XXXXABCDEF12").unwrap();
    /// assert_eq!(id.as_str(), "ABCDEF");
    /// ```
    pub fn from_frame(frame: &[u8]) -> Result<Self> {
        if frame.len() != CARD_FRAME_LEN {
            return Err(Error::InvalidCardFrame(format!(
                "expected {CARD_FRAME_LEN} bytes, got {}",
                frame.len()
            )));
        }
        Self::new(&frame[CARD_ID_OFFSET..CARD_ID_OFFSET + CARD_ID_LEN])
    }

    /// Raw identifier bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; CARD_ID_LEN] {
        &self.0
    }

    /// Identifier as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Constructors only accept printable ASCII.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CardId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CardId::new(s.as_bytes())
    }
}

/// Request path sent to the validation server: `<base-path><card-id>`.
///
/// The modem firmware receives the path as a NUL-terminated string, so the
/// wire length is the text length plus one and must fit in `MAX_PATH_LEN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpPath(String);

impl HttpPath {
    /// Build the request path for a card.
    ///
    /// # Errors
    /// Returns `Error::PathTooLong` if the terminated path exceeds `MAX_PATH_LEN`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardlink_core::{CardId, HttpPath};
    ///
    /// let card: CardId = "1A2643".parse().unwrap();
    /// let path = HttpPath::new("/cards/", &card).unwrap();
    /// assert_eq!(path.as_str(), "/cards/1A2643");
    /// assert_eq!(path.wire_len(), "/cards/".len() + 6 + 1);
    /// ```
    pub fn new(base_path: &str, card: &CardId) -> Result<Self> {
        let wire_len = Self::wire_len_for(base_path);
        if wire_len > MAX_PATH_LEN {
            return Err(Error::PathTooLong {
                len: wire_len,
                max: MAX_PATH_LEN,
            });
        }

        let mut path = String::with_capacity(wire_len);
        path.push_str(base_path);
        path.push_str(card.as_str());
        Ok(HttpPath(path))
    }

    /// Wire length of a path built on `base_path`, terminator included.
    #[must_use]
    pub fn wire_len_for(base_path: &str) -> usize {
        base_path.len() + CARD_ID_LEN + 1
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length on the wire, terminator included.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        self.0.len() + 1
    }
}

impl fmt::Display for HttpPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"XXXXABCDEF12", "ABCDEF")]
    #[case(b"0F001A26430B", "1A2643")]
    #[case(b"____123456__", "123456")]
    fn test_card_id_from_frame(#[case] frame: &[u8], #[case] expected: &str) {
        let id = CardId::from_frame(frame).unwrap();
        assert_eq!(id.as_str(), expected);
        assert_eq!(id.to_string(), expected);
    }

    #[rstest]
    #[case(b"XXXXABCDEF1")] // too short
    #[case(b"XXXXABCDEF123")] // too long
    #[case(b"")]
    fn test_card_id_from_frame_wrong_length(#[case] frame: &[u8]) {
        let result = CardId::from_frame(frame);
        assert!(matches!(result, Err(Error::InvalidCardFrame(_))));
    }

    #[test]
    fn test_card_id_rejects_control_bytes() {
        let result = CardId::from_frame(b"XXXXAB\rDEF12");
        assert!(matches!(result, Err(Error::InvalidCardId(_))));
    }

    #[rstest]
    #[case("ABCDE")]
    #[case("ABCDEFG")]
    #[case("ABC DE")]
    fn test_card_id_parse_invalid(#[case] input: &str) {
        assert!(input.parse::<CardId>().is_err());
    }

    #[test]
    fn test_http_path_concatenates_base_and_card() {
        let card: CardId = "ABCDEF".parse().unwrap();
        let path = HttpPath::new("/api/cards/", &card).unwrap();
        assert_eq!(path.as_str(), "/api/cards/ABCDEF");
        assert_eq!(path.wire_len(), "/api/cards/".len() + 6 + 1);
    }

    #[test]
    fn test_http_path_rejects_oversized_base() {
        let card: CardId = "ABCDEF".parse().unwrap();
        let base = "/".repeat(MAX_PATH_LEN);
        let result = HttpPath::new(&base, &card);
        assert!(matches!(result, Err(Error::PathTooLong { .. })));
    }

    #[test]
    fn test_http_path_exact_limit_is_accepted() {
        let card: CardId = "ABCDEF".parse().unwrap();
        let base = "/".repeat(MAX_PATH_LEN - CARD_ID_LEN - 1);
        let path = HttpPath::new(&base, &card).unwrap();
        assert_eq!(path.wire_len(), MAX_PATH_LEN);
    }
}
