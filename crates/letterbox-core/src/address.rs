//! Recipient address normalization.
//!
//! Addresses arrive from the PDF's address block with a mix of line breaks,
//! carriage returns and stray commas. They are shown and sent as a single
//! comma-separated line.

use crate::models::letter::decode_tag_value;

/// Collapse an address into `"line one, line two, postcode"`.
///
/// Commas, `\n` and `\r` all separate lines. Lines are trimmed, empty lines
/// dropped and inner whitespace runs squeezed to one space.
pub fn normalize_address(raw: &str) -> String {
    raw.split([',', '\n', '\r'])
        .map(|segment| segment.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Decode a stored `recipient` tag and normalize it.
pub fn format_recipient(encoded: &str) -> String {
    normalize_address(&decode_tag_value(encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_address_vectors() {
        let cases = [
            (
                "The Queen, Buckingham Palace, SW1 1AA",
                "The Queen, Buckingham Palace, SW1 1AA",
            ),
            (
                "The Queen Buckingham Palace SW1 1AA",
                "The Queen Buckingham Palace SW1 1AA",
            ),
            (
                "The Queen,\nBuckingham Palace,\r\nSW1 1AA",
                "The Queen, Buckingham Palace, SW1 1AA",
            ),
            (
                "The Queen   ,,\nBuckingham Palace,\rSW1 1AA,",
                "The Queen, Buckingham Palace, SW1 1AA",
            ),
            (
                "  The Queen\n Buckingham Palace\n SW1 1AA",
                "The Queen, Buckingham Palace, SW1 1AA",
            ),
            ("", ""),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize_address(input), expected, "input: {:?}", input);
        }
    }

    #[test]
    fn test_normalize_squeezes_inner_whitespace() {
        assert_eq!(normalize_address("1   High\tStreet"), "1 High Street");
    }

    #[test]
    fn test_format_recipient_decodes_then_normalizes() {
        assert_eq!(
            format_recipient("The%20Queen%0ABuckingham%20Palace%0D%0ASW1%201AA"),
            "The Queen, Buckingham Palace, SW1 1AA"
        );
        assert_eq!(format_recipient(""), "");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(input in "[a-zA-Z0-9 ,\\n\\r\\t]{0,64}") {
            let once = normalize_address(&input);
            prop_assert_eq!(normalize_address(&once), once);
        }

        #[test]
        fn normalize_has_no_stray_separators(input in "[a-z ,\\n\\r]{0,64}") {
            let out = normalize_address(&input);
            prop_assert!(!out.contains(",,"));
            prop_assert!(!out.contains(", ,"));
            prop_assert!(!out.starts_with(',') && !out.ends_with(','));
            prop_assert!(!out.starts_with(' ') && !out.ends_with(' '));
            prop_assert!(!out.contains('\n') && !out.contains('\r'));
        }
    }
}
