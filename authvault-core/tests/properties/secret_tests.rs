//! Property-based tests for OTP secret decoding

use authvault_core::models::OtpSecret;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: decoding the canonical encoding yields the original bytes
    #[test]
    fn prop_base32_round_trip(bytes in prop::collection::vec(any::<u8>(), 1..64)) {
        let secret = OtpSecret::from_bytes(bytes.clone());
        let decoded = OtpSecret::from_base32(&secret.to_base32()).unwrap();
        prop_assert_eq!(decoded.as_bytes(), bytes.as_slice());
    }

    /// Property: case, spaces and dashes shown by authenticator apps do not
    /// change the decoded secret
    #[test]
    fn prop_base32_ignores_formatting(
        bytes in prop::collection::vec(any::<u8>(), 1..32),
        group in 2usize..8,
    ) {
        let canonical = OtpSecret::from_bytes(bytes).to_base32();
        let formatted: String = canonical
            .to_ascii_lowercase()
            .as_bytes()
            .chunks(group)
            .map(|chunk| String::from_utf8_lossy(chunk).to_string())
            .collect::<Vec<_>>()
            .join(if group % 2 == 0 { " " } else { "-" });

        prop_assert_eq!(
            OtpSecret::from_base32(&formatted).unwrap(),
            OtpSecret::from_base32(&canonical).unwrap()
        );
    }
}
