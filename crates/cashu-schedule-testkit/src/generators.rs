//! Proptest generators for property-based testing.

use proptest::prelude::*;

use cashu_schedule_core::{
    Keys, DELAY_MAX_MINUTES, DELAY_MIN_MINUTES, TOKEN_MAX_LEN, TOKEN_MIN_LEN, TOKEN_PREFIX,
};

/// Generate a random identity.
pub fn keys() -> impl Strategy<Value = Keys> {
    any::<[u8; 32]>()
        .prop_filter_map("not a valid secret scalar", |bytes| {
            Keys::from_secret_bytes(&bytes).ok()
        })
}

/// Generate a token that passes validation.
pub fn valid_token() -> impl Strategy<Value = String> {
    let body_min = TOKEN_MIN_LEN - TOKEN_PREFIX.len();
    let body_max = TOKEN_MAX_LEN - TOKEN_PREFIX.len();
    (
        "[A-Za-z0-9]",
        proptest::collection::vec(
            proptest::char::ranges(vec!['A'..='Z', 'a'..='z', '0'..='9', '-'..='-', '_'..='_'].into()),
            body_min - 1..=body_max.min(512) - 1,
        ),
    )
        .prop_map(|(first, rest)| {
            let mut token = String::from(TOKEN_PREFIX);
            token.push_str(&first);
            token.extend(rest);
            token
        })
}

/// Generate a token that is too short but otherwise well-formed.
pub fn short_token() -> impl Strategy<Value = String> {
    (1..TOKEN_MIN_LEN - TOKEN_PREFIX.len())
        .prop_map(|len| format!("{TOKEN_PREFIX}{}", "A".repeat(len)))
}

/// Generate a delay inside the accepted range.
pub fn valid_delay() -> impl Strategy<Value = i64> {
    DELAY_MIN_MINUTES..=DELAY_MAX_MINUTES
}

/// Generate a delay outside the accepted range.
pub fn invalid_delay() -> impl Strategy<Value = i64> {
    prop_oneof![
        i64::MIN..DELAY_MIN_MINUTES,
        DELAY_MAX_MINUTES + 1..=i64::MAX,
    ]
}

/// Event content: arbitrary unicode, including characters JSON must escape.
pub fn content() -> impl Strategy<Value = String> {
    prop_oneof![
        ".{0,64}",
        proptest::collection::vec(any::<char>(), 0..32).prop_map(String::from_iter),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashu_schedule_core::{
        validate_request, EventBuilder, Kind, Timestamp, ValidationError,
    };

    fn recipient() -> String {
        "c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5".to_string()
    }

    proptest! {
        #[test]
        fn test_valid_inputs_accepted(
            sender in keys(),
            token in valid_token(),
            delay in valid_delay(),
        ) {
            prop_assume!(sender.public_key().to_hex() != recipient());
            let request = validate_request(Some(&sender), Some(recipient().as_str()), &token, delay);
            prop_assert!(request.is_ok());
        }

        #[test]
        fn test_short_tokens_rejected(sender in keys(), token in short_token()) {
            prop_assume!(sender.public_key().to_hex() != recipient());
            let result = validate_request(Some(&sender), Some(recipient().as_str()), &token, 60);
            prop_assert!(matches!(result, Err(ValidationError::InvalidToken(_))));
        }

        #[test]
        fn test_out_of_range_delays_rejected(sender in keys(), delay in invalid_delay()) {
            prop_assume!(sender.public_key().to_hex() != recipient());
            let result = validate_request(
                Some(&sender),
                Some(recipient().as_str()),
                crate::fixtures::SAMPLE_TOKEN,
                delay,
            );
            prop_assert_eq!(result.err(), Some(ValidationError::InvalidDelay(delay)));
        }

        #[test]
        fn test_event_id_deterministic(
            keys in keys(),
            content in content(),
            created_at in 0u64..=4_102_444_800,
        ) {
            let build = || {
                EventBuilder::new(Kind::SCHEDULE_INSTRUCTION, content.clone())
                    .created_at(Timestamp(created_at))
                    .build(keys.public_key())
            };
            prop_assert_eq!(build().compute_id(), build().compute_id());
        }

        #[test]
        fn test_event_id_changes_with_content(
            keys in keys(),
            c1 in content(),
            c2 in content(),
        ) {
            prop_assume!(c1 != c2);
            let id = |content: &str| {
                EventBuilder::new(Kind::SCHEDULE_INSTRUCTION, content)
                    .created_at(Timestamp(1_736_870_400))
                    .build(keys.public_key())
                    .compute_id()
            };
            prop_assert_ne!(id(&c1), id(&c2));
        }
    }
}
