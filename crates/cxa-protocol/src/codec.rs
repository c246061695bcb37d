//! Table lookups between human-level labels and protocol fragments
//!
//! All lookups are exact and case-sensitive.

use crate::command::Command;
use crate::error::CodecError;
use crate::models::{Profile, SOUND_MODES};

/// Encode the command selecting `label` on the given profile
pub fn encode_select_source(profile: Profile, label: &str) -> Result<Command, CodecError> {
    profile
        .select_table()
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, fragment)| Command::new(*fragment))
        .ok_or_else(|| CodecError::UnknownSource {
            profile,
            label: label.to_string(),
        })
}

/// Decode a current-source reply into its label
///
/// The trailing terminator is stripped, then the reply must match a table
/// entry exactly. Substring matching is not used here because several
/// fragments share prefixes (`#04,01,1` is a prefix of both `#04,01,10`
/// and `#04,01,14`).
pub fn decode_source_reply(profile: Profile, reply: &str) -> Result<&'static str, CodecError> {
    let trimmed = reply.trim_end_matches(['\r', '\n']);
    profile
        .reply_table()
        .iter()
        .find(|(fragment, _)| *fragment == trimmed)
        .map(|(_, label)| *label)
        .ok_or_else(|| CodecError::UnrecognizedReply {
            profile,
            reply: trimmed.to_string(),
        })
}

/// Encode the command selecting a sound mode (`A`, `AB` or `B`)
pub fn encode_sound_mode(label: &str) -> Result<Command, CodecError> {
    SOUND_MODES
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, fragment)| Command::new(*fragment))
        .ok_or_else(|| CodecError::UnknownSoundMode(label.to_string()))
}

/// Source labels of a profile, sorted lexicographically
pub fn source_list(profile: Profile) -> Vec<&'static str> {
    let mut labels: Vec<_> = profile.select_table().iter().map(|(l, _)| *l).collect();
    labels.sort_unstable();
    labels
}

/// Sound mode labels, sorted lexicographically
pub fn sound_mode_list() -> Vec<&'static str> {
    let mut labels: Vec<_> = SOUND_MODES.iter().map(|(l, _)| *l).collect();
    labels.sort_unstable();
    labels
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use crate::command::{decode_mute_state, decode_power_state, REPLY_MUTE_ON, REPLY_POWER_ON};
    use proptest::prelude::*;

    fn profile() -> impl Strategy<Value = Profile> {
        prop_oneof![Just(Profile::Cxa61), Just(Profile::Cxa81)]
    }

    // Printable padding that cannot itself contain a '#'
    fn padding() -> impl Strategy<Value = String> {
        "[ a-zA-Z0-9,\r\n]{0,12}"
    }

    proptest! {
        #[test]
        fn power_on_detected_anywhere(prefix in padding(), suffix in padding()) {
            let reply = format!("{prefix}{REPLY_POWER_ON}{suffix}");
            prop_assert!(decode_power_state(&reply));
        }

        #[test]
        fn power_off_without_fragment(text in "[ a-zA-Z0-9,#\r\n]{0,24}") {
            prop_assert_eq!(decode_power_state(&text), text.contains(REPLY_POWER_ON));
        }

        #[test]
        fn mute_on_detected_anywhere(prefix in padding(), suffix in padding()) {
            let reply = format!("{prefix}{REPLY_MUTE_ON}{suffix}");
            prop_assert!(decode_mute_state(&reply));
        }

        #[test]
        fn mute_off_without_fragment(text in "[ a-zA-Z0-9,#\r\n]{0,24}") {
            prop_assert_eq!(decode_mute_state(&text), text.contains(REPLY_MUTE_ON));
        }

        #[test]
        fn every_listed_source_encodes(profile in profile(), pick in any::<prop::sample::Index>()) {
            let labels = source_list(profile);
            let label = labels[pick.index(labels.len())];
            let cmd = encode_select_source(profile, label).unwrap();
            prop_assert!(cmd.as_str().starts_with("#03,04,"));
        }
    }
}
