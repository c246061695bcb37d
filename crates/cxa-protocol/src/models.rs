//! Amplifier model database
//!
//! The CXA61 and CXA81 speak the same protocol but expose different
//! inputs: the CXA61 has an MP3 (front 3.5 mm) input where the CXA81 has a
//! balanced XLR input.

use std::fmt;
use std::str::FromStr;

use crate::error::CodecError;

/// Source label → select command fragment (CXA61)
const CXA61_SELECT: &[(&str, &str)] = &[
    ("A1", "#03,04,00"),
    ("A2", "#03,04,01"),
    ("A3", "#03,04,02"),
    ("A4", "#03,04,03"),
    ("D1", "#03,04,04"),
    ("D2", "#03,04,05"),
    ("D3", "#03,04,06"),
    ("Bluetooth", "#03,04,14"),
    ("USB", "#03,04,16"),
    ("MP3", "#03,04,10"),
];

/// Source label → select command fragment (CXA81)
const CXA81_SELECT: &[(&str, &str)] = &[
    ("A1", "#03,04,00"),
    ("A2", "#03,04,01"),
    ("A3", "#03,04,02"),
    ("A4", "#03,04,03"),
    ("D1", "#03,04,04"),
    ("D2", "#03,04,05"),
    ("D3", "#03,04,06"),
    ("Bluetooth", "#03,04,14"),
    ("USB", "#03,04,16"),
    ("XLR", "#03,04,20"),
];

/// Source reply fragment → label (CXA61)
const CXA61_REPLY: &[(&str, &str)] = &[
    ("#04,01,00", "A1"),
    ("#04,01,01", "A2"),
    ("#04,01,02", "A3"),
    ("#04,01,03", "A4"),
    ("#04,01,04", "D1"),
    ("#04,01,05", "D2"),
    ("#04,01,06", "D3"),
    ("#04,01,14", "Bluetooth"),
    ("#04,01,16", "USB"),
    ("#04,01,10", "MP3"),
];

/// Source reply fragment → label (CXA81)
const CXA81_REPLY: &[(&str, &str)] = &[
    ("#04,01,00", "A1"),
    ("#04,01,01", "A2"),
    ("#04,01,02", "A3"),
    ("#04,01,03", "A4"),
    ("#04,01,04", "D1"),
    ("#04,01,05", "D2"),
    ("#04,01,06", "D3"),
    ("#04,01,14", "Bluetooth"),
    ("#04,01,16", "USB"),
    ("#04,01,20", "XLR"),
];

/// Sound mode label → command fragment (speaker outputs A, A+B, B)
pub(crate) const SOUND_MODES: &[(&str, &str)] =
    &[("A", "#1,25,0"), ("AB", "#1,25,1"), ("B", "#1,25,2")];

/// Amplifier model, selecting which source table applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Profile {
    /// CXA61
    #[cfg_attr(feature = "serde", serde(rename = "CXA61"))]
    Cxa61,
    /// CXA81
    #[cfg_attr(feature = "serde", serde(rename = "CXA81"))]
    Cxa81,
}

impl Profile {
    /// All known profiles
    pub const ALL: [Profile; 2] = [Profile::Cxa61, Profile::Cxa81];

    /// Model name as printed on the front panel
    pub fn name(&self) -> &'static str {
        match self {
            Profile::Cxa61 => "CXA61",
            Profile::Cxa81 => "CXA81",
        }
    }

    /// Label → select command fragment
    pub fn select_table(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Profile::Cxa61 => CXA61_SELECT,
            Profile::Cxa81 => CXA81_SELECT,
        }
    }

    /// Reply fragment → label
    pub fn reply_table(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Profile::Cxa61 => CXA61_REPLY,
            Profile::Cxa81 => CXA81_REPLY,
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profile {
    type Err = CodecError;

    /// Parse a model name, ignoring case (`"cxa81"` works)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Profile::ALL
            .into_iter()
            .find(|p| p.name() == upper)
            .ok_or_else(|| CodecError::UnknownProfile(s.to_string()))
    }
}
