//! Types and wire protocol shared by the garden server and its clients.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub mod controls;
pub mod protocol;

pub use controls::{Button, Controls};
pub use protocol::{
    decode_frame, encode_frame, frame_header, Message, MessageKind, PlayerSummary, ProtocolError,
    StateSnapshot, HEADER_LEN, MAX_PAYLOAD_LEN,
};

/// Simulation ticks per second, on both ends.
pub const TICK_RATE: u32 = 30;
/// Fixed simulation step. The protocol does not enforce it, but client and server pace themselves by it.
pub const TICK: Duration = Duration::from_nanos(1_000_000_000 / TICK_RATE as u64);

/// Harvest totals that end the session in a win.
pub const WIN_GOAL: Harvest = Harvest {
    carrots: 12,
    tomatoes: 10,
    beets: 8,
};

/// Raw garden produce. Each crop also exists as a seed packet on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crop {
    Carrot,
    Tomato,
    Beet,
}

impl Crop {
    pub const ALL: [Crop; 3] = [Crop::Carrot, Crop::Tomato, Crop::Beet];

    /// Resource type code of the raw crop (0, 2 or 4).
    pub fn code(self) -> u8 {
        match self {
            Crop::Carrot => 0,
            Crop::Tomato => 2,
            Crop::Beet => 4,
        }
    }

    /// Resource type code of the seed packet for this crop (1, 3 or 5).
    pub fn seed_code(self) -> u8 {
        self.code() + 1
    }

    /// Maps a raw crop code back to the crop. Seed codes are rejected.
    pub fn from_code(code: u8) -> Option<Crop> {
        match code {
            0 => Some(Crop::Carrot),
            2 => Some(Crop::Tomato),
            4 => Some(Crop::Beet),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Crop::Carrot => "carrot",
            Crop::Tomato => "tomato",
            Crop::Beet => "beet",
        }
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a pickup code refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pickup {
    /// A raw crop that counts towards the harvest.
    Crop(Crop),
    /// A seed packet, which is gifted onwards as the matching crop.
    Seed(Crop),
    /// Anything else. Kept so newer clients do not get disconnected.
    Unknown(u8),
}

impl Pickup {
    pub fn code(self) -> u8 {
        match self {
            Pickup::Crop(crop) => crop.code(),
            Pickup::Seed(crop) => crop.seed_code(),
            Pickup::Unknown(code) => code,
        }
    }
}

impl From<u8> for Pickup {
    fn from(code: u8) -> Self {
        let known = if code % 2 == 0 {
            Crop::from_code(code).map(Pickup::Crop)
        } else {
            Crop::from_code(code - 1).map(Pickup::Seed)
        };
        known.unwrap_or(Pickup::Unknown(code))
    }
}

/// Collected crop counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Harvest {
    pub carrots: u32,
    pub tomatoes: u32,
    pub beets: u32,
}

impl Harvest {
    /// Counts one more of `crop` and returns the new total for it.
    pub fn add(&mut self, crop: Crop) -> u32 {
        let counter = match crop {
            Crop::Carrot => &mut self.carrots,
            Crop::Tomato => &mut self.tomatoes,
            Crop::Beet => &mut self.beets,
        };
        *counter = counter.saturating_add(1);
        *counter
    }

    pub fn count(&self, crop: Crop) -> u32 {
        match crop {
            Crop::Carrot => self.carrots,
            Crop::Tomato => self.tomatoes,
            Crop::Beet => self.beets,
        }
    }

    /// True when every counter has reached the one in `goal`.
    pub fn meets(&self, goal: &Harvest) -> bool {
        self.carrots >= goal.carrots && self.tomatoes >= goal.tomatoes && self.beets >= goal.beets
    }
}

impl fmt::Display for Harvest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "carrots {}, tomatoes {}, beets {}",
            self.carrots, self.tomatoes, self.beets
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_codes() {
        assert_eq!(Crop::Carrot.code(), 0);
        assert_eq!(Crop::Tomato.code(), 2);
        assert_eq!(Crop::Beet.code(), 4);
        assert_eq!(Crop::Beet.seed_code(), 5);

        for crop in Crop::ALL {
            assert_eq!(Crop::from_code(crop.code()), Some(crop));
            assert_eq!(Crop::from_code(crop.seed_code()), None);
        }
    }

    #[test]
    fn test_pickup_classification() {
        assert_eq!(Pickup::from(0), Pickup::Crop(Crop::Carrot));
        assert_eq!(Pickup::from(1), Pickup::Seed(Crop::Carrot));
        assert_eq!(Pickup::from(3), Pickup::Seed(Crop::Tomato));
        assert_eq!(Pickup::from(4), Pickup::Crop(Crop::Beet));
        assert_eq!(Pickup::from(6), Pickup::Unknown(6));
        assert_eq!(Pickup::from(0xFF), Pickup::Unknown(0xFF));

        for code in 0..=7u8 {
            assert_eq!(Pickup::from(code).code(), code);
        }
    }

    #[test]
    fn test_harvest_counts() {
        let mut harvest = Harvest::default();
        assert_eq!(harvest.add(Crop::Carrot), 1);
        assert_eq!(harvest.add(Crop::Carrot), 2);
        assert_eq!(harvest.add(Crop::Beet), 1);

        assert_eq!(harvest.count(Crop::Carrot), 2);
        assert_eq!(harvest.count(Crop::Tomato), 0);
        assert_eq!(harvest.count(Crop::Beet), 1);
    }

    #[test]
    fn test_harvest_meets_goal() {
        let mut harvest = Harvest {
            carrots: 12,
            tomatoes: 10,
            beets: 7,
        };
        assert!(!harvest.meets(&WIN_GOAL));

        harvest.add(Crop::Beet);
        assert!(harvest.meets(&WIN_GOAL));

        harvest.add(Crop::Carrot);
        assert!(harvest.meets(&WIN_GOAL));
    }

    #[test]
    fn test_tick_matches_rate() {
        let per_second = TICK * TICK_RATE;
        assert!(per_second <= Duration::from_secs(1));
        assert!(Duration::from_secs(1) - per_second < Duration::from_micros(1));
    }
}
