use crate::values::Timestamp;
use serde::{Deserialize, Serialize};

/// Freeze options accepted by a time travel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TravelOption {
    /// Logical time stays at the travel target
    Freeze,
    /// Freeze, and suspend derived timers and tickers entirely
    DeepFreeze,
    /// Let logical time flow again
    Unfreeze,
}

/// Freeze flags resolved from an option list
///
/// Options apply in list order and a later option overrides an earlier one,
/// so `[Freeze, Unfreeze]` unfreezes while `[Unfreeze, Freeze]` freezes.
/// When no option is given, the current freeze state is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TravelFlags {
    pub freeze: bool,
    pub deep: bool,
    pub unfreeze: bool,
}

impl TravelFlags {
    pub fn from_options(options: &[TravelOption]) -> Self {
        options
            .iter()
            .fold(TravelFlags::default(), |flags, option| flags.apply(*option))
    }

    fn apply(self, option: TravelOption) -> Self {
        match option {
            TravelOption::Freeze => TravelFlags {
                freeze: true,
                deep: self.deep,
                unfreeze: false,
            },
            TravelOption::DeepFreeze => TravelFlags {
                freeze: true,
                deep: true,
                unfreeze: false,
            },
            TravelOption::Unfreeze => TravelFlags {
                freeze: false,
                deep: false,
                unfreeze: true,
            },
        }
    }

    /// True when no option was given
    pub fn is_keep(&self) -> bool {
        !self.freeze && !self.deep && !self.unfreeze
    }
}

/// Where a travel lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Relative to the logical now at the moment of travel
    Offset(chrono::Duration),
    /// An absolute logical instant
    At(Timestamp),
}

impl Destination {
    /// Resolve against the logical now
    ///
    /// `None` when the offset lands outside the representable range.
    pub fn resolve(&self, now: Timestamp) -> Option<Timestamp> {
        match self {
            Destination::Offset(offset) => now.checked_add_signed(*offset),
            Destination::At(at) => Some(*at),
        }
    }
}

impl From<chrono::Duration> for Destination {
    fn from(offset: chrono::Duration) -> Self {
        Destination::Offset(offset)
    }
}

impl From<std::time::Duration> for Destination {
    fn from(offset: std::time::Duration) -> Self {
        Destination::Offset(crate::values::to_delta(offset))
    }
}

impl From<Timestamp> for Destination {
    fn from(at: Timestamp) -> Self {
        Destination::At(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_no_options_keeps_state() {
        let flags = TravelFlags::from_options(&[]);
        assert!(flags.is_keep());
    }

    #[test]
    fn test_later_option_wins() {
        let unfrozen = TravelFlags::from_options(&[TravelOption::Freeze, TravelOption::Unfreeze]);
        assert!(unfrozen.unfreeze);
        assert!(!unfrozen.freeze);

        let frozen = TravelFlags::from_options(&[TravelOption::Unfreeze, TravelOption::Freeze]);
        assert!(frozen.freeze);
        assert!(!frozen.unfreeze);
    }

    #[test]
    fn test_deep_freeze_implies_freeze() {
        let flags = TravelFlags::from_options(&[TravelOption::DeepFreeze]);
        assert!(flags.freeze && flags.deep);

        // A plain freeze after a deep one does not thaw the depth
        let flags = TravelFlags::from_options(&[TravelOption::DeepFreeze, TravelOption::Freeze]);
        assert!(flags.freeze && flags.deep);
    }

    #[test]
    fn test_destination_resolve() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let target = Utc.with_ymd_and_hms(2022, 1, 1, 12, 0, 0).unwrap();

        assert_eq!(
            Destination::from(Duration::hours(1)).resolve(now),
            Some(now + Duration::hours(1))
        );
        assert_eq!(
            Destination::from(std::time::Duration::from_secs(30)).resolve(now),
            Some(now + Duration::seconds(30))
        );
        assert_eq!(Destination::from(target).resolve(now), Some(target));
    }

    #[test]
    fn test_offset_out_of_range_does_not_resolve() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(Destination::from(Duration::MAX).resolve(now), None);
        assert_eq!(Destination::from(Duration::MIN).resolve(now), None);
        assert_eq!(Destination::from(std::time::Duration::MAX).resolve(now), None);
    }

    #[test]
    fn test_option_serialization() {
        let json = serde_json::to_string(&TravelOption::DeepFreeze).unwrap();
        assert_eq!(json, "\"DeepFreeze\"");
    }
}
