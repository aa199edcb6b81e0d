//! Fixed buckets for the analytics charts.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Time formats accepted from the free-text bite time field.
const TIME_FORMATS: [&str; 6] = [
    "%H:%M",
    "%H:%M:%S",
    "%I:%M %p",
    "%I:%M%p",
    "%I:%M:%S %p",
    "%H%M",
];

/// Two-hour slots of the bite time chart, 06:00 to 22:00.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeSlot {
    S06To08,
    S08To10,
    S10To12,
    S12To14,
    S14To16,
    S16To18,
    S18To20,
    S20To22,
}

impl TimeSlot {
    /// All slots in chart order.
    pub const ALL: [TimeSlot; 8] = [
        TimeSlot::S06To08,
        TimeSlot::S08To10,
        TimeSlot::S10To12,
        TimeSlot::S12To14,
        TimeSlot::S14To16,
        TimeSlot::S16To18,
        TimeSlot::S18To20,
        TimeSlot::S20To22,
    ];

    /// Slot containing `hour`, if it falls inside charted hours.
    pub fn from_hour(hour: u32) -> Option<Self> {
        if !(6..22).contains(&hour) {
            return None;
        }
        Some(Self::ALL[((hour - 6) / 2) as usize])
    }

    /// Slot for a free-text time; `None` when unparseable or uncharted.
    pub fn from_text(text: &str) -> Option<Self> {
        parse_time(text).and_then(|t| Self::from_hour(t.hour()))
    }

    /// Chart label.
    pub fn label(&self) -> &'static str {
        match self {
            TimeSlot::S06To08 => "6AM-8AM",
            TimeSlot::S08To10 => "8AM-10AM",
            TimeSlot::S10To12 => "10AM-12PM",
            TimeSlot::S12To14 => "12PM-2PM",
            TimeSlot::S14To16 => "2PM-4PM",
            TimeSlot::S16To18 => "4PM-6PM",
            TimeSlot::S18To20 => "6PM-8PM",
            TimeSlot::S20To22 => "8PM-10PM",
        }
    }
}

/// Parse a free-text time of day.
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let mut cleaned = text.trim().to_uppercase().replace('.', "");
    if cleaned.is_empty() {
        return None;
    }

    // "7 AM" / "7PM": minutes are required by the parser
    if !cleaned.contains(':') {
        if let Some(hour) = cleaned
            .strip_suffix("AM")
            .or_else(|| cleaned.strip_suffix("PM"))
        {
            let suffix = &cleaned[cleaned.len() - 2..];
            cleaned = format!("{}:00 {}", hour.trim(), suffix);
        }
    }

    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&cleaned, fmt).ok())
}

/// Patient age ranges of the age chart.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgeBucket {
    Child,
    Teen,
    YoungAdult,
    Adult,
    MiddleAge,
    Senior,
}

impl AgeBucket {
    /// All buckets in chart order.
    pub const ALL: [AgeBucket; 6] = [
        AgeBucket::Child,
        AgeBucket::Teen,
        AgeBucket::YoungAdult,
        AgeBucket::Adult,
        AgeBucket::MiddleAge,
        AgeBucket::Senior,
    ];

    pub fn from_age(age: u32) -> Self {
        match age {
            0..=12 => AgeBucket::Child,
            13..=17 => AgeBucket::Teen,
            18..=30 => AgeBucket::YoungAdult,
            31..=45 => AgeBucket::Adult,
            46..=60 => AgeBucket::MiddleAge,
            _ => AgeBucket::Senior,
        }
    }

    /// Chart label.
    pub fn label(&self) -> &'static str {
        match self {
            AgeBucket::Child => "0-12",
            AgeBucket::Teen => "13-17",
            AgeBucket::YoungAdult => "18-30",
            AgeBucket::Adult => "31-45",
            AgeBucket::MiddleAge => "46-60",
            AgeBucket::Senior => "61+",
        }
    }
}
