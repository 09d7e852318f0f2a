//! Command catalog
//!
//! Static table of the requests the station understands, the header its
//! answer carries and the layout of that answer. The header probe reads just
//! the (command, subcommand) pair and is never sent.

use crate::protocol::frame::{FieldLayout as F, FrameHeader, Layout};
use serde::{Deserialize, Serialize};
use wx_model::Channel;

/// Configuration switch that gates one call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallFlag {
    Firmware,
    Current,
    Max,
    Min,
    DailyMax,
    DailyMin,
}

/// Which calls a poll cycle makes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallFlags {
    pub firmware: bool,
    pub current: bool,
    pub max: bool,
    pub min: bool,
    pub daily_max: bool,
    pub daily_min: bool,
}

impl Default for CallFlags {
    fn default() -> Self {
        Self {
            firmware: true,
            current: true,
            max: false,
            min: false,
            daily_max: false,
            daily_min: false,
        }
    }
}

impl CallFlags {
    pub fn none() -> Self {
        Self {
            firmware: false,
            current: false,
            max: false,
            min: false,
            daily_max: false,
            daily_min: false,
        }
    }

    pub fn is_enabled(&self, flag: CallFlag) -> bool {
        match flag {
            CallFlag::Firmware => self.firmware,
            CallFlag::Current => self.current,
            CallFlag::Max => self.max,
            CallFlag::Min => self.min,
            CallFlag::DailyMax => self.daily_max,
            CallFlag::DailyMin => self.daily_min,
        }
    }

    pub fn enable(mut self, flag: CallFlag) -> Self {
        match flag {
            CallFlag::Firmware => self.firmware = true,
            CallFlag::Current => self.current = true,
            CallFlag::Max => self.max = true,
            CallFlag::Min => self.min = true,
            CallFlag::DailyMax => self.daily_max = true,
            CallFlag::DailyMin => self.daily_min = true,
        }
        self
    }
}

/// One request/response pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    /// Literal bytes written to the socket
    pub request: &'static [u8],
    /// Header of the matching response
    pub response: FrameHeader,
    pub layout: Layout,
    /// `None` for the probe, which is always available and never sent
    pub enabled_by: Option<CallFlag>,
    /// Category the decoded fields are filed under
    pub channel: Option<Channel>,
}

impl CommandSpec {
    pub fn frame_len(&self) -> usize {
        self.layout.frame_len()
    }
}

/// Header probe: magic, command, subcommand
pub const PROBE: CommandSpec = CommandSpec {
    name: "Return Header",
    request: &[],
    response: FrameHeader::new(0, 0),
    layout: Layout {
        header_skip: 2,
        fields: &[F::unsigned("command", 1), F::unsigned("subcommand", 1)],
    },
    enabled_by: None,
    channel: None,
};

pub const FIRMWARE: CommandSpec = CommandSpec {
    name: "Get Firmware",
    request: &[0xFF, 0xFF, 0x50, 0x03, 0x53],
    response: FrameHeader::new(80, 69),
    layout: Layout {
        header_skip: 5,
        fields: &[F::text("softwaretype", 17)],
    },
    enabled_by: Some(CallFlag::Firmware),
    channel: Some(Channel::Info),
};

pub const GET_CURRENT: CommandSpec = CommandSpec {
    name: "Get Current Data",
    request: &[0xFF, 0xFF, 0x0B, 0x00, 0x06, 0x04, 0x04, 0x19],
    response: FrameHeader::new(11, 4),
    layout: Layout {
        header_skip: 7,
        fields: &[
            F::signed("indoortemp", 2).skip(1),
            F::signed("temp", 2).skip(1),
            F::signed("dewpt", 2).skip(1),
            F::signed("windchill", 2).skip(1),
            F::signed("heatindex", 2).skip(1),
            F::unsigned("indoorhumidity", 1).skip(1),
            F::unsigned("humidity", 1).skip(1),
            F::unsigned("baromabs", 2).skip(1),
            F::unsigned("baromrel", 2).skip(1),
            F::unsigned("winddir", 2).skip(1),
            F::unsigned("windspeed", 2).skip(1),
            F::unsigned("windgust", 2).skip(1),
            F::unsigned("rainrate", 4).skip(1),
            F::unsigned("dailyrain", 4).skip(1),
            F::unsigned("weeklyrain", 4).skip(1),
            F::unsigned("monthlyrain", 4).skip(1),
            F::unsigned("yearlyrain", 4).skip(1),
            F::unsigned("raintotal", 4).skip(1),
            F::unsigned("solarradiation", 4).skip(1),
            F::unsigned("UVraw", 2).skip(1),
            F::unsigned("UV", 1),
        ],
    },
    enabled_by: Some(CallFlag::Current),
    channel: Some(Channel::Current),
};

pub const GET_MAX: CommandSpec = CommandSpec {
    name: "Get Max Data",
    request: &[0xFF, 0xFF, 0x0B, 0x00, 0x06, 0x05, 0x05, 0x1B],
    response: FrameHeader::new(11, 5),
    layout: Layout {
        header_skip: 7,
        fields: &[
            F::signed("indoortemp", 2).skip(1),
            F::signed("temp", 2).skip(1),
            F::signed("dewpt", 2).skip(1),
            F::signed("heatindex", 2).skip(1),
            F::unsigned("indoorhumidity", 1).skip(1),
            F::unsigned("humidity", 1).skip(1),
            F::unsigned("baromabs", 2).skip(1),
            F::unsigned("baromrel", 2).skip(1),
            F::unsigned("windspeed", 2).skip(1),
            F::unsigned("windgust", 2).skip(1),
            F::unsigned("rainrate", 4).skip(1),
            F::unsigned("dailyrain", 4).skip(1),
            F::unsigned("weeklyrain", 4).skip(1),
            F::unsigned("monthlyrain", 4).skip(1),
            F::unsigned("yearlyrain", 4).skip(1),
            F::unsigned("solarradiation", 4).skip(1),
            F::unsigned("UVraw", 2).skip(1),
            F::unsigned("UV", 1),
        ],
    },
    enabled_by: Some(CallFlag::Max),
    channel: Some(Channel::Max),
};

pub const GET_MIN: CommandSpec = CommandSpec {
    name: "Get Min Data",
    request: &[0xFF, 0xFF, 0x0B, 0x00, 0x06, 0x06, 0x06, 0x1D],
    response: FrameHeader::new(11, 6),
    layout: Layout {
        header_skip: 7,
        fields: &[
            F::signed("indoortemp", 2).skip(1),
            F::signed("temp", 2).skip(1),
            F::signed("dewpt", 2).skip(1),
            F::signed("windchill", 2).skip(1),
            F::unsigned("indoorhumidity", 1).skip(1),
            F::unsigned("humidity", 1).skip(1),
            F::unsigned("baromabs", 2).skip(1),
            F::unsigned("baromrel", 2),
        ],
    },
    enabled_by: Some(CallFlag::Min),
    channel: Some(Channel::Min),
};

// Daily extremes carry a 16-bit time stamp after every value
pub const GET_DAILY_MAX: CommandSpec = CommandSpec {
    name: "Get Daily Max Data",
    request: &[0xFF, 0xFF, 0x0B, 0x00, 0x06, 0x07, 0x07, 0x1F],
    response: FrameHeader::new(11, 7),
    layout: Layout {
        header_skip: 7,
        fields: &[
            F::signed("indoortemp", 2),
            F::signed("indoortemptime", 2).skip(1),
            F::signed("temp", 2),
            F::signed("temptime", 2).skip(1),
            F::signed("dewpt", 2),
            F::signed("dewpttime", 2).skip(1),
            F::signed("windchill", 2),
            F::signed("windchilltime", 2).skip(1),
            F::unsigned("indoorhumidity", 1),
            F::signed("indoorhumiditytime", 2).skip(1),
            F::unsigned("humidity", 1),
            F::signed("humiditytime", 2).skip(1),
            F::unsigned("baromabs", 2),
            F::signed("baromabstime", 2).skip(1),
            F::unsigned("baromrel", 2),
            F::signed("baromreltime", 2).skip(1),
            F::unsigned("windspeed", 2),
            F::signed("windspeedtime", 2).skip(1),
            F::unsigned("windgust", 2),
            F::signed("windgusttime", 2).skip(1),
            F::unsigned("rainrate", 4),
            F::signed("rainratetime", 2).skip(1),
            F::unsigned("solarradiation", 4),
            F::signed("solarradiationtime", 2).skip(1),
            F::unsigned("UVraw", 2),
            F::signed("UVrawtime", 2).skip(1),
            F::unsigned("UV", 1),
            F::signed("UVtime", 2),
        ],
    },
    enabled_by: Some(CallFlag::DailyMax),
    channel: Some(Channel::DailyMax),
};

pub const GET_DAILY_MIN: CommandSpec = CommandSpec {
    name: "Get Daily Min Data",
    request: &[0xFF, 0xFF, 0x0B, 0x00, 0x06, 0x08, 0x08, 0x21],
    response: FrameHeader::new(11, 8),
    layout: Layout {
        header_skip: 7,
        fields: &[
            F::signed("indoortemp", 2),
            F::signed("indoortemptime", 2).skip(1),
            F::signed("temp", 2),
            F::signed("temptime", 2).skip(1),
            F::signed("dewpt", 2),
            F::signed("dewpttime", 2).skip(1),
            F::signed("windchill", 2),
            F::signed("windchilltime", 2).skip(1),
            F::unsigned("indoorhumidity", 1),
            F::signed("indoorhumiditytime", 2).skip(1),
            F::unsigned("humidity", 1),
            F::signed("humiditytime", 2).skip(1),
            F::unsigned("baromabs", 2),
            F::signed("baromabstime", 2).skip(1),
            F::unsigned("baromrel", 2),
            F::signed("baromreltime", 2),
        ],
    },
    enabled_by: Some(CallFlag::DailyMin),
    channel: Some(Channel::DailyMin),
};

static CALLS: [CommandSpec; 6] = [
    FIRMWARE,
    GET_CURRENT,
    GET_MAX,
    GET_MIN,
    GET_DAILY_MAX,
    GET_DAILY_MIN,
];

/// Every call the station supports, in the order a cycle sends them.
pub fn catalog() -> &'static [CommandSpec] {
    &CALLS
}

/// The calls switched on by `flags`, in catalog order.
pub fn enabled_calls(flags: &CallFlags) -> Vec<&'static CommandSpec> {
    CALLS
        .iter()
        .filter(|spec| spec.enabled_by.is_some_and(|flag| flags.is_enabled(flag)))
        .collect()
}

/// Catalog entry whose response carries `header`.
pub fn lookup(header: FrameHeader) -> Option<&'static CommandSpec> {
    CALLS.iter().find(|spec| spec.response == header)
}
