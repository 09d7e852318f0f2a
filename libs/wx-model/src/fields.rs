//! Static table of canonical measurement definitions
//!
//! Each row names a measurement once and says how every source dialect spells
//! it, how to bring the raw value into the canonical unit, and which display
//! units the field can be stored in. The table is plain data; patterns and
//! formulas are compiled and validated when the service builds its registry.

use crate::types::{Channel, FieldType, UnitGroup, Vocabulary};

/// How one vocabulary names a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceMapping {
    /// Key regex, anchored at both ends when compiled. At most one capture
    /// group, holding the instance index of multi-sensor fields.
    pub pattern: &'static str,
    /// Raw-to-canonical formula over `x`; `None` is identity.
    pub to_canonical: Option<&'static str>,
}

/// One display unit a field can be stored in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitOption {
    pub display_unit: &'static str,
    /// Display-to-canonical formula; `None` marks the canonical unit.
    pub to_canonical: Option<&'static str>,
    /// Canonical-to-display formula; `None` is identity.
    pub from_canonical: Option<&'static str>,
}

/// Canonical measurement definition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub id: &'static str,
    /// Base display name, used as-is on the primary channel
    pub name: &'static str,
    pub field_type: FieldType,
    /// Canonical storage unit
    pub unit: Option<&'static str>,
    pub role: &'static str,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Allowed channels, primary first
    pub channels: &'static [Channel],
    pub device: Option<SourceMapping>,
    pub wunderground: Option<SourceMapping>,
    pub ecowitt: Option<SourceMapping>,
    pub unit_group: Option<UnitGroup>,
    pub unit_options: &'static [UnitOption],
}

impl FieldSpec {
    pub fn source(&self, vocabulary: Vocabulary) -> Option<&SourceMapping> {
        match vocabulary {
            Vocabulary::DeviceBinary => self.device.as_ref(),
            Vocabulary::Wunderground => self.wunderground.as_ref(),
            Vocabulary::Ecowitt => self.ecowitt.as_ref(),
        }
    }

    pub fn primary_channel(&self) -> Option<Channel> {
        self.channels.first().copied()
    }

    pub fn has_channel(&self, channel: Channel) -> bool {
        self.channels.contains(&channel)
    }

    pub fn unit_option(&self, display_unit: &str) -> Option<&UnitOption> {
        self.unit_options
            .iter()
            .find(|o| o.display_unit == display_unit)
    }
}

const fn src(pattern: &'static str, to_canonical: Option<&'static str>) -> Option<SourceMapping> {
    Some(SourceMapping {
        pattern,
        to_canonical,
    })
}

const fn canonical(display_unit: &'static str) -> UnitOption {
    UnitOption {
        display_unit,
        to_canonical: None,
        from_canonical: None,
    }
}

const fn derived(
    display_unit: &'static str,
    to_canonical: &'static str,
    from_canonical: &'static str,
) -> UnitOption {
    UnitOption {
        display_unit,
        to_canonical: Some(to_canonical),
        from_canonical: Some(from_canonical),
    }
}

// Raw conversions
const TENTHS: Option<&str> = Some("x / 10");
const DEVICE_SOLAR: Option<&str> = Some("x / 10000");
const DEVICE_WIND: Option<&str> = Some("roundTo(x / 10 * 3.6, 1)");
const F_TO_C: Option<&str> = Some("roundTo((x - 32) * 5 / 9, 1)");
const IN_TO_MM: Option<&str> = Some("roundTo(x * 25.4, 1)");
const INHG_TO_HPA: Option<&str> = Some("roundTo(x / 0.02952998751, 1)");
const MPH_TO_KMH: Option<&str> = Some("roundTo(x * 1.609344, 1)");
const WM2_TO_LUX: Option<&str> = Some("roundTo(x * 126.7, 0)");

// Display units
const TEMPERATURE_UNITS: &[UnitOption] = &[
    canonical("°C"),
    derived("°F", "(x - 32) * 5 / 9", "x * 9 / 5 + 32"),
];
const RAIN_UNITS: &[UnitOption] = &[canonical("mm"), derived("in", "x * 25.4", "x / 25.4")];
const PRESSURE_UNITS: &[UnitOption] = &[
    canonical("hPa"),
    derived("inHg", "x / 0.02952998751", "x * 0.02952998751"),
    derived("mmHg", "x / 0.750062", "x * 0.750062"),
];
const WIND_UNITS: &[UnitOption] = &[
    canonical("km/h"),
    derived("m/s", "x * 3.6", "x / 3.6"),
    derived("mph", "x * 1.609344", "x / 1.609344"),
];

// Channel sets, primary first
const INFO: &[Channel] = &[Channel::Info];
const CURRENT: &[Channel] = &[Channel::Current];
const ALL_READINGS: &[Channel] = &[
    Channel::Current,
    Channel::Max,
    Channel::Min,
    Channel::DailyMax,
    Channel::DailyMin,
];
const NO_MAX: &[Channel] = &[
    Channel::Current,
    Channel::Min,
    Channel::DailyMax,
    Channel::DailyMin,
];
const CURRENT_MAX: &[Channel] = &[Channel::Current, Channel::Max];
const PEAKS: &[Channel] = &[Channel::Current, Channel::Max, Channel::DailyMax];

const fn temperature(
    id: &'static str,
    name: &'static str,
    channels: &'static [Channel],
    device: Option<SourceMapping>,
    wunderground: Option<SourceMapping>,
    ecowitt: Option<SourceMapping>,
) -> FieldSpec {
    FieldSpec {
        id,
        name,
        field_type: FieldType::Number,
        unit: Some("°C"),
        role: "value.temperature",
        min: Some(-60.0),
        max: Some(80.0),
        channels,
        device,
        wunderground,
        ecowitt,
        unit_group: Some(UnitGroup::Temperature),
        unit_options: TEMPERATURE_UNITS,
    }
}

const fn humidity(
    id: &'static str,
    name: &'static str,
    channels: &'static [Channel],
    device: Option<SourceMapping>,
    wunderground: Option<SourceMapping>,
    ecowitt: Option<SourceMapping>,
) -> FieldSpec {
    FieldSpec {
        id,
        name,
        field_type: FieldType::Number,
        unit: Some("%"),
        role: "value.humidity",
        min: Some(0.0),
        max: Some(100.0),
        channels,
        device,
        wunderground,
        ecowitt,
        unit_group: None,
        unit_options: &[],
    }
}

const fn pressure(
    id: &'static str,
    name: &'static str,
    device: Option<SourceMapping>,
    wunderground: Option<SourceMapping>,
    ecowitt: Option<SourceMapping>,
) -> FieldSpec {
    FieldSpec {
        id,
        name,
        field_type: FieldType::Number,
        unit: Some("hPa"),
        role: "value.pressure",
        min: Some(300.0),
        max: Some(1200.0),
        channels: ALL_READINGS,
        device,
        wunderground,
        ecowitt,
        unit_group: Some(UnitGroup::Pressure),
        unit_options: PRESSURE_UNITS,
    }
}

const fn wind(
    id: &'static str,
    name: &'static str,
    device: Option<SourceMapping>,
    wunderground: Option<SourceMapping>,
    ecowitt: Option<SourceMapping>,
) -> FieldSpec {
    FieldSpec {
        id,
        name,
        field_type: FieldType::Number,
        unit: Some("km/h"),
        role: "value.speed.wind",
        min: Some(0.0),
        max: Some(400.0),
        channels: PEAKS,
        device,
        wunderground,
        ecowitt,
        unit_group: Some(UnitGroup::WindSpeed),
        unit_options: WIND_UNITS,
    }
}

const fn rain(
    id: &'static str,
    name: &'static str,
    channels: &'static [Channel],
    device: Option<SourceMapping>,
    wunderground: Option<SourceMapping>,
    ecowitt: Option<SourceMapping>,
) -> FieldSpec {
    FieldSpec {
        id,
        name,
        field_type: FieldType::Number,
        unit: Some("mm"),
        role: "value.rain",
        min: Some(0.0),
        max: None,
        channels,
        device,
        wunderground,
        ecowitt,
        unit_group: Some(UnitGroup::Rain),
        unit_options: RAIN_UNITS,
    }
}

const fn plain(
    id: &'static str,
    name: &'static str,
    unit: Option<&'static str>,
    role: &'static str,
    bounds: (Option<f64>, Option<f64>),
    channels: &'static [Channel],
    sources: [Option<SourceMapping>; 3],
) -> FieldSpec {
    let [device, wunderground, ecowitt] = sources;
    FieldSpec {
        id,
        name,
        field_type: FieldType::Number,
        unit,
        role,
        min: bounds.0,
        max: bounds.1,
        channels,
        device,
        wunderground,
        ecowitt,
        unit_group: None,
        unit_options: &[],
    }
}

/// Every measurement the system knows about.
pub static FIELDS: &[FieldSpec] = &[
    FieldSpec {
        id: "softwaretype",
        name: "Station firmware",
        field_type: FieldType::Text,
        unit: None,
        role: "text",
        min: None,
        max: None,
        channels: INFO,
        device: src("softwaretype", None),
        wunderground: src("softwaretype", None),
        ecowitt: src("stationtype", None),
        unit_group: None,
        unit_options: &[],
    },
    // Temperatures
    temperature(
        "indoortemp",
        "Indoor temperature",
        ALL_READINGS,
        src("indoortemp", TENTHS),
        src("indoortempf", F_TO_C),
        src("tempinf", F_TO_C),
    ),
    temperature(
        "outdoortemp",
        "Outdoor temperature",
        ALL_READINGS,
        src("temp", TENTHS),
        src("tempf", F_TO_C),
        src("tempf", F_TO_C),
    ),
    temperature(
        "dewpointtemp",
        "Dew point",
        ALL_READINGS,
        src("dewpt", TENTHS),
        src("dewptf", F_TO_C),
        None,
    ),
    temperature(
        "windchilltemp",
        "Wind chill",
        NO_MAX,
        src("windchill", TENTHS),
        src("windchillf", F_TO_C),
        None,
    ),
    temperature(
        "heatindextemp",
        "Heat index",
        CURRENT_MAX,
        src("heatindex", TENTHS),
        None,
        None,
    ),
    temperature(
        "soiltemp",
        "Soil temperature",
        CURRENT,
        None,
        src("soiltemp([0-9]*)f", F_TO_C),
        None,
    ),
    temperature(
        "extratemp",
        "Extra sensor temperature",
        CURRENT,
        None,
        None,
        src("temp([1-8])f", F_TO_C),
    ),
    // Humidity
    humidity(
        "indoorhumidity",
        "Indoor humidity",
        ALL_READINGS,
        src("indoorhumidity", None),
        src("indoorhumidity", None),
        src("humidityin", None),
    ),
    humidity(
        "outdoorhumidity",
        "Outdoor humidity",
        ALL_READINGS,
        src("humidity", None),
        src("humidity", None),
        src("humidity", None),
    ),
    humidity(
        "extrahumidity",
        "Extra sensor humidity",
        CURRENT,
        None,
        None,
        src("humidity([1-8])", None),
    ),
    humidity(
        "soilmoisture",
        "Soil moisture",
        CURRENT,
        None,
        src("soilmoisture([0-9]*)", None),
        src("soilmoisture([0-9]*)", None),
    ),
    // Pressure
    pressure(
        "pressureabs",
        "Absolute pressure",
        src("baromabs", TENTHS),
        src("absbaromin", INHG_TO_HPA),
        src("baromabsin", INHG_TO_HPA),
    ),
    pressure(
        "pressurerel",
        "Relative pressure",
        src("baromrel", TENTHS),
        src("baromin", INHG_TO_HPA),
        src("baromrelin", INHG_TO_HPA),
    ),
    // Wind
    plain(
        "winddir",
        "Wind direction",
        Some("°"),
        "value.direction.wind",
        (Some(0.0), Some(360.0)),
        CURRENT,
        [
            src("winddir", None),
            src("winddir", None),
            src("winddir", None),
        ],
    ),
    wind(
        "windspeed",
        "Wind speed",
        src("windspeed", DEVICE_WIND),
        src("windspeedmph", MPH_TO_KMH),
        src("windspeedmph", MPH_TO_KMH),
    ),
    wind(
        "windgustspeed",
        "Wind gust",
        src("windgust", DEVICE_WIND),
        src("windgustmph", MPH_TO_KMH),
        src("windgustmph", MPH_TO_KMH),
    ),
    // Rain
    rain(
        "rain",
        "Rain rate",
        PEAKS,
        src("rainrate", TENTHS),
        src("rainin", IN_TO_MM),
        src("rainratein", IN_TO_MM),
    ),
    rain(
        "dailyrain",
        "Daily rain",
        CURRENT_MAX,
        src("dailyrain", TENTHS),
        src("dailyrainin", IN_TO_MM),
        src("dailyrainin", IN_TO_MM),
    ),
    rain(
        "weeklyrain",
        "Weekly rain",
        CURRENT_MAX,
        src("weeklyrain", TENTHS),
        src("weeklyrainin", IN_TO_MM),
        src("weeklyrainin", IN_TO_MM),
    ),
    rain(
        "monthlyrain",
        "Monthly rain",
        CURRENT_MAX,
        src("monthlyrain", TENTHS),
        src("monthlyrainin", IN_TO_MM),
        src("monthlyrainin", IN_TO_MM),
    ),
    rain(
        "yearlyrain",
        "Yearly rain",
        CURRENT_MAX,
        src("yearlyrain", TENTHS),
        src("yearlyrainin", IN_TO_MM),
        src("yearlyrainin", IN_TO_MM),
    ),
    rain(
        "totalrain",
        "Total rain",
        CURRENT,
        src("raintotal", TENTHS),
        None,
        src("totalrainin", IN_TO_MM),
    ),
    // Light
    plain(
        "solarradiation",
        "Solar radiation",
        Some("lux"),
        "value.brightness",
        (Some(0.0), Some(300_000.0)),
        PEAKS,
        [
            src("solarradiation", DEVICE_SOLAR),
            src("solarradiation", WM2_TO_LUX),
            src("solarradiation", WM2_TO_LUX),
        ],
    ),
    plain(
        "uvraw",
        "UV raw",
        None,
        "value",
        (Some(0.0), Some(65_534.0)),
        PEAKS,
        [src("UVraw", None), None, None],
    ),
    plain(
        "uvi",
        "UV index",
        None,
        "value.uv",
        (Some(0.0), Some(20.0)),
        PEAKS,
        [src("UV", None), src("UV", None), src("uv", None)],
    ),
];

/// Look up a definition by id.
pub fn find(id: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.id == id)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let mut seen = HashSet::new();
        for field in FIELDS {
            assert!(seen.insert(field.id), "duplicate id {}", field.id);
        }
    }

    #[test]
    fn test_every_field_has_a_primary_channel() {
        for field in FIELDS {
            assert!(field.primary_channel().is_some(), "{}", field.id);
        }
    }

    #[test]
    fn test_unit_options_have_one_canonical_entry() {
        for field in FIELDS.iter().filter(|f| !f.unit_options.is_empty()) {
            let canonical: Vec<_> = field
                .unit_options
                .iter()
                .filter(|o| o.to_canonical.is_none())
                .collect();
            assert_eq!(canonical.len(), 1, "{}", field.id);
            assert_eq!(Some(canonical[0].display_unit), field.unit, "{}", field.id);
        }
    }

    #[test]
    fn test_unit_groups_come_with_options() {
        for field in FIELDS {
            assert_eq!(
                field.unit_group.is_some(),
                !field.unit_options.is_empty(),
                "{}",
                field.id
            );
        }
    }

    #[test]
    fn test_lookup() {
        let field = find("outdoortemp").unwrap();
        assert_eq!(field.source(Vocabulary::Wunderground).unwrap().pattern, "tempf");
        assert_eq!(field.source(Vocabulary::DeviceBinary).unwrap().pattern, "temp");
        assert_eq!(field.primary_channel(), Some(Channel::Current));
        assert!(field.has_channel(Channel::DailyMin));
        assert!(field.unit_option("°F").is_some());
        assert!(find("nope").is_none());
    }
}
