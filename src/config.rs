use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
#[cfg(test)]
use std::collections::HashMap;
use std::env;
use std::path::Path;

use crate::calendar::{CutoffTable, WorkWeek, WorkdayCalendar};
use crate::clock::{HourConversion, ReferenceOffset};

pub const DEFAULT_CUTOFFS: &str = "wholesale=20,retail=15";
pub const DEFAULT_WORKDAYS: &str = "CA=1,2,3,4,5,6;US=1,2,3,4,5";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    // Channel cutoff hours, reference timezone
    pub cutoffs: CutoffTable,

    // Location working weeks
    pub workdays: WorkdayCalendar,

    // Hours between UTC and the reference timezone (EDT = 4)
    pub offset: ReferenceOffset,

    // How UTC hours near midnight map into the reference timezone
    pub hour_conversion: HourConversion,
}

/// On-disk shape of a JSON config file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub cutoffs: Option<BTreeMap<String, u32>>,
    #[serde(default)]
    pub workdays: Option<BTreeMap<String, Vec<u32>>>,
    #[serde(default)]
    pub utc_offset_hours: Option<i32>,
    #[serde(default)]
    pub hour_conversion: Option<HourConversion>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env if present, ignore if missing
        Self::from_getter(|key| env::var(key).ok())
    }

    /// Parse config from a custom getter function (for testing)
    pub fn from_getter<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = get("SLA_CONFIG_PATH").filter(|p| !p.trim().is_empty()) {
            return Self::from_file(Path::new(path.trim()));
        }

        let cutoffs = parse_cutoffs(&get("SLA_CUTOFFS").unwrap_or_else(|| DEFAULT_CUTOFFS.to_string()))
            .context("SLA_CUTOFFS must look like 'wholesale=20,retail=15'")?;

        let workdays = parse_workdays(&get("SLA_WORKDAYS").unwrap_or_else(|| DEFAULT_WORKDAYS.to_string()))
            .context("SLA_WORKDAYS must look like 'CA=1,2,3,4,5,6;US=1,2,3,4,5'")?;

        let offset_hours: i32 = get("SLA_UTC_OFFSET_HOURS")
            .unwrap_or_else(|| "4".to_string())
            .trim()
            .parse()
            .context("SLA_UTC_OFFSET_HOURS must be a whole number of hours")?;
        let offset = ReferenceOffset::hours(offset_hours).context("SLA_UTC_OFFSET_HOURS out of range")?;

        let hour_conversion = match get("SLA_HOUR_CONVERSION").filter(|s| !s.trim().is_empty()) {
            Some(mode) => mode
                .parse()
                .map_err(anyhow::Error::msg)
                .context("SLA_HOUR_CONVERSION invalid")?,
            None => HourConversion::default(),
        };

        Ok(Config { cutoffs, workdays, offset, hour_conversion })
    }

    /// Create config from a HashMap (convenience for testing)
    #[cfg(test)]
    pub fn from_map(map: &HashMap<&str, &str>) -> Result<Self> {
        Self::from_getter(|key| map.get(key).map(|v| v.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read SLA_CONFIG_PATH '{}'", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid config file '{}'", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(raw).context("config JSON is malformed")?;
        let defaults = Config::default();

        let cutoffs = match file.cutoffs {
            Some(map) => CutoffTable::new(map).context("cutoffs")?,
            None => defaults.cutoffs,
        };

        let workdays = match file.workdays {
            Some(map) => {
                let mut weeks = Vec::with_capacity(map.len());
                for (code, days) in map {
                    let week = WorkWeek::from_days(days).with_context(|| format!("workdays.{}", code))?;
                    weeks.push((code, week));
                }
                WorkdayCalendar::new(weeks).context("workdays")?
            }
            None => defaults.workdays,
        };

        let offset = match file.utc_offset_hours {
            Some(hours) => ReferenceOffset::hours(hours).context("utc_offset_hours")?,
            None => defaults.offset,
        };

        Ok(Config {
            cutoffs,
            workdays,
            offset,
            hour_conversion: file.hour_conversion.unwrap_or(defaults.hour_conversion),
        })
    }

    /// Validate configuration values at startup.
    /// Returns Ok(()) if all validations pass, or Err with details of what failed.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.cutoffs.is_empty() {
            errors.push("No sales channels configured. Set SLA_CUTOFFS.".to_string());
        }

        if self.workdays.is_empty() {
            errors.push("No fulfillment locations configured. Set SLA_WORKDAYS.".to_string());
        }

        // Fulfillment hours past midnight UTC land on the next calendar day
        for (channel, hour) in self.cutoffs.entries() {
            let utc_hour = hour as i32 + self.offset.as_hours();
            if !(0..24).contains(&utc_hour) {
                tracing::warn!(
                    "Channel '{}' cutoff {}:00 is {}:00 UTC, fulfillment rolls to an adjacent day",
                    channel,
                    hour,
                    utc_hour.rem_euclid(24)
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )
        }
    }
}

/// Parse `channel=hour,channel=hour`
pub fn parse_cutoffs(raw: &str) -> Result<CutoffTable> {
    let mut entries: Vec<(String, u32)> = Vec::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (channel, hour) = pair
            .split_once('=')
            .with_context(|| format!("'{}' is missing '='", pair))?;
        let hour: u32 = hour
            .trim()
            .parse()
            .with_context(|| format!("'{}' is not a valid hour", hour.trim()))?;
        entries.push((channel.to_string(), hour));
    }
    Ok(CutoffTable::new(entries)?)
}

/// Parse `CC=d,d,d;CC=d,d`
pub fn parse_workdays(raw: &str) -> Result<WorkdayCalendar> {
    let mut entries: Vec<(String, WorkWeek)> = Vec::new();
    for block in raw.split(';').map(str::trim).filter(|b| !b.is_empty()) {
        let (code, days) = block
            .split_once('=')
            .with_context(|| format!("'{}' is missing '='", block))?;
        let days = days
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| d.parse::<u32>().with_context(|| format!("'{}' is not a weekday index", d)))
            .collect::<Result<Vec<_>>>()?;
        entries.push((code.to_string(), WorkWeek::from_days(days)?));
    }
    Ok(WorkdayCalendar::new(entries)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_env_empty() {
        let config = Config::from_map(&HashMap::new()).expect("should parse empty env");
        assert_eq!(config, Config::default());
        assert_eq!(config.cutoffs.cutoff_hour("retail"), Some(15));
        assert_eq!(config.workdays.work_week("CA"), Some(WorkWeek::MON_TO_SAT));
        assert_eq!(config.offset.as_hours(), 4);
        assert_eq!(config.hour_conversion, HourConversion::Wrapped);
    }

    #[test]
    fn test_custom_cutoffs() {
        let mut env = HashMap::new();
        env.insert("SLA_CUTOFFS", "Retail=12, marketplace=9");
        let config = Config::from_map(&env).expect("should parse");
        assert_eq!(config.cutoffs.cutoff_hour("retail"), Some(12));
        assert_eq!(config.cutoffs.cutoff_hour("MARKETPLACE"), Some(9));
        assert_eq!(config.cutoffs.cutoff_hour("wholesale"), None);
    }

    #[test]
    fn test_invalid_cutoff_hour() {
        let mut env = HashMap::new();
        env.insert("SLA_CUTOFFS", "retail=25");
        let err = format!("{:#}", Config::from_map(&env).unwrap_err());
        assert!(err.contains("SLA_CUTOFFS"), "error should mention SLA_CUTOFFS: {}", err);
        assert!(err.contains("outside 0-23"), "error should explain the range: {}", err);
    }

    #[test]
    fn test_cutoff_missing_equals() {
        let mut env = HashMap::new();
        env.insert("SLA_CUTOFFS", "retail15");
        assert!(Config::from_map(&env).is_err());
    }

    #[test]
    fn test_custom_workdays() {
        let mut env = HashMap::new();
        env.insert("SLA_WORKDAYS", "MX=1,2,3;US=1,2,3,4,5;");
        let config = Config::from_map(&env).expect("should parse");
        assert_eq!(config.workdays.work_week("MX").unwrap().days(), vec![1, 2, 3]);
        assert_eq!(config.workdays.len(), 2);
    }

    #[test]
    fn test_empty_work_week_rejected() {
        let mut env = HashMap::new();
        env.insert("SLA_WORKDAYS", "MX=");
        let err = format!("{:#}", Config::from_map(&env).unwrap_err());
        assert!(err.contains("SLA_WORKDAYS"), "error should mention SLA_WORKDAYS: {}", err);
    }

    #[test]
    fn test_weekday_out_of_range_rejected() {
        let mut env = HashMap::new();
        env.insert("SLA_WORKDAYS", "US=1,2,7");
        assert!(Config::from_map(&env).is_err());
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let mut env = HashMap::new();
        env.insert("SLA_CUTOFFS", "retail=15,RETAIL=9");
        let err = format!("{:#}", Config::from_map(&env).unwrap_err());
        assert!(err.contains("SLA_CUTOFFS"), "error should mention SLA_CUTOFFS: {}", err);
        assert!(err.contains("more than once"), "error should name the duplicate: {}", err);

        let mut env = HashMap::new();
        env.insert("SLA_WORKDAYS", "US=1;US=2");
        let err = format!("{:#}", Config::from_map(&env).unwrap_err());
        assert!(err.contains("SLA_WORKDAYS"), "error should mention SLA_WORKDAYS: {}", err);
        assert!(err.contains("'US'"), "error should name the location: {}", err);
    }

    #[test]
    fn test_from_json_case_variant_channels_rejected() {
        let err = Config::from_json(r#"{"cutoffs": {"retail": 15, "Retail": 9}}"#).unwrap_err();
        assert!(format!("{:#}", err).contains("more than once"));
    }

    #[test]
    fn test_offset_parsing() {
        let mut env = HashMap::new();
        env.insert("SLA_UTC_OFFSET_HOURS", "5");
        assert_eq!(Config::from_map(&env).unwrap().offset.as_hours(), 5);

        env.insert("SLA_UTC_OFFSET_HOURS", "four");
        let err = Config::from_map(&env).unwrap_err().to_string();
        assert!(err.contains("SLA_UTC_OFFSET_HOURS"), "error should mention offset: {}", err);

        env.insert("SLA_UTC_OFFSET_HOURS", "30");
        assert!(Config::from_map(&env).is_err());
    }

    #[test]
    fn test_hour_conversion_parsing() {
        let mut env = HashMap::new();
        env.insert("SLA_HOUR_CONVERSION", "legacy");
        assert_eq!(Config::from_map(&env).unwrap().hour_conversion, HourConversion::Legacy);

        env.insert("SLA_HOUR_CONVERSION", "");
        assert_eq!(Config::from_map(&env).unwrap().hour_conversion, HourConversion::Wrapped);

        env.insert("SLA_HOUR_CONVERSION", "sometimes");
        let err = Config::from_map(&env).unwrap_err().to_string();
        assert!(err.contains("SLA_HOUR_CONVERSION"), "error should mention mode: {}", err);
    }

    #[test]
    fn test_from_json_full() {
        let config = Config::from_json(
            r#"{
                "cutoffs": {"retail": 14, "b2b": 18},
                "workdays": {"DE": [1, 2, 3, 4, 5]},
                "utc_offset_hours": 5,
                "hour_conversion": "legacy"
            }"#,
        )
        .expect("should parse");
        assert_eq!(config.cutoffs.cutoff_hour("B2B"), Some(18));
        assert_eq!(config.workdays.work_week("DE"), Some(WorkWeek::WEEKDAYS));
        assert_eq!(config.workdays.work_week("US"), None);
        assert_eq!(config.offset.as_hours(), 5);
        assert_eq!(config.hour_conversion, HourConversion::Legacy);
    }

    #[test]
    fn test_from_json_partial_uses_defaults() {
        let config = Config::from_json(r#"{"cutoffs": {"retail": 10}}"#).expect("should parse");
        assert_eq!(config.cutoffs.cutoff_hour("retail"), Some(10));
        assert_eq!(config.workdays, WorkdayCalendar::default());
        assert_eq!(config.offset, ReferenceOffset::default());
    }

    #[test]
    fn test_from_json_rejects_unknown_fields() {
        assert!(Config::from_json(r#"{"cutoff": {"retail": 10}}"#).is_err());
    }

    #[test]
    fn test_from_json_rejects_empty_week() {
        let err = format!("{:#}", Config::from_json(r#"{"workdays": {"US": []}}"#).unwrap_err());
        assert!(err.contains("no working days"), "unexpected error: {}", err);
    }

    #[test]
    fn test_config_path_missing_file() {
        let mut env = HashMap::new();
        env.insert("SLA_CONFIG_PATH", "/nonexistent/fulfillsla.json");
        let err = format!("{:#}", Config::from_map(&env).unwrap_err());
        assert!(err.contains("SLA_CONFIG_PATH"), "error should mention path: {}", err);
    }

    #[test]
    fn test_config_path_overrides_env() {
        let path = std::env::temp_dir().join(format!("fulfillsla-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"cutoffs": {"retail": 9}}"#).unwrap();

        let path_str = path.to_string_lossy().to_string();
        let mut env = HashMap::new();
        env.insert("SLA_CONFIG_PATH", path_str.as_str());
        env.insert("SLA_CUTOFFS", "retail=12");
        let config = Config::from_map(&env).expect("should load file");
        std::fs::remove_file(&path).ok();

        assert_eq!(config.cutoffs.cutoff_hour("retail"), Some(9));
    }

    #[test]
    fn test_validation_default_passes() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validation_empty_tables() {
        let mut env = HashMap::new();
        env.insert("SLA_CUTOFFS", "");
        env.insert("SLA_WORKDAYS", " ");
        let config = Config::from_map(&env).expect("empty tables still parse");
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("SLA_CUTOFFS"), "error should mention channels: {}", err);
        assert!(err.contains("SLA_WORKDAYS"), "error should mention locations: {}", err);
    }
}
