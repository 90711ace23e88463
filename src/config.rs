//! Run configuration: the caller's credential, the UTC report window, vendor
//! client settings read from the environment, and report tuning knobs.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://mapon.com/api/v1";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Vendor API key. Forwarded verbatim as the `key` query parameter and never
/// printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// # Errors
    ///
    /// Rejects empty or whitespace-only keys.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            bail!("API key must not be empty");
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Closed UTC interval the report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }
}

/// Which side of the window a user-supplied time string describes. A bare
/// date expands to the first second of the day for `Start` and the last for `End`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSide {
    Start,
    End,
}

/// Zone in which local window bounds are read: an IANA name such as
/// `Europe/Kyiv`, with daylight saving, or a fixed offset such as `+03:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportZone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl Default for ReportZone {
    fn default() -> Self {
        ReportZone::Named(Tz::UTC)
    }
}

impl FromStr for ReportZone {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(offset) = s.parse::<FixedOffset>() {
            return Ok(ReportZone::Fixed(offset));
        }
        s.parse::<Tz>()
            .map(ReportZone::Named)
            .map_err(|_| format!("unknown timezone '{s}', expected an IANA name or +HH:MM"))
    }
}

impl fmt::Display for ReportZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportZone::Named(tz) => f.write_str(tz.name()),
            ReportZone::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

impl ReportZone {
    /// Converts a wall-clock time to UTC. An ambiguous time (clocks turned
    /// back) resolves to its earliest instant for `Start` and its latest for
    /// `End`, so the window never shrinks.
    ///
    /// # Errors
    ///
    /// Fails for a wall-clock time skipped by a forward clock change.
    pub fn localize(&self, naive: NaiveDateTime, side: WindowSide) -> Result<DateTime<Utc>> {
        let instant = match self {
            ReportZone::Named(tz) => localize_in(tz, naive, side),
            ReportZone::Fixed(offset) => localize_in(offset, naive, side),
        };
        instant.with_context(|| format!("{naive} does not exist in {self}"))
    }

    fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            ReportZone::Named(tz) => now.with_timezone(tz).date_naive(),
            ReportZone::Fixed(offset) => now.with_timezone(offset).date_naive(),
        }
    }
}

fn localize_in<Z: TimeZone>(
    zone: &Z,
    naive: NaiveDateTime,
    side: WindowSide,
) -> Option<DateTime<Utc>> {
    let local = zone.from_local_datetime(&naive);
    let picked = match side {
        WindowSide::Start => local.earliest(),
        WindowSide::End => local.latest(),
    };
    picked.map(|dt| dt.with_timezone(&Utc))
}

/// Parses a user-entered instant into UTC.
///
/// Accepts RFC 3339 (`2024-06-01T00:00:00+03:00`), which carries its own
/// offset, or a local `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or
/// `YYYY-MM-DD` read in `zone`.
pub fn parse_local_instant(input: &str, zone: ReportZone, side: WindowSide) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(side_time(side)))
        })
        .with_context(|| format!("unrecognised date/time '{input}'"))?;

    zone.localize(naive, side)
}

/// Default window: start of yesterday through end of today in `zone`.
pub fn default_window(now: DateTime<Utc>, zone: ReportZone) -> Result<ReportWindow> {
    let today = zone.today(now);
    let yesterday = today.pred_opt().context("date underflow")?;

    Ok(ReportWindow::new(
        zone.localize(yesterday.and_time(side_time(WindowSide::Start)), WindowSide::Start)?,
        zone.localize(today.and_time(side_time(WindowSide::End)), WindowSide::End)?,
    ))
}

fn side_time(side: WindowSide) -> NaiveTime {
    match side {
        WindowSide::Start => NaiveTime::MIN,
        WindowSide::End => NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN),
    }
}

/// Vendor endpoint and timeout settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Reads `MAPON_BASE_URL`, `MAPON_REQUEST_TIMEOUT_SECS` and
    /// `MAPON_CONNECT_TIMEOUT_SECS`, keeping defaults for anything unset or
    /// unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("MAPON_BASE_URL")
            .ok()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.base_url);

        Self {
            base_url,
            request_timeout: secs_from_env("MAPON_REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout),
            connect_timeout: secs_from_env("MAPON_CONNECT_TIMEOUT_SECS")
                .unwrap_or(defaults.connect_timeout),
        }
    }
}

fn secs_from_env(var: &str) -> Option<Duration> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            warn!(var, value = %raw, "Ignoring invalid timeout, using default");
            None
        }
    }
}

/// Knobs for one report run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Maximum number of vehicles processed at once.
    pub concurrency: usize,
    /// Drop roster units that do not report a positive mileage.
    pub require_mileage: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            require_mileage: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_credential_rejects_blank() {
        assert!(Credential::new("   ").is_err());
        assert_eq!(Credential::new(" abc ").unwrap().expose(), "abc");
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let key = Credential::new("top-secret").unwrap();
        assert!(!format!("{key:?}").contains("top-secret"));
    }

    #[test]
    fn test_parse_rfc3339_keeps_own_offset() {
        let zone: ReportZone = "+05:00".parse().unwrap();
        let parsed =
            parse_local_instant("2024-06-01T03:00:00+03:00", zone, WindowSide::Start).unwrap();
        assert_eq!(parsed, utc("2024-06-01T00:00:00Z"));
    }

    #[test]
    fn test_parse_naive_uses_selected_offset() {
        let zone: ReportZone = "+03:00".parse().unwrap();
        let parsed = parse_local_instant("2024-06-01 10:30:00", zone, WindowSide::Start).unwrap();
        assert_eq!(parsed, utc("2024-06-01T07:30:00Z"));
    }

    #[test]
    fn test_parse_bare_date_expands_by_side() {
        let zone = ReportZone::default();
        let start = parse_local_instant("2024-06-01", zone, WindowSide::Start).unwrap();
        let end = parse_local_instant("2024-06-01", zone, WindowSide::End).unwrap();
        assert_eq!(start, utc("2024-06-01T00:00:00Z"));
        assert_eq!(end, utc("2024-06-01T23:59:59Z"));
    }

    #[test]
    fn test_parse_garbage_fails() {
        let zone = ReportZone::default();
        assert!(parse_local_instant("yesterday", zone, WindowSide::Start).is_err());
    }

    #[test]
    fn test_default_window_spans_yesterday_and_today() {
        let zone: ReportZone = "+02:00".parse().unwrap();
        let window = default_window(utc("2024-06-10T23:30:00Z"), zone).unwrap();
        // 23:30Z is already June 11 at +02:00.
        assert_eq!(window.start, utc("2024-06-09T22:00:00Z"));
        assert_eq!(window.end, utc("2024-06-11T21:59:59Z"));
        assert!(window.is_ordered());
    }

    fn kyiv() -> ReportZone {
        "Europe/Kyiv".parse().unwrap()
    }

    #[test]
    fn test_zone_parsing() {
        assert_eq!(
            "+03:00".parse::<ReportZone>().unwrap(),
            ReportZone::Fixed(FixedOffset::east_opt(3 * 3600).unwrap())
        );
        assert_eq!(kyiv(), ReportZone::Named(Tz::Europe__Kyiv));
        assert_eq!("UTC".parse::<ReportZone>().unwrap(), ReportZone::default());
        assert!("Mars/Olympus".parse::<ReportZone>().is_err());
        assert_eq!(kyiv().to_string(), "Europe/Kyiv");
    }

    #[test]
    fn test_named_zone_follows_daylight_saving() {
        // Kyiv moves from +02:00 to +03:00 on 2024-03-31.
        let start = parse_local_instant("2024-03-30", kyiv(), WindowSide::Start).unwrap();
        let end = parse_local_instant("2024-04-01", kyiv(), WindowSide::End).unwrap();
        assert_eq!(start, utc("2024-03-29T22:00:00Z"));
        assert_eq!(end, utc("2024-04-01T20:59:59Z"));
    }

    #[test]
    fn test_skipped_local_time_is_rejected() {
        let err = parse_local_instant("2024-03-31 03:30:00", kyiv(), WindowSide::Start);
        assert!(err.is_err());
    }

    #[test]
    fn test_repeated_local_time_widens_window() {
        // 03:30 happens twice on 2024-10-27 in Kyiv.
        let start = parse_local_instant("2024-10-27 03:30:00", kyiv(), WindowSide::Start).unwrap();
        let end = parse_local_instant("2024-10-27 03:30:00", kyiv(), WindowSide::End).unwrap();
        assert_eq!(start, utc("2024-10-27T00:30:00Z"));
        assert_eq!(end, utc("2024-10-27T01:30:00Z"));
    }

    #[test]
    fn test_default_window_in_named_zone() {
        let window = default_window(utc("2024-07-15T12:00:00Z"), kyiv()).unwrap();
        assert_eq!(window.start, utc("2024-07-13T21:00:00Z"));
        assert_eq!(window.end, utc("2024-07-15T20:59:59Z"));
    }
}
