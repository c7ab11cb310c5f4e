use chrono_tz::Tz;
use tracing::debug;

/// Countries clinics can register in, keyed by normalised name.
const COUNTRY_TIMEZONES: &[(&str, Tz)] = &[
    ("nigeria", Tz::Africa__Lagos),
    ("ghana", Tz::Africa__Accra),
    ("kenya", Tz::Africa__Nairobi),
    ("southafrica", Tz::Africa__Johannesburg),
    ("egypt", Tz::Africa__Cairo),
    ("unitedkingdom", Tz::Europe__London),
    ("uk", Tz::Europe__London),
    ("unitedstates", Tz::America__New_York),
    ("usa", Tz::America__New_York),
    ("canada", Tz::America__Toronto),
    ("india", Tz::Asia__Kolkata),
    ("unitedarabemirates", Tz::Asia__Dubai),
    ("uae", Tz::Asia__Dubai),
];

/// Maps a clinic's free-text country to the IANA zone its wall clock runs on.
///
/// Unknown or missing countries resolve to UTC without raising: slot and
/// availability computations must keep working when geo data is absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimezoneResolver;

impl TimezoneResolver {
    pub fn resolve(country: Option<&str>) -> Tz {
        let Some(country) = country else {
            return Tz::UTC;
        };

        let key: String = country
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        match COUNTRY_TIMEZONES.iter().find(|(name, _)| *name == key) {
            Some((_, tz)) => *tz,
            None => {
                debug!("No timezone mapping for country '{}', falling back to UTC", country);
                Tz::UTC
            }
        }
    }

    pub fn resolve_name(country: Option<&str>) -> &'static str {
        Self::resolve(country).name()
    }
}
