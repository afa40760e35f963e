//! Scripted seed events loaded from an additional-seeds file, and the kernel
//! that applies them to a network's play susceptibles.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;

use crate::error::ConfigError;
use crate::network::Network;
use crate::ward::Wards;

/// One scheduled seeding event: on `day`, inject `count` new stage-0
/// infections into `ward`'s play pool (optionally restricted to a named
/// demographic).
#[derive(Debug, Clone, PartialEq)]
pub struct SeedEvent {
    pub day: u32,
    pub count: u32,
    pub ward: u32,
    pub demographic: Option<String>,
}

/// Load an additional-seeds file. Each line is `day_or_date, count,
/// ward_id_or_name[, demographic]`, delimited by commas or by whitespace —
/// whichever the first non-blank line uses is assumed for the whole file.
/// `day` may be a bare day offset or an ISO (`YYYY-MM-DD`) date, resolved
/// against `start_date`; `ward` may be a bare integer id or a name matched
/// against `wards`.
pub fn load_additional_seeds(
    path: impl AsRef<Path>,
    wards: &Wards,
    start_date: Option<NaiveDate>,
) -> Result<Vec<SeedEvent>, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let comma_delimited = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.contains(','))
        .unwrap_or(false);

    let mut events = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = if comma_delimited {
            line.split(',').map(str::trim).collect()
        } else {
            line.split_whitespace().collect()
        };
        if fields.len() < 3 {
            return Err(ConfigError::MissingField("day, count, ward"));
        }

        let day = parse_day(fields[0], start_date, path)?;
        let count: u32 = fields[1].parse().map_err(|_| ConfigError::OutOfRange {
            field: "count",
            value: f64::NAN,
        })?;
        let ward = parse_ward(fields[2], wards)?;
        let demographic = fields.get(3).map(|s| s.to_string());

        events.push(SeedEvent {
            day,
            count,
            ward,
            demographic,
        });
    }

    Ok(events)
}

fn parse_day(field: &str, start_date: Option<NaiveDate>, path: &Path) -> Result<u32, ConfigError> {
    if let Ok(day) = field.parse::<u32>() {
        return Ok(day);
    }
    let date = NaiveDate::parse_from_str(field, "%Y-%m-%d").map_err(|_| ConfigError::OutOfRange {
        field: "day_or_date",
        value: f64::NAN,
    })?;
    let start = start_date.ok_or_else(|| ConfigError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "additional-seeds file uses ISO dates but no start_date was supplied",
        ),
    })?;
    let offset = (date - start).num_days();
    if offset < 0 {
        return Err(ConfigError::OutOfRange {
            field: "day_or_date",
            value: offset as f64,
        });
    }
    Ok(offset as u32)
}

fn parse_ward(field: &str, wards: &Wards) -> Result<u32, ConfigError> {
    if let Ok(id) = field.parse::<u32>() {
        return Ok(id);
    }
    wards.index_of_name(field).ok_or(ConfigError::OutOfRange {
        field: "ward",
        value: f64::NAN,
    })
}

/// Apply one seed event to `network`'s play pool, clamping to the
/// susceptibles available and warning on shortfall. Returns the number of
/// infections actually seeded.
pub fn apply_seed_event(network: &mut Network, infections_play_stage0: &mut [u32], event: &SeedEvent) -> u32 {
    let node = &mut network.nodes[event.ward as usize];
    let available = node.play_suscept.max(0.0) as u32;
    let applied = event.count.min(available);
    if applied < event.count {
        tracing::warn!(
            ward = event.ward,
            requested = event.count,
            available,
            "additional seed event requests more infections than available susceptibles; capping"
        );
    }
    node.play_suscept -= applied as f64;
    infections_play_stage0[event.ward as usize] += applied;
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::tests_support::sample;
    use crate::ward::Ward;

    fn wards_with_named(name: &str) -> Wards {
        let mut wards = Wards::new();
        wards
            .insert(Ward::new().with_id(1).unwrap().with_info(crate::ward::WardInfo::new().with_name(name)))
            .unwrap();
        wards.insert(Ward::new().with_id(2).unwrap()).unwrap();
        wards.resolve().unwrap();
        wards
    }

    #[test]
    fn parses_comma_delimited_file_with_numeric_day_and_ward() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seeds.csv");
        fs::write(&path, "10, 5, 2\n15, 3, 2\n").unwrap();
        let wards = wards_with_named("Oxford East");
        let events = load_additional_seeds(&path, &wards, None).unwrap();
        assert_eq!(
            events,
            vec![
                SeedEvent { day: 10, count: 5, ward: 2, demographic: None },
                SeedEvent { day: 15, count: 3, ward: 2, demographic: None },
            ]
        );
    }

    #[test]
    fn parses_whitespace_delimited_file_with_ward_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seeds.txt");
        fs::write(&path, "10 5 OxfordEast\n").unwrap();
        let wards = wards_with_named("OxfordEast");
        let events = load_additional_seeds(&path, &wards, None).unwrap();
        assert_eq!(events[0].ward, 1);
    }

    #[test]
    fn resolves_iso_date_relative_to_start_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seeds.csv");
        fs::write(&path, "2020-03-11, 5, 2\n").unwrap();
        let wards = wards_with_named("Oxford East");
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let events = load_additional_seeds(&path, &wards, Some(start)).unwrap();
        assert_eq!(events[0].day, 10);
    }

    #[test]
    fn apply_seed_event_clamps_to_available_susceptibles() {
        let mut wards = Wards::new();
        wards.insert(Ward::new().with_id(1).unwrap().with_num_players(3)).unwrap();
        wards.resolve().unwrap();
        let mut network = Network::compile(&wards, sample(), 1).unwrap();
        let mut play_stage0 = vec![0u32; (network.nnodes + 1) as usize];

        let event = SeedEvent { day: 1, count: 10, ward: 1, demographic: None };
        let applied = apply_seed_event(&mut network, &mut play_stage0, &event);

        assert_eq!(applied, 3);
        assert_eq!(play_stage0[1], 3);
        assert_eq!(network.nodes[1].play_suscept, 0.0);
    }
}
