// Input records: roster/contract JSON, service-time CSV, signed-contract CSV,
// and the per-season stat line shared with the stats database.
//
// Malformed rows are logged and skipped; only unreadable files are errors.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::valuation::calibration::SignedContract;
use crate::valuation::contracts::ContractTerms;
use crate::valuation::role::Role;
use crate::valuation::service_time::ServiceTimeRecord;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One player from the roster file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    #[serde(alias = "id", alias = "mlbam_id")]
    pub player_id: u32,
    pub name: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default, alias = "role")]
    pub role_hint: Option<Role>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub contract: ContractTerms,
    /// Explicit workload-spike flag; derived from innings when absent.
    #[serde(default)]
    pub workload_spike: Option<bool>,
    #[serde(default)]
    pub il_history_years: u32,
}

/// One player-season of usage and rate stats. Batting and pitching lines are
/// merged; a side the player did not play is zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SeasonStats {
    pub season: i32,
    pub pa: f64,
    pub batting_war: f64,
    pub ops_plus: Option<f64>,
    pub ip: f64,
    pub games_pitched: f64,
    pub games_started: f64,
    pub pitching_war: f64,
    pub fip_minus: Option<f64>,
}

/// Service time keyed by player, plus prior-season days for the Super Two
/// cohort when the source provides them.
#[derive(Debug, Clone, Default)]
pub struct ServiceTimeData {
    pub records: HashMap<u32, ServiceTimeRecord>,
    pub prior_season_days: HashMap<u32, u32>,
}

// ---------------------------------------------------------------------------
// Raw serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawServiceTime {
    player_id: u32,
    years: u32,
    days: u32,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    prior_season_days: Option<u32>,
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_players_from_reader<R: Read>(rdr: R) -> Result<Vec<PlayerRecord>, serde_json::Error> {
    let rows: Vec<serde_json::Value> = serde_json::from_reader(rdr)?;
    let mut players = Vec::with_capacity(rows.len());
    let mut seen = HashMap::new();
    for (index, row) in rows.into_iter().enumerate() {
        match serde_json::from_value::<PlayerRecord>(row) {
            Ok(player) => {
                if let Some(&previous) = seen.get(&player.player_id) {
                    warn!(
                        "duplicate roster entry for player {}, keeping the later row",
                        player.player_id
                    );
                    players[previous] = player;
                } else {
                    seen.insert(player.player_id, players.len());
                    players.push(player);
                }
            }
            Err(e) => {
                warn!("skipping malformed player record #{index}: {e}");
            }
        }
    }
    Ok(players)
}

fn load_service_time_from_reader<R: Read>(rdr: R) -> Result<ServiceTimeData, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut data = ServiceTimeData::default();
    for result in reader.deserialize::<RawServiceTime>() {
        match result {
            Ok(raw) => {
                if data.records.contains_key(&raw.player_id) {
                    warn!("duplicate service time for player {}, using latest row", raw.player_id);
                }
                if let Some(days) = raw.prior_season_days {
                    data.prior_season_days.insert(raw.player_id, days);
                }
                let label = raw.label.filter(|l| !l.is_empty());
                let mut record = ServiceTimeRecord::new(raw.player_id, raw.years, raw.days);
                record.label = label;
                data.records.insert(raw.player_id, record);
            }
            Err(e) => {
                warn!("skipping malformed service time row: {}", e);
            }
        }
    }
    Ok(data)
}

fn load_signed_contracts_from_reader<R: Read>(rdr: R) -> Result<Vec<SignedContract>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut contracts = Vec::new();
    for result in reader.deserialize::<SignedContract>() {
        match result {
            Ok(contract) => {
                if !(contract.aav_m.is_finite() && contract.projected_war.is_finite()) {
                    warn!(
                        "skipping signed contract {:?}: non-finite AAV or projection",
                        contract.name
                    );
                    continue;
                }
                contracts.push(contract);
            }
            Err(e) => {
                warn!("skipping malformed signed contract row: {}", e);
            }
        }
    }
    Ok(contracts)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, InputError> {
    std::fs::File::open(path).map_err(|e| InputError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load the roster JSON (an array of player records).
pub fn load_players(path: &Path) -> Result<Vec<PlayerRecord>, InputError> {
    load_players_from_reader(open(path)?).map_err(|e| InputError::Json {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn load_service_time(path: &Path) -> Result<ServiceTimeData, InputError> {
    load_service_time_from_reader(open(path)?).map_err(|e| InputError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn load_signed_contracts(path: &Path) -> Result<Vec<SignedContract>, InputError> {
    load_signed_contracts_from_reader(open(path)?).map_err(|e| InputError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::contracts::OptionType;

    const ROSTER: &str = r#"[
        {
            "player_id": 1,
            "name": "Young Hitter",
            "team": "SEA",
            "age": 23,
            "role": "H",
            "contract": {}
        },
        {
            "id": 2,
            "name": "Veteran Arm",
            "age": 31,
            "role_hint": "SP",
            "il_history_years": 2,
            "contract": {
                "contract_years": [
                    {"season": 2026, "salary_m": 20.0, "is_guaranteed": true}
                ],
                "options": [
                    {"season": 2027, "type": "CO", "salary_m": 18.0, "buyout_m": 2.0}
                ],
                "aav_m": 20.0
            }
        },
        {"name": "No Id"},
        {"player_id": 3, "name": "Unknown Age"}
    ]"#;

    #[test]
    fn players_load_and_skip_malformed() {
        let players = load_players_from_reader(ROSTER.as_bytes()).unwrap();
        assert_eq!(players.len(), 3);

        assert_eq!(players[0].role_hint, Some(Role::Hitter));
        assert_eq!(players[0].contract, ContractTerms::default());

        let vet = &players[1];
        assert_eq!(vet.player_id, 2);
        assert_eq!(vet.role_hint, Some(Role::Starter));
        assert_eq!(vet.il_history_years, 2);
        assert_eq!(vet.contract.options[0].option_type, OptionType::Club);
        assert_eq!(vet.contract.contract_years[0].is_guaranteed, Some(true));

        assert_eq!(players[2].age, None);
    }

    #[test]
    fn duplicate_players_keep_later_row() {
        let json = r#"[
            {"player_id": 5, "name": "First", "age": 25},
            {"player_id": 5, "name": "Second", "age": 26}
        ]"#;
        let players = load_players_from_reader(json.as_bytes()).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "Second");
    }

    #[test]
    fn roster_must_be_json_array() {
        assert!(load_players_from_reader("{\"players\": 1}".as_bytes()).is_err());
    }

    #[test]
    fn service_time_csv_with_optional_columns() {
        let csv = "player_id,years,days,label,prior_season_days\n\
                   1,2,120,2.120,118\n\
                   2,0,15,,\n\
                   bad,row,here,,\n\
                   3,6,0,6.000,\n";
        let data = load_service_time_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(data.records.len(), 3);
        assert_eq!(data.records[&1].total_service_days(), 2 * 172 + 120);
        assert_eq!(data.records[&1].label.as_deref(), Some("2.120"));
        assert_eq!(data.records[&2].label, None);
        assert_eq!(data.prior_season_days.get(&1), Some(&118));
        assert_eq!(data.prior_season_days.get(&2), None);
    }

    #[test]
    fn service_time_csv_without_optional_columns() {
        let csv = "player_id,years,days\n7,1,100\n";
        let data = load_service_time_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(data.records[&7].years, 1);
        assert!(data.prior_season_days.is_empty());
    }

    #[test]
    fn signed_contracts_csv() {
        let csv = "player_id,name,signed_season,aav_m,years,projected_war\n\
                   10,Free Agent,2025,25.0,4,2.5\n\
                   ,Unnamed,2024,12.0,2,1.2\n\
                   11,Broken,2025,NaN,3,2.0\n\
                   12,Garbage,twenty,1,1,1\n";
        let contracts = load_signed_contracts_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(contracts.len(), 2);
        assert_eq!(contracts[0].player_id, Some(10));
        assert_eq!(contracts[1].player_id, None);
        assert!((contracts[1].aav_m - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = std::env::temp_dir().join("tvp_inputs_test_does_not_exist.json");
        assert!(matches!(load_players(&path), Err(InputError::Io { .. })));
    }
}
