// SQLite season-stat source (batting_stats, pitching_stats).

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::inputs::SeasonStats;

/// One batting season as stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BattingLine {
    pub player_id: u32,
    pub season: i32,
    pub pa: f64,
    pub war: f64,
    pub ops_plus: Option<f64>,
}

/// One pitching season as stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchingLine {
    pub player_id: u32,
    pub season: i32,
    pub ip: f64,
    pub games: f64,
    pub games_started: f64,
    pub war: f64,
    pub fip_minus: Option<f64>,
}

/// Per-season usage and rate stats keyed by player id and season.
pub struct StatsDatabase {
    conn: Connection,
}

impl StatsDatabase {
    /// Open (or create) the database at `path` and ensure both tables exist.
    /// Pass `":memory:"` for an ephemeral database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open stats database at {path}"))?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS batting_stats (
                player_id INTEGER NOT NULL,
                season    INTEGER NOT NULL,
                pa        REAL NOT NULL DEFAULT 0,
                war       REAL NOT NULL DEFAULT 0,
                ops_plus  REAL,
                PRIMARY KEY (player_id, season)
            );

            CREATE TABLE IF NOT EXISTS pitching_stats (
                player_id INTEGER NOT NULL,
                season    INTEGER NOT NULL,
                ip        REAL NOT NULL DEFAULT 0,
                g         REAL NOT NULL DEFAULT 0,
                gs        REAL NOT NULL DEFAULT 0,
                war       REAL NOT NULL DEFAULT 0,
                fip_minus REAL,
                PRIMARY KEY (player_id, season)
            );
            ",
        )
        .context("failed to create stats schema")?;

        Ok(Self { conn })
    }

    pub fn upsert_batting(&self, line: &BattingLine) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO batting_stats (player_id, season, pa, war, ops_plus)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![line.player_id, line.season, line.pa, line.war, line.ops_plus],
            )
            .with_context(|| {
                format!("failed to store batting line {} / {}", line.player_id, line.season)
            })?;
        Ok(())
    }

    pub fn upsert_pitching(&self, line: &PitchingLine) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO pitching_stats
                     (player_id, season, ip, g, gs, war, fip_minus)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    line.player_id,
                    line.season,
                    line.ip,
                    line.games,
                    line.games_started,
                    line.war,
                    line.fip_minus
                ],
            )
            .with_context(|| {
                format!("failed to store pitching line {} / {}", line.player_id, line.season)
            })?;
        Ok(())
    }

    /// Distinct seasons present in either table, ascending.
    pub fn available_seasons(&self) -> Result<Vec<i32>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT season FROM batting_stats
                 UNION
                 SELECT season FROM pitching_stats
                 ORDER BY season",
            )
            .context("failed to prepare season query")?;
        let seasons = stmt
            .query_map([], |row| row.get::<_, i32>(0))
            .context("failed to query seasons")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to read season row")?;
        Ok(seasons)
    }

    /// Merged batting and pitching lines for `first..=last`, per player,
    /// ordered oldest season first.
    pub fn load_seasons(&self, first: i32, last: i32) -> Result<HashMap<u32, Vec<SeasonStats>>> {
        let mut merged: HashMap<u32, BTreeMap<i32, SeasonStats>> = HashMap::new();

        let mut stmt = self
            .conn
            .prepare(
                "SELECT player_id, season, pa, war, ops_plus FROM batting_stats
                 WHERE season BETWEEN ?1 AND ?2",
            )
            .context("failed to prepare batting query")?;
        let batting = stmt
            .query_map(params![first, last], |row| {
                Ok(BattingLine {
                    player_id: row.get(0)?,
                    season: row.get(1)?,
                    pa: row.get(2)?,
                    war: row.get(3)?,
                    ops_plus: row.get(4)?,
                })
            })
            .context("failed to query batting stats")?;
        for line in batting {
            let line = line.context("failed to read batting row")?;
            let entry = season_entry(&mut merged, line.player_id, line.season);
            entry.pa = line.pa;
            entry.batting_war = line.war;
            entry.ops_plus = line.ops_plus;
        }

        let mut stmt = self
            .conn
            .prepare(
                "SELECT player_id, season, ip, g, gs, war, fip_minus FROM pitching_stats
                 WHERE season BETWEEN ?1 AND ?2",
            )
            .context("failed to prepare pitching query")?;
        let pitching = stmt
            .query_map(params![first, last], |row| {
                Ok(PitchingLine {
                    player_id: row.get(0)?,
                    season: row.get(1)?,
                    ip: row.get(2)?,
                    games: row.get(3)?,
                    games_started: row.get(4)?,
                    war: row.get(5)?,
                    fip_minus: row.get(6)?,
                })
            })
            .context("failed to query pitching stats")?;
        for line in pitching {
            let line = line.context("failed to read pitching row")?;
            let entry = season_entry(&mut merged, line.player_id, line.season);
            entry.ip = line.ip;
            entry.games_pitched = line.games;
            entry.games_started = line.games_started;
            entry.pitching_war = line.war;
            entry.fip_minus = line.fip_minus;
        }

        Ok(merged
            .into_iter()
            .map(|(id, seasons)| (id, seasons.into_values().collect()))
            .collect())
    }
}

fn season_entry(
    merged: &mut HashMap<u32, BTreeMap<i32, SeasonStats>>,
    player_id: u32,
    season: i32,
) -> &mut SeasonStats {
    merged
        .entry(player_id)
        .or_default()
        .entry(season)
        .or_insert_with(|| SeasonStats {
            season,
            ..SeasonStats::default()
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
