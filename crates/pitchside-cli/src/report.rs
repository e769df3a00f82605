// Request handlers: one per subcommand, each returning a JSON value.

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::Subcommand;
use serde_json::{json, Value};

use pitchside_core::coerce;
use pitchside_core::metrics::capability::{
    benchmark_by_movement, benchmark_distribution, capability_seasons, development_flags,
    in_season, player_movement_matrix, progression,
};
use pitchside_core::metrics::events::{match_list, summarize_events, EventFilter};
use pitchside_core::metrics::load::{
    accel_columns, accel_label, load_demand, session_seasons, sprint_summary, SprintMode,
};
use pitchside_core::metrics::notes::{dev_plan_view, external_notes, latest_objectives};
use pitchside_core::metrics::readiness::{readiness_report, Bucket, ReadinessFilter};
use pitchside_core::metrics::recovery::{
    daily_by_player, injury_counts, low_recovery_cards, recovery_seasons, scope_recovery,
    weekly_trend,
};
use pitchside_core::metrics::trend::{load_recovery_points, player_trends};
use pitchside_core::metrics::Season;
use pitchside_core::pipeline::{Pipeline, Tables};
use pitchside_core::records::{PlayerId, RecoveryRecord, Roster};
use pitchside_core::writeback::{
    DevPlanUpdate, ExternalNoteEntry, InjuryEntry, MatchEventEntry, NewEntry, RecoveryEntry,
    TrainingLoadEntry,
};

use super::{Command, Mode, Scope};

const PLAN_STATUSES: [&str; 4] = ["Not Started", "In Progress", "On Hold", "Completed"];

#[derive(Subcommand)]
pub(crate) enum AddCommand {
    /// GPS session row
    TrainingLoad {
        #[arg(long)]
        player: String,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long)]
        distance: f64,
        #[arg(long)]
        opposition: Option<String>,
        /// Efforts above 2.5 m/s²
        #[arg(long)]
        accel: Option<u32>,
    },
    /// Recovery survey score (0-100)
    Recovery {
        #[arg(long)]
        player: String,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long)]
        score: f64,
        #[arg(long)]
        note: Option<String>,
    },
    /// Injury occurrence
    Injury {
        #[arg(long)]
        player: String,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long)]
        injury: String,
    },
    /// External factor note; omit --player for the whole team
    Note {
        #[arg(long)]
        player: Option<String>,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long = "type", default_value = "Other")]
        factor_type: String,
        note: String,
    },
    /// Development plan update
    DevPlan {
        #[arg(long)]
        player: String,
        #[arg(long)]
        goal: String,
        #[arg(long, default_value = "")]
        dimensions: String,
        #[arg(long, value_parser = PLAN_STATUSES, default_value = "In Progress")]
        status: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Match event
    Event {
        #[arg(long)]
        player: String,
        #[arg(long)]
        opponent: String,
        #[arg(long = "type")]
        event_type: String,
        #[arg(long, value_parser = parse_timestamp)]
        timestamp: Option<NaiveDateTime>,
        #[arg(long, default_value_t = 52.5)]
        x: f64,
        #[arg(long, default_value_t = 34.0)]
        y: f64,
        #[arg(long)]
        success: Option<bool>,
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    coerce::parse_date(raw).ok_or_else(|| format!("unrecognised date '{raw}'"))
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    coerce::parse_datetime(raw).ok_or_else(|| format!("unrecognised timestamp '{raw}'"))
}

fn player_id(roster: &Roster, raw: &str) -> anyhow::Result<PlayerId> {
    roster
        .resolve(raw)
        .with_context(|| format!("unknown player '{raw}'"))
}

fn optional_player(roster: &Roster, raw: Option<&str>) -> anyhow::Result<Option<PlayerId>> {
    raw.map(|r| player_id(roster, r)).transpose()
}

fn season(raw: Option<&str>) -> anyhow::Result<Option<Season>> {
    match raw {
        None => Ok(None),
        Some(label) => match Season::parse(label) {
            Some(s) => Ok(Some(s)),
            None => bail!("season must look like 2024/2025, got '{label}'"),
        },
    }
}

fn load_tables(pipeline: &mut Pipeline) -> anyhow::Result<Tables> {
    pipeline.tables().context("failed to load source tables")
}

pub(crate) fn run(pipeline: &mut Pipeline, command: Command) -> anyhow::Result<Value> {
    match command {
        Command::Status => status(pipeline),
        Command::Readiness { scope } => readiness(pipeline, &scope),
        Command::Trends { scope } => {
            let tables = load_tables(pipeline)?;
            let scoped = recovery_scope(&tables, pipeline.roster(), &scope)?;
            let points = load_recovery_points(&tables.sessions, &scoped.records);
            Ok(json!({
                "seasons": scoped.seasons,
                "season": scoped.season,
                "trends": player_trends(&points, &pipeline.config().thresholds, pipeline.roster()),
            }))
        }
        Command::Load { player, season: label } => {
            let tables = load_tables(pipeline)?;
            let id = player_id(pipeline.roster(), &player)?;
            let seasons = session_seasons(&tables.sessions, Some(id));
            let selected = season(label.as_deref())?.or_else(|| seasons.first().copied());
            let demand = selected.and_then(|s| load_demand(&tables.sessions, id, Some(s), pipeline.roster()));
            Ok(json!({ "seasons": seasons, "season": selected, "demand": demand }))
        }
        Command::Sprint {
            column,
            mode,
            season: label,
        } => sprint(pipeline, column, mode, label.as_deref()),
        Command::Recovery { scope } => recovery(pipeline, &scope),
        Command::Injuries => {
            let tables = load_tables(pipeline)?;
            Ok(serde_json::to_value(injury_counts(&tables.recovery))?)
        }
        Command::Capability { scope } => capability(pipeline, &scope),
        Command::Events {
            match_id,
            player,
            event_types,
        } => {
            let tables = load_tables(pipeline)?;
            let filter = EventFilter {
                match_id,
                player: optional_player(pipeline.roster(), player.as_deref())?,
                event_types,
            };
            let selected = filter.apply(&tables.events);
            Ok(json!({
                "matches": match_list(&tables.events),
                "summary": summarize_events(&selected, &pipeline.config().thresholds),
                "events": selected,
            }))
        }
        Command::DevPlan { player } => {
            let tables = load_tables(pipeline)?;
            match optional_player(pipeline.roster(), player.as_deref())? {
                Some(id) => Ok(serde_json::to_value(dev_plan_view(
                    &tables.dev_plan,
                    id,
                    pipeline.roster(),
                ))?),
                None => Ok(serde_json::to_value(latest_objectives(&tables.dev_plan))?),
            }
        }
        Command::Notes => {
            let tables = load_tables(pipeline)?;
            Ok(serde_json::to_value(external_notes(&tables.external, pipeline.roster()))?)
        }
        Command::Priority => {
            let tables = load_tables(pipeline)?;
            Ok(serde_json::to_value(&tables.priority)?)
        }
        Command::Fbref { player } => {
            let season = pipeline.fbref().context("failed to load FBref statistics")?;
            match player {
                Some(name) => {
                    let row = season
                        .player(&pipeline.config().fbref, &name)
                        .with_context(|| format!("no FBref row for '{name}'"))?;
                    Ok(serde_json::to_value(row.to_map())?)
                }
                None => Ok(json!({
                    "categories": season.categories,
                    "players": season.table,
                    "warnings": season.warnings,
                })),
            }
        }
        Command::Ucl => {
            let season = pipeline.ucl().context("failed to load UCL matches")?;
            let matches: Vec<Value> = season
                .matches
                .iter()
                .map(|m| {
                    json!({
                        "file": m.file,
                        "phase": m.phase,
                        "order": m.order,
                        "score": m.score,
                        "players": m.table.len(),
                    })
                })
                .collect();
            Ok(json!({
                "phases": season.phases(),
                "matches": matches,
                "unlisted": season.unlisted,
                "warnings": season.warnings,
            }))
        }
        Command::Add { entry } => add(pipeline, entry),
    }
}

fn status(pipeline: &mut Pipeline) -> anyhow::Result<Value> {
    let tables = load_tables(pipeline)?;
    let sources: serde_json::Map<String, Value> = tables
        .normalized
        .iter()
        .map(|(source, table)| {
            (
                source.label().to_string(),
                json!({ "rows": table.len(), "columns": table.headers() }),
            )
        })
        .collect();
    Ok(json!({
        "sources": sources,
        "synthesized": tables.synthesized,
        "warnings": tables.warnings,
    }))
}

fn readiness(pipeline: &mut Pipeline, scope: &Scope) -> anyhow::Result<Value> {
    let tables = load_tables(pipeline)?;
    let config = pipeline.config();
    let filter = ReadinessFilter {
        season: season(scope.season.as_deref())?,
        player: optional_player(pipeline.roster(), scope.player.as_deref())?,
    };
    let rows = tables.readiness_rows(config);
    let report = readiness_report(&rows, &filter, &config.thresholds, pipeline.roster());
    let zones: Vec<Value> = [Bucket::Low, Bucket::Moderate, Bucket::High]
        .iter()
        .map(|b| {
            let (from, to) = b.zone(&config.thresholds);
            json!({ "band": b.label(), "from": from, "to": to })
        })
        .collect();
    Ok(json!({ "report": report, "zones": zones }))
}

fn sprint(
    pipeline: &mut Pipeline,
    column: Option<String>,
    mode: Mode,
    label: Option<&str>,
) -> anyhow::Result<Value> {
    let tables = load_tables(pipeline)?;
    let columns = accel_columns(&tables.sessions);
    let Some(column) = column.or_else(|| columns.first().cloned()) else {
        return Ok(json!({ "columns": columns, "summary": [] }));
    };
    if !columns.contains(&column) {
        bail!("no acceleration column '{column}'; available: {}", columns.join(", "));
    }
    let mode = match mode {
        Mode::Total => SprintMode::Total,
        Mode::AveragePerSession => SprintMode::AveragePerSession,
    };
    let seasons = session_seasons(&tables.sessions, None);
    let selected = season(label)?.or_else(|| seasons.first().copied());
    let summary = match selected {
        Some(s) => sprint_summary(&tables.sessions, &column, mode, Some(s), pipeline.roster()),
        None => Vec::new(),
    };
    Ok(json!({
        "seasons": seasons,
        "season": selected,
        "columns": columns,
        "column": column,
        "label": accel_label(&column),
        "mode": mode,
        "summary": summary,
    }))
}

/// Recovery entries of the requested season (latest by default), narrowed
/// to the requested player.
struct RecoveryScope {
    seasons: Vec<Season>,
    season: Option<Season>,
    records: Vec<RecoveryRecord>,
}

fn recovery_scope(tables: &Tables, roster: &Roster, scope: &Scope) -> anyhow::Result<RecoveryScope> {
    let player = optional_player(roster, scope.player.as_deref())?;
    let seasons = recovery_seasons(&tables.recovery, player);
    let selected = season(scope.season.as_deref())?.or_else(|| seasons.first().copied());
    let records = match selected {
        Some(s) => scope_recovery(&tables.recovery, s, player),
        None => Vec::new(),
    };
    Ok(RecoveryScope {
        seasons,
        season: selected,
        records,
    })
}

fn recovery(pipeline: &mut Pipeline, scope: &Scope) -> anyhow::Result<Value> {
    let tables = load_tables(pipeline)?;
    let roster = pipeline.roster();
    let thresholds = &pipeline.config().thresholds;
    let scoped = recovery_scope(&tables, roster, scope)?;
    let points = load_recovery_points(&tables.sessions, &scoped.records);
    Ok(json!({
        "seasons": scoped.seasons,
        "season": scoped.season,
        "weekly": weekly_trend(&scoped.records, thresholds),
        "daily": daily_by_player(&scoped.records, None, roster),
        "low_recovery": low_recovery_cards(&scoped.records, thresholds, roster),
        "load_vs_recovery": &points,
        "trends": player_trends(&points, thresholds, roster),
    }))
}

fn capability(pipeline: &mut Pipeline, scope: &Scope) -> anyhow::Result<Value> {
    let tables = load_tables(pipeline)?;
    let roster = pipeline.roster();
    let thresholds = &pipeline.config().thresholds;
    let seasons = capability_seasons(&tables.capability);
    let selected = season(scope.season.as_deref())?.or_else(|| seasons.first().copied());
    let records = match selected {
        Some(s) => in_season(&tables.capability, s),
        None => tables.capability.clone(),
    };
    let player = optional_player(roster, scope.player.as_deref())?;
    Ok(json!({
        "seasons": seasons,
        "season": selected,
        "by_movement": benchmark_by_movement(&records),
        "matrix": player_movement_matrix(&records, roster),
        "distribution": benchmark_distribution(&records, thresholds),
        "progression": progression(&records, player),
        "flags": development_flags(&records, thresholds),
    }))
}

fn add(pipeline: &mut Pipeline, command: AddCommand) -> anyhow::Result<Value> {
    let today = Local::now().date_naive();
    let roster = pipeline.roster();
    let entry = match command {
        AddCommand::TrainingLoad {
            player,
            date,
            distance,
            opposition,
            accel,
        } => NewEntry::TrainingLoad(TrainingLoadEntry {
            date: date.unwrap_or(today),
            player_id: player_id(roster, &player)?,
            distance,
            opposition,
            accel_decel_over_2_5: accel,
        }),
        AddCommand::Recovery {
            player,
            date,
            score,
            note,
        } => NewEntry::Recovery(RecoveryEntry {
            date: date.unwrap_or(today),
            player_id: player_id(roster, &player)?,
            recovery_score: score,
            note,
        }),
        AddCommand::Injury {
            player,
            date,
            injury,
        } => NewEntry::Injury(InjuryEntry {
            date: date.unwrap_or(today),
            player_id: player_id(roster, &player)?,
            injury,
        }),
        AddCommand::Note {
            player,
            date,
            factor_type,
            note,
        } => NewEntry::ExternalNote(ExternalNoteEntry {
            date: date.unwrap_or(today),
            player_id: optional_player(roster, player.as_deref())?,
            factor_type,
            note,
        }),
        AddCommand::DevPlan {
            player,
            goal,
            dimensions,
            status,
            notes,
        } => NewEntry::DevPlan(DevPlanUpdate {
            player_id: player_id(roster, &player)?,
            long_term_goal: goal,
            dimensions,
            status,
            coach_notes: notes,
            last_update: Local::now().naive_local(),
        }),
        AddCommand::Event {
            player,
            opponent,
            event_type,
            timestamp,
            x,
            y,
            success,
            tags,
            notes,
        } => NewEntry::MatchEvent(MatchEventEntry {
            timestamp: timestamp.unwrap_or_else(|| Local::now().naive_local()),
            player_id: player_id(roster, &player)?,
            event_type,
            opponent,
            x,
            y,
            success,
            tags,
            notes,
        }),
    };
    let source = entry.source();
    let path = pipeline
        .append(&entry)
        .with_context(|| format!("failed to append {source} entry"))?;
    Ok(json!({ "source": source, "written": path }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitchside_core::config::Config;

    fn pipeline() -> (tempfile::TempDir, Pipeline) {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(Config::with_base_dir(dir.path()));
        (dir, pipeline)
    }

    #[test]
    fn status_on_empty_project_lists_every_source() {
        let (_dir, mut pipeline) = pipeline();
        let out = run(&mut pipeline, Command::Status).unwrap();
        assert_eq!(out["sources"].as_object().unwrap().len(), 7);
        assert_eq!(out["sources"]["gps"]["rows"], 0);
        assert!(out["synthesized"].as_array().unwrap().is_empty());
    }

    #[test]
    fn unknown_player_is_an_error() {
        let (_dir, mut pipeline) = pipeline();
        let err = run(
            &mut pipeline,
            Command::Load {
                player: "Nobody".into(),
                season: None,
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown player 'Nobody'"));
    }

    #[test]
    fn bad_season_label_is_an_error() {
        let (_dir, mut pipeline) = pipeline();
        let scope = Scope {
            season: Some("last year".into()),
            player: None,
        };
        assert!(run(&mut pipeline, Command::Readiness { scope }).is_err());
    }

    #[test]
    fn added_recovery_shows_in_injuries_and_recovery_views() {
        let (_dir, mut pipeline) = pipeline();
        let date = NaiveDate::from_ymd_opt(2024, 9, 2);
        let out = run(
            &mut pipeline,
            Command::Add {
                entry: AddCommand::Recovery {
                    player: "Vitinha".into(),
                    date,
                    score: 55.0,
                    note: None,
                },
            },
        )
        .unwrap();
        assert_eq!(out["source"], "recovery");

        run(
            &mut pipeline,
            Command::Add {
                entry: AddCommand::Injury {
                    player: "29".into(),
                    date,
                    injury: "Hamstring".into(),
                },
            },
        )
        .unwrap();

        let injuries = run(&mut pipeline, Command::Injuries).unwrap();
        assert_eq!(injuries[0]["injury"], "Hamstring");
        assert_eq!(injuries[0]["count"], 1);

        let scope = Scope {
            season: None,
            player: Some("vitinha".into()),
        };
        let recovery = run(&mut pipeline, Command::Recovery { scope }).unwrap();
        assert_eq!(recovery["season"], "2024/2025");
        let daily = recovery["daily"].as_array().unwrap();
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0]["player_id"], 17);
    }

    fn add_load(pipeline: &mut Pipeline, player: &str, date: NaiveDate, distance: f64) {
        let entry = AddCommand::TrainingLoad {
            player: player.into(),
            date: Some(date),
            distance,
            opposition: None,
            accel: Some(3),
        };
        run(pipeline, Command::Add { entry }).unwrap();
    }

    fn add_recovery(pipeline: &mut Pipeline, player: &str, date: NaiveDate, score: f64) {
        let entry = AddCommand::Recovery {
            player: player.into(),
            date: Some(date),
            score,
            note: None,
        };
        run(pipeline, Command::Add { entry }).unwrap();
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn load_and_sprint_default_to_latest_season() {
        let (_dir, mut pipeline) = pipeline();
        add_load(&mut pipeline, "29", ymd(2023, 10, 1), 5000.0);
        add_load(&mut pipeline, "29", ymd(2024, 9, 2), 7000.0);

        let latest = run(
            &mut pipeline,
            Command::Load {
                player: "Bradley Barcola".into(),
                season: None,
            },
        )
        .unwrap();
        assert_eq!(latest["season"], "2024/2025");
        assert_eq!(latest["seasons"].as_array().unwrap().len(), 2);
        assert_eq!(latest["demand"]["overall_mean"], 7000.0);

        let older = run(
            &mut pipeline,
            Command::Load {
                player: "29".into(),
                season: Some("2023/2024".into()),
            },
        )
        .unwrap();
        assert_eq!(older["demand"]["overall_mean"], 5000.0);

        let sprint = run(
            &mut pipeline,
            Command::Sprint {
                column: None,
                mode: Mode::Total,
                season: None,
            },
        )
        .unwrap();
        assert_eq!(sprint["season"], "2024/2025");
        assert_eq!(sprint["summary"][0]["value"], 3.0);
    }

    #[test]
    fn trends_pair_every_same_day_session() {
        let (_dir, mut pipeline) = pipeline();
        for (day, distance) in [(1, 3000.0), (1, 9000.0), (2, 4000.0), (2, 8000.0)] {
            add_load(&mut pipeline, "29", ymd(2024, 9, day), distance);
        }
        add_recovery(&mut pipeline, "29", ymd(2024, 9, 1), 80.0);
        add_recovery(&mut pipeline, "29", ymd(2024, 9, 2), 60.0);
        add_recovery(&mut pipeline, "17", ymd(2024, 9, 2), 70.0);

        let scope = Scope {
            season: None,
            player: Some("29".into()),
        };
        let out = run(&mut pipeline, Command::Trends { scope }).unwrap();
        let trends = out["trends"].as_array().unwrap();
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0]["points"], 4);
        assert_eq!(trends[0]["trend"], "no_significant_correlation");
    }

    #[test]
    fn sprint_without_accel_columns_is_empty() {
        let (_dir, mut pipeline) = pipeline();
        let out = run(
            &mut pipeline,
            Command::Sprint {
                column: None,
                mode: Mode::Total,
                season: None,
            },
        )
        .unwrap();
        assert!(out["summary"].as_array().unwrap().is_empty());
    }
}
