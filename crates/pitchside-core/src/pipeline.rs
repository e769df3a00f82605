// The normalize pipeline: loaded source tables in, typed and backfilled
// tables out. A consumer calls it on demand; nothing here knows about
// presentation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

use crate::backfill::{self, Synthesized};
use crate::cache::TableCache;
use crate::config::Config;
use crate::fbref::{load_fbref, FbrefSeason};
use crate::ingest::{IngestError, LoadedTable, Warning};
use crate::metrics::readiness::{join_readiness, ReadinessRow};
use crate::records::{
    CapabilityRecord, DevPlanEntry, ExternalNote, MatchEvent, RecoveryRecord, Roster,
    SessionMetric,
};
use crate::schema::SourceKind;
use crate::table::Table;
use crate::ucl::{load_ucl, UclSeason};
use crate::writeback::{append_entry, NewEntry, WriteError};

/// The single-file sources `normalize` consumes.
pub const TABLE_SOURCES: [SourceKind; 7] = [
    SourceKind::Gps,
    SourceKind::Recovery,
    SourceKind::Priority,
    SourceKind::Capability,
    SourceKind::MatchEvents,
    SourceKind::DevPlan,
    SourceKind::ExternalFactors,
];

/// Reconciled but not yet backfilled tables, one per source.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    tables: BTreeMap<SourceKind, LoadedTable>,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: SourceKind, loaded: LoadedTable) {
        self.tables.insert(source, loaded);
    }

    pub fn with(mut self, source: SourceKind, loaded: LoadedTable) -> Self {
        self.insert(source, loaded);
        self
    }

    /// Load every single-file source through the cache.
    pub fn load(config: &Config, cache: &mut TableCache) -> Result<Self, IngestError> {
        let mut sources = Self::new();
        for source in TABLE_SOURCES {
            let loaded = cache.get_or_load(source, &config.path_for(source))?;
            sources.insert(source, loaded.clone());
        }
        Ok(sources)
    }

    fn take(&mut self, source: SourceKind) -> LoadedTable {
        self.tables.remove(&source).unwrap_or_default()
    }
}

/// Normalized output of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Tables {
    pub sessions: Vec<SessionMetric>,
    pub recovery: Vec<RecoveryRecord>,
    /// Priority areas have no derived metrics and pass through as loaded.
    pub priority: Table,
    pub capability: Vec<CapabilityRecord>,
    pub events: Vec<MatchEvent>,
    pub dev_plan: Vec<DevPlanEntry>,
    pub external: Vec<ExternalNote>,
    /// Backfilled tables the records were extracted from.
    pub normalized: BTreeMap<SourceKind, Table>,
    /// Columns that hold synthetic values.
    pub synthesized: Vec<Synthesized>,
    pub warnings: Vec<Warning>,
}

impl Tables {
    /// GPS and recovery joined per (player, day) with readiness scores.
    pub fn readiness_rows(&self, config: &Config) -> Vec<ReadinessRow> {
        join_readiness(&self.sessions, &self.recovery, &config.thresholds)
    }

    /// True when `column` of `source` was fabricated by backfill.
    pub fn is_synthetic(&self, source: SourceKind, column: &str) -> bool {
        self.synthesized
            .iter()
            .any(|s| s.source == source && s.column == column)
    }
}

/// Backfill and type every source table.
pub fn normalize(mut sources: Sources, config: &Config) -> Tables {
    let roster = Roster::from_config(&config.roster);
    let mut warnings = Vec::new();
    let mut synthesized = Vec::new();
    let mut normalized = BTreeMap::new();

    let mut take = |source: SourceKind, warnings: &mut Vec<Warning>| {
        let loaded = sources.take(source);
        warnings.extend(loaded.warnings);
        loaded.table
    };

    let mut gps = take(SourceKind::Gps, &mut warnings);
    synthesized.extend(backfill::backfill_gps(&mut gps, &config.backfill));

    let mut recovery = take(SourceKind::Recovery, &mut warnings);
    synthesized.extend(backfill::backfill_recovery(&mut recovery, &config.backfill, &roster));

    let mut capability = take(SourceKind::Capability, &mut warnings);
    synthesized.extend(backfill::backfill_capability(&mut capability, &config.backfill, &roster));

    let priority = take(SourceKind::Priority, &mut warnings);
    let events = take(SourceKind::MatchEvents, &mut warnings);
    let dev_plan = take(SourceKind::DevPlan, &mut warnings);
    let external = take(SourceKind::ExternalFactors, &mut warnings);

    warnings.extend(
        synthesized
            .iter()
            .map(|s| Warning::new(s.source, s.describe())),
    );

    let tables = Tables {
        sessions: SessionMetric::from_table(&gps, &roster),
        recovery: RecoveryRecord::from_table(&recovery, &roster),
        capability: CapabilityRecord::from_table(&capability, &roster),
        events: MatchEvent::from_table(&events, &roster),
        dev_plan: DevPlanEntry::from_table(&dev_plan, &roster),
        external: ExternalNote::from_table(&external, &roster),
        priority: priority.clone(),
        normalized: {
            normalized.insert(SourceKind::Gps, gps);
            normalized.insert(SourceKind::Recovery, recovery);
            normalized.insert(SourceKind::Priority, priority);
            normalized.insert(SourceKind::Capability, capability);
            normalized.insert(SourceKind::MatchEvents, events);
            normalized.insert(SourceKind::DevPlan, dev_plan);
            normalized.insert(SourceKind::ExternalFactors, external);
            normalized
        },
        synthesized,
        warnings,
    };
    info!(
        sessions = tables.sessions.len(),
        recovery = tables.recovery.len(),
        capability = tables.capability.len(),
        events = tables.events.len(),
        warnings = tables.warnings.len(),
        "normalized tables"
    );
    tables
}

/// Owns the configuration and the load cache, and answers requests.
#[derive(Debug)]
pub struct Pipeline {
    config: Config,
    roster: Roster,
    cache: TableCache,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let roster = Roster::from_config(&config.roster);
        Self {
            config,
            roster,
            cache: TableCache::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn cache(&self) -> &TableCache {
        &self.cache
    }

    /// Load (through the cache) and normalize every single-file source.
    pub fn tables(&mut self) -> Result<Tables, IngestError> {
        let sources = Sources::load(&self.config, &mut self.cache)?;
        Ok(normalize(sources, &self.config))
    }

    pub fn fbref(&self) -> Result<FbrefSeason, IngestError> {
        load_fbref(&self.config.fbref, &self.config.fbref_dir())
    }

    pub fn ucl(&self) -> Result<UclSeason, IngestError> {
        load_ucl(&self.config.ucl, &self.config.ucl_dir())
    }

    /// Append a user entry; the next `tables()` call sees it.
    pub fn append(&mut self, entry: &NewEntry) -> Result<PathBuf, WriteError> {
        append_entry(&self.config, &mut self.cache, entry)
    }
}
