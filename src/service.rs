//! Query/aggregation layer: orchestrates drain + normalization, computes
//! aggregate distance and bounds, and drives ingestion and trip queries.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::declination::DeclinationModel;
use crate::drain::drain;
use crate::error::{Error, Result};
use crate::event::IngestEvent;
use crate::geo::{self, Bounds};
use crate::normalizer::{Fix, Normalizer};
use crate::store::{
    FIX_PARTITION, LATEST_PARTITION, LATEST_ROW, RangePredicate, StoreAdapter, row_key,
};
use crate::trips::{Trip, segment_trips};

/// Time-range selector for a fixes query.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixQuery {
    pub since: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    /// Fetch only the single latest-pointer record.
    pub latest_only: bool,
}

/// Aggregated result of a fixes query.
#[derive(Debug, Serialize)]
pub struct FixesResult {
    pub count: usize,
    /// Cumulative great-circle path length over `items`, in the configured
    /// distance unit.
    pub distance: f64,
    /// `None` when `items` is empty; never a synthetic zero box.
    pub bounds: Option<Bounds>,
    pub items: Vec<Fix>,
}

/// Latest-position response shape.
#[derive(Debug, Serialize)]
pub struct LatestFix {
    pub last: Fix,
}

pub struct Tracker<S: StoreAdapter> {
    store: S,
    normalizer: Normalizer,
    config: TrackerConfig,
}

impl<S: StoreAdapter> Tracker<S> {
    pub fn new(
        store: S,
        declination: Arc<dyn DeclinationModel>,
        config: TrackerConfig,
    ) -> Result<Self> {
        let normalizer = Normalizer::new(config.calibration, declination)?;
        Ok(Tracker {
            store,
            normalizer,
            config,
        })
    }

    /// Ingests one telemetry event: normalizes it end to end, then writes
    /// the time-series record and the latest pointer.
    ///
    /// The full normalization runs up front so a record whose position
    /// cannot be decoded is rejected here instead of poisoning every later
    /// read of its window.
    ///
    /// The two writes are not atomic. When the pointer write fails after the
    /// time-series write succeeded, the error is surfaced and the first
    /// write stands; readers of "latest" tolerate that staleness.
    #[tracing::instrument(skip(self, event), fields(asset_id = %event.coreid))]
    pub async fn ingest(&self, event: IngestEvent) -> Result<()> {
        let record = event.into_raw_record()?;
        self.normalizer.normalize(&record)?;
        let asset_id = record.asset_id.clone();

        self.store.create_if_absent(&asset_id).await?;

        let key = row_key(record.timestamp);
        self.store
            .upsert(&asset_id, FIX_PARTITION, &key, &record)
            .await?;

        if let Err(e) = self
            .store
            .upsert(&asset_id, LATEST_PARTITION, LATEST_ROW, &record)
            .await
        {
            warn!(error = %e, "latest pointer write failed; time-series record kept");
            return Err(e);
        }

        info!(row = %key, "fix stored");
        Ok(())
    }

    /// Retrieves normalized fixes with aggregate distance and bounds.
    #[tracing::instrument(skip(self, query), fields(asset_id))]
    pub async fn get_fixes(&self, asset_id: &str, query: &FixQuery) -> Result<FixesResult> {
        let predicate = self.predicate_for(query);
        let records = drain(
            &self.store,
            asset_id,
            &predicate,
            self.config.query.max_pages,
        )
        .await?;
        debug!(records = records.len(), "drained raw records");

        let mut items = Vec::with_capacity(records.len());
        for record in &records {
            items.push(self.normalizer.normalize(record)?);
        }

        let mut distance_m = 0.0;
        let mut bounds: Option<Bounds> = None;
        for pair in items.windows(2) {
            distance_m += geo::haversine_distance(
                pair[0].latitude,
                pair[0].longitude,
                pair[1].latitude,
                pair[1].longitude,
            );
        }
        for fix in &items {
            match bounds.as_mut() {
                Some(b) => b.extend(fix.latitude, fix.longitude),
                None => bounds = Some(Bounds::from_point(fix.latitude, fix.longitude)),
            }
        }

        Ok(FixesResult {
            count: items.len(),
            distance: self.config.query.distance_unit.from_meters(distance_m),
            bounds,
            items,
        })
    }

    /// Returns the asset's most recent fix via the O(1) latest pointer, or
    /// [`Error::NotFound`] when the pointer is absent or older than the
    /// configured freshness window. Absence of recent data is a normal,
    /// reportable state.
    #[tracing::instrument(skip(self), fields(asset_id))]
    pub async fn get_latest_fix(&self, asset_id: &str) -> Result<LatestFix> {
        let result = self
            .get_fixes(
                asset_id,
                &FixQuery {
                    latest_only: true,
                    ..Default::default()
                },
            )
            .await?;

        let horizon = Utc::now() - Duration::minutes(self.config.query.latest_window_minutes);
        match result.items.into_iter().next_back() {
            Some(fix) if fix.timestamp >= horizon => Ok(LatestFix { last: fix }),
            _ => Err(Error::NotFound(asset_id.to_string())),
        }
    }

    /// Reconstructs trips from the fixes matching `query`.
    #[tracing::instrument(skip(self, query), fields(asset_id))]
    pub async fn get_trips(&self, asset_id: &str, query: &FixQuery) -> Result<Vec<Trip>> {
        let fixes = self.get_fixes(asset_id, query).await?;
        let trips = segment_trips(&fixes.items, &self.config.trips)?;
        info!(fixes = fixes.count, trips = trips.len(), "segmented trips");
        Ok(trips)
    }

    /// Lists the assets with a telemetry table.
    pub async fn list_assets(&self) -> Result<Vec<String>> {
        self.store.list_tables().await
    }

    fn predicate_for(&self, query: &FixQuery) -> RangePredicate {
        if query.latest_only {
            return RangePredicate::latest();
        }
        if query.since.is_some() || query.before.is_some() {
            return RangePredicate::fixes(query.since, query.before);
        }
        let since = Utc::now() - Duration::hours(self.config.query.default_window_hours);
        RangePredicate::fixes(Some(since), None)
    }
}
