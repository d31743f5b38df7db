//! Port resolution for filtered position report batches

use crate::error::Result;
use crate::regions::RegionCatalog;
use crate::schema::columns;
use polars::prelude::*;

/// Attach a `PortName` column resolving every report's position against the catalog.
///
/// Rows without a position resolve to the fallback region.
pub fn annotate_ports(
    mut batch: DataFrame,
    catalog: &RegionCatalog,
    tolerance: f64,
) -> Result<DataFrame> {
    let lat = batch.column(columns::LAT)?.cast(&DataType::Float64)?;
    let lon = batch.column(columns::LON)?.cast(&DataType::Float64)?;

    let ports: Vec<&str> = lat
        .f64()?
        .into_iter()
        .zip(lon.f64()?)
        .map(|position| match position {
            (Some(lat), Some(lon)) => catalog.resolve(lat, lon, tolerance),
            _ => catalog.fallback(),
        })
        .collect();

    batch.with_column(Column::new(columns::PORT_NAME.into(), ports))?;
    Ok(batch)
}
