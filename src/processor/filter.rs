//! Record filtering for position report batches
//!
//! Narrows a raw batch to the reports usable for visit inference and to the
//! columns the rest of the pipeline needs. Values are coerced rather than
//! validated: anything that fails to coerce becomes null and the row is
//! dropped by the retention predicate, never failing the batch.

use crate::constants::{nav_status, vessel_types};
use crate::error::{AisError, Result};
use crate::schema::{columns, ensure_required_columns, has_status, parse_timestamp};
use polars::prelude::*;
use tracing::debug;

/// Retain port-calling, stationary vessels with usable positions and times.
///
/// Output columns: `MMSI`, `BaseDateTime` (epoch milliseconds), `LAT`, `LON`,
/// `VesselType` and, when the batch has one, `Status`. Row order is kept.
/// Fails only when a required column is missing or has an unusable type.
pub fn filter_reports(mut batch: DataFrame, unit: &str) -> Result<DataFrame> {
    ensure_required_columns(&batch, unit)?;
    let with_status = has_status(&batch);
    let input_rows = batch.height();

    let timestamps = timestamp_millis(batch.column(columns::BASE_DATE_TIME)?)?;
    batch.with_column(timestamps)?;

    let mut projection = vec![
        integer_code(columns::MMSI),
        col(columns::BASE_DATE_TIME),
        col(columns::LAT).cast(DataType::Float64),
        col(columns::LON).cast(DataType::Float64),
        integer_code(columns::VESSEL_TYPE),
    ];
    if with_status {
        projection.push(integer_code(columns::STATUS));
    }

    let filtered = batch
        .lazy()
        .select(projection)
        .filter(retention_predicate(with_status))
        .collect()?;

    debug!(
        "{}: retained {} of {} reports",
        unit,
        filtered.height(),
        input_rows
    );

    Ok(filtered)
}

/// Conjunction of the retention rules over already-coerced columns
fn retention_predicate(with_status: bool) -> Expr {
    let vessel = col(columns::VESSEL_TYPE);
    let port_calling = vessel
        .clone()
        .eq(lit(vessel_types::TOWING))
        .or(vessel.clone().eq(lit(vessel_types::TUG)))
        .or(vessel
            .clone()
            .gt_eq(lit(vessel_types::CARGO_TANKER_START))
            .and(vessel.lt(lit(vessel_types::CARGO_TANKER_END))));

    let positioned = valid_coordinate(columns::LAT).and(valid_coordinate(columns::LON));

    let timed = col(columns::BASE_DATE_TIME).is_not_null();

    let predicate = port_calling.and(positioned).and(timed);
    if with_status {
        let status = col(columns::STATUS);
        predicate.and(
            status
                .clone()
                .eq(lit(nav_status::AT_ANCHOR))
                .or(status.eq(lit(nav_status::MOORED))),
        )
    } else {
        predicate
    }
}

/// Present and non-zero
fn valid_coordinate(name: &str) -> Expr {
    col(name).is_not_null().and(col(name).neq(lit(0.0)))
}

/// Codes may arrive as text or floats ("70.0"); go through Float64 first.
/// Values with a fractional part ("30.7") become null rather than truncating.
fn integer_code(name: &str) -> Expr {
    let value = col(name).cast(DataType::Float64);
    when((value.clone() % lit(1.0)).eq(lit(0.0)))
        .then(value.cast(DataType::Int64))
        .otherwise(lit(NULL))
        .alias(name)
}

/// Coerce `BaseDateTime` into nullable epoch milliseconds
fn timestamp_millis(column: &Column) -> Result<Column> {
    let name: PlSmallStr = columns::BASE_DATE_TIME.into();

    let millis: Vec<Option<i64>> = match column.dtype() {
        DataType::String => column
            .str()?
            .into_iter()
            .map(|value| value.and_then(parse_timestamp))
            .collect(),
        DataType::Datetime(unit, _) => {
            let per_milli = match unit {
                TimeUnit::Nanoseconds => 1_000_000,
                TimeUnit::Microseconds => 1_000,
                TimeUnit::Milliseconds => 1,
            };
            column
                .cast(&DataType::Int64)?
                .i64()?
                .into_iter()
                .map(|value| value.map(|v| v.div_euclid(per_milli)))
                .collect()
        }
        dtype if dtype.is_integer() => column.cast(&DataType::Int64)?.i64()?.into_iter().collect(),
        other => {
            return Err(AisError::InvalidColumnType {
                column: columns::BASE_DATE_TIME.to_string(),
                dtype: other.to_string(),
            });
        }
    };

    Ok(Column::new(name, millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_batch() -> DataFrame {
        df!(
            "MMSI" => &[1i64, 2, 3, 4, 5, 6, 7, 8],
            "BaseDateTime" => &[
                "2020-01-01T00:00:00",
                "2020-01-01T00:01:00",
                "not a time",
                "2020-01-01T00:03:00",
                "2020-01-01T00:04:00",
                "2020-01-01T00:05:00",
                "2020-01-01T00:06:00",
                "2020-01-01T00:07:00",
            ],
            "LAT" => &[Some(33.7), Some(33.7), Some(33.7), None, Some(0.0), Some(33.7), Some(91.0), Some(29.7)],
            "LON" => &[-118.2, -118.2, -118.2, -118.2, -118.2, -118.2, -118.2, -95.0],
            "VesselType" => &[Some(70i64), Some(60), Some(80), Some(52), Some(30), None, Some(89), Some(30)],
            "SOG" => &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8],
            "VesselName" => &["A", "B", "C", "D", "E", "F", "G", "H"],
        )
        .unwrap()
    }

    fn mmsis(df: &DataFrame) -> Vec<i64> {
        df.column("MMSI")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect()
    }

    #[test]
    fn test_filter_applies_every_rule() {
        let filtered = filter_reports(mixed_batch(), "test").unwrap();
        // 2: vessel type 60, 3: bad timestamp, 4: missing LAT, 5: zero LAT,
        // 6: missing type. 7 carries the 91 "not available" sentinel and stays.
        assert_eq!(mmsis(&filtered), vec![1, 7, 8]);
    }

    #[test]
    fn test_filter_drops_auxiliary_columns() {
        let filtered = filter_reports(mixed_batch(), "test").unwrap();
        let names: Vec<&str> = filtered
            .get_column_names()
            .into_iter()
            .map(|name| name.as_str())
            .collect();
        assert_eq!(names, vec!["MMSI", "BaseDateTime", "LAT", "LON", "VesselType"]);
        assert_eq!(filtered.column("BaseDateTime").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_status_rule_only_when_column_present() {
        let batch = df!(
            "MMSI" => &[1i64, 2, 3, 4],
            "BaseDateTime" => &["2020-01-01"; 4],
            "LAT" => &[33.7; 4],
            "LON" => &[-118.2; 4],
            "VesselType" => &[70i64; 4],
            "Status" => &[Some(1i64), Some(0), Some(5), None],
        )
        .unwrap();

        let filtered = filter_reports(batch.clone(), "with status").unwrap();
        assert_eq!(mmsis(&filtered), vec![1, 3]);

        let without = batch.drop("Status").unwrap();
        let filtered = filter_reports(without, "without status").unwrap();
        assert_eq!(mmsis(&filtered), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_text_codes_are_coerced() {
        let batch = df!(
            "MMSI" => &["367000001", "367000002", "garbage"],
            "BaseDateTime" => &["2020-01-01T00:00:00"; 3],
            "LAT" => &["33.7", "33.7", "33.7"],
            "LON" => &["-118.2", "-118.2", "-118.2"],
            "VesselType" => &["70.0", "52", "70"],
        )
        .unwrap();

        let filtered = filter_reports(batch, "text").unwrap();
        let ids = filtered.column("MMSI").unwrap().i64().unwrap();
        assert_eq!(filtered.height(), 3);
        assert_eq!(ids.get(0), Some(367000001));
        assert_eq!(ids.get(1), Some(367000002));
        assert_eq!(ids.get(2), None);
    }

    #[test]
    fn test_fractional_codes_are_dropped() {
        let batch = df!(
            "MMSI" => &["1", "2", "3", "4", "5.5", "6"],
            "BaseDateTime" => &["2020-01-01T00:00:00"; 6],
            "LAT" => &[33.7; 6],
            "LON" => &[-118.2; 6],
            "VesselType" => &["89.9", "30.7", "89", "30.0", "70", "70"],
            "Status" => &["5", "5", "5", "1", "5", "4.9"],
        )
        .unwrap();

        let filtered = filter_reports(batch, "fractional").unwrap();
        assert_eq!(filtered.height(), 3);

        let ids: Vec<Option<i64>> = filtered.column("MMSI").unwrap().i64().unwrap().into_iter().collect();
        // "5.5" is kept as a row but has no usable vessel id
        assert_eq!(ids, vec![Some(3), Some(4), None]);

        let types: Vec<Option<i64>> = filtered
            .column("VesselType")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(types, vec![Some(89), Some(30), Some(70)]);
    }

    #[test]
    fn test_integer_timestamps_pass_through() {
        let batch = df!(
            "MMSI" => &[1i64, 2],
            "BaseDateTime" => &[Some(1_577_836_800_000i64), None],
            "LAT" => &[33.7, 33.7],
            "LON" => &[-118.2, -118.2],
            "VesselType" => &[70i64, 70],
        )
        .unwrap();

        let filtered = filter_reports(batch, "millis").unwrap();
        assert_eq!(mmsis(&filtered), vec![1]);
        assert_eq!(
            filtered.column("BaseDateTime").unwrap().i64().unwrap().get(0),
            Some(1_577_836_800_000)
        );
    }

    #[test]
    fn test_missing_required_column_is_schema_mismatch() {
        let batch = mixed_batch().drop("LON").unwrap();
        match filter_reports(batch, "archive.csv batch 2").unwrap_err() {
            AisError::SchemaMismatch { unit, missing } => {
                assert_eq!(unit, "archive.csv batch 2");
                assert_eq!(missing, vec!["LON"]);
            }
            other => panic!("Expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_unusable_timestamp_type() {
        let batch = df!(
            "MMSI" => &[1i64],
            "BaseDateTime" => &[true],
            "LAT" => &[33.7],
            "LON" => &[-118.2],
            "VesselType" => &[70i64],
        )
        .unwrap();
        assert!(matches!(
            filter_reports(batch, "bool"),
            Err(AisError::InvalidColumnType { .. })
        ));
    }

    #[test]
    fn test_large_batch_keeps_passing_rows_in_order() {
        let rows = 100_000usize;
        let mmsi: Vec<i64> = (0..rows as i64).collect();
        // two in five rows carry a cargo code, the rest pleasure craft
        let vessel_type: Vec<i64> = (0..rows).map(|i| if i % 5 < 2 { 70 } else { 37 }).collect();
        let batch = df!(
            "MMSI" => mmsi,
            "BaseDateTime" => vec!["2020-01-01T12:00:00"; rows],
            "LAT" => vec![33.7; rows],
            "LON" => vec![-118.2; rows],
            "VesselType" => vessel_type,
        )
        .unwrap();

        let filtered = filter_reports(batch, "bulk").unwrap();
        assert_eq!(filtered.height(), 40_000);

        let expected: Vec<i64> = (0..rows as i64).filter(|i| i % 5 < 2).collect();
        assert_eq!(mmsis(&filtered), expected);
    }

    #[test]
    fn test_filter_conjunction_property() {
        let types = [Some(30i64), Some(52), Some(69), Some(70), Some(89), Some(90), None];
        let coords = [Some(33.7), Some(0.0), Some(-91.0), None];
        let times = [Some("2020-01-01T00:00:00"), Some("bad"), None];
        let statuses = [Some(1i64), Some(5), Some(0), None];

        let mut mmsi = Vec::new();
        let mut vt = Vec::new();
        let mut lat = Vec::new();
        let mut ts = Vec::new();
        let mut st = Vec::new();
        let mut expected = Vec::new();

        let mut id = 0i64;
        for t in types {
            for c in coords {
                for time in times {
                    for s in statuses {
                        mmsi.push(id);
                        vt.push(t);
                        lat.push(c);
                        ts.push(time);
                        st.push(s);

                        let keep = t.is_some_and(vessel_types::is_port_calling)
                            && c.is_some_and(|v| v != 0.0)
                            && time.and_then(parse_timestamp).is_some()
                            && s.is_some_and(nav_status::is_stationary);
                        if keep {
                            expected.push(id);
                        }
                        id += 1;
                    }
                }
            }
        }

        let rows = mmsi.len();
        let batch = df!(
            "MMSI" => mmsi,
            "BaseDateTime" => ts,
            "LAT" => lat,
            "LON" => vec![-118.2; rows],
            "VesselType" => vt,
            "Status" => st,
        )
        .unwrap();

        let filtered = filter_reports(batch, "grid").unwrap();
        assert!(!expected.is_empty());
        assert_eq!(mmsis(&filtered), expected);
    }
}
