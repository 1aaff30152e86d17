use chrono::{Datelike, Days, Duration, Months, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use proptest::prelude::*;

use ts_ingest::app::pipeline::{ingest, validate};
use ts_ingest::config::Settings;
use ts_ingest::domain::RawIngestionPayload;
use ts_ingest::error::IngestError;

#[derive(Debug, Clone, Copy)]
enum Cadence {
    Hourly,
    Daily,
    Monthly,
}

impl Cadence {
    fn granularity(self) -> &'static str {
        match self {
            Cadence::Hourly => "hourly",
            Cadence::Daily => "daily",
            Cadence::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Clone)]
struct Case {
    cadence: Cadence,
    tz: Tz,
    timestamps: Vec<String>,
    values: Vec<f64>,
}

impl Case {
    fn csv(&self) -> String {
        rows_csv(self.timestamps.iter().cloned().zip(self.values.iter().map(|v| v.to_string())))
    }

    fn payload(&self, csv_text: String) -> RawIngestionPayload {
        RawIngestionPayload {
            csv_text,
            granularity: self.cadence.granularity().to_string(),
            timezone: self.tz.name().to_string(),
            name: Some("prop".to_string()),
        }
    }
}

fn rows_csv(rows: impl Iterator<Item = (String, String)>) -> String {
    let mut out = String::from("timestamp,value\n");
    for (ts, v) in rows {
        out.push_str(&format!("{ts},{v}\n"));
    }
    out
}

/// Hourly rows are absolute instants rendered in the target zone; daily and
/// monthly rows are local dates.
fn timestamps(cadence: Cadence, tz: Tz, start: NaiveDate, hour: u32, n: usize) -> Vec<String> {
    match cadence {
        Cadence::Hourly => {
            let first = Utc.from_utc_datetime(&start.and_hms_opt(hour, 0, 0).unwrap());
            (0..n)
                .map(|k| {
                    (first + Duration::hours(k as i64))
                        .with_timezone(&tz)
                        .format("%Y-%m-%d %H:%M:%S%:z")
                        .to_string()
                })
                .collect()
        }
        Cadence::Daily => (0..n)
            .map(|k| (start + Days::new(k as u64)).format("%Y-%m-%d").to_string())
            .collect(),
        Cadence::Monthly => {
            let first = start.with_day(1).unwrap();
            (0..n)
                .map(|k| (first + Months::new(k as u32)).format("%Y-%m-%d").to_string())
                .collect()
        }
    }
}

fn case_strategy(min_len: usize) -> impl Strategy<Value = Case> {
    let cadence = prop_oneof![Just(Cadence::Hourly), Just(Cadence::Daily), Just(Cadence::Monthly)];
    let tz = prop_oneof![Just(Tz::UTC), Just(chrono_tz::Europe::Paris)];
    (cadence, tz, 2018i32..2030, 1u32..=12, 1u32..=28, 0u32..24, min_len..40usize).prop_flat_map(
        |(cadence, tz, year, month, day, hour, n)| {
            let start = NaiveDate::from_ymd_opt(year, month, day).unwrap();
            let ts = timestamps(cadence, tz, start, hour, n);
            proptest::collection::vec(0.001f64..1.0e6, n).prop_map(move |values| Case {
                cadence,
                tz,
                timestamps: ts.clone(),
                values,
            })
        },
    )
}

fn settings() -> Settings {
    Settings::default()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn rendered_series_round_trips(case in case_strategy(3)) {
        let first = ingest(&case.payload(case.csv()), &settings()).unwrap();
        prop_assert_eq!(first.series.len(), case.values.len());
        prop_assert_eq!(first.series.values(), case.values.as_slice());

        let second = ingest(&case.payload(first.csv.clone()), &settings()).unwrap();
        prop_assert_eq!(&second.series, &first.series);
        prop_assert_eq!(second.csv, first.csv);
    }

    #[test]
    fn removing_a_middle_point_fails_continuity(case in case_strategy(4), pick in any::<prop::sample::Index>()) {
        let n = case.timestamps.len();
        let drop = 1 + pick.index(n - 2);
        let rows = case
            .timestamps
            .iter()
            .cloned()
            .zip(case.values.iter().map(|v| v.to_string()))
            .enumerate()
            .filter(|(i, _)| *i != drop)
            .map(|(_, row)| row);
        let err = validate(&case.payload(rows_csv(rows)), &settings()).unwrap_err();
        prop_assert!(matches!(err, IngestError::Continuity(_)), "{:?}", err);
    }

    #[test]
    fn duplicated_timestamp_fails_continuity(case in case_strategy(3), pick in any::<prop::sample::Index>()) {
        let dup = pick.index(case.timestamps.len());
        let mut rows: Vec<(String, String)> = case
            .timestamps
            .iter()
            .cloned()
            .zip(case.values.iter().map(|v| v.to_string()))
            .collect();
        let extra = (rows[dup].0.clone(), (case.values[dup] + 1.0).to_string());
        rows.insert(dup + 1, extra);

        let err = validate(&case.payload(rows_csv(rows.into_iter())), &settings()).unwrap_err();
        prop_assert_eq!(
            err,
            IngestError::Continuity("Index frequency could be inferred, but missing dates.".into())
        );
    }

    #[test]
    fn one_bad_value_fails_value_domain(
        case in case_strategy(3),
        pick in any::<prop::sample::Index>(),
        bad in prop_oneof![Just("0"), Just("-1.5"), Just(""), Just("NaN"), Just("null")],
    ) {
        let at = pick.index(case.values.len());
        let rows = case
            .timestamps
            .iter()
            .cloned()
            .zip(case.values.iter().enumerate().map(|(i, v)| {
                if i == at { bad.to_string() } else { v.to_string() }
            }));
        let err = validate(&case.payload(rows_csv(rows)), &settings()).unwrap_err();
        prop_assert!(matches!(err, IngestError::ValueDomain(_)), "{:?}", err);
    }
}
