// src/store/mod.rs

use anyhow::{bail, Context, Result};
use arrow::{
    array::{
        Array, ArrayRef, Decimal128Array, Int64Array, StringArray, TimestampMicrosecondArray,
        UInt32Array,
    },
    datatypes::{DataType, Field, Schema, TimeUnit},
    record_batch::RecordBatch,
};
use chrono::{DateTime, Utc};
use glob::glob;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info};

use crate::table::{CurrencyRecord, Registry};

/// Scale used for the rate columns.
pub const RATE_SCALE: u32 = 6;
const RATE_PRECISION: u8 = 18;

/// Destination for a completed pass.
pub trait RecordSink {
    fn store(&self, registry: &Registry, pass_time: DateTime<Utc>) -> Result<PathBuf>;
}

/// Persisted row as read back from disk. Parse failures are kept as a count only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRate {
    pub code: String,
    pub numeric_code: i64,
    pub country_or_region: String,
    pub unit_relation: i64,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    pub observed_at: Option<DateTime<Utc>>,
    pub parse_failures: u32,
}

/// Date-partitioned Parquet store, one file per pass:
/// `<base>/date=YYYYMMDD/rates---<micros>.parquet`.
pub struct RateStore {
    base_dir: PathBuf,
    schema: Arc<Schema>,
}

impl RateStore {
    /// Create the store, creating `base_dir` if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("creating rate store directory {:?}", &base_dir))?;
        Ok(Self {
            base_dir,
            schema: Arc::new(rate_schema()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// All pass files, oldest first.
    pub fn pass_files(&self) -> Result<Vec<PathBuf>> {
        let pattern = format!("{}/date=*/rates---*.parquet", self.base_dir.display());
        let mut files: Vec<PathBuf> = glob(&pattern)?.filter_map(Result::ok).collect();
        files.sort_by_key(|p| pass_micros(p));
        Ok(files)
    }

    /// Most recently written pass file, if any.
    pub fn latest_pass(&self) -> Result<Option<PathBuf>> {
        Ok(self.pass_files()?.pop())
    }

    fn to_batch(&self, registry: &Registry) -> Result<RecordBatch> {
        let records: Vec<&CurrencyRecord> = registry.iter().collect();

        let code = StringArray::from_iter_values(records.iter().map(|r| r.code.as_str()));
        let numeric = Int64Array::from_iter_values(records.iter().map(|r| r.numeric_code));
        let country =
            StringArray::from_iter_values(records.iter().map(|r| r.country_or_region.as_str()));
        let unit = Int64Array::from_iter_values(records.iter().map(|r| r.unit_relation));
        let buy = rate_array(&records, "buy_rate", |r| r.buy_rate)?;
        let sell = rate_array(&records, "sell_rate", |r| r.sell_rate)?;
        let observed = TimestampMicrosecondArray::from(
            records
                .iter()
                .map(|r| r.observed_at.map(|t| t.timestamp_micros()))
                .collect::<Vec<_>>(),
        )
        .with_timezone("UTC");
        let failures = UInt32Array::from_iter_values(
            records.iter().map(|r| r.parse_failures.len() as u32),
        );

        let columns: Vec<ArrayRef> = vec![
            Arc::new(code),
            Arc::new(numeric),
            Arc::new(country),
            Arc::new(unit),
            Arc::new(buy),
            Arc::new(sell),
            Arc::new(observed),
            Arc::new(failures),
        ];
        RecordBatch::try_new(self.schema.clone(), columns).context("building rate record batch")
    }
}

impl RecordSink for RateStore {
    fn store(&self, registry: &Registry, pass_time: DateTime<Utc>) -> Result<PathBuf> {
        let batch = self.to_batch(registry)?;

        let partition = format!("date={}", pass_time.date_naive().format("%Y%m%d"));
        let dir = self.base_dir.join(partition);
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating partition {}", dir.display()))?;

        let fname = format!("rates---{}.parquet", pass_time.timestamp_micros());
        let tmp = dir.join(format!("{}.tmp", fname));
        let final_path = dir.join(&fname);

        let file =
            File::create(&tmp).with_context(|| format!("creating rate file {:?}", &tmp))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(BufWriter::new(file), self.schema.clone(), Some(props))
            .context("creating Arrow writer for rates")?;
        writer.write(&batch).context("writing rate batch")?;
        writer.close().context("closing rate writer")?;
        fs::rename(&tmp, &final_path)
            .with_context(|| format!("moving {:?} into place", &tmp))?;

        info!(path = %final_path.display(), rows = batch.num_rows(), "stored rates");
        Ok(final_path)
    }
}

/// Read a pass file written by [`RateStore`].
pub fn load_records(path: &Path) -> Result<Vec<StoredRate>> {
    let file = File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
    let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)?
        .with_batch_size(1024)
        .build()?;

    let mut out = Vec::new();
    while let Some(batch) = reader.next().transpose()? {
        let code = column::<StringArray>(&batch, 0)?;
        let numeric = column::<Int64Array>(&batch, 1)?;
        let country = column::<StringArray>(&batch, 2)?;
        let unit = column::<Int64Array>(&batch, 3)?;
        let buy = column::<Decimal128Array>(&batch, 4)?;
        let sell = column::<Decimal128Array>(&batch, 5)?;
        let observed = column::<TimestampMicrosecondArray>(&batch, 6)?;
        let failures = column::<UInt32Array>(&batch, 7)?;

        for i in 0..batch.num_rows() {
            let observed_at = if observed.is_null(i) {
                None
            } else {
                DateTime::<Utc>::from_timestamp_micros(observed.value(i))
            };
            out.push(StoredRate {
                code: code.value(i).to_string(),
                numeric_code: numeric.value(i),
                country_or_region: country.value(i).to_string(),
                unit_relation: unit.value(i),
                buy_rate: decode_rate(buy.value(i))?,
                sell_rate: decode_rate(sell.value(i))?,
                observed_at,
                parse_failures: failures.value(i),
            });
        }
    }
    debug!(path = %path.display(), rows = out.len(), "loaded rates");
    Ok(out)
}

fn rate_schema() -> Schema {
    let rate = DataType::Decimal128(RATE_PRECISION, RATE_SCALE as i8);
    Schema::new(vec![
        Field::new("code", DataType::Utf8, false),
        Field::new("numeric_code", DataType::Int64, false),
        Field::new("country_or_region", DataType::Utf8, false),
        Field::new("unit_relation", DataType::Int64, false),
        Field::new("buy_rate", rate.clone(), false),
        Field::new("sell_rate", rate, false),
        Field::new(
            "observed_at",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            true,
        ),
        Field::new("parse_failures", DataType::UInt32, false),
    ])
}

fn rate_array<'a>(
    records: &[&'a CurrencyRecord],
    name: &str,
    rate: impl Fn(&'a CurrencyRecord) -> Decimal,
) -> Result<Decimal128Array> {
    let mantissas = records
        .iter()
        .map(|r| {
            encode_rate(rate(*r))
                .with_context(|| format!("{} {} cannot be stored", r.code, name))
        })
        .collect::<Result<Vec<i128>>>()?;
    Decimal128Array::from(mantissas)
        .with_precision_and_scale(RATE_PRECISION, RATE_SCALE as i8)
        .context("building rate column")
}

/// Mantissa of `value` at `RATE_SCALE`, refusing anything that would be rounded
/// or that exceeds `RATE_PRECISION` digits.
fn encode_rate(value: Decimal) -> Result<i128> {
    let mut scaled = value;
    scaled.rescale(RATE_SCALE);
    if scaled.scale() != RATE_SCALE {
        bail!("{} does not fit at scale {}", value, RATE_SCALE);
    }
    if scaled != value {
        bail!("{} has more than {} decimals", value, RATE_SCALE);
    }
    let mantissa = scaled.mantissa();
    if mantissa.unsigned_abs() >= 10u128.pow(RATE_PRECISION as u32) {
        bail!("{} exceeds {} significant digits", value, RATE_PRECISION);
    }
    Ok(mantissa)
}

fn decode_rate(raw: i128) -> Result<Decimal> {
    let mut rate = Decimal::try_from_i128_with_scale(raw, RATE_SCALE)
        .with_context(|| format!("stored rate {} out of range", raw))?;
    rate.normalize_assign();
    Ok(rate)
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, idx: usize) -> Result<&'a T> {
    match batch.column(idx).as_any().downcast_ref::<T>() {
        Some(arr) => Ok(arr),
        None => bail!(
            "column {} has unexpected type {:?}",
            idx,
            batch.column(idx).data_type()
        ),
    }
}

/// Pass timestamp embedded in `rates---<micros>.parquet`.
fn pass_micros(path: &Path) -> i64 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.rsplit("---").next())
        .and_then(|ts| ts.parse().ok())
        .unwrap_or(0)
}
