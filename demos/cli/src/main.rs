use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use discharge_core::{aggregate, generate_routes, FacilityDirectory, Marketer, PipelineConfig};
use discharge_intake::seed::{seed_admissions, seed_facilities, seed_marketers};
use discharge_intake::{process_admissions_value, AdmissionSource, JsonFileSource, ProcessedBatch};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "discharge-cli",
    about = "Chấm điểm ca nhập viện, phân tuyến marketer và tổng hợp chỉ số."
)]
struct Args {
    /// File JSON cấu hình pipeline, thiếu trường nào thì dùng mặc định.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chấm điểm và xếp ưu tiên danh sách nhập viện.
    Score {
        /// Đường dẫn tới file JSON nhập viện.
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Dựng tuyến trong ngày cho từng marketer.
    Routes {
        #[arg(short, long)]
        input: PathBuf,
        /// Danh sách marketer (JSON); bỏ trống để dùng dữ liệu mẫu.
        #[arg(long)]
        marketers: Option<PathBuf>,
        /// Danh bạ cơ sở (JSON); bỏ trống để dùng dữ liệu mẫu.
        #[arg(long)]
        facilities: Option<PathBuf>,
        /// Ngày của tuyến (YYYY-MM-DD), mặc định hôm nay.
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Tổng hợp chỉ số theo cơ sở và vùng.
    Metrics {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        facilities: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Sinh dữ liệu nhập viện mẫu tất định.
    Seed {
        #[arg(long, default_value_t = 25)]
        count: usize,
        /// Ngày neo cho ngày nhập viện, mặc định hôm nay.
        #[arg(long)]
        anchor: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Score { input, output } => {
            let batch = load_batch(&input, &config)?;
            println!(
                "Records: {}\nSkipped: {}\nUrgent: {}",
                batch.records.len(),
                batch.skipped,
                batch
                    .records
                    .iter()
                    .filter(|r| r.marketing_priority.level() == 1)
                    .count()
            );
            write_json(output.as_deref(), &batch)?;
        }
        Command::Routes {
            input,
            marketers,
            facilities,
            date,
            output,
        } => {
            let batch = load_batch(&input, &config)?;
            let marketers: Vec<Marketer> = match marketers {
                Some(path) => read_json(&path)?,
                None => {
                    log::info!("Không có file marketer, dùng danh sách mẫu");
                    seed_marketers()
                }
            };
            let directory = load_directory(facilities.as_deref())?;
            let date = date.unwrap_or_else(|| Utc::now().date_naive());

            let plan =
                generate_routes(&batch.records, &marketers, &directory, date, &config.routing);
            println!(
                "Date: {}\nRoutes: {}\nUnassigned: {}",
                plan.date,
                plan.routes.len(),
                plan.unassigned.len()
            );
            if let Err(err) = plan.ensure_routed() {
                eprintln!("{err}");
            }
            write_json(output.as_deref(), &plan)?;
        }
        Command::Metrics {
            input,
            facilities,
            output,
        } => {
            let batch = load_batch(&input, &config)?;
            let directory = load_directory(facilities.as_deref())?;
            let metrics = aggregate(&batch.records, &directory);
            println!(
                "Admissions: {}\nConversions: {}\nPotential value: {:.2}",
                metrics.totals.admissions,
                metrics.totals.conversions,
                metrics.totals.total_potential_value
            );
            write_json(output.as_deref(), &metrics)?;
        }
        Command::Seed {
            count,
            anchor,
            output,
        } => {
            let anchor = anchor.unwrap_or_else(|| Utc::now().date_naive());
            write_json(output.as_deref(), &seed_admissions(count, anchor))?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let config = match path {
        Some(path) => read_json(path)?,
        None => PipelineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn load_batch(input: &Path, config: &PipelineConfig) -> anyhow::Result<ProcessedBatch> {
    let source = JsonFileSource::new(input);
    let payload = source
        .fetch()
        .with_context(|| format!("Không đọc được file {:?}", input))?;
    let batch = process_admissions_value(&payload, config)?;
    for issue in &batch.issues {
        log::warn!(
            "Bỏ qua bản ghi #{}: thiếu {}",
            issue.index,
            issue.missing.join(", ")
        );
    }
    Ok(batch)
}

fn load_directory(path: Option<&Path>) -> anyhow::Result<FacilityDirectory> {
    match path {
        Some(path) => read_json(path),
        None => {
            log::info!("Không có danh bạ cơ sở, dùng dữ liệu mẫu");
            Ok(seed_facilities())
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Không đọc được file {:?}", path))?;
    serde_json::from_str(&data).with_context(|| format!("JSON không hợp lệ trong {:?}", path))
}

fn write_json<T: Serialize>(output: Option<&Path>, value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("Không ghi được file {:?}", path)),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}
