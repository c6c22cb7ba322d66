use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::config::Settings;
use crate::context::ForecastContext;
use crate::error::Result;
use crate::model::{Action, FeatureRow, MedicineInput, Recommendation};

#[derive(Debug, Parser)]
#[command(name = "medicine-demand", about = "Medicine demand spike forecasting")]
pub struct Cli {
    /// Config file (toml, json, yaml). Defaults to config/default.* if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Sales data path, overrides the config file.
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Classifier artifact path, overrides the config file.
    #[arg(long, global = true)]
    pub model: Option<PathBuf>,

    /// Print JSON instead of a table.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the medicine catalog.
    Medicines,
    /// Score the latest features of every medicine.
    Predict,
    /// Score a single caller-supplied feature vector.
    PredictOne(PredictOneArgs),
    /// Show the most recent feature rows of one medicine.
    Features(FeaturesArgs),
}

#[derive(Debug, Args)]
pub struct PredictOneArgs {
    #[arg(long)]
    pub medicine: String,
    #[arg(long = "last-7d", allow_hyphen_values = true)]
    pub last_7d: f64,
    #[arg(long = "last-30d", allow_hyphen_values = true)]
    pub last_30d: f64,
    #[arg(long = "avg-30d", allow_hyphen_values = true)]
    pub avg_30d: f64,
    #[arg(long = "std-30d", allow_hyphen_values = true)]
    pub std_30d: f64,
}

impl From<PredictOneArgs> for MedicineInput {
    fn from(args: PredictOneArgs) -> Self {
        MedicineInput {
            medicine: args.medicine,
            last_7d: args.last_7d,
            last_30d: args.last_30d,
            avg_30d: args.avg_30d,
            std_30d: args.std_30d,
        }
    }
}

#[derive(Debug, Args)]
pub struct FeaturesArgs {
    #[arg(long)]
    pub medicine: String,
    #[arg(long, default_value_t = 10)]
    pub tail: usize,
}

impl Cli {
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(data) = &self.data {
            settings.data_path = data.clone();
        }
        if let Some(model) = &self.model {
            settings.model_path = model.clone();
        }
    }
}

pub fn run<W: Write>(ctx: &ForecastContext, command: Command, json: bool, out: &mut W) -> Result<()> {
    match command {
        Command::Medicines => {
            let medicines = ctx.medicines();
            if json {
                print_json(out, &medicines)
            } else {
                for m in &medicines {
                    writeln!(out, "{}", m)?;
                }
                Ok(())
            }
        }
        Command::Predict => {
            let recs = ctx.predict()?;
            if json {
                print_json(out, &recs)
            } else {
                print_recommendations(out, &recs)
            }
        }
        Command::PredictOne(args) => {
            let rec = ctx.predict_one(&args.into())?;
            if json {
                print_json(out, &rec)
            } else {
                print_recommendations(out, std::slice::from_ref(&rec))
            }
        }
        Command::Features(args) => {
            let rows = ctx.features_for(&args.medicine, args.tail)?;
            if json {
                print_json(out, &rows)
            } else {
                print_features(out, rows)
            }
        }
    }
}

fn print_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).map_err(std::io::Error::from)?;
    writeln!(out)?;
    Ok(())
}

fn print_recommendations<W: Write>(out: &mut W, recs: &[Recommendation]) -> Result<()> {
    writeln!(out, "{:<10} {:>11}  {}", "MEDICINE", "PROBABILITY", "ACTION")?;
    for r in recs {
        let marker = match r.action {
            Action::IncreaseStock => "▲",
            Action::Normal => " ",
        };
        writeln!(
            out,
            "{:<10} {:>11.4}  {} {}",
            r.medicine_id,
            r.probability,
            marker,
            r.action.label()
        )?;
    }
    Ok(())
}

fn print_features<W: Write>(out: &mut W, rows: &[FeatureRow]) -> Result<()> {
    writeln!(
        out,
        "{:<10} {:<10} {:>9} {:>9} {:>9} {:>9}",
        "MEDICINE", "DATE", "LAST_7D", "LAST_30D", "AVG_30D", "STD_30D"
    )?;
    for r in rows {
        writeln!(
            out,
            "{:<10} {:<10} {:>9.2} {:>9.2} {:>9.3} {:>9.3}",
            r.medicine_id,
            r.date.format("%Y-%m-%d"),
            r.last_7d,
            r.last_30d,
            r.avg_30d,
            r.std_30d
        )?;
    }
    Ok(())
}
