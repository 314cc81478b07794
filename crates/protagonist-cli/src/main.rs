use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use protagonist::{Argument, Bridge, ParseOutput, ThreadPoolScheduler};

mod config;
mod utils;
use config::CliConfig;
use utils::{default_workers, workers_in_range};

#[derive(Debug, Parser)]
#[command(name = "protagonist", about = "Parse API Blueprint documents")]
pub struct App {
    /// API Blueprint files
    #[clap(num_args(1..), required = true)]
    pub files: Vec<PathBuf>,

    /// Result serialization
    #[clap(short, long, value_parser = ["ast", "refract"])]
    pub r#type: Option<String>,

    /// Treat a missing API name as an error
    #[clap(long)]
    pub require_name: bool,

    /// Export source maps
    #[clap(short, long)]
    pub sourcemap: bool,

    /// Only report errors and warnings
    #[clap(long)]
    pub validate: bool,

    #[arg(value_parser = workers_in_range)]
    #[clap(short, long)]
    pub workers: Option<usize>,

    /// JSON file with `workers` and default `options`
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    #[clap(long)]
    pub pretty: bool,
}

impl App {
    /// Options object for every call: the config file's options overridden
    /// by flags given on the command line.
    fn options(&self, mut options: Map<String, Value>) -> Map<String, Value> {
        if self.require_name {
            options.insert("requireBlueprintName".to_string(), Value::Bool(true));
        }
        if self.sourcemap {
            options.insert("exportSourcemap".to_string(), Value::Bool(true));
        }
        if let Some(ast_type) = &self.r#type {
            options.insert("type".to_string(), Value::String(ast_type.clone()));
        }
        if self.validate && options.remove("type").is_some() {
            tracing::warn!("`type` has no effect when validating, ignoring it");
        }
        options
    }
}

fn read_sources(files: &[PathBuf]) -> Result<Vec<String>> {
    files
        .iter()
        .map(|path| {
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
        })
        .collect()
}

#[derive(Serialize)]
struct Report<'a> {
    file: &'a PathBuf,
    #[serde(flatten)]
    output: &'a ParseOutput,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let args = App::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "protagonist=info,protagonist_cli=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &args.config {
        Some(path) => CliConfig::from_path(path)?,
        None => CliConfig::default(),
    };
    let workers = args.workers.or(config.workers).unwrap_or_else(default_workers);
    let options = Value::Object(args.options(config.options.clone()));

    // Every file is read before anything is scheduled
    let sources = read_sources(&args.files)?;

    let bridge = Bridge::new(ThreadPoolScheduler::new(workers)?);
    let outputs: Rc<RefCell<Vec<Option<ParseOutput>>>> =
        Rc::new(RefCell::new(vec![None; args.files.len()]));

    for (i, source) in sources.into_iter().enumerate() {
        let sink = Rc::clone(&outputs);
        let call = vec![
            Argument::from(source),
            Argument::from(options.clone()),
            Argument::function(move |error, result| {
                sink.borrow_mut()[i] = Some(ParseOutput { error, result });
                Ok(())
            }),
        ];
        if args.validate {
            bridge.validate(call)?;
        } else {
            bridge.parse(call)?;
        }
    }

    let delivered = bridge.scheduler().run().await;
    tracing::debug!("Delivered {} results from {} workers", delivered, workers);

    let mut failed = false;
    for (path, output) in args.files.iter().zip(outputs.borrow().iter()) {
        let Some(output) = output else {
            tracing::error!("No result for {}", path.display());
            failed = true;
            continue;
        };
        if let Some(error) = &output.error {
            tracing::error!("{}: {}", path.display(), error);
            failed = true;
        }

        let report = Report { file: path, output };
        let json = if args.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        println!("{json}");
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
