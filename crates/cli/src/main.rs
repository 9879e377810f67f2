use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cfa_core::domain::section::{Section, SectionSelection};
use cfa_core::prompt::{CompanyInfoMode, SummaryPolicy};
use cfa_core::report::ReportService;

#[derive(Debug, Parser)]
#[command(name = "cfa_cli", about = "Generate a CFA Research Challenge style report for a company")]
struct Args {
    /// Company ticker symbol (e.g. AAPL).
    #[arg(long, required_unless_present = "list_sections")]
    ticker: Option<String>,

    /// Sections to include. Repeat the flag or pass a comma-separated list.
    #[arg(long = "section", value_delimiter = ',')]
    sections: Vec<String>,

    /// Include every section.
    #[arg(long, conflicts_with = "sections")]
    all_sections: bool,

    /// `full` embeds whole tables, `latest` only the most recent period.
    #[arg(long)]
    summary_policy: Option<SummaryPolicy>,

    /// `direct` renders Company Info from metadata, `generated` asks the model.
    #[arg(long)]
    company_info: Option<CompanyInfoMode>,

    /// Print the available section names and exit.
    #[arg(long)]
    list_sections: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let settings = cfa_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if args.list_sections {
        for section in Section::ALL {
            println!("{section}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let ticker = args.ticker.as_deref().context("--ticker is required")?;
    let selection = selection(&args)?;

    let mut options = settings.prompt_options()?;
    if let Some(policy) = args.summary_policy {
        options.summary_policy = policy;
    }
    if let Some(mode) = args.company_info {
        options.company_info_mode = mode;
    }

    let service = ReportService::from_settings(&settings)?.with_options(options);

    match service.generate(ticker, &selection).await {
        Ok(report) => {
            if report.failures() > 0 {
                tracing::warn!(
                    failures = report.failures(),
                    "some sections could not be generated"
                );
            }
            println!("{report}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            sentry_anyhow::capture_anyhow(&anyhow::Error::new(err.clone()));
            tracing::error!(error = %err, "report generation failed");
            eprintln!("{err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn selection(args: &Args) -> anyhow::Result<SectionSelection> {
    if args.all_sections {
        return Ok(SectionSelection::all());
    }
    Ok(SectionSelection::parse(&args.sections)?)
}

fn init_sentry(settings: &cfa_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
