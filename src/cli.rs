use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use price_sonify::config::{self, FundamentalMapping, MidiRange, SonifyConfig, ToneDuration};
use price_sonify::export;
use price_sonify::harmony::HarmonicRatioTable;
use price_sonify::series::{self, PricePoint};
use price_sonify::{InputError, Pipeline, SonifyError};

/// Turn intraday prices into just-intonation tones
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one or more trading days to CSV, WAV and optionally MIDI
    Render(RenderArgs),

    /// List the trading days present in a price file
    Dates(DatesArgs),
}

#[derive(Parser)]
struct RenderArgs {
    /// Path to the input price CSV
    #[arg(required = true)]
    input: PathBuf,

    /// Trading day to render (YYYY-MM-DD)
    #[arg(short, long, conflicts_with = "all_dates")]
    date: Option<NaiveDate>,

    /// Render every trading day in the file, in parallel
    #[arg(long)]
    all_dates: bool,

    /// Directory for the generated files
    #[arg(short, long, default_value = "output")]
    out_dir: PathBuf,

    /// Configuration file (defaults to ./config.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output sample rate (Hz)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Fixed duration of each note (seconds)
    #[arg(long, value_name = "SECONDS")]
    duration: Option<f64>,

    /// Peak amplitude of each tone, 0 to 1
    #[arg(long)]
    amplitude: Option<f64>,

    /// Fade length at each end of a tone (milliseconds)
    #[arg(long)]
    fade_ms: Option<f64>,

    /// Use the seven-interval ratio table instead of the default four
    #[arg(long)]
    extended_ratios: bool,

    /// Label notes within the piano range (A0 to C8)
    #[arg(long)]
    piano_range: bool,

    /// Spread detected fundamentals logarithmically instead of clamping them
    #[arg(long)]
    log_scale: bool,

    /// Also write a Standard MIDI File
    #[arg(long)]
    midi: bool,
}

#[derive(Parser)]
struct DatesArgs {
    /// Path to the input price CSV
    #[arg(required = true)]
    input: PathBuf,
}

fn build_config(args: &RenderArgs) -> Result<SonifyConfig, SonifyError> {
    let mut config = match &args.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config()?,
    };

    if let Some(sample_rate) = args.sample_rate {
        config.sample_rate = sample_rate;
    }
    if let Some(seconds) = args.duration {
        config.tone_duration = ToneDuration::Fixed { seconds };
    }
    if let Some(amplitude) = args.amplitude {
        config.amplitude = amplitude;
    }
    if let Some(fade_ms) = args.fade_ms {
        config.fade_ms = fade_ms;
    }
    if args.extended_ratios {
        config.harmonic_ratios = HarmonicRatioTable::extended();
    }
    if args.piano_range {
        config.midi_range = MidiRange::PIANO;
    }
    if args.log_scale {
        config.fundamental_mapping = FundamentalMapping::LogScale;
    }

    config.validate()?;
    Ok(config)
}

fn load_points(input: &Path) -> Result<Vec<PricePoint>, SonifyError> {
    if !input.exists() {
        return Err(SonifyError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Price file not found: {}", input.display()),
        )));
    }
    series::load_csv(input)
}

fn render_date(
    points: &[PricePoint],
    date: NaiveDate,
    config: &SonifyConfig,
    args: &RenderArgs,
) -> Result<(), SonifyError> {
    tracing::info!("Processing {}", date);
    let series = series::for_date(points, date)?;
    let pipeline = Pipeline::new(&series, config)?;
    let rendering = pipeline.run()?;

    let files = export::export_rendering(&rendering, &args.out_dir, &date.to_string(), args.midi)?;

    if let Some(reason) = rendering.diagnostics.fundamental_fallback {
        tracing::warn!("{}: default fundamental used ({})", date, reason);
    }
    tracing::info!(
        "{}: {} notes, {:.2}s of audio, fundamental {:.2} Hz, {} clamped -> {}, {}{}",
        date,
        rendering.notes.len(),
        rendering.audio.duration_seconds(),
        rendering.fundamental.hz,
        rendering.diagnostics.clamped_notes,
        files.notes_csv.display(),
        files.audio_wav.display(),
        files
            .midi
            .as_ref()
            .map(|p| format!(", {}", p.display()))
            .unwrap_or_default()
    );
    Ok(())
}

fn pick_dates(points: &[PricePoint], args: &RenderArgs) -> Result<Vec<NaiveDate>, SonifyError> {
    if let Some(date) = args.date {
        return Ok(vec![date]);
    }

    let dates = series::available_dates(points);
    if args.all_dates || dates.len() == 1 {
        if dates.is_empty() {
            return Err(InputError::Empty.into());
        }
        return Ok(dates);
    }

    Err(SonifyError::InvalidParams(format!(
        "the file covers {} trading days; pass --date YYYY-MM-DD or --all-dates (see the `dates` command)",
        dates.len()
    )))
}

fn run_render_command(args: &RenderArgs) -> Result<(), SonifyError> {
    let config = build_config(args)?;
    let points = load_points(&args.input)?;
    let dates = pick_dates(&points, args)?;

    if dates.len() == 1 {
        return render_date(&points, dates[0], &config, args);
    }

    let workers = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    tracing::info!("Rendering {} days on {} workers", dates.len(), workers);
    let results = render_in_parallel(&dates, workers, |date| {
        render_date(&points, date, &config, args)
    });

    let failed: Vec<_> = results.iter().filter(|(_, r)| r.is_err()).collect();
    for (date, result) in &failed {
        if let Err(e) = result {
            tracing::error!("{}: {}", date, e);
        }
    }
    if !failed.is_empty() {
        return Err(SonifyError::InvalidParams(format!(
            "{} of {} days failed",
            failed.len(),
            results.len()
        )));
    }
    Ok(())
}

/// Renders each day on a fixed pool of at most `workers` scoped threads.
///
/// Workers pull the next unrendered day from a shared index, so no more
/// than `workers` days are in memory at once. Results come back in the
/// order of `dates`; a day whose worker panicked is reported as failed.
fn render_in_parallel<F>(
    dates: &[NaiveDate],
    workers: usize,
    render: F,
) -> Vec<(NaiveDate, Result<(), SonifyError>)>
where
    F: Fn(NaiveDate) -> Result<(), SonifyError> + Sync,
{
    let next = AtomicUsize::new(0);
    let workers = workers.clamp(1, dates.len().max(1));

    let mut slots: Vec<Option<Result<(), SonifyError>>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let (next, render) = (&next, &render);
                scope.spawn(move || {
                    let mut done = Vec::new();
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(&date) = dates.get(index) else {
                            break;
                        };
                        done.push((index, render(date)));
                    }
                    done
                })
            })
            .collect();

        let mut slots: Vec<Option<Result<(), SonifyError>>> =
            (0..dates.len()).map(|_| None).collect();
        for handle in handles {
            for (index, result) in handle.join().unwrap_or_default() {
                slots[index] = Some(result);
            }
        }
        slots
    });

    dates
        .iter()
        .zip(slots.iter_mut())
        .map(|(&date, slot)| {
            let result = slot.take().unwrap_or_else(|| {
                Err(SonifyError::InvalidParams(format!(
                    "worker rendering {} panicked",
                    date
                )))
            });
            (date, result)
        })
        .collect()
}

fn run_dates_command(args: &DatesArgs) -> Result<(), SonifyError> {
    let points = load_points(&args.input)?;
    let dates = series::available_dates(&points);

    println!("Available dates:");
    println!(
        "{}",
        dates
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<String>>()
            .join(", ")
    );
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Render(args) => run_render_command(args)?,
        Commands::Dates(args) => run_dates_command(args)?,
    }

    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "price_sonify=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if let Err(err) = run() {
        eprintln!("\nERROR: {}\n", err);
        match err.downcast_ref::<SonifyError>() {
            Some(SonifyError::Io(ref io_err)) if io_err.kind() == io::ErrorKind::NotFound => {
                eprintln!("Please check that:");
                eprintln!("1. The file path is correct");
                eprintln!("2. The file exists");
                eprintln!("3. You have permission to read the file");
            }
            Some(SonifyError::Input(_)) => {
                eprintln!("The price data must be non-empty, strictly time-ordered and positive.");
            }
            _ => {}
        }
        process::exit(1);
    }
}
