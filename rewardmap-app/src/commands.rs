use crate::surface::WinitSurface;
use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rewardmap_core::{ExperimentParameters, SessionLayout, SiteTable};
use rewardmap_experiment::{
    DisplaySurface, DriftingPosition, HeadlessSurface, Key, LocationMarker, MarkerConfig,
    RunnerConfig, SurfaceEvent, TrialEvent, TrialRunner, UniformSampler,
    config::DEFAULT_DISPLAY_MS,
};
use rewardmap_render::{MapImage, OverlayPainter, OverlayStyle, TextPainter};
use rewardmap_timing::HighPrecisionTimer;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Args)]
pub struct MarkArgs {
    /// Arena map image
    #[arg(long, env = "REWARDMAP_MAP")]
    map: PathBuf,

    /// Folder that receives rewardlocations.csv and rewardlocations.tif
    #[arg(long, env = "REWARDMAP_OUT")]
    out: PathBuf,

    /// TrueType font for coordinate labels (system fonts are tried otherwise)
    #[arg(long, env = "REWARDMAP_FONT")]
    font: Option<PathBuf>,
}

#[derive(Args)]
pub struct RunArgs {
    /// Arena map image
    #[arg(long, env = "REWARDMAP_MAP")]
    map: PathBuf,

    /// Reward site table written by `mark`
    #[arg(long, env = "REWARDMAP_SITES")]
    sites: PathBuf,

    /// Root folder; each session goes to <folder>/<date>/<number>_<subject>
    #[arg(long, env = "REWARDMAP_EXPERIMENT_FOLDER")]
    experiment_folder: PathBuf,

    /// Number of trials
    #[arg(long, env = "REWARDMAP_TRIALS")]
    trials: usize,

    /// Seconds each trial lasts
    #[arg(long, env = "REWARDMAP_TIMEOUT", allow_negative_numbers = true)]
    timeout: f64,

    #[arg(long, env = "REWARDMAP_EXPERIMENT_NUMBER", default_value_t = 1)]
    experiment_number: u32,

    /// Session date as DDMMYYYY (defaults to today)
    #[arg(long, env = "REWARDMAP_DATE")]
    date: Option<String>,

    #[arg(long, env = "REWARDMAP_SUBJECT", default_value = "subject")]
    subject: String,

    /// How long each target is shown before tracking starts
    #[arg(long, env = "REWARDMAP_DISPLAY_MS", default_value_t = DEFAULT_DISPLAY_MS)]
    display_ms: u64,

    /// Seed for target selection and agent placement
    #[arg(long, env = "REWARDMAP_SEED")]
    seed: Option<u64>,

    /// Start trials without the site review window
    #[arg(long)]
    skip_review: bool,

    /// Run without opening a window
    #[arg(long)]
    headless: bool,

    /// TrueType font for labels and the time readout
    #[arg(long, env = "REWARDMAP_FONT")]
    font: Option<PathBuf>,
}

/// Loads the requested font, or the first system font found. Without one,
/// markers are still drawn but text is skipped.
fn overlay_painter(font: Option<&Path>) -> Result<OverlayPainter> {
    let text = match font {
        Some(path) => Some(
            TextPainter::from_file(path)
                .with_context(|| format!("Failed to load font {}", path.display()))?,
        ),
        None => match TextPainter::discover() {
            Some((painter, path)) => {
                info!(font = %path.display(), "using system font");
                Some(painter)
            }
            None => {
                warn!("no font found, labels and time readout will not be drawn; pass --font");
                None
            }
        },
    };
    Ok(OverlayPainter::new(OverlayStyle::default(), text))
}

fn open_map(path: &Path) -> Result<MapImage> {
    MapImage::open(path).with_context(|| format!("Failed to open map {}", path.display()))
}

pub fn mark(args: MarkArgs) -> Result<()> {
    let map = open_map(&args.map)?;
    let painter = overlay_painter(args.font.as_deref())?;
    fs::create_dir_all(&args.out)
        .with_context(|| format!("Failed to create {}", args.out.display()))?;

    let mut marker = LocationMarker::new(map, &args.out, painter, MarkerConfig::default());
    let mut surface = WinitSurface::new()?;
    marker
        .run_until_quit(&mut surface)
        .context("Marking aborted, nothing was saved")?;

    let saved = marker.persist().context("Failed to save reward locations")?;
    info!(
        sites = saved.sites.len(),
        table = %saved.site_table.display(),
        snapshot = %saved.snapshot.display(),
        "reward locations saved"
    );
    Ok(())
}

type SessionRunner =
    TrialRunner<HighPrecisionTimer, UniformSampler<StdRng>, DriftingPosition<StdRng>>;

/// Validates every input and builds the runner before anything is written,
/// so a bad configuration leaves no session folder behind.
fn prepare_session(args: &RunArgs) -> Result<(SessionRunner, SessionLayout)> {
    let date = args
        .date
        .clone()
        .unwrap_or_else(|| Local::now().format("%d%m%Y").to_string());
    let session = SessionLayout::new(
        &args.experiment_folder,
        &date,
        args.experiment_number,
        &args.subject,
    );

    let map = open_map(&args.map)?;
    let sites = SiteTable::load(&args.sites)
        .with_context(|| format!("Failed to load reward sites {}", args.sites.display()))?;
    let painter = overlay_painter(args.font.as_deref())?;

    let mut seeder = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let config = RunnerConfig::new(args.trials, args.timeout, session.path())
        .with_display_duration(Duration::from_millis(args.display_ms));
    let runner = TrialRunner::new(
        config,
        map,
        sites,
        HighPrecisionTimer::new(),
        UniformSampler::new(StdRng::from_rng(&mut seeder)),
        DriftingPosition::new(StdRng::from_rng(&mut seeder)),
    )?
    .with_painter(painter);

    session
        .create_dirs()
        .context("Failed to create session folder")?;
    ExperimentParameters {
        experiment_number: args.experiment_number,
        experiment_date: date,
        subject_name: args.subject.clone(),
        number_of_trials: args.trials,
        reward_timeout_secs: args.timeout,
        map: args.map.clone(),
        reward_locations: args.sites.clone(),
    }
    .write(session.path())
    .context("Failed to save experiment parameters")?;

    Ok((runner, session))
}

pub fn run(args: RunArgs) -> Result<()> {
    let (mut runner, session) = prepare_session(&args)?;

    let mut surface: Box<dyn DisplaySurface> = if args.headless {
        let mut headless = HeadlessSurface::realtime();
        if !args.skip_review {
            headless.push_event(SurfaceEvent::Key(Key::Escape));
        }
        Box::new(headless)
    } else {
        Box::new(WinitSurface::new()?)
    };

    if !args.skip_review {
        let snapshot = runner
            .review_sites(surface.as_mut())
            .context("Site review aborted")?;
        info!(snapshot = %snapshot.display(), "reward locations checked");
    }

    let report = runner.run(surface.as_mut(), |event| {
        if let TrialEvent::TrialCompleted(record) = event {
            info!(
                trial = record.trial_index,
                target = %record.target,
                ticks = record.ticks,
                "trial recorded"
            );
        }
    })?;

    info!(
        trials = report.records.len(),
        folder = %session.path().display(),
        "session complete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rewardmap_core::{PARAMETERS_FILE, RewardSite};
    use rewardmap_experiment::TRIAL_RESULTS_FILE;
    use std::ffi::OsString;

    #[derive(Parser)]
    struct RunCli {
        #[command(flatten)]
        args: RunArgs,
    }

    fn fixtures(dir: &Path, sites: &[RewardSite]) -> (PathBuf, PathBuf) {
        let map = dir.join("map.png");
        image::RgbaImage::from_pixel(100, 100, image::Rgba([255, 255, 255, 255]))
            .save(&map)
            .unwrap();
        let table = dir.join("sites.csv");
        SiteTable::from_sites(sites.to_vec()).save(&table).unwrap();
        (map, table)
    }

    fn run_args(map: &Path, sites: &Path, folder: &Path, trials: &str) -> RunArgs {
        let mut argv: Vec<OsString> = vec!["run".into()];
        for (flag, path) in [("--map", map), ("--sites", sites), ("--experiment-folder", folder)] {
            argv.push(flag.into());
            argv.push(path.into());
        }
        argv.extend(
            [
                "--trials", trials, "--timeout", "0", "--date", "21022018", "--display-ms", "0",
                "--seed", "7", "--skip-review", "--headless",
            ]
            .map(OsString::from),
        );
        RunCli::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn zero_trials_leave_no_session_folder() {
        let dir = tempfile::tempdir().unwrap();
        let (map, sites) = fixtures(dir.path(), &[RewardSite::new(10, 10)]);
        let folder = dir.path().join("sessions");

        assert!(run(run_args(&map, &sites, &folder, "0")).is_err());
        assert!(!folder.exists());
    }

    #[test]
    fn off_map_site_leaves_no_session_folder() {
        let dir = tempfile::tempdir().unwrap();
        let (map, sites) = fixtures(dir.path(), &[RewardSite::new(150, 10)]);
        let folder = dir.path().join("sessions");

        assert!(run(run_args(&map, &sites, &folder, "2")).is_err());
        assert!(!folder.exists());
    }

    #[test]
    fn headless_session_writes_parameters_and_results() {
        let dir = tempfile::tempdir().unwrap();
        let (map, sites) =
            fixtures(dir.path(), &[RewardSite::new(10, 10), RewardSite::new(90, 90)]);
        let folder = dir.path().join("sessions");

        run(run_args(&map, &sites, &folder, "2")).unwrap();

        let session = folder.join("21022018").join("1_subject");
        let params = fs::read_to_string(session.join(PARAMETERS_FILE)).unwrap();
        assert!(params.contains("NumberOfTrials,2"));
        assert!(session.join(TRIAL_RESULTS_FILE).is_file());
    }
}
