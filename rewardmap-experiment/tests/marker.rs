mod common;

use common::{SteppedTimer, on_target, white_map};
use rewardmap_core::{RewardSite, SITE_SNAPSHOT_FILE, SITE_TABLE_FILE, SiteTable};
use rewardmap_experiment::{
    ExperimentError, Gesture, HeadlessSurface, Key, LocationMarker, MarkerConfig, RunnerConfig,
    SurfaceError, SurfaceEvent, TrialRunner,
};
use rewardmap_render::OverlayPainter;
use std::fs;
use std::time::Duration;

fn marker(dir: &std::path::Path) -> LocationMarker {
    LocationMarker::new(
        white_map(500, 500),
        dir,
        OverlayPainter::default(),
        MarkerConfig {
            refresh: Duration::ZERO,
            ..MarkerConfig::default()
        },
    )
}

fn double_click(x: i32, y: i32) -> SurfaceEvent {
    SurfaceEvent::Pointer {
        gesture: Gesture::DoubleClick,
        x,
        y,
    }
}

fn press(x: i32, y: i32) -> SurfaceEvent {
    SurfaceEvent::Pointer {
        gesture: Gesture::Press,
        x,
        y,
    }
}

#[test]
fn two_double_clicks_then_quit_persist_two_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut surface = HeadlessSurface::new().with_script([
        press(10, 10),
        double_click(50, 50),
        SurfaceEvent::Key(Key::Space),
        press(400, 400),
        double_click(200, 200),
        SurfaceEvent::Key(Key::Escape),
        double_click(300, 300),
    ]);

    let mut marker = marker(dir.path());
    marker.run_until_quit(&mut surface).unwrap();
    let persisted = marker.persist().unwrap();

    assert_eq!(
        persisted.sites.sites(),
        &[RewardSite::new(50, 50), RewardSite::new(200, 200)]
    );
    assert_eq!(persisted.site_table, dir.path().join(SITE_TABLE_FILE));
    assert_eq!(
        fs::read_to_string(&persisted.site_table).unwrap(),
        ",x,y\n0,50,50\n1,200,200\n"
    );
    assert!(dir.path().join(SITE_SNAPSHOT_FILE).is_file());
    assert!(surface.frames_shown() >= 6);
    assert_eq!(surface.last_title(), Some("LocationMap"));
    assert_eq!(surface.releases(), 1);
}

#[test]
fn only_double_clicks_on_the_map_mark_sites() {
    let dir = tempfile::tempdir().unwrap();
    let mut marker = marker(dir.path());

    assert!(!marker.mark(Gesture::Press, 20, 20));
    assert!(!marker.mark(Gesture::DoubleClick, 500, 20));
    assert!(!marker.mark(Gesture::DoubleClick, -1, 20));
    assert!(marker.mark(Gesture::DoubleClick, 20, 20));
    assert_eq!(marker.sites().sites(), &[RewardSite::new(20, 20)]);
}

#[test]
fn marking_draws_on_the_view_not_the_map() {
    let dir = tempfile::tempdir().unwrap();
    let mut marker = marker(dir.path());
    let before = marker.map().pixmap().data().to_vec();

    marker.mark(Gesture::DoubleClick, 100, 100);

    assert_eq!(marker.map().pixmap().data(), &before[..]);
    assert_ne!(marker.annotated().data(), &before[..]);
}

#[test]
fn persisted_sites_load_back_into_a_trial_runner() {
    let dir = tempfile::tempdir().unwrap();
    let mut surface = HeadlessSurface::new().with_script([
        double_click(120, 80),
        double_click(300, 450),
        SurfaceEvent::Key(Key::Escape),
    ]);
    let mut marker = marker(dir.path());
    marker.run_until_quit(&mut surface).unwrap();
    let persisted = marker.persist().unwrap();

    let table = SiteTable::load(&persisted.site_table).unwrap();
    let runner = TrialRunner::new(
        RunnerConfig::new(1, 0.0, dir.path()),
        white_map(500, 500),
        table,
        SteppedTimer::new(Duration::from_millis(1)),
        |_len: usize| 0,
        on_target,
    )
    .unwrap();

    assert_eq!(
        runner.sites().sites(),
        &[RewardSite::new(120, 80), RewardSite::new(300, 450)]
    );
}

#[test]
fn unwritable_folder_fails_without_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("not-created");
    let mut marker = marker(&missing);
    marker.mark(Gesture::DoubleClick, 60, 60);

    assert!(marker.persist().is_err());
    assert!(!missing.exists());
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn closing_the_window_aborts_marking() {
    let dir = tempfile::tempdir().unwrap();
    let mut surface =
        HeadlessSurface::new().with_script([double_click(50, 50), SurfaceEvent::Closed]);
    let mut marker = marker(dir.path());

    let err = marker.run_until_quit(&mut surface).unwrap_err();

    assert!(matches!(
        err,
        ExperimentError::Surface(SurfaceError::Closed)
    ));
    assert_eq!(marker.sites().len(), 1);
}
