use std::fs;

use page_diff::staging::{SlotState, Staging, Transition};

fn staging_in(dir: &std::path::Path) -> Staging {
    Staging::new(dir.join("screenshots"), "initial.png", "final.png")
}

#[test]
fn empty_directory_captures_initial() {
    let tmp = tempfile::tempdir().unwrap();
    let staging = staging_in(tmp.path());
    assert_eq!(staging.state(), SlotState::Empty);

    let run = staging.prepare().unwrap();
    assert_eq!(run.transition, Transition::CaptureInitial);
    assert_eq!(run.capture_to, staging.initial_path());
    assert!(run.compare.is_none());
    assert!(staging.dir().is_dir());
}

#[test]
fn initial_only_captures_final() {
    let tmp = tempfile::tempdir().unwrap();
    let staging = staging_in(tmp.path());
    fs::create_dir_all(staging.dir()).unwrap();
    fs::write(staging.initial_path(), b"first").unwrap();

    assert_eq!(staging.state(), SlotState::InitialOnly);
    let run = staging.prepare().unwrap();
    assert_eq!(run.transition, Transition::CaptureFinal);
    assert_eq!(run.capture_to, staging.final_path());
    assert!(run.compare.is_none());
    assert_eq!(fs::read(staging.initial_path()).unwrap(), b"first");
}

#[test]
fn both_slots_rotate_final_into_initial() {
    let tmp = tempfile::tempdir().unwrap();
    let staging = staging_in(tmp.path());
    fs::create_dir_all(staging.dir()).unwrap();
    fs::write(staging.initial_path(), b"old").unwrap();
    fs::write(staging.final_path(), b"previous").unwrap();

    assert_eq!(staging.state(), SlotState::Both);
    let run = staging.prepare().unwrap();
    assert_eq!(run.transition, Transition::RotateAndCompare);
    assert_eq!(run.capture_to, staging.final_path());
    assert_eq!(
        run.compare,
        Some((staging.initial_path().to_path_buf(), staging.final_path().to_path_buf()))
    );

    assert_eq!(fs::read(staging.initial_path()).unwrap(), b"previous");
    assert!(!staging.final_path().exists());
    assert_eq!(staging.state(), SlotState::InitialOnly);
}

#[test]
fn stray_final_is_treated_as_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let staging = staging_in(tmp.path());
    fs::create_dir_all(staging.dir()).unwrap();
    fs::write(staging.final_path(), b"orphan").unwrap();

    let run = staging.prepare().unwrap();
    assert_eq!(run.transition, Transition::CaptureInitial);
}
