//! Rolling "initial"/"final" screenshot slots.
//!
//! The slot state is read from the filesystem on every run and drives a single
//! transition: bootstrap one slot, or rotate `final` into `initial` and compare
//! against a fresh capture.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("failed to create screenshot directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to rename {} to {}: {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Which slots currently hold a screenshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    InitialOnly,
    Both,
}

/// What a run has to do for a given slot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    CaptureInitial,
    CaptureFinal,
    RotateAndCompare,
}

impl SlotState {
    pub fn from_slots(initial_exists: bool, final_exists: bool) -> Self {
        match (initial_exists, final_exists) {
            (true, true) => SlotState::Both,
            (true, false) => SlotState::InitialOnly,
            // a stray final without an initial is overwritten by the next captures
            (false, _) => SlotState::Empty,
        }
    }

    pub fn transition(self) -> Transition {
        match self {
            SlotState::Empty => Transition::CaptureInitial,
            SlotState::InitialOnly => Transition::CaptureFinal,
            SlotState::Both => Transition::RotateAndCompare,
        }
    }
}

/// A prepared run: where to capture, and what to compare afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRun {
    pub transition: Transition,
    pub capture_to: PathBuf,
    /// `(initial, final)` once the capture has landed.
    pub compare: Option<(PathBuf, PathBuf)>,
}

#[derive(Debug, Clone)]
pub struct Staging {
    dir: PathBuf,
    initial: PathBuf,
    final_: PathBuf,
}

impl Staging {
    pub fn new(dir: impl Into<PathBuf>, initial_name: &str, final_name: &str) -> Self {
        let dir = dir.into();
        Self {
            initial: dir.join(initial_name),
            final_: dir.join(final_name),
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn initial_path(&self) -> &Path {
        &self.initial
    }

    pub fn final_path(&self) -> &Path {
        &self.final_
    }

    pub fn state(&self) -> SlotState {
        SlotState::from_slots(self.initial.is_file(), self.final_.is_file())
    }

    /// Creates the directory, applies the file moves for the current state
    /// and returns where the next screenshot goes.
    pub fn prepare(&self) -> Result<StagedRun, StagingError> {
        fs::create_dir_all(&self.dir).map_err(|source| StagingError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let transition = self.state().transition();
        let run = match transition {
            Transition::CaptureInitial => {
                info!(path = %self.initial.display(), "creating initial screenshot");
                StagedRun {
                    transition,
                    capture_to: self.initial.clone(),
                    compare: None,
                }
            }
            Transition::CaptureFinal => {
                info!(path = %self.final_.display(), "creating final screenshot");
                StagedRun {
                    transition,
                    capture_to: self.final_.clone(),
                    compare: None,
                }
            }
            Transition::RotateAndCompare => {
                info!("both screenshots exist, rotating final into initial");
                self.rotate()?;
                StagedRun {
                    transition,
                    capture_to: self.final_.clone(),
                    compare: Some((self.initial.clone(), self.final_.clone())),
                }
            }
        };
        Ok(run)
    }

    fn rotate(&self) -> Result<(), StagingError> {
        fs::remove_file(&self.initial).map_err(|source| StagingError::Remove {
            path: self.initial.clone(),
            source,
        })?;
        fs::rename(&self.final_, &self.initial).map_err(|source| StagingError::Rename {
            from: self.final_.clone(),
            to: self.initial.clone(),
            source,
        })
    }
}
