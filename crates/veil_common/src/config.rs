use crate::progress_ui::ProgressMode;
use std::ffi::OsStr;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct ArtifactDir {
    pub dir_path: PathBuf,
    pub filename_prefix: PathBuf,
}

impl ArtifactDir {
    pub fn artifact_path(&self, extension: &(impl AsRef<OsStr> + ?Sized)) -> PathBuf {
        self.dir_path
            .join(self.filename_prefix.with_extension(extension))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CfgSimplification {
    Enabled,
    Disabled,
}

impl Default for CfgSimplification {
    fn default() -> Self {
        CfgSimplification::Enabled
    }
}

#[derive(Clone, Debug)]
pub struct PassOptions {
    pub simplify_cfg: CfgSimplification,
    pub remove_redundant_folds: bool,
    pub remove_trivial_assertions: bool,
    pub run_fixups: bool,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            simplify_cfg: CfgSimplification::default(),
            remove_redundant_folds: true,
            remove_trivial_assertions: true,
            run_fixups: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DriverConfig {
    /// Number of worker threads verifying methods. Zero means one worker per
    /// available CPU.
    pub num_workers: usize,
    pub progress: ProgressMode,
    /// When set, the driver dumps per-method artifacts (textual backend
    /// program, reborrowing DAG graphviz) into this directory.
    pub artifact_dir: Option<ArtifactDir>,
    pub pass_options: PassOptions,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            num_workers: 0,
            progress: ProgressMode::Hidden,
            artifact_dir: None,
            pass_options: PassOptions::default(),
        }
    }
}
