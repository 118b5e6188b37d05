pub mod go;

pub use go::{
    BatchOutcome, GoManager, InstallReport, InstallWarning, LinkReport, UninstallSpec,
    UpgradeOutcome, VersionStore,
};
