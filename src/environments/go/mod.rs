pub mod installer;
pub mod linker;
pub mod manager;
pub mod store;
pub mod uninstaller;
pub mod upgrade;

pub use installer::{InstallOrchestrator, InstallReport, InstallStage, InstallWarning};
pub use linker::LinkReport;
pub use manager::GoManager;
pub use store::VersionStore;
pub use uninstaller::{BatchFilter, BatchOutcome, BatchSummary, UninstallEngine, UninstallSpec};
pub use upgrade::{UpgradeOutcome, UpgradePlan};
