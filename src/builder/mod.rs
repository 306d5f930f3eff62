//! Build pipeline: context, toolchain generation, orchestrator invocation,
//! archive merging, and the driver sequencing them.

pub mod colcon;
pub mod context;
pub mod driver;
pub mod merge;
pub mod toolchain;

pub use context::BuildContext;
pub use driver::BuildDriver;
pub use merge::ArchiveMerger;
pub use toolchain::CMakeToolchain;
