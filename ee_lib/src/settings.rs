//! Core configuration

use crate::ee::sif::DEFAULT_TAG_BUDGET;

#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct CoreSettings {
    /// Trace every BIOS syscall by name
    pub log_bios_calls: bool,
    /// Maximum number of DMA tags each side of a SIF channel may fetch per engine invocation
    pub sif_tag_budget: u32,
}

impl Default for CoreSettings {
    fn default() -> CoreSettings {
        CoreSettings {
            log_bios_calls: true,
            sif_tag_budget: DEFAULT_TAG_BUDGET,
        }
    }
}
