pub mod config;
pub mod pack;
pub mod util;

pub use config::Config;
pub use pack::{
    list_runs, load_evidence_pack, write_evidence_pack, EvidencePackPaths, LoadedPack,
    PackCapture, PackError, RunMetadata,
};
