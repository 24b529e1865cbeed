//! Episode orchestration and component assembly.

mod orchestrator;
mod setup;

pub use orchestrator::{EpisodeContext, EpisodeEnd, EpisodeSummary, Orchestrator, episode_dir};
pub use setup::{
    build_audio_analyzer, build_gate, build_strategy, load_regional_species, log_banner,
};
