// src/utils/progress_bars/logging.rs - Per-stage diagnostics sink
//
// Each pipeline stage constructs one StageLogger and passes it to the
// components it drives; components emit events through it instead of
// writing to ambient state.

use std::time::Instant;

use log::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    AssigneeMatching,
    DictionaryBuild,
    Aggregation,
    CompustatVerify,
    CompustatApply,
}

#[derive(Clone)]
pub struct StageLogger {
    stage_name: &'static str,
    stage_emoji: &'static str,
    start_time: Instant,
}

impl StageLogger {
    pub fn new(stage: PipelineStage) -> Self {
        let (stage_name, stage_emoji) = match stage {
            PipelineStage::AssigneeMatching => ("MATCH", "🔎"),
            PipelineStage::DictionaryBuild => ("DICT", "📖"),
            PipelineStage::Aggregation => ("AGG", "📊"),
            PipelineStage::CompustatVerify => ("COMPU-A", "🏦"),
            PipelineStage::CompustatApply => ("COMPU-B", "🏦"),
        };
        Self {
            stage_name,
            stage_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, run_id: &str) {
        info!(
            "[{}] {} 🚀 Starting {} stage (run ID: {})",
            self.stage_name,
            self.stage_emoji,
            self.stage_name.to_lowercase(),
            run_id
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        match details {
            Some(details) => info!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.stage_name,
                self.stage_emoji,
                phase,
                details,
                elapsed.as_secs_f32()
            ),
            None => info!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.stage_name,
                self.stage_emoji,
                phase,
                elapsed.as_secs_f32()
            ),
        }
    }

    pub fn log_data_loaded(&self, count: usize, data_type: &str) {
        info!(
            "[{}] {} 📊 Loaded {} {} records",
            self.stage_name, self.stage_emoji, count, data_type
        );
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}] {}", self.stage_name, message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] {} ⚠️  {}", self.stage_name, self.stage_emoji, message);
    }

    pub fn log_completion(&self, message: &str) {
        let elapsed = self.start_time.elapsed();
        info!(
            "[{}] {} ✅ {} [total {:.1}s]",
            self.stage_name,
            self.stage_emoji,
            message,
            elapsed.as_secs_f32()
        );
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }
}
