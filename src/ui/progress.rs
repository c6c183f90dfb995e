use crate::core::scheduler::ProgressFn;
use indicatif::{ProgressBar, ProgressStyle};

/// Thin progress bar over the orchestrator's completion callback. The engine
/// only promises "probe N finished"; this is the whole UI contract.
pub struct RunProgress {
    bar: ProgressBar,
}

impl RunProgress {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .expect("static template")
                .progress_chars("#>-"),
        );
        Self { bar }
    }

    pub fn observer(&self) -> Box<ProgressFn> {
        let bar = self.bar.clone();
        Box::new(move |_idx, result| {
            bar.set_message(result.identity.clone());
            bar.inc(1);
        })
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
