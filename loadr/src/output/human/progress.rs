use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Resolution of the bar; progress is reported as a fraction of the whole run.
const BAR_LENGTH: u64 = 1000;

pub(crate) struct HumanProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl HumanProgress {
    pub(crate) fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    pub(crate) fn update(&self, fraction: f64, message: String) {
        let mut bar = self
            .bar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let pb = bar.get_or_insert_with(|| {
            let pb = ProgressBar::with_draw_target(
                Some(BAR_LENGTH),
                ProgressDrawTarget::stderr_with_hz(5),
            );
            pb.set_style(bar_style());
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        });

        pb.set_position((fraction.clamp(0.0, 1.0) * BAR_LENGTH as f64) as u64);
        pb.set_message(message);
    }

    pub(crate) fn finish(&self) {
        let mut bar = self
            .bar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(pb) = bar.take() {
            pb.finish_and_clear();
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner} [ {bar:20.cyan/blue} ] {percent:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█░")
}
