use std::time::Duration;

use indicatif::ProgressBar;

pub trait SpinnerExt {
    /// Ticks the spinner from a background task until it is finished.
    fn with_ticking(self) -> Self;
}

impl SpinnerExt for ProgressBar {
    fn with_ticking(self) -> Self {
        let spinner = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(50)).await;
                if spinner.is_finished() {
                    break;
                }
                spinner.tick();
            }
        });
        self
    }
}
