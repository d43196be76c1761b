use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Receives `(dataset_name, percent)` progress events.
pub type ProgressCallback = Box<dyn FnMut(&str, u8) + Send>;

/// Per-dataset progress gate in front of an optional callback.
///
/// Values are clamped to 100 and never delivered out of order: a lower value than the
/// last one reported for the same dataset is dropped. `reset` is the only way back to 0.
#[derive(Default)]
pub struct ProgressTracker {
    callback: Option<ProgressCallback>,
    last: HashMap<String, u8>,
}

impl ProgressTracker {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            last: HashMap::new(),
        }
    }

    pub fn set_callback(&mut self, callback: ProgressCallback) {
        self.callback = Some(callback);
    }

    pub fn report(&mut self, dataset: &str, percent: u8) {
        let percent = percent.min(100);
        if let Some(&last) = self.last.get(dataset) {
            if percent < last {
                return;
            }
        }
        self.last.insert(dataset.to_string(), percent);
        if let Some(callback) = self.callback.as_mut() {
            callback(dataset, percent);
        }
    }

    /// Restart `dataset` at 0, at the start of a run or after a failure.
    pub fn reset(&mut self, dataset: &str) {
        self.last.insert(dataset.to_string(), 0);
        if let Some(callback) = self.callback.as_mut() {
            callback(dataset, 0);
        }
    }

    pub fn last(&self, dataset: &str) -> Option<u8> {
        self.last.get(dataset).copied()
    }

    /// Progress scoped to one dataset.
    pub fn scoped<'a>(&'a mut self, dataset: &'a str) -> DatasetProgress<'a> {
        DatasetProgress {
            tracker: self,
            dataset,
        }
    }
}

pub struct DatasetProgress<'a> {
    tracker: &'a mut ProgressTracker,
    dataset: &'a str,
}

impl DatasetProgress<'_> {
    pub fn report(&mut self, percent: u8) {
        self.tracker.report(self.dataset, percent);
    }

    /// Report `base + done / total * span`, truncated to an integer.
    pub fn report_fraction(&mut self, base: u8, span: f64, done: usize, total: usize) {
        let fraction = if total == 0 {
            0.0
        } else {
            done as f64 / total as f64
        };
        let percent = f64::from(base) + fraction * span;
        self.report(percent as u8);
    }
}

/// Terminal progress bars, one per dataset, driven by pipeline progress events.
pub struct ProgressReporter {
    multi: Option<MultiProgress>,
    bars: Arc<Mutex<HashMap<String, ProgressBar>>>,
}

impl ProgressReporter {
    pub fn new(silent: bool) -> Self {
        Self {
            multi: if silent {
                None
            } else {
                Some(MultiProgress::new())
            },
            bars: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Callback that renders events on this reporter's bars. No-op when silent.
    pub fn callback(&self) -> ProgressCallback {
        let multi = self.multi.clone();
        let bars = Arc::clone(&self.bars);

        Box::new(move |dataset: &str, percent: u8| {
            let Some(multi) = multi.as_ref() else {
                return;
            };
            let Ok(mut bars) = bars.lock() else {
                return;
            };
            let bar = bars
                .entry(dataset.to_string())
                .or_insert_with(|| new_dataset_bar(multi, dataset));
            bar.set_position(u64::from(percent));
            if percent >= 100 {
                bar.finish_with_message("done");
            } else if percent == 0 {
                bar.set_message("");
            }
        })
    }

    pub fn println(&self, message: &str) {
        match &self.multi {
            Some(multi) => {
                if multi.println(message).is_err() {
                    println!("{}", message);
                }
            }
            None => println!("{}", message),
        }
    }

    pub fn finish_all(&self) {
        if let Ok(bars) = self.bars.lock() {
            for bar in bars.values() {
                if !bar.is_finished() {
                    bar.abandon();
                }
            }
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.finish_all();
    }
}

fn new_dataset_bar(multi: &MultiProgress, dataset: &str) -> ProgressBar {
    let pb = multi.add(ProgressBar::new(100));
    if let Ok(style) =
        ProgressStyle::default_bar().template("{prefix:>18} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_prefix(dataset.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> (ProgressTracker, Arc<Mutex<Vec<(String, u8)>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let tracker = ProgressTracker::new(Some(Box::new(move |name: &str, pct: u8| {
            sink.lock().unwrap().push((name.to_string(), pct));
        })));
        (tracker, events)
    }

    #[test]
    fn test_drops_out_of_order_values() {
        let (mut tracker, events) = recording();
        tracker.reset("ERA5");
        tracker.report("ERA5", 15);
        tracker.report("ERA5", 10);
        tracker.report("ERA5", 150);

        let values: Vec<u8> = events.lock().unwrap().iter().map(|(_, p)| *p).collect();
        assert_eq!(values, vec![0, 15, 100]);
    }

    #[test]
    fn test_datasets_are_tracked_independently() {
        let (mut tracker, events) = recording();
        tracker.report("A", 50);
        tracker.report("B", 5);
        tracker.reset("A");
        assert_eq!(tracker.last("A"), Some(0));
        assert_eq!(tracker.last("B"), Some(5));
        assert_eq!(events.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_unset_callback_is_noop() {
        let mut tracker = ProgressTracker::default();
        tracker.report("A", 40);
        assert_eq!(tracker.last("A"), Some(40));
    }

    #[test]
    fn test_report_fraction_truncates() {
        let mut tracker = ProgressTracker::default();
        let mut progress = tracker.scoped("A");
        progress.report_fraction(15, 80.0, 1, 3);
        assert_eq!(tracker.last("A"), Some(41));
    }

    #[test]
    fn test_silent_reporter_callback_is_noop() {
        let reporter = ProgressReporter::new(true);
        let mut callback = reporter.callback();
        callback("A", 50);
        assert!(reporter.bars.lock().unwrap().is_empty());
    }
}
