//! Terminal progress for coordinator jobs.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use plugsync_core::{JobCoordinator, JobOutput, TaskRecord, TaskState};

/// One indicatif bar per watched task.
struct TaskBoard {
    bars: HashMap<String, ProgressBar>,
}

impl TaskBoard {
    fn new(names: &[String]) -> Self {
        let multi = MultiProgress::new();
        let style = ProgressStyle::with_template(
            "{prefix:>24.bold} [{bar:30.cyan/blue}] {pos:>3}% {msg}",
        )
        .expect("valid progress template")
        .progress_chars("=> ");

        let bars = names
            .iter()
            .map(|name| {
                let bar = multi.add(ProgressBar::new(100));
                bar.set_style(style.clone());
                bar.set_prefix(name.clone());
                bar.set_message("pending");
                (name.clone(), bar)
            })
            .collect();

        Self { bars }
    }

    fn update(&self, snapshot: &BTreeMap<String, TaskRecord<JobOutput>>) {
        for (name, bar) in &self.bars {
            let Some(record) = snapshot.get(name) else {
                continue;
            };
            bar.set_position(u64::from(record.progress));
            match record.state {
                TaskState::Pending => bar.set_message("pending"),
                _ if record.message.is_empty() => bar.set_message(record.state.as_str()),
                _ => bar.set_message(record.message.clone()),
            }
        }
    }

    fn finish(&self, snapshot: &BTreeMap<String, TaskRecord<JobOutput>>) {
        for (name, bar) in &self.bars {
            match snapshot.get(name) {
                Some(record) if record.state == TaskState::Finished => {
                    bar.set_position(100);
                    bar.finish_with_message(format!("done: {}", record.message));
                }
                Some(record) => {
                    let error = record.error.as_deref().unwrap_or("not started");
                    bar.abandon_with_message(format!("failed: {error}"));
                }
                None => bar.abandon_with_message("missing"),
            }
        }
    }
}

/// Render bars for `names` until none of them is in flight, polling
/// `status_all` every `poll`. Returns the final snapshot of every task.
pub(crate) async fn watch(
    coordinator: &JobCoordinator,
    names: &[String],
    poll: Duration,
) -> BTreeMap<String, TaskRecord<JobOutput>> {
    let board = TaskBoard::new(names);

    let settled = async {
        for name in names {
            coordinator.wait(name).await;
        }
    };
    tokio::pin!(settled);

    let mut ticker = tokio::time::interval(poll.max(Duration::from_millis(50)));
    loop {
        tokio::select! {
            _ = &mut settled => break,
            _ = ticker.tick() => board.update(&coordinator.status_all()),
        }
    }

    let snapshot = coordinator.status_all();
    board.finish(&snapshot);
    snapshot
}
