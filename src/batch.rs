use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use frame_snap::{JpegInfo, SnapError};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

/// Where `input` lands inside `out_dir`: the input file name with `.jpeg` appended.
pub fn output_path(out_dir: &Path, input: &Path) -> PathBuf {
    let mut name = input.file_name().unwrap_or_default().to_os_string();
    name.push(".jpeg");
    out_dir.join(name)
}

#[derive(Debug)]
pub enum Outcome {
    Converted(JpegInfo),
    Failed(String),
    Skipped,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub converted: usize,
    pub skipped: usize,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    fn record(&mut self, input: PathBuf, outcome: Outcome) {
        match outcome {
            Outcome::Converted(_) => self.converted += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed(err) => self.failed.push((input, err)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped == 0
    }
}

/// Pairs each input with its output path. An input whose output path was already claimed by
/// an earlier input is returned separately and never converted.
fn plan_outputs(
    inputs: Vec<PathBuf>,
    out_dir: &Path,
) -> (Vec<(PathBuf, PathBuf)>, Vec<(PathBuf, String)>) {
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut jobs = Vec::with_capacity(inputs.len());
    let mut collisions = Vec::new();
    for input in inputs {
        let output = output_path(out_dir, &input);
        if let Some(first) = claimed.get(&output) {
            let reason = format!(
                "output {} is already written by {}",
                output.display(),
                first.display()
            );
            collisions.push((input, reason));
            continue;
        }
        claimed.insert(output.clone(), input.clone());
        jobs.push((input, output));
    }
    (jobs, collisions)
}

/// Converts every input on the blocking pool, at most `jobs` at a time.
///
/// Inputs that would overwrite another input's output fail up front. Once `cancel` fires no
/// new conversion starts; those already running finish and are reported.
pub async fn run_batch<F>(
    inputs: Vec<PathBuf>,
    out_dir: &Path,
    jobs: usize,
    cancel: CancellationToken,
    convert: F,
) -> BatchReport
where
    F: Fn(&Path, &Path) -> Result<JpegInfo, SnapError> + Send + Sync + 'static,
{
    let convert = Arc::new(convert);
    let total = inputs.len();
    let (planned, collisions) = plan_outputs(inputs, out_dir);

    let mut report = BatchReport::default();
    for (input, reason) in collisions {
        log::error!("{}: {}", input.display(), reason);
        report.record(input, Outcome::Failed(reason));
    }

    let mut results = futures::stream::iter(planned)
        .map(|(input, output)| {
            let convert = convert.clone();
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return (input, Outcome::Skipped);
                }
                let task_input = input.clone();
                let handle = tokio::task::spawn_blocking(move || convert(&task_input, &output));
                let outcome = match handle.await {
                    Ok(Ok(info)) => Outcome::Converted(info),
                    Ok(Err(e)) => Outcome::Failed(e.to_string()),
                    Err(e) => Outcome::Failed(format!("conversion task panicked: {}", e)),
                };
                (input, outcome)
            }
        })
        .buffer_unordered(jobs.max(1));

    while let Some((input, outcome)) = results.next().await {
        match &outcome {
            Outcome::Converted(info) => log::info!(
                "[{}/{}] {}: {}x{}, {}B",
                report.converted + report.failed.len() + report.skipped + 1,
                total,
                input.display(),
                info.width,
                info.height,
                info.len
            ),
            Outcome::Failed(err) => log::error!("{}: {}", input.display(), err),
            Outcome::Skipped => log::warn!("{}: skipped after cancel", input.display()),
        }
        report.record(input, outcome);
    }
    report
}
