//! Background jobs for save, load and export.
//!
//! One job runs at a time on a named worker thread. The job closure owns a
//! snapshot of whatever it needs, so session state is never touched off the
//! main context. While a job is active the canvas refuses edits.

use std::any::Any;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use web_time::Instant;

use crate::format::{ExportResult, FormatError, ProjectData};

/// What a background job is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    SaveProject,
    LoadProject,
    ExportImage,
    ExportCoco,
    ExportShapefile,
    ImportShapefile,
}

impl JobKind {
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::SaveProject => "save project",
            JobKind::LoadProject => "load project",
            JobKind::ExportImage => "export image",
            JobKind::ExportCoco => "export COCO",
            JobKind::ExportShapefile => "export shapefile",
            JobKind::ImportShapefile => "import shapefile",
        }
    }

    /// Registry id of the format this job reads or writes.
    pub fn format_id(&self) -> &'static str {
        match self {
            JobKind::SaveProject | JobKind::LoadProject => "sgmt",
            JobKind::ExportImage => "png",
            JobKind::ExportCoco => "coco",
            JobKind::ExportShapefile | JobKind::ImportShapefile => "shp",
        }
    }
}

/// Successful job result.
#[derive(Debug)]
pub enum JobOutput {
    Exported(ExportResult),
    Loaded(Box<ProjectData>),
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Worker panicked: {0}")]
    Panicked(String),

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Another job is running ({})", .0.name())]
    Busy(JobKind),
}

/// Completion of one job.
#[derive(Debug)]
pub struct JobReport {
    pub kind: JobKind,
    pub result: Result<JobOutput, JobError>,
}

struct ActiveJob {
    kind: JobKind,
    started: Instant,
    receiver: Receiver<Result<JobOutput, FormatError>>,
    handle: JoinHandle<()>,
}

/// Runs at most one job at a time.
#[derive(Default)]
pub struct JobRunner {
    active: Option<ActiveJob>,
}

impl std::fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRunner")
            .field("active", &self.active_kind())
            .finish()
    }
}

impl JobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kind of the running job, if any.
    pub fn active_kind(&self) -> Option<JobKind> {
        self.active.as_ref().map(|job| job.kind)
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    /// Spawn `work` on a worker thread.
    pub fn start<F>(&mut self, kind: JobKind, work: F) -> Result<(), JobError>
    where
        F: FnOnce() -> Result<JobOutput, FormatError> + Send + 'static,
    {
        if let Some(active) = self.active_kind() {
            return Err(JobError::Busy(active));
        }

        let (sender, receiver) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(format!("segpaint-{}", kind.name().replace(' ', "-")))
            .spawn(move || {
                log::debug!("Job '{}' started", kind.name());
                let result = work();
                if sender.send(result).is_err() {
                    log::warn!("Job '{}' finished after its runner was dropped", kind.name());
                }
            })?;

        log::info!("Started job '{}'", kind.name());
        self.active = Some(ActiveJob {
            kind,
            started: Instant::now(),
            receiver,
            handle,
        });
        Ok(())
    }

    /// Non-blocking check for completion.
    pub fn poll(&mut self) -> Option<JobReport> {
        let job = self.active.as_ref()?;
        let outcome = match job.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => None,
        };
        let job = self.active.take()?;
        Some(Self::finish(job, outcome))
    }

    /// Block until the running job completes.
    pub fn wait(&mut self) -> Option<JobReport> {
        let job = self.active.take()?;
        let outcome = job.receiver.recv().ok();
        Some(Self::finish(job, outcome))
    }

    fn finish(job: ActiveJob, outcome: Option<Result<JobOutput, FormatError>>) -> JobReport {
        let joined = job.handle.join();
        let result = match (outcome, joined) {
            (Some(result), _) => result.map_err(JobError::from),
            (None, Err(payload)) => Err(JobError::Panicked(panic_message(payload.as_ref()))),
            (None, Ok(())) => Err(JobError::Panicked("worker exited without a result".to_string())),
        };

        let elapsed = job.started.elapsed();
        match &result {
            Ok(_) => log::info!("Job '{}' finished in {:.2?}", job.kind.name(), elapsed),
            Err(e) => log::error!("Job '{}' failed after {:.2?}: {}", job.kind.name(), elapsed, e),
        }

        JobReport {
            kind: job.kind,
            result,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};

    #[test]
    fn test_job_result_is_reported() {
        let mut runner = JobRunner::new();
        runner
            .start(JobKind::ExportCoco, || {
                let mut result = ExportResult::new();
                result.annotations_exported = 3;
                Ok(JobOutput::Exported(result))
            })
            .unwrap();

        let report = runner.wait().unwrap();
        assert_eq!(report.kind, JobKind::ExportCoco);
        match report.result {
            Ok(JobOutput::Exported(result)) => assert_eq!(result.annotations_exported, 3),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!runner.is_busy());
    }

    #[test]
    fn test_format_error_is_reported() {
        let mut runner = JobRunner::new();
        runner
            .start(JobKind::LoadProject, || Err(FormatError::missing_field("image")))
            .unwrap();

        let report = runner.wait().unwrap();
        assert!(matches!(report.result, Err(JobError::Format(_))));
    }

    #[test]
    fn test_panic_is_caught() {
        let mut runner = JobRunner::new();
        runner
            .start(JobKind::SaveProject, || panic!("disk on fire"))
            .unwrap();

        let report = runner.wait().unwrap();
        match report.result {
            Err(JobError::Panicked(message)) => assert_eq!(message, "disk on fire"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_second_job_is_refused_while_busy() {
        let gate = Arc::new(Barrier::new(2));
        let worker_gate = Arc::clone(&gate);

        let mut runner = JobRunner::new();
        runner
            .start(JobKind::ExportImage, move || {
                worker_gate.wait();
                Ok(JobOutput::Exported(ExportResult::new()))
            })
            .unwrap();

        assert!(runner.is_busy());
        assert!(runner.poll().is_none());
        let err = runner
            .start(JobKind::ExportCoco, || Ok(JobOutput::Exported(ExportResult::new())))
            .unwrap_err();
        assert!(matches!(err, JobError::Busy(JobKind::ExportImage)));

        gate.wait();
        assert!(runner.wait().unwrap().result.is_ok());
        assert_eq!(runner.active_kind(), None);
    }

    #[test]
    fn test_poll_without_job() {
        assert!(JobRunner::new().poll().is_none());
        assert!(JobRunner::new().wait().is_none());
    }
}
