//! 处理协调器
//!
//! 持有处理状态与任务批次表（同一把锁保护），以及工作队列。
//! 控制面（HTTP 接口）只做入队、查询、暂停/恢复/取消，不会执行任何阶段，
//! 因此永远不会被文档转换阻塞。
//!
//! 加锁顺序固定为：协调器状态 → 队列内部锁。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::model::{
    CancelOutcome, Job, ProcessingPhase, ProcessingSnapshot, ProcessingStatus, ProcessingTask,
    SourceFile, SubmitOutcome,
};
use crate::storage::Library;
use crate::util::config::ProcessingConfig;
use crate::util::logging::standards::events;
use crate::util::task_queue::TaskQueue;

use super::error::{ProcessingError, ProcessingResult};
use super::registry::JobRegistry;

#[derive(Debug, Default)]
struct CoordinatorState {
    status: ProcessingStatus,
    current_file: Option<String>,
    current_job: Option<String>,
    current_phase: Option<ProcessingPhase>,
    queue_length: usize,
    /// 正在执行阶段的文件ID（取消后仍保留，直到 Worker 处理完）
    in_flight: Option<String>,
    jobs: JobRegistry,
}

impl CoordinatorState {
    fn snapshot(&self) -> ProcessingSnapshot {
        ProcessingSnapshot {
            status: self.status,
            current_file: self.current_file.clone(),
            current_job: self.current_job.clone(),
            current_phase: self.current_phase,
            queue_length: self.queue_length,
        }
    }

    fn clear_current(&mut self) {
        self.current_file = None;
        self.current_job = None;
        self.current_phase = None;
    }
}

/// Worker 尝试领取队首任务的结果
#[derive(Debug)]
pub(super) enum Claim {
    Task(ProcessingTask),
    /// 暂停中，任务留在队列里
    Paused,
    /// 协调器已空闲，任务被确认并丢弃
    Discarded(ProcessingTask),
    Empty,
}

pub struct ProcessingCoordinator {
    state: Mutex<CoordinatorState>,
    queue: TaskQueue,
    state_changed: Notify,
    library: Arc<Library>,
    pause_poll_interval: Duration,
}

impl ProcessingCoordinator {
    pub fn new(library: Arc<Library>, pause_poll_interval: Duration) -> Self {
        Self {
            state: Mutex::new(CoordinatorState::default()),
            queue: TaskQueue::new(),
            state_changed: Notify::new(),
            library,
            pause_poll_interval,
        }
    }

    pub fn from_config(library: Arc<Library>, config: &ProcessingConfig) -> Self {
        Self::new(
            library,
            Duration::from_millis(config.pause_poll_interval_ms.max(1)),
        )
    }

    pub fn library(&self) -> &Arc<Library> {
        &self.library
    }

    /// 当前处理状态快照
    pub fn status(&self) -> ProcessingSnapshot {
        self.state.lock().snapshot()
    }

    /// 暂停：当前文件两个阶段都完成后，Worker 不再领取新任务
    pub fn pause(&self) -> ProcessingResult<ProcessingSnapshot> {
        let mut state = self.state.lock();
        match state.status {
            ProcessingStatus::Idle => {
                warn!(event = events::CONTROL_REJECTED, op = "pause", "空闲状态无法暂停");
                Err(ProcessingError::NoActiveJob)
            }
            ProcessingStatus::Paused => Ok(state.snapshot()),
            ProcessingStatus::Running => {
                state.status = ProcessingStatus::Paused;
                info!(
                    event = events::CONTROL_PAUSE,
                    queue_length = state.queue_length,
                    current_file = ?state.current_file
                );
                Ok(state.snapshot())
            }
        }
    }

    pub fn resume(&self) -> ProcessingResult<ProcessingSnapshot> {
        let snapshot = {
            let mut state = self.state.lock();
            match state.status {
                ProcessingStatus::Idle => {
                    warn!(event = events::CONTROL_REJECTED, op = "resume", "空闲状态无法恢复");
                    return Err(ProcessingError::NoActiveJob);
                }
                ProcessingStatus::Running => return Ok(state.snapshot()),
                ProcessingStatus::Paused => {
                    state.status = ProcessingStatus::Running;
                    info!(event = events::CONTROL_RESUME, queue_length = state.queue_length);
                    state.snapshot()
                }
            }
        };
        self.state_changed.notify_waiters();
        Ok(snapshot)
    }

    /// 取消：清空队列中尚未开始的任务，状态立即回到 idle
    ///
    /// 正在处理的文件不会被中断，也不会被标记为失败。
    pub fn cancel(&self) -> CancelOutcome {
        let outcome = {
            let mut state = self.state.lock();
            if state.status == ProcessingStatus::Idle {
                return CancelOutcome {
                    items_cleared: 0,
                    status: state.snapshot(),
                };
            }

            let drained = self.queue.drain();
            for task in &drained {
                state.jobs.record_cancelled(&task.job_id, &task.file_id);
            }
            state.status = ProcessingStatus::Idle;
            state.clear_current();
            state.queue_length = 0;

            info!(
                event = events::CONTROL_CANCEL,
                items_cleared = drained.len(),
                in_flight = ?state.in_flight
            );
            CancelOutcome {
                items_cleared: drained.len(),
                status: state.snapshot(),
            }
        };
        self.state_changed.notify_waiters();
        outcome
    }

    /// 为一组文件创建任务批次并入队
    ///
    /// 已在队列中或正在处理的文件会被跳过。没有可入队文件时不创建批次。
    pub fn submit(&self, files: Vec<SourceFile>) -> SubmitOutcome {
        let outcome = {
            let mut state = self.state.lock();
            self.enqueue_locked(&mut state, files, 0)
        };
        self.state_changed.notify_waiters();
        outcome
    }

    fn enqueue_locked(
        &self,
        state: &mut CoordinatorState,
        files: Vec<SourceFile>,
        already_skipped: usize,
    ) -> SubmitOutcome {
        let mut seen = HashSet::new();
        let mut skipped = already_skipped;
        let accepted: Vec<SourceFile> = files
            .into_iter()
            .filter(|file| {
                let duplicate =
                    self.is_scheduled(state, &file.id) || !seen.insert(file.id.clone());
                if duplicate {
                    skipped += 1;
                }
                !duplicate
            })
            .collect();

        if accepted.is_empty() {
            info!(event = events::CONTROL_SUBMIT_EMPTY, files_skipped = skipped);
            return SubmitOutcome {
                job_id: None,
                files_queued: 0,
                files_skipped: skipped,
                status: state.status,
            };
        }

        let job_id = state.jobs.create_job(accepted.len());
        let files_queued = accepted.len();
        for file in accepted {
            self.queue.enqueue(ProcessingTask {
                job_id: job_id.clone(),
                file_id: file.id,
                filename: file.filename,
                category: file.category,
                source_path: file.path,
                sequence: file.sequence,
            });
        }

        // 暂停中提交的任务等待 resume
        if state.status == ProcessingStatus::Idle {
            state.status = ProcessingStatus::Running;
        }
        state.queue_length = self.queue.len();

        info!(
            event = events::CONTROL_SUBMIT,
            job_id = %job_id,
            files_queued,
            files_skipped = skipped,
            queue_length = state.queue_length,
            status = %state.status
        );
        SubmitOutcome {
            job_id: Some(job_id),
            files_queued,
            files_skipped: skipped,
            status: state.status,
        }
    }

    /// 处理单个文件
    pub fn process_file(&self, file_id: &str, reprocess: bool) -> ProcessingResult<SubmitOutcome> {
        let file = self.library.find_file(file_id)?;
        self.submit_eligible(vec![file], reprocess)
    }

    /// 处理某个分类下所有待处理文件
    pub fn process_category(
        &self,
        category: &str,
        reprocess: bool,
    ) -> ProcessingResult<SubmitOutcome> {
        let files = self.library.list_files(category)?;
        self.submit_eligible(files, reprocess)
    }

    /// 处理所有分类下的待处理文件
    pub fn process_all(&self, reprocess: bool) -> ProcessingResult<SubmitOutcome> {
        let files = self.library.list_all_files()?;
        self.submit_eligible(files, reprocess)
    }

    /// 过滤可入队文件：pending/markdown 可入队；completed 仅在重新处理时入队，
    /// 且先删除派生产物
    ///
    /// 检查、删除产物与入队在同一次加锁内完成，已排队或正在处理的文件的产物不会被删除。
    fn submit_eligible(
        &self,
        files: Vec<SourceFile>,
        reprocess: bool,
    ) -> ProcessingResult<SubmitOutcome> {
        let outcome = {
            let mut state = self.state.lock();
            let mut eligible = Vec::with_capacity(files.len());
            let mut skipped = 0;
            for mut file in files {
                if self.is_scheduled(&state, &file.id) {
                    skipped += 1;
                    continue;
                }
                if reprocess {
                    self.library.clear_artifacts(&file)?;
                    file.status = self.library.status_at(&file.category, file.sequence);
                } else if !file.status.is_eligible() {
                    skipped += 1;
                    continue;
                }
                eligible.push(file);
            }
            self.enqueue_locked(&mut state, eligible, skipped)
        };
        self.state_changed.notify_waiters();
        Ok(outcome)
    }

    fn is_scheduled(&self, state: &CoordinatorState, file_id: &str) -> bool {
        state.in_flight.as_deref() == Some(file_id) || self.queue.contains_file(file_id)
    }

    pub fn job(&self, job_id: &str) -> ProcessingResult<Job> {
        self.state
            .lock()
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| ProcessingError::UnknownJob(job_id.to_string()))
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.state.lock().jobs.list()
    }

    /// 关闭队列，Worker 在当前文件结束后退出
    pub fn shutdown(&self) {
        info!(event = events::QUEUE_CLOSED, "关闭工作队列");
        self.queue.close();
        self.state_changed.notify_waiters();
    }

    pub(super) fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub(super) fn state_changed(&self) -> &Notify {
        &self.state_changed
    }

    pub(super) fn pause_poll_interval(&self) -> Duration {
        self.pause_poll_interval
    }

    /// 在状态锁内检查暂停/空闲并领取队首任务
    pub(super) fn claim_next(&self) -> Claim {
        let mut state = self.state.lock();
        match state.status {
            ProcessingStatus::Paused => Claim::Paused,
            ProcessingStatus::Idle => match self.queue.try_dequeue() {
                Some(task) => {
                    state.jobs.record_cancelled(&task.job_id, &task.file_id);
                    state.queue_length = self.queue.len();
                    Claim::Discarded(task)
                }
                None => Claim::Empty,
            },
            ProcessingStatus::Running => match self.queue.try_dequeue() {
                Some(task) => {
                    state.jobs.mark_processing(&task.job_id, &task.filename);
                    state.current_file = Some(task.filename.clone());
                    state.current_job = Some(task.job_id.clone());
                    state.current_phase = Some(ProcessingPhase::Markup);
                    state.in_flight = Some(task.file_id.clone());
                    state.queue_length = self.queue.len();
                    Claim::Task(task)
                }
                None => Claim::Empty,
            },
        }
    }

    /// 仅当快照仍指向该任务时更新阶段；取消后清空的快照不再回填
    pub(super) fn enter_phase(&self, task: &ProcessingTask, phase: ProcessingPhase) {
        let mut state = self.state.lock();
        let visible = state.in_flight.as_deref() == Some(task.file_id.as_str())
            && state.current_job.as_deref() == Some(task.job_id.as_str());
        if state.status != ProcessingStatus::Idle && visible {
            state.current_phase = Some(phase);
        }
    }

    /// 记录任务结果；队列为空时回到 idle
    pub(super) fn finish_task(&self, task: &ProcessingTask, success: bool) {
        let mut state = self.state.lock();
        if success {
            state.jobs.record_completed(&task.job_id, &task.file_id);
        } else {
            state.jobs.record_failed(&task.job_id, &task.file_id);
        }

        if state.in_flight.as_deref() == Some(task.file_id.as_str()) {
            state.in_flight = None;
        }
        state.clear_current();
        state.queue_length = self.queue.len();

        if self.queue.is_empty() && state.status != ProcessingStatus::Idle {
            state.status = ProcessingStatus::Idle;
            info!(event = events::WORKER_IDLE, "队列已清空，回到空闲状态");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JobStatus;
    use crate::storage::library::tests::{add_source, library_in};
    use tempfile::TempDir;

    fn coordinator(dir: &TempDir) -> ProcessingCoordinator {
        ProcessingCoordinator::new(Arc::new(library_in(dir)), Duration::from_millis(20))
    }

    fn seed(coordinator: &ProcessingCoordinator, category: &str, names: &[&str]) {
        for name in names {
            add_source(coordinator.library(), category, name);
        }
    }

    #[test]
    fn test_pause_and_resume_require_active_job() {
        let dir = TempDir::new().unwrap();
        let coordinator = coordinator(&dir);

        assert!(matches!(
            coordinator.pause(),
            Err(ProcessingError::NoActiveJob)
        ));
        assert!(matches!(
            coordinator.resume(),
            Err(ProcessingError::NoActiveJob)
        ));
        assert_eq!(coordinator.status().status, ProcessingStatus::Idle);
    }

    #[test]
    fn test_cancel_when_idle_is_noop() {
        let dir = TempDir::new().unwrap();
        let coordinator = coordinator(&dir);

        let outcome = coordinator.cancel();
        assert_eq!(outcome.items_cleared, 0);
        assert_eq!(outcome.status, ProcessingSnapshot::default());
    }

    #[test]
    fn test_submit_starts_running() {
        let dir = TempDir::new().unwrap();
        let coordinator = coordinator(&dir);
        seed(&coordinator, "Req_1", &["a.pdf", "b.pdf"]);

        let outcome = coordinator.process_category("Req_1", false).unwrap();
        assert_eq!(outcome.files_queued, 2);
        assert_eq!(outcome.status, ProcessingStatus::Running);

        let job = coordinator.job(outcome.job_id.as_deref().unwrap()).unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.total_files, 2);

        let status = coordinator.status();
        assert_eq!(status.status, ProcessingStatus::Running);
        assert_eq!(status.queue_length, 2);
        assert!(status.current_phase.is_none());
    }

    #[test]
    fn test_pause_resume_round_trip() {
        let dir = TempDir::new().unwrap();
        let coordinator = coordinator(&dir);
        seed(&coordinator, "Req_1", &["a.pdf"]);
        coordinator.process_all(false).unwrap();

        let before = coordinator.status();
        let paused = coordinator.pause().unwrap();
        assert_eq!(paused.status, ProcessingStatus::Paused);
        // 重复暂停是无操作
        assert_eq!(coordinator.pause().unwrap(), paused);

        let resumed = coordinator.resume().unwrap();
        assert_eq!(resumed, before);
        assert_eq!(coordinator.resume().unwrap(), before);
    }

    #[test]
    fn test_cancel_clears_queued_tasks() {
        let dir = TempDir::new().unwrap();
        let coordinator = coordinator(&dir);
        seed(&coordinator, "Req_1", &["a.pdf", "b.pdf", "c.pdf"]);
        let job_id = coordinator
            .process_category("Req_1", false)
            .unwrap()
            .job_id
            .unwrap();

        let outcome = coordinator.cancel();
        assert_eq!(outcome.items_cleared, 3);
        assert_eq!(outcome.status.status, ProcessingStatus::Idle);
        assert_eq!(outcome.status.queue_length, 0);
        assert!(coordinator.queue().is_empty());

        let job = coordinator.job(&job_id).unwrap();
        assert_eq!(job.cancelled.len(), 3);
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.completed.len() + job.failed.len(), 0);
    }

    #[test]
    fn test_duplicate_submission_is_skipped() {
        let dir = TempDir::new().unwrap();
        let coordinator = coordinator(&dir);
        seed(&coordinator, "Req_1", &["a.pdf", "b.pdf"]);

        let first = coordinator.process_category("Req_1", false).unwrap();
        assert_eq!(first.files_queued, 2);

        let file_id = crate::model::derive_file_id("Req_1", "a.pdf");
        let second = coordinator.process_file(&file_id, false).unwrap();
        assert!(second.job_id.is_none());
        assert_eq!(second.files_queued, 0);
        assert_eq!(second.files_skipped, 1);
        assert_eq!(coordinator.status().queue_length, 2);
    }

    #[test]
    fn test_completed_files_need_reprocess() {
        let dir = TempDir::new().unwrap();
        let coordinator = coordinator(&dir);
        seed(&coordinator, "Req_1", &["a.pdf", "b.pdf"]);

        let library = coordinator.library();
        let record = library.record_path("Req_1", 1);
        std::fs::create_dir_all(record.parent().unwrap()).unwrap();
        std::fs::write(&record, b"{}").unwrap();

        let outcome = coordinator.process_category("Req_1", false).unwrap();
        assert_eq!(outcome.files_queued, 1);
        assert_eq!(outcome.files_skipped, 1);
        coordinator.cancel();

        let outcome = coordinator.process_category("Req_1", true).unwrap();
        assert_eq!(outcome.files_queued, 2);
        assert!(!record.exists());
    }

    #[test]
    fn test_submit_while_paused_stays_paused() {
        let dir = TempDir::new().unwrap();
        let coordinator = coordinator(&dir);
        seed(&coordinator, "Req_1", &["a.pdf"]);
        seed(&coordinator, "Req_2", &["b.pdf"]);

        coordinator.process_category("Req_1", false).unwrap();
        coordinator.pause().unwrap();
        let outcome = coordinator.process_category("Req_2", false).unwrap();

        assert_eq!(outcome.status, ProcessingStatus::Paused);
        assert_eq!(coordinator.status().queue_length, 2);
        assert!(matches!(coordinator.claim_next(), Claim::Paused));
        assert_eq!(coordinator.queue().len(), 2);
    }

    #[test]
    fn test_claim_while_idle_discards_once() {
        let dir = TempDir::new().unwrap();
        let coordinator = coordinator(&dir);
        seed(&coordinator, "Req_1", &["a.pdf"]);
        let job_id = coordinator.process_all(false).unwrap().job_id.unwrap();

        coordinator.state.lock().status = ProcessingStatus::Idle;

        assert!(matches!(coordinator.claim_next(), Claim::Discarded(_)));
        assert!(matches!(coordinator.claim_next(), Claim::Empty));
        let job = coordinator.job(&job_id).unwrap();
        assert_eq!(job.cancelled.len(), 1);
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[test]
    fn test_claim_and_finish_update_state() {
        let dir = TempDir::new().unwrap();
        let coordinator = coordinator(&dir);
        seed(&coordinator, "Req_1", &["a.pdf", "b.pdf"]);
        let job_id = coordinator.process_all(false).unwrap().job_id.unwrap();

        let Claim::Task(task) = coordinator.claim_next() else {
            panic!("expected a task");
        };
        let status = coordinator.status();
        assert_eq!(status.current_file.as_deref(), Some("a.pdf"));
        assert_eq!(status.current_phase, Some(ProcessingPhase::Markup));
        assert_eq!(status.queue_length, 1);
        assert_eq!(
            coordinator.job(&job_id).unwrap().status,
            JobStatus::Processing
        );

        coordinator.enter_phase(&task, ProcessingPhase::Record);
        assert_eq!(
            coordinator.status().current_phase,
            Some(ProcessingPhase::Record)
        );

        coordinator.finish_task(&task, true);
        let status = coordinator.status();
        assert_eq!(status.status, ProcessingStatus::Running);
        assert!(status.current_file.is_none());
        assert_eq!(status.queue_length, 1);
    }

    #[test]
    fn test_stale_task_does_not_touch_new_snapshot() {
        let dir = TempDir::new().unwrap();
        let coordinator = coordinator(&dir);
        seed(&coordinator, "Req_1", &["a.pdf", "b.pdf"]);
        seed(&coordinator, "Req_2", &["c.pdf"]);
        coordinator.process_category("Req_1", false).unwrap();

        let Claim::Task(stale) = coordinator.claim_next() else {
            panic!("expected a task");
        };
        coordinator.cancel();
        coordinator.process_category("Req_2", false).unwrap();

        // 被取消批次的文件仍在执行，进入阶段2时不应改写新的快照
        coordinator.enter_phase(&stale, ProcessingPhase::Record);
        let status = coordinator.status();
        assert_eq!(status.status, ProcessingStatus::Running);
        assert!(status.current_file.is_none());
        assert!(status.current_job.is_none());
        assert!(status.current_phase.is_none());
        assert_eq!(status.queue_length, 1);

        coordinator.finish_task(&stale, true);
        let Claim::Task(next) = coordinator.claim_next() else {
            panic!("expected a task");
        };
        assert_eq!(next.filename, "c.pdf");
        coordinator.enter_phase(&next, ProcessingPhase::Record);
        let status = coordinator.status();
        assert_eq!(status.current_file.as_deref(), Some("c.pdf"));
        assert_eq!(status.current_phase, Some(ProcessingPhase::Record));
    }

    #[test]
    fn test_reprocess_keeps_artifacts_of_scheduled_file() {
        let dir = TempDir::new().unwrap();
        let coordinator = coordinator(&dir);
        seed(&coordinator, "Req_1", &["a.pdf"]);
        let file_id = crate::model::derive_file_id("Req_1", "a.pdf");
        coordinator.process_file(&file_id, false).unwrap();

        let Claim::Task(task) = coordinator.claim_next() else {
            panic!("expected a task");
        };
        // 阶段1已产出 Markdown
        let markdown = coordinator.library().markdown_path("Req_1", 1);
        std::fs::create_dir_all(markdown.parent().unwrap()).unwrap();
        std::fs::write(&markdown, b"# a").unwrap();

        let outcome = coordinator.process_file(&file_id, true).unwrap();
        assert_eq!(outcome.files_queued, 0);
        assert_eq!(outcome.files_skipped, 1);
        assert!(markdown.exists());

        coordinator.finish_task(&task, true);
        assert_eq!(coordinator.status().status, ProcessingStatus::Idle);
    }

    #[test]
    fn test_concurrent_reprocess_queues_once() {
        let dir = TempDir::new().unwrap();
        let coordinator = coordinator(&dir);
        seed(&coordinator, "Req_1", &["a.pdf"]);
        let file_id = crate::model::derive_file_id("Req_1", "a.pdf");

        let outcomes: Vec<SubmitOutcome> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| coordinator.process_file(&file_id, true).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let queued: usize = outcomes.iter().map(|o| o.files_queued).sum();
        assert_eq!(queued, 1);
        assert_eq!(outcomes.iter().filter(|o| o.job_id.is_some()).count(), 1);
        assert_eq!(coordinator.status().queue_length, 1);
        assert_eq!(coordinator.jobs().len(), 1);
    }

    #[test]
    fn test_unknown_lookups() {
        let dir = TempDir::new().unwrap();
        let coordinator = coordinator(&dir);
        coordinator.library().ensure_directories().unwrap();

        assert!(matches!(
            coordinator.job("nope"),
            Err(ProcessingError::UnknownJob(_))
        ));
        assert!(matches!(
            coordinator.process_file("nope", false),
            Err(ProcessingError::UnknownFile(_))
        ));
        assert!(matches!(
            coordinator.process_category("nope", false),
            Err(ProcessingError::UnknownCategory(_))
        ));
    }
}
