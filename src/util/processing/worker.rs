//! 后台处理 Worker
//!
//! 进程内只有一个 Worker，严格按 FIFO 顺序、一次一个文件地执行两个阶段。
//! 暂停/取消只在文件之间生效，正在处理的文件总会跑完两个阶段。

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::model::{ProcessingPhase, ProcessingTask};
use crate::util::logging::standards::events;

use super::coordinator::{Claim, ProcessingCoordinator};
use super::error::{ProcessingError, ProcessingResult};
use super::stages::PipelineStages;

/// 启动后台 Worker，返回其句柄（关闭时等待退出）
pub fn spawn_processing_worker(
    coordinator: Arc<ProcessingCoordinator>,
    stages: Arc<dyn PipelineStages>,
) -> JoinHandle<()> {
    tokio::spawn(run_worker(coordinator, stages))
}

async fn run_worker(coordinator: Arc<ProcessingCoordinator>, stages: Arc<dyn PipelineStages>) {
    info!(event = events::WORKER_START, "处理Worker已启动");

    while let Some(task) = next_task(&coordinator).await {
        process_task(&coordinator, &stages, task).await;
    }

    info!(event = events::WORKER_STOP, "处理Worker已退出");
}

/// 等待下一个可执行的任务，队列关闭时返回 `None`
async fn next_task(coordinator: &ProcessingCoordinator) -> Option<ProcessingTask> {
    loop {
        if !coordinator.queue().wait_for_task().await {
            return None;
        }

        // 先登记通知再检查状态，避免错过 resume/cancel
        let state_changed = coordinator.state_changed().notified();
        tokio::pin!(state_changed);
        state_changed.as_mut().enable();

        match coordinator.claim_next() {
            Claim::Task(task) => return Some(task),
            Claim::Discarded(task) => {
                warn!(
                    event = events::WORKER_DISCARD,
                    job_id = %task.job_id,
                    file_id = %task.file_id,
                    "协调器已空闲，丢弃任务"
                );
            }
            Claim::Paused => {
                debug!(event = events::WORKER_PAUSED, "处理已暂停，等待恢复");
                let _ = tokio::time::timeout(coordinator.pause_poll_interval(), state_changed).await;
            }
            Claim::Empty => {}
        }
    }
}

async fn process_task(
    coordinator: &ProcessingCoordinator,
    stages: &Arc<dyn PipelineStages>,
    task: ProcessingTask,
) {
    let started = Instant::now();
    info!(
        event = events::PIPELINE_START,
        job_id = %task.job_id,
        file_id = %task.file_id,
        filename = %task.filename,
        category = %task.category,
        sequence = task.sequence
    );

    let success = match run_pipeline(coordinator, stages, &task).await {
        Ok(()) => true,
        Err(err) => {
            error!(
                event = events::PIPELINE_ERROR,
                job_id = %task.job_id,
                file_id = %task.file_id,
                error = %err
            );
            false
        }
    };

    coordinator.finish_task(&task, success);

    info!(
        event = events::PIPELINE_COMPLETE,
        job_id = %task.job_id,
        file_id = %task.file_id,
        success,
        elapsed_ms = started.elapsed().as_millis() as u64
    );
}

async fn run_pipeline(
    coordinator: &ProcessingCoordinator,
    stages: &Arc<dyn PipelineStages>,
    task: &ProcessingTask,
) -> ProcessingResult<()> {
    let convert = {
        let stages = Arc::clone(stages);
        let source = task.source_path.clone();
        let category = task.category.clone();
        let sequence = task.sequence;
        async move {
            stages
                .convert_to_markup(&source, &category, sequence)
                .await
        }
    };
    run_stage(ProcessingPhase::Markup, &task.file_id, convert).await?;

    coordinator.enter_phase(task, ProcessingPhase::Record);

    let extract = {
        let stages = Arc::clone(stages);
        let markup = coordinator
            .library()
            .markdown_path(&task.category, task.sequence);
        let category = task.category.clone();
        async move { stages.generate_record(&markup, &category).await }
    };
    run_stage(ProcessingPhase::Record, &task.file_id, extract).await
}

/// 在独立任务中执行阶段，panic 与错误都转换为 [`ProcessingError::StageFailure`]
async fn run_stage<F>(phase: ProcessingPhase, file_id: &str, stage: F) -> ProcessingResult<()>
where
    F: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    let started = Instant::now();
    debug!(event = events::PIPELINE_STAGE, phase = phase.number(), file_id, "阶段开始");

    let reason = match tokio::spawn(stage).await {
        Ok(Ok(true)) => {
            info!(
                event = events::PIPELINE_STAGE,
                phase = phase.number(),
                file_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "阶段完成"
            );
            return Ok(());
        }
        Ok(Ok(false)) => "阶段返回失败".to_string(),
        Ok(Err(err)) => format!("{err:#}"),
        Err(join_err) if join_err.is_panic() => format!("阶段发生panic: {join_err}"),
        Err(join_err) => format!("阶段任务被中止: {join_err}"),
    };

    Err(ProcessingError::StageFailure {
        phase,
        file_id: file_id.to_string(),
        reason,
    })
}
