use std::collections::HashMap;

use chrono::Utc;
use nanoid::nanoid;
use tracing::info;

use crate::model::{Job, JobStatus};
use crate::util::logging::standards::events;

const JOB_ID_ALPHABET: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j',
    'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
const JOB_ID_LEN: usize = 8;

/// 任务批次表
///
/// 只保存在内存中，进程存活期间不删除任何记录。
/// 所有读写都在协调器的同一把锁内进行。
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: HashMap<String, Job>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新建任务批次，返回其ID
    pub fn create_job(&mut self, total_files: usize) -> String {
        let mut id = nanoid!(JOB_ID_LEN, JOB_ID_ALPHABET);
        while self.jobs.contains_key(&id) {
            id = nanoid!(JOB_ID_LEN, JOB_ID_ALPHABET);
        }

        self.jobs.insert(id.clone(), Job::new(id.clone(), total_files));
        info!(event = events::JOB_CREATED, job_id = %id, total_files);
        id
    }

    pub fn get(&self, job_id: &str) -> Option<&Job> {
        self.jobs.get(job_id)
    }

    /// 按创建时间倒序列出
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub(crate) fn mark_processing(&mut self, job_id: &str, filename: &str) {
        if let Some(job) = self.jobs.get_mut(job_id) {
            job.status = JobStatus::Processing;
            job.current_file = Some(filename.to_string());
        }
    }

    pub(crate) fn record_completed(&mut self, job_id: &str, file_id: &str) {
        self.record(job_id, |job| job.completed.push(file_id.to_string()));
    }

    pub(crate) fn record_failed(&mut self, job_id: &str, file_id: &str) {
        self.record(job_id, |job| job.failed.push(file_id.to_string()));
    }

    pub(crate) fn record_cancelled(&mut self, job_id: &str, file_id: &str) {
        self.record(job_id, |job| job.cancelled.push(file_id.to_string()));
    }

    fn record(&mut self, job_id: &str, update: impl FnOnce(&mut Job)) {
        let Some(job) = self.jobs.get_mut(job_id) else {
            return;
        };
        if job.status == JobStatus::Completed {
            return;
        }

        update(job);
        job.current_file = None;

        if job.is_resolved() {
            job.status = JobStatus::Completed;
            job.finished_at = Some(Utc::now());
            info!(
                event = events::JOB_COMPLETED,
                job_id = %job.id,
                total_files = job.total_files,
                completed = job.completed.len(),
                failed = job.failed.len(),
                cancelled = job.cancelled.len()
            );
        }
    }
}
