use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use crate::model::ProcessingTask;
use crate::util::logging::standards::events;

/// 单消费者的本地 FIFO 任务队列
///
/// 生产者是控制面，唯一消费者是后台 Worker。容量不设上限（任务只是文件引用）。
/// 取消时通过 [`TaskQueue::drain`] 原地清空同一个队列实例，
/// 不替换实例，避免 Worker 持有旧队列的引用。
pub struct TaskQueue {
    items: Mutex<VecDeque<ProcessingTask>>,
    ready: Notify,
    closed: AtomicBool,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            ready: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// 入队，不阻塞且总是成功
    pub fn enqueue(&self, task: ProcessingTask) {
        let depth = {
            let mut items = self.items.lock();
            items.push_back(task);
            items.len()
        };
        debug!(event = events::QUEUE_ENQUEUE, depth);
        self.ready.notify_one();
    }

    /// 等待队列中出现任务
    ///
    /// 返回 `false` 表示队列已关闭（进程退出的停止信号）。
    pub async fn wait_for_task(&self) -> bool {
        loop {
            if self.is_closed() {
                return false;
            }
            if !self.items.lock().is_empty() {
                return true;
            }
            self.ready.notified().await;
        }
    }

    /// 取出队首任务（不阻塞）
    pub fn try_dequeue(&self) -> Option<ProcessingTask> {
        let task = self.items.lock().pop_front();
        if let Some(task) = &task {
            debug!(
                event = events::QUEUE_DEQUEUE,
                job_id = %task.job_id,
                file_id = %task.file_id
            );
        }
        task
    }

    /// 原地清空队列，返回被丢弃的任务
    pub fn drain(&self) -> Vec<ProcessingTask> {
        self.items.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn contains_file(&self, file_id: &str) -> bool {
        self.items.lock().iter().any(|task| task.file_id == file_id)
    }

    /// 关闭队列，唤醒等待中的消费者
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.ready.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    fn task(file_id: &str) -> ProcessingTask {
        ProcessingTask {
            job_id: "job".to_string(),
            file_id: file_id.to_string(),
            filename: format!("{file_id}.pdf"),
            category: "Req_1".to_string(),
            source_path: PathBuf::from(format!("data/input/Req_1/{file_id}.pdf")),
            sequence: 1,
        }
    }

    #[test]
    fn test_fifo_order() {
        let queue = TaskQueue::new();
        queue.enqueue(task("a"));
        queue.enqueue(task("b"));
        queue.enqueue(task("c"));

        assert_eq!(queue.len(), 3);
        assert!(queue.contains_file("b"));
        assert_eq!(queue.try_dequeue().unwrap().file_id, "a");
        assert_eq!(queue.try_dequeue().unwrap().file_id, "b");
        assert_eq!(queue.try_dequeue().unwrap().file_id, "c");
        assert!(queue.try_dequeue().is_none());
    }

    #[test]
    fn test_drain_empties_in_place() {
        let queue = TaskQueue::new();
        queue.enqueue(task("a"));
        queue.enqueue(task("b"));

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(queue.is_empty());

        queue.enqueue(task("c"));
        assert_eq!(queue.try_dequeue().unwrap().file_id, "c");
    }

    #[tokio::test]
    async fn test_waiter_wakes_on_enqueue() {
        let queue = Arc::new(TaskQueue::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.wait_for_task().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.enqueue(task("a"));

        let ready = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(ready);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_close_stops_waiter() {
        let queue = Arc::new(TaskQueue::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.wait_for_task().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close();

        let ready = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(!ready);
    }
}
