use chrono::Utc;
use l10n_core::{SchedulerError, SchedulerResult};
use l10n_domain::{RunProgress, RunResult};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// 正在后台执行的运行
///
/// 持有运行任务的句柄，调用方可以查询进度、订阅进度变化、取消或等待结果。
/// 句柄被丢弃时运行继续在后台执行。
pub struct RunHandle {
    run_id: Uuid,
    progress: watch::Receiver<RunProgress>,
    cancel: CancellationToken,
    join: JoinHandle<SchedulerResult<RunResult>>,
}

impl RunHandle {
    pub(crate) fn new(
        run_id: Uuid,
        progress: watch::Receiver<RunProgress>,
        cancel: CancellationToken,
        join: JoinHandle<SchedulerResult<RunResult>>,
    ) -> Self {
        Self {
            run_id,
            progress,
            cancel,
            join,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// 当前进度快照
    pub fn progress(&self) -> RunProgress {
        self.progress.borrow().clone()
    }

    /// 订阅进度变化
    pub fn subscribe(&self) -> watch::Receiver<RunProgress> {
        self.progress.clone()
    }

    /// 请求取消；正在执行的翻译调用不会被中断，已完成的批次结果保留
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// 等待运行结束
    pub async fn wait(self) -> SchedulerResult<RunResult> {
        self.join
            .await
            .map_err(|e| SchedulerError::Internal(format!("运行任务异常退出: {e}")))?
    }
}

/// 运行内部的进度发布端，没有订阅者时不做任何事
#[derive(Default)]
pub(crate) struct ProgressReporter {
    sender: Option<watch::Sender<RunProgress>>,
}

impl ProgressReporter {
    pub(crate) fn new(sender: watch::Sender<RunProgress>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub(crate) fn update(&self, apply: impl FnOnce(&mut RunProgress)) {
        if let Some(sender) = &self.sender {
            sender.send_modify(|progress| {
                apply(progress);
                progress.updated_at = Utc::now();
            });
        }
    }
}
