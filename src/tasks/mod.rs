//! 后台任务登记表：提交研究计划生成任务、查询进度与结果

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use uuid::Uuid;

use crate::generator::workflow::{ProgressFn, ResearchPlanGenerator};
use crate::generator::{ResearchResult, RunStatus};

pub type TaskId = Uuid;

/// 单个任务最多检索的论文数量
pub const MAX_PAPER_NUM: usize = 20;
/// 已结束的任务在这段时间后不再出现在活跃列表中
const ACTIVE_WINDOW_HOURS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Started,
    Progress,
    Success,
    Failure,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failure)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TaskError {
    #[error("关键词不能为空")]
    EmptyKeyword,

    #[error("论文数量必须在1到{max}之间，实际为{actual}")]
    InvalidPaperCount { actual: usize, max: usize },
}

#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub keyword: String,
    pub search_paper_num: usize,
    pub status: TaskStatus,
    pub progress: u8,
    pub message: String,
    pub result: Option<ResearchResult>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 对外返回的任务状态
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub task_id: TaskId,
    pub keyword: String,
    pub status: TaskStatus,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskSnapshot {
    fn from_record(task_id: TaskId, record: &TaskRecord) -> Self {
        Self {
            task_id,
            keyword: record.keyword.clone(),
            status: record.status,
            progress: record.progress,
            message: record.message.clone(),
            result: record.result.clone(),
            error: record.error.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

type TaskTable = Arc<RwLock<HashMap<TaskId, TaskRecord>>>;

/// 任务登记表。所有读写都经过同一把锁，持锁期间不做任何await。
#[derive(Clone)]
pub struct TaskRegistry {
    tasks: TaskTable,
    generator: Arc<ResearchPlanGenerator>,
}

fn read(tasks: &TaskTable) -> RwLockReadGuard<'_, HashMap<TaskId, TaskRecord>> {
    tasks.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write(tasks: &TaskTable) -> RwLockWriteGuard<'_, HashMap<TaskId, TaskRecord>> {
    tasks.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn update(tasks: &TaskTable, id: TaskId, apply: impl FnOnce(&mut TaskRecord)) {
    if let Some(record) = write(tasks).get_mut(&id) {
        apply(record);
        record.updated_at = Utc::now();
    }
}

/// 校验任务参数
pub fn validate(keyword: &str, search_paper_num: usize) -> Result<(), TaskError> {
    if keyword.trim().is_empty() {
        return Err(TaskError::EmptyKeyword);
    }
    if !(1..=MAX_PAPER_NUM).contains(&search_paper_num) {
        return Err(TaskError::InvalidPaperCount {
            actual: search_paper_num,
            max: MAX_PAPER_NUM,
        });
    }
    Ok(())
}

impl TaskRegistry {
    pub fn new(generator: Arc<ResearchPlanGenerator>) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            generator,
        }
    }

    /// 校验参数并在后台启动任务，立即返回任务ID
    pub fn submit(&self, keyword: &str, search_paper_num: usize) -> Result<TaskId, TaskError> {
        validate(keyword, search_paper_num)?;
        let keyword = keyword.trim().to_string();

        let id = Uuid::new_v4();
        let now = Utc::now();
        write(&self.tasks).insert(
            id,
            TaskRecord {
                keyword: keyword.clone(),
                search_paper_num,
                status: TaskStatus::Pending,
                progress: 0,
                message: "等待执行".to_string(),
                result: None,
                error: None,
                created_at: now,
                updated_at: now,
            },
        );
        tracing::info!(task_id = %id, keyword = %keyword, search_paper_num, "📥 提交研究计划任务");

        let tasks = self.tasks.clone();
        let generator = self.generator.clone();
        tokio::spawn(async move {
            update(&tasks, id, |record| {
                record.status = TaskStatus::Started;
                record.message = "任务已开始".to_string();
            });

            let progress_tasks = tasks.clone();
            let progress: ProgressFn = Arc::new(move |percent, message| {
                update(&progress_tasks, id, |record| {
                    record.status = TaskStatus::Progress;
                    record.progress = percent;
                    record.message = message.to_string();
                });
            });

            let result = generator
                .run_with_progress(&keyword, search_paper_num, Some(progress))
                .await;
            finish(&tasks, id, result);
        });

        Ok(id)
    }

    pub fn poll(&self, id: TaskId) -> Option<TaskSnapshot> {
        read(&self.tasks)
            .get(&id)
            .map(|record| TaskSnapshot::from_record(id, record))
    }

    /// 未结束的任务，以及一小时内更新过的已结束任务，按创建时间倒序
    pub fn list_active(&self) -> Vec<TaskSnapshot> {
        self.list_active_at(Utc::now())
    }

    pub fn list_active_at(&self, now: DateTime<Utc>) -> Vec<TaskSnapshot> {
        let cutoff = now - Duration::hours(ACTIVE_WINDOW_HOURS);
        let mut active: Vec<TaskSnapshot> = read(&self.tasks)
            .iter()
            .filter(|(_, record)| !record.status.is_terminal() || record.updated_at >= cutoff)
            .map(|(id, record)| TaskSnapshot::from_record(*id, record))
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        active
    }

    pub fn len(&self) -> usize {
        read(&self.tasks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn insert_record(&self, id: TaskId, record: TaskRecord) {
        write(&self.tasks).insert(id, record);
    }
}

fn finish(tasks: &TaskTable, id: TaskId, result: ResearchResult) {
    update(tasks, id, |record| match result.status {
        RunStatus::Failed => {
            tracing::error!(task_id = %id, error = ?result.error, "❌ 任务失败");
            record.status = TaskStatus::Failure;
            record.message = "生成失败".to_string();
            record.error = result.error.clone();
            record.result = Some(result);
        }
        _ => {
            tracing::info!(task_id = %id, "✅ 任务完成");
            record.status = TaskStatus::Success;
            record.progress = 100;
            record.message = "任务完成".to_string();
            record.result = Some(result);
        }
    });
}
