//! Contact form submit flow: validate, save locally, optionally forward,
//! then confirm with the running total.

use std::time::Duration;

use crate::{
    log_error, log_info, log_warn,
    models::SubmissionInput,
    submissions::SubmissionStore,
    sync::SubmissionSink,
};

const ENABLE_LOGS: bool = true;

pub const THANK_YOU_MESSAGE: &str = "感谢您的留言！我们会在24小时内回复您。";
pub const RETRY_MESSAGE: &str = "提交失败，请稍后重试或直接联系我们。";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted {
        /// Submissions stored locally, this one included.
        total: usize,
        message: String,
    },
    Rejected {
        reason: String,
    },
    Failed {
        message: String,
    },
}

/// Checks the fields the contact form marks as required.
pub fn validate(input: &SubmissionInput) -> Result<(), String> {
    if input.name.trim().is_empty() {
        return Err("请填写姓名".into());
    }
    let email = input.email.trim();
    if email.is_empty() {
        return Err("请填写邮箱".into());
    }
    if !email.contains('@') {
        return Err(format!("邮箱地址无效：{email}"));
    }
    Ok(())
}

pub struct SubmitFlow<S> {
    store: SubmissionStore,
    sink: Option<S>,
    delay: Duration,
}

impl<S: SubmissionSink> SubmitFlow<S> {
    pub fn new(store: SubmissionStore, delay: Duration) -> Self {
        Self {
            store,
            sink: None,
            delay,
        }
    }

    /// Forward each accepted submission through `sink` before confirming.
    pub fn with_sink(mut self, sink: S) -> Self {
        self.sink = Some(sink);
        self
    }

    pub async fn submit(&self, input: SubmissionInput) -> SubmitOutcome {
        if let Err(reason) = validate(&input) {
            log_warn!("Rejected submission: {reason}");
            return SubmitOutcome::Rejected { reason };
        }

        if !self.store.save(input.clone()).await {
            log_warn!("Submission from {} was not stored locally", input.email);
        }

        if let Some(sink) = &self.sink {
            if let Err(err) = sink.send_to_server(&input).await {
                log_error!("Submit failed while forwarding: {err}");
                return SubmitOutcome::Failed {
                    message: RETRY_MESSAGE.to_string(),
                };
            }
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let total = self.store.stats().await.total;
        log_info!("Submission accepted; {total} stored");
        SubmitOutcome::Accepted {
            total,
            message: format!("{THANK_YOU_MESSAGE}\n\n已保存 {total} 条留言记录。"),
        }
    }
}
