//! Mock backend for testing.
//!
//! Behaves like a backend that stores messages in memory, and lets tests
//! queue canned responses, inject failures, delay replies and count calls.

use super::{Backend, BackendError};
use async_trait::async_trait;
use chat_types::{
    DeviceInfoResponse, LatestMessageResponse, Message, MessageId, MessageListResponse,
    SubmitRequest, SubmitResponse, STATUS_NO_MESSAGES, STATUS_SUCCESS,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Mock backend for testing.
///
/// Clones share state, so a test can keep one handle while the engine owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<MockBackendInner>>,
}

#[derive(Debug)]
struct MockBackendInner {
    device: DeviceInfoResponse,
    stored: Vec<Message>,
    next_id: i64,
    reflect_writes: bool,
    list_status: String,
    queued_lists: VecDeque<QueuedList>,
    submit_delay: Duration,
    submitted: Vec<SubmitRequest>,
    fail_next_device_info: Option<String>,
    fail_next_messages: Option<String>,
    fail_next_submit: Option<String>,
    device_info_calls: usize,
    message_calls: usize,
    latest_calls: usize,
    submit_calls: usize,
}

#[derive(Debug)]
struct QueuedList {
    delay: Duration,
    messages: Vec<Message>,
}

impl Default for MockBackendInner {
    fn default() -> Self {
        Self {
            device: DeviceInfoResponse {
                local_ip: Some("192.168.1.50".to_string()),
                device_info: Some(r#"{"device_info":"Mock Device"}"#.to_string()),
                network_gateway: Some("192.168.1.1".to_string()),
                error: None,
            },
            stored: Vec::new(),
            next_id: 1,
            reflect_writes: true,
            list_status: STATUS_SUCCESS.to_string(),
            queued_lists: VecDeque::new(),
            submit_delay: Duration::ZERO,
            submitted: Vec::new(),
            fail_next_device_info: None,
            fail_next_messages: None,
            fail_next_submit: None,
            device_info_calls: 0,
            message_calls: 0,
            latest_calls: 0,
            submit_calls: 0,
        }
    }
}

impl MockBackend {
    /// Create a new mock backend with an empty message store.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, MockBackendInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the device information returned by `device_info()`.
    pub fn set_device_info(&self, device: DeviceInfoResponse) {
        self.inner().device = device;
    }

    /// Replace the stored messages.
    pub fn set_messages(&self, messages: Vec<Message>) {
        self.inner().stored = messages;
    }

    /// Status reported by `messages()` (default `"success"`).
    pub fn set_list_status(&self, status: &str) {
        self.inner().list_status = status.to_string();
    }

    /// Whether submitted messages show up in later fetches (default true).
    pub fn set_reflect_writes(&self, reflect: bool) {
        self.inner().reflect_writes = reflect;
    }

    /// Answer the next `messages()` call with `messages` after `delay`,
    /// instead of the stored list.
    pub fn queue_messages(&self, delay: Duration, messages: Vec<Message>) {
        self.inner()
            .queued_lists
            .push_back(QueuedList { delay, messages });
    }

    /// Delay every `submit()` by `delay`.
    pub fn set_submit_delay(&self, delay: Duration) {
        self.inner().submit_delay = delay;
    }

    /// Cause the next `device_info()` to fail with the given error.
    pub fn fail_next_device_info(&self, error: &str) {
        self.inner().fail_next_device_info = Some(error.to_string());
    }

    /// Cause the next `messages()` to fail with the given error.
    pub fn fail_next_messages(&self, error: &str) {
        self.inner().fail_next_messages = Some(error.to_string());
    }

    /// Cause the next `submit()` to fail with the given error.
    pub fn fail_next_submit(&self, error: &str) {
        self.inner().fail_next_submit = Some(error.to_string());
    }

    /// Messages currently stored.
    pub fn stored_messages(&self) -> Vec<Message> {
        self.inner().stored.clone()
    }

    /// Every submission received, in order.
    pub fn submitted(&self) -> Vec<SubmitRequest> {
        self.inner().submitted.clone()
    }

    /// Number of `device_info()` calls so far.
    pub fn device_info_calls(&self) -> usize {
        self.inner().device_info_calls
    }

    /// Number of `messages()` calls so far.
    pub fn message_calls(&self) -> usize {
        self.inner().message_calls
    }

    /// Number of `latest_message()` calls so far.
    pub fn latest_calls(&self) -> usize {
        self.inner().latest_calls
    }

    /// Number of `submit()` calls so far.
    pub fn submit_calls(&self) -> usize {
        self.inner().submit_calls
    }

    /// Total number of calls across all endpoints.
    pub fn total_calls(&self) -> usize {
        let inner = self.inner();
        inner.device_info_calls + inner.message_calls + inner.latest_calls + inner.submit_calls
    }

    /// Clear all state (messages, queues, failures, counters).
    pub fn reset(&self) {
        *self.inner() = MockBackendInner::default();
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn device_info(&self) -> Result<DeviceInfoResponse, BackendError> {
        let mut inner = self.inner();
        inner.device_info_calls += 1;

        // Check for forced failure
        if let Some(error) = inner.fail_next_device_info.take() {
            return Err(BackendError::ConnectionFailed(error));
        }

        Ok(inner.device.clone())
    }

    async fn messages(&self) -> Result<MessageListResponse, BackendError> {
        let (delay, response) = {
            let mut inner = self.inner();
            inner.message_calls += 1;

            // Check for forced failure
            if let Some(error) = inner.fail_next_messages.take() {
                return Err(BackendError::ConnectionFailed(error));
            }

            let (delay, messages) = match inner.queued_lists.pop_front() {
                Some(queued) => (queued.delay, queued.messages),
                None => (Duration::ZERO, inner.stored.clone()),
            };
            let mut response = MessageListResponse::success(messages);
            response.status = inner.list_status.clone();
            (delay, response)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(response)
    }

    async fn latest_message(&self) -> Result<LatestMessageResponse, BackendError> {
        let mut inner = self.inner();
        inner.latest_calls += 1;

        Ok(match inner.stored.last() {
            Some(message) => LatestMessageResponse {
                status: STATUS_SUCCESS.to_string(),
                latest_message: Some(message.clone()),
                message: None,
            },
            None => LatestMessageResponse {
                status: STATUS_NO_MESSAGES.to_string(),
                latest_message: None,
                message: Some("No messages available".to_string()),
            },
        })
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, BackendError> {
        let delay = {
            let mut inner = self.inner();
            inner.submit_calls += 1;
            inner.submit_delay
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner();

        // Check for forced failure
        if let Some(error) = inner.fail_next_submit.take() {
            return Err(BackendError::ConnectionFailed(error));
        }

        inner.submitted.push(request.clone());

        let id = MessageId::new(inner.next_id);
        inner.next_id += 1;
        if inner.reflect_writes {
            let sent_at = format!("2024-05-01T10:00:{:02}", id.value() % 60);
            inner.stored.push(Message {
                id,
                author_name: request.device_name.clone(),
                author_address: request.local_ip.clone(),
                text: request.message_text.clone(),
                sent_at,
            });
        }

        Ok(SubmitResponse {
            status: Some(STATUS_SUCCESS.to_string()),
            message: Some("Message sent successfully".to_string()),
            message_id: Some(id),
        })
    }
}
