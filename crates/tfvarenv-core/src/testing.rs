//! In-memory collaborators for unit tests

use crate::console::Console;
use crate::error::{CoreError, Result};
use crate::runner::{ExecutionResult, Provisioner, RunOptions};
use crate::store::{ObjectStore, ObjectVersion, PutObject, PutOutput, StoredObject};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tfvarenv_config::{DEFAULT_REGION, Environment};

pub(crate) const TEST_ACCOUNT: &str = "123456789012";

pub(crate) fn test_env(name: &str) -> Environment {
    let mut env = Environment::new(name, "tfvars-bucket", format!("terraform/{}", name));
    env.aws.account_id = TEST_ACCOUNT.to_string();
    env.normalize(DEFAULT_REGION).unwrap();
    env
}

type ObjectKey = (String, String);

/// Versioned bucket kept in memory; versions per key are oldest first.
pub(crate) struct MemoryStore {
    objects: Mutex<HashMap<ObjectKey, Vec<StoredObject>>>,
    next_id: AtomicU64,
    gets: AtomicUsize,
    puts: AtomicUsize,
    failing_suffix: Mutex<Option<String>>,
    account_id: String,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            failing_suffix: Mutex::new(None),
            account_id: TEST_ACCOUNT.to_string(),
        }
    }

    pub(crate) fn with_account(mut self, account_id: &str) -> Self {
        self.account_id = account_id.to_string();
        self
    }

    /// Every put to a key ending with `suffix` fails until cleared.
    pub(crate) fn fail_puts_ending_with(&self, suffix: &str) {
        *self.failing_suffix.lock().unwrap() = Some(suffix.to_string());
    }

    pub(crate) fn clear_failures(&self) {
        *self.failing_suffix.lock().unwrap() = None;
    }

    pub(crate) fn seed(&self, bucket: &str, key: &str, content: &[u8]) -> String {
        let id = self.allocate_id();
        self.objects
            .lock()
            .unwrap()
            .entry((bucket.to_string(), key.to_string()))
            .or_default()
            .push(StoredObject {
                content: content.to_vec(),
                version_id: Some(id.clone()),
                metadata: HashMap::new(),
                last_modified: Some(Utc::now()),
            });
        id
    }

    pub(crate) fn latest_content(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .and_then(|versions| versions.last())
            .map(|o| o.content.clone())
    }

    pub(crate) fn version_count(&self, bucket: &str, key: &str) -> usize {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .map_or(0, Vec::len)
    }

    pub(crate) fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub(crate) fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn allocate_id(&self) -> String {
        format!("ver{:06}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<Option<StoredObject>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects.lock().unwrap();
        let Some(versions) = objects.get(&(bucket.to_string(), key.to_string())) else {
            return Ok(None);
        };
        Ok(match version_id {
            Some(id) => versions
                .iter()
                .find(|o| o.version_id.as_deref() == Some(id))
                .cloned(),
            None => versions.last().cloned(),
        })
    }

    async fn put_object(&self, request: PutObject) -> Result<PutOutput> {
        if let Some(suffix) = self.failing_suffix.lock().unwrap().as_deref()
            && request.key.ends_with(suffix)
        {
            return Err(CoreError::Storage(format!(
                "injected failure writing {}",
                request.key
            )));
        }

        self.puts.fetch_add(1, Ordering::SeqCst);
        let id = self.allocate_id();
        self.objects
            .lock()
            .unwrap()
            .entry((request.bucket, request.key))
            .or_default()
            .push(StoredObject {
                content: request.content,
                version_id: Some(id.clone()),
                metadata: request.metadata,
                last_modified: Some(Utc::now()),
            });
        Ok(PutOutput {
            version_id: Some(id),
            etag: None,
        })
    }

    async fn check_versioning(&self, _bucket: &str) -> Result<()> {
        Ok(())
    }

    async fn list_versions(
        &self,
        bucket: &str,
        key: &str,
        limit: usize,
    ) -> Result<Vec<ObjectVersion>> {
        let objects = self.objects.lock().unwrap();
        let Some(versions) = objects.get(&(bucket.to_string(), key.to_string())) else {
            return Ok(Vec::new());
        };
        let count = versions.len();
        Ok(versions
            .iter()
            .enumerate()
            .rev()
            .take(limit)
            .map(|(i, o)| ObjectVersion {
                version_id: o.version_id.clone().unwrap_or_default(),
                last_modified: o.last_modified,
                size: o.content.len() as u64,
                is_latest: i + 1 == count,
            })
            .collect())
    }

    async fn caller_account_id(&self) -> Result<String> {
        Ok(self.account_id.clone())
    }
}

/// Console answering from pre-loaded queues
#[derive(Default)]
pub(crate) struct ScriptedConsole {
    confirms: Mutex<VecDeque<bool>>,
    inputs: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    messages: Mutex<Vec<String>>,
    unattended: bool,
}

impl ScriptedConsole {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_confirms(self, answers: &[bool]) -> Self {
        self.confirms.lock().unwrap().extend(answers.iter().copied());
        self
    }

    pub(crate) fn with_inputs(self, answers: &[&str]) -> Self {
        self.inputs
            .lock()
            .unwrap()
            .extend(answers.iter().map(|s| s.to_string()));
        self
    }

    /// Nobody at the terminal
    pub(crate) fn unattended(mut self) -> Self {
        self.unattended = true;
        self
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Console for ScriptedConsole {
    fn info(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push(format!("warning: {}", message));
    }

    fn confirm(&self, prompt: &str, _default: bool) -> Result<bool> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.confirms
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CoreError::Validation(format!("unexpected prompt: {}", prompt)))
    }

    fn input(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.inputs
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CoreError::Validation(format!("unexpected prompt: {}", prompt)))
    }

    fn interactive(&self) -> bool {
        !self.unattended
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ProvisionerCall {
    pub command: &'static str,
    pub var_file: Option<PathBuf>,
    /// Content of the var file at the time of the call
    pub var_content: Option<String>,
    pub auto_approve: bool,
}

/// Provisioner that records calls and succeeds unless told otherwise
#[derive(Default)]
pub(crate) struct FakeProvisioner {
    failure: Mutex<Option<String>>,
    interrupted: bool,
    calls: Mutex<Vec<ProvisionerCall>>,
}

impl FakeProvisioner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing(stderr: &str) -> Self {
        let fake = Self::default();
        *fake.failure.lock().unwrap() = Some(stderr.to_string());
        fake
    }

    /// Fails as if the user pressed Ctrl-C mid-run
    pub(crate) fn interrupted() -> Self {
        Self {
            interrupted: true,
            ..Self::failing("")
        }
    }

    pub(crate) fn calls(&self) -> Vec<ProvisionerCall> {
        self.calls.lock().unwrap().clone()
    }

    fn run(&self, command: &'static str, options: &RunOptions) -> Result<ExecutionResult> {
        let var_content = options
            .var_file
            .as_ref()
            .and_then(|p| std::fs::read_to_string(p).ok());
        self.calls.lock().unwrap().push(ProvisionerCall {
            command,
            var_file: options.var_file.clone(),
            var_content,
            auto_approve: options.auto_approve,
        });

        let failure = self.failure.lock().unwrap().clone();
        Ok(ExecutionResult {
            success: failure.is_none(),
            exit_code: if failure.is_some() { 1 } else { 0 },
            stdout: String::new(),
            stderr: failure.unwrap_or_default(),
            duration: Duration::from_millis(250),
            command_line: format!("terraform {}", command),
            interrupted: self.interrupted,
        })
    }
}

#[async_trait]
impl Provisioner for FakeProvisioner {
    async fn init(&self, options: &RunOptions) -> Result<ExecutionResult> {
        self.run("init", options)
    }

    async fn plan(&self, options: &RunOptions) -> Result<ExecutionResult> {
        self.run("plan", options)
    }

    async fn apply(&self, options: &RunOptions) -> Result<ExecutionResult> {
        self.run("apply", options)
    }

    async fn destroy(&self, options: &RunOptions) -> Result<ExecutionResult> {
        self.run("destroy", options)
    }
}
