use super::*;
use crate::deployment::{DeployCommand, DeployStatus, DeploymentRecord, EnvironmentState};
use crate::testing::{FakeProvisioner, MemoryStore, ScriptedConsole, test_env};
use std::fs;
use tempfile::{TempDir, tempdir};

struct Harness {
    ws: Workspace,
    store: Arc<MemoryStore>,
    console: Arc<ScriptedConsole>,
    provisioner: Arc<FakeProvisioner>,
    env: Environment,
    _root: TempDir,
}

impl Harness {
    fn new(env: Environment) -> Self {
        Self::with(env, MemoryStore::new(), ScriptedConsole::new(), FakeProvisioner::new())
    }

    fn with(
        env: Environment,
        store: MemoryStore,
        console: ScriptedConsole,
        provisioner: FakeProvisioner,
    ) -> Self {
        let root = tempdir().unwrap();
        let store = Arc::new(store);
        let console = Arc::new(console);
        let provisioner = Arc::new(provisioner);
        let ws = Workspace {
            store: store.clone(),
            provisioner: provisioner.clone(),
            console: console.clone(),
            root: root.path().to_path_buf(),
            operator: "alice".to_string(),
        };
        Self {
            ws,
            store,
            console,
            provisioner,
            env,
            _root: root,
        }
    }

    fn write_local(&self, content: &str) {
        let path = self.ws.local_path(&self.env);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn read_local(&self) -> Option<String> {
        fs::read_to_string(self.ws.local_path(&self.env)).ok()
    }

    async fn upload(&self, content: &str) -> Version {
        self.write_local(content);
        let outcome = upload(&self.ws, &self.env, &UploadRequest::default())
            .await
            .unwrap();
        match outcome {
            UploadOutcome::Uploaded(version) => version,
            other => panic!("expected upload, got {:?}", other),
        }
    }

    async fn version_count(&self) -> usize {
        self.ws.versions(&self.env).load().await.unwrap().versions.len()
    }

    fn blob_count(&self) -> usize {
        self.store
            .version_count(&self.env.s3.bucket, &self.env.s3_key())
    }
}

fn approval_env(name: &str) -> Environment {
    let mut env = test_env(name);
    env.deployment.require_approval = true;
    env
}

// Upload

#[tokio::test]
async fn test_upload_twice_records_once() {
    let h = Harness::new(test_env("dev"));
    h.write_local("region = \"ap-northeast-1\"\n");

    let first = upload(&h.ws, &h.env, &UploadRequest::default()).await.unwrap();
    assert!(matches!(first, UploadOutcome::Uploaded(_)));
    let puts = h.store.put_count();

    let second = upload(&h.ws, &h.env, &UploadRequest::default()).await.unwrap();
    assert!(matches!(second, UploadOutcome::Unchanged(_)));
    assert_eq!(second.version().version_id, first.version().version_id);

    assert_eq!(h.version_count().await, 1);
    assert_eq!(h.blob_count(), 1);
    assert_eq!(h.store.put_count(), puts);
}

#[tokio::test]
async fn test_scenario_a_latest_and_noop_reupload() {
    let h = Harness::new(test_env("dev"));
    let v1 = h.upload("instance_type = \"t3.small\"\n").await;
    let v2 = h.upload("instance_type = \"t3.large\"\n").await;
    assert_ne!(v1.hash, v2.hash);

    let latest = h.ws.versions(&h.env).latest_version().await.unwrap();
    assert_eq!(latest.version_id, v2.version_id);

    h.write_local("instance_type = \"t3.large\"\n");
    let again = upload(&h.ws, &h.env, &UploadRequest::default()).await.unwrap();
    assert!(matches!(again, UploadOutcome::Unchanged(v) if v.version_id == v2.version_id));
    assert_eq!(h.version_count().await, 2);
}

#[tokio::test]
async fn test_upload_records_metadata() {
    let h = Harness::new(test_env("dev"));
    h.write_local("a = 1\n");

    let request = UploadRequest {
        description: "first cut".to_string(),
        backup: None,
    };
    let outcome = upload(&h.ws, &h.env, &request).await.unwrap();
    let version = outcome.version();

    assert_eq!(version.uploaded_by, "alice");
    assert_eq!(version.description, "first cut");
    assert_eq!(version.size, 6);
    assert_eq!(version.hash, files::hash_bytes(b"a = 1\n"));

    let object = h
        .store
        .get_object(&h.env.s3.bucket, &h.env.s3_key(), Some(&version.version_id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(object.content, b"a = 1\n");
    assert_eq!(object.metadata["Hash"], version.hash);
    assert_eq!(object.metadata["UploadedBy"], "alice");
}

#[tokio::test]
async fn test_upload_without_local_file() {
    let h = Harness::new(test_env("dev"));

    let result = upload(&h.ws, &h.env, &UploadRequest::default()).await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));
    assert_eq!(h.store.put_count(), 0);
}

#[tokio::test]
async fn test_upload_unrecorded_then_rerun() {
    let h = Harness::new(test_env("dev"));
    h.write_local("a = 1\n");
    h.store.fail_puts_ending_with(".versions.json");

    let outcome = upload(&h.ws, &h.env, &UploadRequest::default()).await.unwrap();
    let UploadOutcome::Unrecorded { version, error } = outcome else {
        panic!("expected partial upload");
    };
    assert!(matches!(error, CoreError::Storage(_)));
    assert_eq!(h.blob_count(), 1);
    assert_eq!(h.version_count().await, 0);

    h.store.clear_failures();
    let rerun = upload(&h.ws, &h.env, &UploadRequest::default()).await.unwrap();
    assert!(matches!(rerun, UploadOutcome::Uploaded(_)));
    assert_ne!(rerun.version().version_id, version.version_id);
    assert_eq!(h.version_count().await, 1);
}

#[tokio::test]
async fn test_upload_backup() {
    let mut env = test_env("dev");
    env.deployment.auto_backup = true;
    let h = Harness::new(env);
    h.upload("a = 1\n").await;

    let backups = files::list_backups(&h.ws.backup_dir(&h.env), "terraform.tfvars")
        .await
        .unwrap();
    assert_eq!(backups.len(), 1);

    h.write_local("a = 2\n");
    let request = UploadRequest {
        backup: Some(false),
        ..Default::default()
    };
    upload(&h.ws, &h.env, &request).await.unwrap();
    let backups = files::list_backups(&h.ws.backup_dir(&h.env), "terraform.tfvars")
        .await
        .unwrap();
    assert_eq!(backups.len(), 1);
}

// Download

#[tokio::test]
async fn test_download_writes_latest() {
    let h = Harness::new(test_env("dev"));
    let version = h.upload("a = 1\n").await;
    fs::remove_file(h.ws.local_path(&h.env)).unwrap();

    let outcome = download(&h.ws, &h.env, &DownloadRequest::default())
        .await
        .unwrap();
    let DownloadOutcome::Written { version: got, backup, .. } = outcome else {
        panic!("expected write");
    };
    assert_eq!(got.version_id, version.version_id);
    assert!(backup.is_none());
    assert_eq!(h.read_local().unwrap(), "a = 1\n");
}

#[tokio::test]
async fn test_download_same_content_is_noop() {
    let h = Harness::new(test_env("dev"));
    h.upload("a = 1\n").await;

    let outcome = download(&h.ws, &h.env, &DownloadRequest::default())
        .await
        .unwrap();
    assert!(matches!(outcome, DownloadOutcome::AlreadyCurrent(_)));
    assert!(h.console.prompts().is_empty());
}

#[tokio::test]
async fn test_download_declined_keeps_local() {
    let h = Harness::with(
        test_env("dev"),
        MemoryStore::new(),
        ScriptedConsole::new().with_confirms(&[false]),
        FakeProvisioner::new(),
    );
    h.upload("a = 1\n").await;
    h.write_local("a = 99\n");

    let result = download(&h.ws, &h.env, &DownloadRequest::default()).await;
    assert!(matches!(result, Err(CoreError::Cancelled(msg)) if msg == "download cancelled by user"));
    assert_eq!(h.read_local().unwrap(), "a = 99\n");
}

#[tokio::test]
async fn test_download_diverged_without_terminal_is_conflict() {
    let h = Harness::with(
        test_env("dev"),
        MemoryStore::new(),
        ScriptedConsole::new().unattended(),
        FakeProvisioner::new(),
    );
    h.upload("a = 1\n").await;
    h.write_local("a = 99\n");

    let result = download(&h.ws, &h.env, &DownloadRequest::default()).await;
    assert!(matches!(result, Err(CoreError::Conflict(msg)) if msg.contains("--force")));
    assert!(h.console.prompts().is_empty());
    assert_eq!(h.read_local().unwrap(), "a = 99\n");

    let forced = DownloadRequest {
        force: true,
        ..Default::default()
    };
    download(&h.ws, &h.env, &forced).await.unwrap();
    assert_eq!(h.read_local().unwrap(), "a = 1\n");
}

#[tokio::test]
async fn test_download_specific_version_with_force() {
    let h = Harness::new(test_env("dev"));
    let v1 = h.upload("a = 1\n").await;
    h.upload("a = 2\n").await;

    let request = DownloadRequest {
        version_id: Some(v1.version_id.clone()),
        force: true,
    };
    let outcome = download(&h.ws, &h.env, &request).await.unwrap();
    let DownloadOutcome::Written { backup, .. } = outcome else {
        panic!("expected write");
    };

    assert_eq!(h.read_local().unwrap(), "a = 1\n");
    let backup = backup.unwrap();
    assert_eq!(fs::read_to_string(backup).unwrap(), "a = 2\n");
    assert!(h.console.prompts().is_empty());
}

#[tokio::test]
async fn test_download_reports_deployed_version() {
    let h = Harness::new(test_env("dev"));
    h.upload("a = 1\n").await;
    apply(&h.ws, &h.env, &ApplyRequest::default()).await.unwrap();
    fs::remove_file(h.ws.local_path(&h.env)).unwrap();

    download(&h.ws, &h.env, &DownloadRequest::default())
        .await
        .unwrap();
    assert!(
        h.console
            .messages()
            .iter()
            .any(|m| m.contains("currently deployed"))
    );
}

#[tokio::test]
async fn test_download_unknown_version() {
    let h = Harness::new(test_env("dev"));
    h.upload("a = 1\n").await;

    let request = DownloadRequest {
        version_id: Some("nope".to_string()),
        force: false,
    };
    let result = download(&h.ws, &h.env, &request).await;
    assert!(result.unwrap_err().is_not_found());
}

// Reconcile

#[tokio::test]
async fn test_reconcile_creates_placeholder() {
    let h = Harness::new(test_env("dev"));

    let report = reconcile(&h.ws, &h.env).await.unwrap();
    assert_eq!(report.state, SyncState::Missing);
    assert!(matches!(report.action, SyncAction::CreatedPlaceholder));
    assert_eq!(h.read_local().unwrap(), "");
    assert_eq!(h.store.put_count(), 0);
}

#[tokio::test]
async fn test_scenario_d_remote_only_declined() {
    let h = Harness::with(
        test_env("dev"),
        MemoryStore::new(),
        ScriptedConsole::new().with_confirms(&[false]),
        FakeProvisioner::new(),
    );
    h.upload("a = 1\n").await;
    fs::remove_file(h.ws.local_path(&h.env)).unwrap();
    let puts = h.store.put_count();

    let report = reconcile(&h.ws, &h.env).await.unwrap();
    assert_eq!(report.state, SyncState::RemoteOnly);
    assert!(matches!(report.action, SyncAction::Declined));
    assert_eq!(h.console.prompts().len(), 1);
    assert!(h.read_local().is_none());
    assert_eq!(h.store.put_count(), puts);
}

#[tokio::test]
async fn test_reconcile_remote_only_accepted() {
    let h = Harness::with(
        test_env("dev"),
        MemoryStore::new(),
        ScriptedConsole::new().with_confirms(&[true]),
        FakeProvisioner::new(),
    );
    h.upload("a = 1\n").await;
    fs::remove_file(h.ws.local_path(&h.env)).unwrap();

    let report = reconcile(&h.ws, &h.env).await.unwrap();
    assert!(matches!(report.action, SyncAction::Downloaded(_)));
    assert_eq!(h.read_local().unwrap(), "a = 1\n");
}

#[tokio::test]
async fn test_reconcile_local_only_uploads() {
    let h = Harness::with(
        test_env("dev"),
        MemoryStore::new(),
        ScriptedConsole::new().with_confirms(&[true]),
        FakeProvisioner::new(),
    );
    h.write_local("a = 1\n");

    let report = reconcile(&h.ws, &h.env).await.unwrap();
    assert_eq!(report.state, SyncState::LocalOnly);
    assert!(matches!(
        report.action,
        SyncAction::Uploaded(UploadOutcome::Uploaded(_))
    ));
    let latest = h.ws.versions(&h.env).latest_version().await.unwrap();
    assert!(latest.description.starts_with("Initial upload"));
}

#[tokio::test]
async fn test_reconcile_in_sync_and_diverged() {
    let h = Harness::new(test_env("dev"));
    h.upload("a = 1\n").await;

    let report = reconcile(&h.ws, &h.env).await.unwrap();
    assert_eq!(report.state, SyncState::InSync);
    assert!(matches!(report.action, SyncAction::None));

    h.write_local("a = 2\n");
    let puts = h.store.put_count();
    let report = reconcile(&h.ws, &h.env).await.unwrap();
    assert_eq!(report.state, SyncState::Diverged);
    assert!(matches!(report.action, SyncAction::None));
    assert_eq!(h.read_local().unwrap(), "a = 2\n");
    assert_eq!(h.store.put_count(), puts);
    let warnings: Vec<String> = h
        .console
        .messages()
        .into_iter()
        .filter(|m| m.starts_with("warning:"))
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("tfvarenv download dev"));
}

// Apply

#[tokio::test]
async fn test_scenario_b_declined_approval() {
    let h = Harness::with(
        approval_env("prod"),
        MemoryStore::new(),
        ScriptedConsole::new().with_confirms(&[false]),
        FakeProvisioner::new(),
    );
    h.upload("a = 1\n").await;

    let result = apply(&h.ws, &h.env, &ApplyRequest::default()).await;
    let err = result.unwrap_err();
    assert!(err.is_cancelled());
    assert!(err.to_string().contains("cancelled by user"));

    assert!(h.ws.deployments(&h.env).history().await.unwrap().is_empty());
    assert!(h.ws.deployments(&h.env).current_state().await.unwrap().is_none());
    assert!(h.provisioner.calls().is_empty());
}

#[tokio::test]
async fn test_declined_approval_does_not_upload() {
    let h = Harness::with(
        approval_env("prod"),
        MemoryStore::new(),
        ScriptedConsole::new().with_confirms(&[false]),
        FakeProvisioner::new(),
    );
    h.upload("a = 1\n").await;
    h.write_local("a = 2\n");

    apply(&h.ws, &h.env, &ApplyRequest::default())
        .await
        .unwrap_err();
    assert_eq!(h.version_count().await, 1);
}

#[tokio::test]
async fn test_auto_approve_skips_prompt() {
    let h = Harness::new(approval_env("prod"));
    h.upload("a = 1\n").await;

    let request = ApplyRequest {
        auto_approve: true,
        ..Default::default()
    };
    let outcome = apply(&h.ws, &h.env, &request).await.unwrap();
    assert_eq!(outcome.record.parameters["auto_approve"], "true");
    assert!(h.console.prompts().is_empty());
    assert!(h.provisioner.calls()[0].auto_approve);
}

#[tokio::test]
async fn test_local_apply_uploads_changes_first() {
    let h = Harness::new(test_env("dev"));
    h.upload("a = 1\n").await;
    h.write_local("a = 2\n");

    let outcome = apply(&h.ws, &h.env, &ApplyRequest::default()).await.unwrap();

    let latest = h.ws.versions(&h.env).latest_version().await.unwrap();
    assert_eq!(outcome.version.version_id, latest.version_id);
    assert!(latest.description.starts_with("Uploaded during local apply"));
    assert_eq!(h.version_count().await, 2);

    let history = h.ws.deployments(&h.env).history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].version_id, latest.version_id);
    assert_eq!(history[0].status, DeployStatus::Success);
    assert_eq!(history[0].deployed_by, "alice");
    assert!(history[0].duration().is_some());

    let calls = h.provisioner.calls();
    assert_eq!(calls[0].command, "apply");
    assert_eq!(calls[0].var_file.as_ref().unwrap(), &h.ws.local_path(&h.env));
}

#[tokio::test]
async fn test_remote_apply_stages_version() {
    let h = Harness::new(test_env("dev"));
    let v1 = h.upload("a = 1\n").await;
    h.upload("a = 2\n").await;
    h.write_local("a = local\n");

    let request = ApplyRequest {
        version_id: Some(v1.version_id.clone()),
        ..Default::default()
    };
    let outcome = apply(&h.ws, &h.env, &request).await.unwrap();
    assert_eq!(outcome.version.version_id, v1.version_id);
    assert_eq!(outcome.record.parameters["remote"], "true");

    let calls = h.provisioner.calls();
    let call = &calls[0];
    assert_eq!(call.var_content.as_deref(), Some("a = 1\n"));
    let staged = call.var_file.clone().unwrap();
    assert!(staged.starts_with(h.ws.root.join(TMP_DIR)));
    assert!(!staged.exists());
}

#[tokio::test]
async fn test_failed_apply_is_recorded() {
    let h = Harness::with(
        test_env("dev"),
        MemoryStore::new(),
        ScriptedConsole::new(),
        FakeProvisioner::failing("Error: quota exceeded"),
    );
    h.upload("a = 1\n").await;

    let result = apply(&h.ws, &h.env, &ApplyRequest::default()).await;
    match result {
        Err(CoreError::ExternalTool { stderr, exit_code, .. }) => {
            assert_eq!(stderr, "Error: quota exceeded");
            assert_eq!(exit_code, 1);
        }
        other => panic!("expected tool error, got {:?}", other),
    }

    let history = h.ws.deployments(&h.env).history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, DeployStatus::Failure);
    assert_eq!(
        history[0].error_message.as_deref(),
        Some("Error: quota exceeded")
    );
    assert!(
        h.ws.deployments(&h.env)
            .last_successful_apply()
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_interrupted_apply_is_recorded() {
    let h = Harness::with(
        test_env("dev"),
        MemoryStore::new(),
        ScriptedConsole::new(),
        FakeProvisioner::interrupted(),
    );
    let v1 = h.upload("a = 1\n").await;

    let result = apply(&h.ws, &h.env, &ApplyRequest::default()).await;
    assert!(
        matches!(result, Err(CoreError::ExternalTool { stderr, .. }) if stderr == "interrupted by user")
    );

    let history = h.ws.deployments(&h.env).history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].version_id, v1.version_id);
    assert_eq!(history[0].status, DeployStatus::Failure);
    assert_eq!(
        history[0].error_message.as_deref(),
        Some("interrupted by user")
    );
    assert!(history[0].duration().is_some());
}

#[tokio::test]
async fn test_account_mismatch_blocks_apply() {
    let h = Harness::with(
        test_env("dev"),
        MemoryStore::new().with_account("999999999999"),
        ScriptedConsole::new(),
        FakeProvisioner::new(),
    );
    h.upload("a = 1\n").await;

    let result = apply(&h.ws, &h.env, &ApplyRequest::default()).await;
    assert!(matches!(result, Err(CoreError::Validation(msg)) if msg.contains("999999999999")));
    assert!(h.provisioner.calls().is_empty());
    assert!(h.ws.deployments(&h.env).history().await.unwrap().is_empty());
}

// Plan

#[tokio::test]
async fn test_plan_records_nothing() {
    let h = Harness::new(test_env("dev"));
    let v1 = h.upload("a = 1\n").await;

    let outcome = plan(&h.ws, &h.env, &PlanRequest::default()).await.unwrap();
    assert_eq!(outcome.version.unwrap().version_id, v1.version_id);
    assert!(h.ws.deployments(&h.env).current_state().await.unwrap().is_none());
    assert_eq!(h.provisioner.calls()[0].command, "plan");
}

#[tokio::test]
async fn test_plan_old_version_warns() {
    let h = Harness::new(test_env("dev"));
    let v1 = h.upload("a = 1\n").await;
    h.upload("a = 2\n").await;

    let request = PlanRequest {
        version_id: Some(v1.version_id.clone()),
        ..Default::default()
    };
    plan(&h.ws, &h.env, &request).await.unwrap();

    assert!(
        h.console
            .messages()
            .iter()
            .any(|m| m.contains("not the latest"))
    );
    assert_eq!(
        h.provisioner.calls()[0].var_content.as_deref(),
        Some("a = 1\n")
    );
}

// Destroy

#[tokio::test]
async fn test_scenario_c_destroy_uses_last_deployed_version() {
    let h = Harness::with(
        test_env("dev"),
        MemoryStore::new(),
        ScriptedConsole::new().with_inputs(&["dev"]),
        FakeProvisioner::new(),
    );
    let deployed = h.upload("a = 1\n").await;
    apply(&h.ws, &h.env, &ApplyRequest::default()).await.unwrap();
    let newer = h.upload("a = 2\n").await;
    assert_ne!(newer.version_id, deployed.version_id);

    let outcome = destroy(&h.ws, &h.env, &DestroyRequest::default())
        .await
        .unwrap();
    assert_eq!(outcome.version.version_id, deployed.version_id);

    let calls = h.provisioner.calls();
    let destroy_call = calls.iter().find(|c| c.command == "destroy").unwrap();
    assert_eq!(destroy_call.var_content.as_deref(), Some("a = 1\n"));

    let deployments = h.ws.deployments(&h.env);
    let state = deployments.current_state().await.unwrap().unwrap();
    assert_eq!(state.status, EnvironmentState::Destroyed);
    assert_eq!(state.deployment.unwrap().version_id, deployed.version_id);
    assert_eq!(deployments.history().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_destroy_requires_exact_name() {
    let h = Harness::with(
        test_env("dev"),
        MemoryStore::new(),
        ScriptedConsole::new().with_inputs(&["yes"]),
        FakeProvisioner::new(),
    );
    h.upload("a = 1\n").await;
    apply(&h.ws, &h.env, &ApplyRequest::default()).await.unwrap();

    let result = destroy(&h.ws, &h.env, &DestroyRequest::default()).await;
    assert!(matches!(result, Err(CoreError::Cancelled(msg)) if msg == "destroy cancelled by user"));
    assert!(h.provisioner.calls().iter().all(|c| c.command != "destroy"));

    let state = h.ws.deployments(&h.env).current_state().await.unwrap().unwrap();
    assert_eq!(state.status, EnvironmentState::Active);
}

#[tokio::test]
async fn test_destroy_without_deployment() {
    let h = Harness::new(test_env("dev"));
    h.upload("a = 1\n").await;

    let result = destroy(&h.ws, &h.env, &DestroyRequest::default()).await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn test_failed_destroy_is_recorded() {
    let h = Harness::with(
        test_env("dev"),
        MemoryStore::new(),
        ScriptedConsole::new(),
        FakeProvisioner::failing("Error: resource in use"),
    );
    let version = h.upload("a = 1\n").await;
    h.ws.deployments(&h.env)
        .add_record(DeploymentRecord::new(
            "dev",
            &version.version_id,
            "bob",
            DeployCommand::Apply,
        ))
        .await
        .unwrap();

    let request = DestroyRequest {
        auto_approve: true,
        ..Default::default()
    };
    let result = destroy(&h.ws, &h.env, &request).await;
    assert!(matches!(result, Err(CoreError::ExternalTool { .. })));

    let deployments = h.ws.deployments(&h.env);
    let history = deployments.history().await.unwrap();
    assert_eq!(history.len(), 2);
    let failed = history
        .iter()
        .find(|r| r.command == DeployCommand::Destroy)
        .unwrap();
    assert_eq!(failed.status, DeployStatus::Failure);
    let state = deployments.current_state().await.unwrap().unwrap();
    assert_eq!(state.status, EnvironmentState::Active);
}

// Status

#[tokio::test]
async fn test_status_overview() {
    let h = Harness::new(test_env("dev"));
    let fresh = status(&h.ws, &h.env).await.unwrap();
    assert_eq!(fresh.local, LocalStatus::Missing);
    assert!(fresh.latest.is_none());

    h.upload("a = 1\n").await;
    apply(&h.ws, &h.env, &ApplyRequest::default()).await.unwrap();
    h.write_local("a = 2\n");

    let current = status(&h.ws, &h.env).await.unwrap();
    assert_eq!(current.local, LocalStatus::Modified);
    assert_eq!(current.total_versions, 1);
    assert!(current.deployment.is_some());
    assert_eq!(current.state.unwrap().status, EnvironmentState::Active);
}
