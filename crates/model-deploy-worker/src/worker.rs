//! The deployment worker state machine (`§4.1`).

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::capabilities::{
    ClusterControllerRegistry, DeploymentStore, EndpointStore, EventProducer, ImageBuilder,
    WebhookDispatcher, WebhookEventKind,
};
use crate::error::{Cancelled, CapabilityError, Timeout, WorkerError};
use crate::model::{
    Deployment, EndpointJob, EndpointStatus, Model, Project, Service, Version, VersionEndpoint,
};
use crate::naming::{merge_labels, next_revision_id};
use crate::resource::resolve_resource_request;
use crate::settings::WorkerSettings;

/// Orchestrates a single `"deployment"` job end to end.
///
/// Construction wires in every capability from `§6`; `handle` executes
/// phases P1–P7 sequentially with no intra-invocation concurrency (`§5`).
/// The queue guarantees at most one in-flight invocation per endpoint
/// identity — re-entrancy on the same identity is not handled here.
pub struct DeploymentWorker {
    controllers: Arc<dyn ClusterControllerRegistry>,
    image_builder: Arc<dyn ImageBuilder>,
    endpoint_store: Arc<dyn EndpointStore>,
    deployment_store: Arc<dyn DeploymentStore>,
    webhook: Arc<dyn WebhookDispatcher>,
    event_producer: Arc<dyn EventProducer>,
    settings: WorkerSettings,
}

impl DeploymentWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        controllers: Arc<dyn ClusterControllerRegistry>,
        image_builder: Arc<dyn ImageBuilder>,
        endpoint_store: Arc<dyn EndpointStore>,
        deployment_store: Arc<dyn DeploymentStore>,
        webhook: Arc<dyn WebhookDispatcher>,
        event_producer: Arc<dyn EventProducer>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            controllers,
            image_builder,
            endpoint_store,
            deployment_store,
            webhook,
            event_producer,
            settings,
        }
    }

    /// Reconcile one `EndpointJob`. `Ok(())` signals the queue should not
    /// redeliver; `Err` signals a retryable (or, for `Misconfiguration`,
    /// operator-actionable) failure.
    ///
    /// `cancellation` is the job's context (`§5`): every collaborator call
    /// below races against it, and a cancellation mid-flight returns
    /// promptly rather than completing the phase. A cancellation between P2
    /// and P6 leaves the audit row `pending`, which a future retry's P2
    /// resumes rather than double-inserts.
    pub async fn handle(
        &self,
        job: EndpointJob,
        cancellation: CancellationToken,
    ) -> Result<(), WorkerError> {
        let EndpointJob {
            mut endpoint,
            version,
            model,
            project,
            environment,
        } = job;

        info!(
            model = %model.name,
            version_id = version.id,
            environment = %endpoint.environment_name,
            "deployment job received"
        );

        // P1: load current.
        let identity = endpoint.identity();
        let current = self
            .call_guarded(&cancellation, self.endpoint_store.get(&identity))
            .await
            .map_err(WorkerError::PersistenceEndpoint)?
            .unwrap_or_else(|| VersionEndpoint::first_deploy(&endpoint));

        // P2: resolve prior-attempt audit.
        let (audit, resumed_pending) = self
            .resolve_audit(&cancellation, &project, &model, &version, &current)
            .await?;

        // P3: merge resource request; namespace is always the project name.
        endpoint.resource_request = Some(resolve_resource_request(
            endpoint.resource_request.as_ref(),
            &environment.default_resource_request,
        ));
        endpoint.namespace = project.name.clone();
        endpoint.labels = merge_labels(&project.labels, &version.labels);

        // Misconfiguration is checked before P4, per the tie-break note.
        let controller = match self.controllers.controller_for(&endpoint.environment_name) {
            Some(controller) => controller,
            None => {
                let err = WorkerError::Misconfiguration(endpoint.environment_name.clone());
                error!(environment = %endpoint.environment_name, "no cluster controller registered");
                self.commit_failure(
                    &cancellation,
                    &current,
                    endpoint,
                    &model,
                    audit,
                    resumed_pending,
                    err.to_string(),
                )
                .await;
                return Err(err);
            }
        };

        // P4: conditional image build.
        if model.needs_image_build(endpoint.transformer.as_ref()) {
            info!(model = %model.name, "building image before deploy");
            match self
                .call_guarded(
                    &cancellation,
                    self.image_builder.build_image(
                        &project,
                        &model,
                        &version,
                        endpoint
                            .resource_request
                            .as_ref()
                            .expect("resource request resolved in P3"),
                    ),
                )
                .await
            {
                Ok(_image_ref) => {}
                Err(source) => {
                    error!(model = %model.name, error = %source, "image build failed");
                    let message = source.to_string();
                    let err = WorkerError::Build(source);
                    self.commit_failure(
                        &cancellation,
                        &current,
                        endpoint,
                        &model,
                        audit,
                        resumed_pending,
                        message,
                    )
                    .await;
                    return Err(err);
                }
            }
        }

        // P5: cluster deploy.
        let service = match self
            .call_guarded(
                &cancellation,
                controller.deploy(&endpoint, &model, &version, &self.settings.logger_destination_url),
            )
            .await
        {
            Ok(service) => service,
            Err(source) => {
                error!(model = %model.name, error = %source, "cluster deploy failed");
                let message = source.to_string();
                let err = WorkerError::Deploy(source);
                self.commit_failure(
                    &cancellation,
                    &current,
                    endpoint,
                    &model,
                    audit,
                    resumed_pending,
                    message,
                )
                .await;
                return Err(err);
            }
        };

        // P6: success commit.
        self.commit_success(&cancellation, &current, endpoint, &model, audit, service)
            .await
    }

    /// Races a single collaborator call against the job's deadline and its
    /// cancellation context, per `§5`'s "context threaded through every I/O
    /// call". Cancellation takes priority over a simultaneous timeout.
    async fn call_guarded<T>(
        &self,
        cancellation: &CancellationToken,
        fut: impl std::future::Future<Output = Result<T, CapabilityError>>,
    ) -> Result<T, CapabilityError> {
        tokio::select! {
            biased;
            _ = cancellation.cancelled() => Err(Box::new(Cancelled) as CapabilityError),
            result = tokio::time::timeout(self.settings.deploy_timeout, fut) => match result {
                Ok(result) => result,
                Err(_elapsed) => Err(Box::new(Timeout) as CapabilityError),
            },
        }
    }

    /// P2: not found -> first attempt; found pending -> resume (no new row
    /// inserted); found terminal -> new attempt (new pending row inserted).
    async fn resolve_audit(
        &self,
        cancellation: &CancellationToken,
        project: &Project,
        model: &Model,
        version: &Version,
        current: &VersionEndpoint,
    ) -> Result<(Deployment, bool), WorkerError> {
        let latest = self
            .call_guarded(
                cancellation,
                self.deployment_store
                    .get_latest_deployment(model.id, version.id),
            )
            .await
            .map_err(WorkerError::PersistenceAudit)?;

        match latest {
            Some(deployment) if matches!(deployment.status, EndpointStatus::Pending) => {
                Ok((deployment, true))
            }
            _ => {
                let now = Utc::now();
                let pending = Deployment {
                    id: None,
                    project_id: project_id(project, model),
                    version_model_id: model.id,
                    version_id: version.id,
                    revision_id: current.revision_id,
                    status: EndpointStatus::Pending,
                    error: None,
                    created_at: now,
                    updated_at: now,
                };
                let saved = self
                    .call_guarded(cancellation, self.deployment_store.save(&pending))
                    .await
                    .map_err(WorkerError::PersistenceAudit)?;
                Ok((saved, false))
            }
        }
    }

    async fn commit_success(
        &self,
        cancellation: &CancellationToken,
        current: &VersionEndpoint,
        mut endpoint: VersionEndpoint,
        model: &Model,
        audit: Deployment,
        service: Service,
    ) -> Result<(), WorkerError> {
        let revision_id = next_revision_id(service.revision_id, current.revision_id);
        let inference_service_name = if !service.current_isvc_name.is_empty() {
            service.current_isvc_name.clone()
        } else {
            service.name.clone()
        };
        let status = if matches!(current.status, EndpointStatus::Serving) {
            EndpointStatus::Serving
        } else {
            EndpointStatus::Running
        };

        endpoint.revision_id = revision_id;
        endpoint.inference_service_name = inference_service_name;
        endpoint.url = service.url;
        endpoint.service_name = service.service_name;
        endpoint.status = status;

        self.call_guarded(cancellation, self.endpoint_store.save(&endpoint))
            .await
            .map_err(WorkerError::PersistenceEndpoint)?;

        let audit = Deployment {
            revision_id,
            status,
            error: None,
            updated_at: Utc::now(),
            ..audit
        };
        self.call_guarded(
            cancellation,
            self.deployment_store.on_deployment_success(&audit),
        )
        .await
        .map_err(WorkerError::PersistenceAudit)?;

        info!(
            model = %model.name,
            revision_id,
            status = ?status,
            "deployment succeeded"
        );

        if let Err(err) = self
            .call_guarded(
                cancellation,
                self.webhook
                    .trigger_webhooks(WebhookEventKind::OnVersionEndpointDeployed, &endpoint),
            )
            .await
        {
            warn!(error = %err, "webhook dispatch failed, continuing");
        }

        if model.observability_supported {
            if let Err(err) = self
                .call_guarded(
                    cancellation,
                    self.event_producer
                        .version_endpoint_change_event(&endpoint, model),
                )
                .await
            {
                warn!(error = %err, "event producer failed, continuing");
            }
        }

        Ok(())
    }

    /// P7. The caller passes in the already-classified `WorkerError` to
    /// return; this only performs the best-effort failure-path persistence
    /// and advisory event emission, it never overrides the returned error.
    async fn commit_failure(
        &self,
        cancellation: &CancellationToken,
        current: &VersionEndpoint,
        mut endpoint: VersionEndpoint,
        model: &Model,
        audit: Deployment,
        resumed_pending: bool,
        error_message: String,
    ) {
        // Preserve everything that describes the currently-running service.
        endpoint.url = current.url.clone();
        endpoint.service_name = current.service_name.clone();
        endpoint.inference_service_name = current.inference_service_name.clone();
        endpoint.revision_id = current.revision_id;
        endpoint.status = match current.status {
            EndpointStatus::Running => EndpointStatus::Running,
            EndpointStatus::Serving => EndpointStatus::Serving,
            _ => EndpointStatus::Failed,
        };

        if let Err(err) = self
            .call_guarded(cancellation, self.endpoint_store.save(&endpoint))
            .await
        {
            warn!(error = %err, "failed to persist failure-path endpoint state");
        }

        if !resumed_pending {
            let failed = Deployment {
                status: EndpointStatus::Failed,
                error: Some(error_message),
                updated_at: Utc::now(),
                ..audit
            };
            if let Err(err) = self
                .call_guarded(cancellation, self.deployment_store.save(&failed))
                .await
            {
                warn!(error = %err, "failed to persist failure audit row");
            }
        }

        if let Err(err) = self
            .call_guarded(
                cancellation,
                self.event_producer
                    .version_endpoint_change_event(&endpoint, model),
            )
            .await
        {
            warn!(error = %err, "event producer failed, continuing");
        }
    }
}

/// `Deployment.project_id` is derived from the model, which carries its own
/// `project_id`; `project` is accepted for symmetry with the original
/// interface shape and to leave room for a future cross-check, but is not
/// itself authoritative here.
fn project_id(_project: &Project, model: &Model) -> i64 {
    model.project_id
}
