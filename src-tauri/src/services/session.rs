use crate::models::capture_types::{
    AcquisitionResult, CaptureConstraints, CaptureSource, PermissionDecision,
};
use crate::models::predict_types::{PredictionOutcome, ViewState};
use crate::services::acquirer::ImageAcquirer;
use crate::services::permission::CameraPermissions;
use crate::services::predictor::{PredictError, PredictionClient};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// User-facing message for a response that carried no classification.
const SEMANTIC_FAILURE_MESSAGE: &str = "Failed to predict";
/// User-facing message for a network or server failure. Kept verbatim
/// from the shipped app; the raw error is logged only.
const TRANSPORT_FAILURE_MESSAGE: &str = "Failed to predicting.";

type TransitionListener = Box<dyn Fn(&ViewState) + Send + Sync>;

/// Orchestrates one capture-to-prediction flow at a time and owns the
/// view state. Every mutation happens inside `capture` or `clear`; the
/// presentation layer only ever reads.
pub struct SessionController {
    permissions: Arc<dyn CameraPermissions>,
    acquirer: Arc<dyn ImageAcquirer>,
    client: PredictionClient,
    constraints: CaptureConstraints,
    state: Mutex<ViewState>,
    // Bumped by clear and by every accepted capture. An in-flight
    // prediction may only fold its outcome into state while the
    // generation it captured is still current, so at most one outcome
    // is ever applied per flow.
    generation: AtomicU64,
    listener: Option<TransitionListener>,
}

impl SessionController {
    pub fn new(
        permissions: Arc<dyn CameraPermissions>,
        acquirer: Arc<dyn ImageAcquirer>,
        client: PredictionClient,
    ) -> Self {
        SessionController {
            permissions,
            acquirer,
            client,
            constraints: CaptureConstraints::default(),
            state: Mutex::new(ViewState::Idle),
            generation: AtomicU64::new(0),
            listener: None,
        }
    }

    /// Register a callback invoked after every state transition.
    pub fn with_listener(mut self, listener: impl Fn(&ViewState) + Send + Sync + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    pub async fn current_state(&self) -> ViewState {
        self.state.lock().await.clone()
    }

    pub async fn ping(&self) -> bool {
        self.client.ping().await
    }

    /// One full capture-to-prediction pass. Returns the state the
    /// screen should show once the pass settles.
    pub async fn capture(&self, source: CaptureSource) -> ViewState {
        // Only one flow may be in flight.
        {
            let state = self.state.lock().await;
            if state.is_predicting() {
                eprintln!("[session] capture ignored while a prediction is in flight");
                return state.clone();
            }
        }

        if self.permissions.check_camera_access().await == PermissionDecision::Denied {
            eprintln!("[session] camera access denied");
            return self.current_state().await;
        }

        let image = match self.acquirer.acquire(source, &self.constraints).await {
            AcquisitionResult::Acquired(image) => image,
            AcquisitionResult::Cancelled => {
                eprintln!("[session] user cancelled the picker");
                return self.current_state().await;
            }
            AcquisitionResult::Failed(message) => {
                eprintln!("[session] picker error: {}", message);
                return self
                    .transition(ViewState::Failed {
                        image: None,
                        reason: message,
                    })
                    .await;
            }
        };

        // Accepting this flow supersedes anything still in flight.
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let preview = image.uri.clone();
        self.transition(ViewState::Predicting {
            image: preview.clone(),
        })
        .await;

        let outcome = self.client.predict(&image).await;
        self.apply_outcome(generation, preview, outcome).await
    }

    /// Discard the preview and outcome from any state.
    pub async fn clear(&self) -> ViewState {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.transition(ViewState::Idle).await
    }

    async fn transition(&self, next: ViewState) -> ViewState {
        let mut state = self.state.lock().await;
        *state = next;
        if let Some(listener) = &self.listener {
            listener(&state);
        }
        state.clone()
    }

    async fn apply_outcome(
        &self,
        generation: u64,
        preview: String,
        outcome: Result<PredictionOutcome, PredictError>,
    ) -> ViewState {
        let mut state = self.state.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            eprintln!("[session] stale prediction outcome dropped");
            return state.clone();
        }

        *state = match outcome {
            Ok(prediction) => ViewState::Succeeded {
                image: preview,
                prediction,
            },
            Err(PredictError::MissingLabel) => ViewState::Failed {
                image: Some(preview),
                reason: SEMANTIC_FAILURE_MESSAGE.to_string(),
            },
            Err(PredictError::Transport(detail)) => {
                eprintln!("[session] prediction failed: {}", detail);
                ViewState::Failed {
                    image: Some(preview),
                    reason: TRANSPORT_FAILURE_MESSAGE.to_string(),
                }
            }
        };
        if let Some(listener) = &self.listener {
            listener(&state);
        }
        state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::capture_types::AcquiredImage;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct Deny;

    #[async_trait]
    impl CameraPermissions for Deny {
        async fn check_camera_access(&self) -> PermissionDecision {
            PermissionDecision::Denied
        }
    }

    struct Allow;

    #[async_trait]
    impl CameraPermissions for Allow {
        async fn check_camera_access(&self) -> PermissionDecision {
            PermissionDecision::Granted
        }
    }

    /// Acquirer that replays a fixed result and counts invocations.
    struct Scripted {
        result: AcquisitionResult,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(result: AcquisitionResult) -> Arc<Self> {
            Arc::new(Scripted {
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ImageAcquirer for Scripted {
        async fn acquire(
            &self,
            _source: CaptureSource,
            _constraints: &CaptureConstraints,
        ) -> AcquisitionResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn image_on_disk(dir: &tempfile::TempDir) -> AcquiredImage {
        let path = dir.path().join("leaf.jpg");
        std::fs::write(&path, b"jpeg-bytes-stand-in").unwrap();
        AcquiredImage {
            uri: path.to_string_lossy().to_string(),
            name: "leaf.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
        }
    }

    fn controller(
        permissions: Arc<dyn CameraPermissions>,
        acquirer: Arc<dyn ImageAcquirer>,
        endpoint: &str,
    ) -> SessionController {
        SessionController::new(
            permissions,
            acquirer,
            PredictionClient::new(Some(endpoint.to_string())),
        )
    }

    #[tokio::test]
    async fn denied_permission_invokes_no_picker_and_keeps_state() {
        let acquirer = Scripted::new(AcquisitionResult::Cancelled);
        let session = controller(Arc::new(Deny), acquirer.clone(), "http://127.0.0.1:9/predict");

        let state = session.capture(CaptureSource::Camera).await;

        assert_eq!(state, ViewState::Idle);
        assert_eq!(acquirer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_picker_leaves_idle_untouched() {
        let acquirer = Scripted::new(AcquisitionResult::Cancelled);
        let session = controller(Arc::new(Allow), acquirer.clone(), "http://127.0.0.1:9/predict");

        let state = session.capture(CaptureSource::Library).await;

        assert_eq!(state, ViewState::Idle);
        assert_eq!(acquirer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn picker_error_folds_into_failed() {
        let acquirer = Scripted::new(AcquisitionResult::Failed("no backend".to_string()));
        let session = controller(Arc::new(Allow), acquirer, "http://127.0.0.1:9/predict");

        let state = session.capture(CaptureSource::Camera).await;

        assert_eq!(
            state,
            ViewState::Failed {
                image: None,
                reason: "no backend".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn successful_prediction_reaches_succeeded() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_header("content-type", "application/json")
            .with_body(r#"{"class": "Late_Blight", "confidence": 87.5}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let image = image_on_disk(&dir);
        let preview = image.uri.clone();
        let acquirer = Scripted::new(AcquisitionResult::Acquired(image));
        let session = controller(
            Arc::new(Allow),
            acquirer,
            &format!("{}/predict", server.url()),
        );

        let state = session.capture(CaptureSource::Library).await;

        match state {
            ViewState::Succeeded {
                image, prediction, ..
            } => {
                assert_eq!(image, preview);
                assert_eq!(prediction.label, "Late_Blight");
                assert_eq!(prediction.confidence_display(), "87.50%");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_classification_shows_the_semantic_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_header("content-type", "application/json")
            .with_body(r#"{"confidence": 10}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let image = image_on_disk(&dir);
        let preview = image.uri.clone();
        let acquirer = Scripted::new(AcquisitionResult::Acquired(image));
        let session = controller(
            Arc::new(Allow),
            acquirer,
            &format!("{}/predict", server.url()),
        );

        let state = session.capture(CaptureSource::Library).await;

        assert_eq!(
            state,
            ViewState::Failed {
                image: Some(preview),
                reason: "Failed to predict".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn transport_failure_shows_the_generic_message() {
        let dir = tempfile::tempdir().unwrap();
        let image = image_on_disk(&dir);
        let preview = image.uri.clone();
        let acquirer = Scripted::new(AcquisitionResult::Acquired(image));
        // Nothing listens on port 9; the request is refused.
        let session = controller(Arc::new(Allow), acquirer, "http://127.0.0.1:9/predict");

        let state = session.capture(CaptureSource::Camera).await;

        assert_eq!(
            state,
            ViewState::Failed {
                image: Some(preview),
                reason: "Failed to predicting.".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn clear_is_idempotent_from_every_state() {
        let acquirer = Scripted::new(AcquisitionResult::Cancelled);
        let session = controller(Arc::new(Allow), acquirer, "http://127.0.0.1:9/predict");

        let occupied = [
            ViewState::Predicting {
                image: "/tmp/a.jpg".to_string(),
            },
            ViewState::Succeeded {
                image: "/tmp/a.jpg".to_string(),
                prediction: PredictionOutcome {
                    label: "Healthy".to_string(),
                    confidence: 99.0,
                },
            },
            ViewState::Failed {
                image: None,
                reason: "boom".to_string(),
            },
            ViewState::Idle,
        ];

        for start in occupied {
            *session.state.lock().await = start;
            assert_eq!(session.clear().await, ViewState::Idle);
            assert_eq!(session.clear().await, ViewState::Idle);
        }
    }

    #[tokio::test]
    async fn capture_is_rejected_while_predicting() {
        let acquirer = Scripted::new(AcquisitionResult::Cancelled);
        let session = controller(Arc::new(Allow), acquirer.clone(), "http://127.0.0.1:9/predict");

        let predicting = ViewState::Predicting {
            image: "/tmp/a.jpg".to_string(),
        };
        *session.state.lock().await = predicting.clone();

        let state = session.capture(CaptureSource::Camera).await;

        assert_eq!(state, predicting);
        assert_eq!(acquirer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stale_outcome_is_dropped_after_clear() {
        let acquirer = Scripted::new(AcquisitionResult::Cancelled);
        let session = controller(Arc::new(Allow), acquirer, "http://127.0.0.1:9/predict");

        // Simulate an accepted flow, then a clear that supersedes it.
        let generation = session.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *session.state.lock().await = ViewState::Predicting {
            image: "/tmp/a.jpg".to_string(),
        };
        session.clear().await;

        let state = session
            .apply_outcome(
                generation,
                "/tmp/a.jpg".to_string(),
                Ok(PredictionOutcome {
                    label: "Late_Blight".to_string(),
                    confidence: 87.5,
                }),
            )
            .await;

        assert_eq!(state, ViewState::Idle);
        assert_eq!(session.current_state().await, ViewState::Idle);
    }

    #[tokio::test]
    async fn listener_sees_every_transition() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let acquirer = Scripted::new(AcquisitionResult::Failed("no backend".to_string()));
        let session = controller(Arc::new(Allow), acquirer, "http://127.0.0.1:9/predict")
            .with_listener(move |state| sink.lock().unwrap().push(state.clone()));

        session.capture(CaptureSource::Camera).await;
        session.clear().await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[0], ViewState::Failed { .. }));
        assert_eq!(seen[1], ViewState::Idle);
    }
}
