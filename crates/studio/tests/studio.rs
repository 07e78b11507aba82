use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use backend::{
    AgentRequest, AgentResult, AssetUpload, BackendConfig, BackendError, CreateNodeRequest, MediaProbe, ProbeError,
    StitchResponse, WorkflowBackend,
};
use serde_json::{json, Map, Value};
use studio::{Notifier, Studio, StudioError, TreeUpdate};
use timeline::{ClipKind, StitchRequest, TimelineError, Track};
use tokio::sync::oneshot;
use workflow::{PreconditionError, TreeSnapshot};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Fetch,
    Create(CreateNodeRequest),
    Upload { parent: Option<String>, file: String },
    Delete(String),
    Stitch(Value),
    Agent(AgentRequest),
}

#[derive(Default)]
struct FakeBackend {
    tree: Mutex<Value>,
    calls: Mutex<Vec<Call>>,
    fail_with: Mutex<Option<BackendError>>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    agent: Mutex<AgentResult>,
}

impl FakeBackend {
    fn with_tree(tree: Value) -> Arc<Self> {
        let backend = Self::default();
        *backend.tree.lock().unwrap() = tree;
        Arc::new(backend)
    }

    fn set_tree(&self, tree: Value) {
        *self.tree.lock().unwrap() = tree;
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<TreeSnapshot, BackendError> {
        self.calls.lock().unwrap().push(call);
        if let Some(err) = self.fail_with.lock().unwrap().take() {
            return Err(err);
        }
        Ok(serde_json::from_value(self.tree.lock().unwrap().clone()).unwrap())
    }
}

#[async_trait]
impl WorkflowBackend for FakeBackend {
    async fn fetch_tree(&self, _tree_id: i64) -> Result<TreeSnapshot, BackendError> {
        let result = self.record(Call::Fetch);
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        result
    }

    async fn create_node(&self, request: &CreateNodeRequest) -> Result<TreeSnapshot, BackendError> {
        self.record(Call::Create(request.clone()))
    }

    async fn upload_asset(&self, upload: AssetUpload) -> Result<TreeSnapshot, BackendError> {
        self.record(Call::Upload {
            parent: upload.parent_id,
            file: upload.file_name,
        })
    }

    async fn delete_node(&self, node_id: &str) -> Result<(), BackendError> {
        self.record(Call::Delete(node_id.to_string())).map(|_| ())
    }

    async fn stitch(&self, request: &StitchRequest) -> Result<StitchResponse, BackendError> {
        self.record(Call::Stitch(serde_json::to_value(request).unwrap()))?;
        Ok(StitchResponse {
            output_url: "/outputs/stitched.mp4".into(),
        })
    }

    async fn process_agent(&self, request: &AgentRequest) -> Result<AgentResult, BackendError> {
        self.record(Call::Agent(request.clone()))?;
        Ok(self.agent.lock().unwrap().clone())
    }
}

struct FakeProbe {
    duration: Option<f64>,
}

#[async_trait]
impl MediaProbe for FakeProbe {
    async fn duration(&self, url: &str) -> Result<f64, ProbeError> {
        self.duration
            .ok_or_else(|| ProbeError::FfprobeFailed(format!("cannot open {url}")))
    }
}

#[derive(Default)]
struct FakeNotifier {
    alerts: Mutex<Vec<String>>,
    refuse: AtomicBool,
}

impl FakeNotifier {
    fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }
}

impl Notifier for FakeNotifier {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }

    fn confirm(&self, _message: &str) -> bool {
        !self.refuse.load(Ordering::SeqCst)
    }
}

fn tree() -> Value {
    json!({"nodes": [
        {"node_id": "r", "parent_id": null, "module_id": "Init"},
        {"node_id": "img", "parent_id": "r", "module_id": "TextGenerateImage",
         "parameters": "{\"positive_prompt\": \"cat:1.0\"}",
         "assets": "{\"output\": {\"images\": [\"/view?filename=a.png\"]}}"},
        {"node_id": "vid", "parent_id": "img", "module_id": "ImageGenerateVideo",
         "assets": {"output": {"videos": ["/view?filename=v.mp4"]}}},
        {"node_id": "txt", "parent_id": "r", "module_id": "AddText", "parameters": {"text": "a fox"}}
    ]})
}

struct Harness {
    studio: Studio,
    backend: Arc<FakeBackend>,
    notifier: Arc<FakeNotifier>,
}

fn harness_with(tree: Value, probe: Option<f64>) -> Harness {
    let backend = FakeBackend::with_tree(tree);
    let notifier = Arc::new(FakeNotifier::default());
    let config = BackendConfig::new().with_media_base("http://media");
    let studio = Studio::new(
        config,
        backend.clone(),
        Arc::new(FakeProbe { duration: probe }),
        notifier.clone(),
    );
    Harness {
        studio,
        backend,
        notifier,
    }
}

async fn loaded() -> Harness {
    let h = harness_with(tree(), Some(8.0));
    h.studio.load_tree().await.unwrap();
    h
}

fn node_ids(studio: &Studio) -> Vec<String> {
    studio.with_state(|s| s.nodes.iter().map(|n| n.id.clone()).collect())
}

#[tokio::test]
async fn test_empty_tree_is_informational() {
    let h = harness_with(json!({"nodes": []}), None);
    let update = h.studio.load_tree().await.unwrap();
    assert_eq!(update, TreeUpdate::Replaced { nodes: 0 });
    assert!(h.studio.status().contains("empty"));
    assert!(h.notifier.alerts().is_empty());
    assert!(h.studio.view().nodes.is_empty());
    assert!(!h.studio.with_state(|s| s.busy.loading_tree));
}

#[tokio::test]
async fn test_load_derives_root_and_view() {
    let h = loaded().await;
    assert_eq!(h.studio.with_state(|s| s.root_id.clone()), Some("r".to_string()));
    let view = h.studio.view();
    assert_eq!(view.nodes.len(), 4);
    assert_eq!(view.edges.len(), 3);
}

#[tokio::test]
async fn test_generate_without_parent_rejects_before_network() {
    let h = loaded().await;
    let before = node_ids(&h.studio);
    let err = h
        .studio
        .generate("ImageGenerateImage_Basic", Map::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StudioError::Precondition(PreconditionError::MissingParent { .. })
    ));
    assert_eq!(h.backend.calls(), vec![Call::Fetch]);
    assert_eq!(node_ids(&h.studio), before);
    assert_eq!(h.notifier.alerts().len(), 1);
}

#[tokio::test]
async fn test_merge_needs_two_parents() {
    let h = loaded().await;
    h.studio.toggle_select("img");
    let err = h.studio.generate("ImageMerging", Map::new()).await.unwrap_err();
    assert!(matches!(
        err,
        StudioError::Precondition(PreconditionError::TwoParentsRequired { got: 1, .. })
    ));
    assert_eq!(h.backend.calls().len(), 1);
    assert_eq!(h.studio.selection().ids(), ["img"]);
}

#[tokio::test]
async fn test_generate_sends_selection_and_consumes_it() {
    let h = loaded().await;
    h.studio.toggle_select("img");
    h.studio.toggle_select("vid");
    let mut params = Map::new();
    params.insert("seed".into(), json!(5));
    h.studio.generate("ImageMerging", params.clone()).await.unwrap();
    assert_eq!(
        h.backend.calls()[1],
        Call::Create(CreateNodeRequest {
            tree_id: 1,
            parent_ids: vec!["img".into(), "vid".into()],
            module_id: "ImageMerging".into(),
            parameters: params,
        })
    );
    assert!(h.studio.selection().is_empty());
}

#[tokio::test]
async fn test_selection_never_exceeds_two() {
    let h = loaded().await;
    for id in ["r", "img", "vid", "txt", "img", "vid", "txt", "r"] {
        h.studio.toggle_select(id);
        assert!(h.studio.selection().len() <= 2);
    }
    assert!(!h.studio.toggle_select("ghost"));
}

#[tokio::test]
async fn test_failed_generation_keeps_state() {
    let h = loaded().await;
    h.studio.toggle_select("img");
    *h.backend.fail_with.lock().unwrap() = Some(BackendError::Http {
        url: "http://api/api/nodes".into(),
        status: 500,
        body: "comfy queue full".into(),
    });
    let before = node_ids(&h.studio);
    assert!(h.studio.generate("ImageCanny", Map::new()).await.is_err());
    assert_eq!(node_ids(&h.studio), before);
    assert_eq!(h.studio.selection().ids(), ["img"]);
    assert!(h.notifier.alerts()[0].contains("comfy queue full"));
    assert!(h.studio.status().contains("failed"));
    assert!(!h.studio.with_state(|s| s.busy.generating));
}

#[tokio::test]
async fn test_upload_parent_is_last_selected_else_root() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cat.png");
    std::fs::write(&path, b"png").unwrap();

    let h = loaded().await;
    h.studio.upload(&path).await.unwrap();
    h.studio.toggle_select("img");
    h.studio.toggle_select("txt");
    h.studio.upload(&path).await.unwrap();
    let uploads: Vec<Call> = h
        .backend
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Upload { .. }))
        .collect();
    assert_eq!(
        uploads,
        vec![
            Call::Upload {
                parent: Some("r".into()),
                file: "cat.png".into()
            },
            Call::Upload {
                parent: Some("txt".into()),
                file: "cat.png".into()
            },
        ]
    );
}

#[tokio::test]
async fn test_delete_requires_confirmation() {
    let h = loaded().await;
    h.studio.toggle_select("vid");
    h.notifier.refuse.store(true, Ordering::SeqCst);
    assert!(matches!(h.studio.delete("vid").await, Err(StudioError::Cancelled)));
    assert_eq!(h.backend.calls(), vec![Call::Fetch]);

    h.notifier.refuse.store(false, Ordering::SeqCst);
    let mut smaller = tree();
    smaller["nodes"].as_array_mut().unwrap().retain(|n| n["node_id"] != "vid");
    h.backend.set_tree(smaller);
    h.studio.delete("vid").await.unwrap();
    assert_eq!(
        h.backend.calls(),
        vec![Call::Fetch, Call::Delete("vid".into()), Call::Fetch]
    );
    assert!(h.studio.selection().is_empty());
    assert_eq!(node_ids(&h.studio), vec!["r", "img", "txt"]);
}

#[tokio::test]
async fn test_client_flags_survive_reload() {
    let h = loaded().await;
    assert_eq!(h.studio.toggle_collapse("img"), Some(true));
    assert!(h.studio.rename("img", "  Hero  "));
    assert!(h.studio.resize_card("img", 900.0));
    assert_eq!(h.studio.view().nodes.len(), 3);

    h.studio.load_tree().await.unwrap();
    h.studio.with_state(|s| {
        let node = s.node("img").unwrap();
        assert!(node.collapsed);
        assert_eq!(node.display_name.as_deref(), Some("Hero"));
        assert_eq!(node.card_height, Some(480.0));
    });
}

#[tokio::test]
async fn test_stale_response_is_discarded() {
    let h = loaded().await;
    let (release, gate) = oneshot::channel();
    *h.backend.gate.lock().unwrap() = Some(gate);
    h.backend.set_tree(json!({"nodes": [{"node_id": "old", "parent_id": null, "module_id": "Init"}]}));

    let (first, second) = tokio::join!(h.studio.load_tree(), async {
        h.backend.set_tree(json!({"nodes": [{"node_id": "new", "parent_id": null, "module_id": "Init"}]}));
        let second = h.studio.load_tree().await;
        let _ = release.send(());
        second
    });
    assert_eq!(second.unwrap(), TreeUpdate::Replaced { nodes: 1 });
    assert_eq!(first.unwrap(), TreeUpdate::Stale);
    assert_eq!(node_ids(&h.studio), vec!["new"]);
}

#[tokio::test]
async fn test_clip_dedup() {
    let h = loaded().await;
    assert_eq!(h.studio.add_clip("img", None).await.unwrap(), (Track::Video, 0));
    let err = h.studio.add_clip("img", None).await.unwrap_err();
    assert!(matches!(err, StudioError::ClipRejected { .. }));
    assert_eq!(h.studio.with_state(|s| s.timeline.len(Track::Video)), 1);
    assert!(matches!(
        h.studio.add_clip("r", None).await,
        Err(StudioError::ClipRejected { .. })
    ));
}

#[tokio::test]
async fn test_probe_failure_leaves_sequence() {
    let h = harness_with(tree(), None);
    h.studio.load_tree().await.unwrap();
    h.studio.add_clip("img", None).await.unwrap();
    let err = h.studio.add_clip("vid", None).await.unwrap_err();
    assert!(matches!(err, StudioError::Probe(_)));
    assert!(h.notifier.alerts()[0].contains("failed to add clip"));
    assert_eq!(h.studio.with_state(|s| s.timeline.len(Track::Video)), 1);
}

#[tokio::test]
async fn test_successful_stitch() {
    let h = loaded().await;
    h.studio.add_clip("img", None).await.unwrap();
    h.studio.add_clip("vid", None).await.unwrap();
    h.studio.trim_clip(Track::Video, 1, 2.0, 5.0).unwrap();

    let url = h.studio.request_stitch().await.unwrap();
    assert_eq!(url, "http://media/outputs/stitched.mp4");
    assert_eq!(
        h.backend.calls().last().unwrap(),
        &Call::Stitch(json!({"clips": [
            {"path": "/view?filename=a.png", "type": "image", "duration": 3.0},
            {"path": "/view?filename=v.mp4", "type": "video", "startTime": 2.0, "endTime": 5.0}
        ]}))
    );
    h.studio.with_state(|s| {
        assert_eq!(s.preview.as_ref().unwrap().url, url);
        assert!(!s.busy.stitching);
    });
}

#[tokio::test]
async fn test_stitch_without_clips_is_rejected() {
    let h = loaded().await;
    assert!(matches!(h.studio.request_stitch().await, Err(StudioError::NoClips)));
    assert_eq!(h.backend.calls().len(), 1);
}

#[tokio::test]
async fn test_drag_reorder_adopts_new_order() {
    let h = loaded().await;
    h.studio.add_clip("img", None).await.unwrap();
    h.studio.add_clip("vid", None).await.unwrap();
    h.studio.begin_drag(Track::Video, 0);
    h.studio.hover_clip(Track::Video, 1);
    assert!(h.studio.drop_on_clip(Track::Video, 1));
    h.studio.end_drag();
    let order: Vec<String> = h
        .studio
        .with_state(|s| s.timeline.track(Track::Video).iter().map(|c| c.node_id.clone()).collect());
    assert_eq!(order, vec!["vid", "img"]);
    assert!(h.studio.with_state(|s| !s.drag.is_dragging()));

    h.studio.begin_drag(Track::Video, 0);
    assert!(h.studio.drop_on_track(Track::Video));
    assert!(!h.studio.drop_on_clip(Track::Video, 0));
}

fn tree_with_audio() -> Value {
    let mut tree = tree();
    tree["nodes"].as_array_mut().unwrap().push(json!({
        "node_id": "aud", "parent_id": "txt", "module_id": "TextToAudio",
        "assets": {"output": {"audio": ["/view?filename=s.wav"]}}
    }));
    tree
}

#[tokio::test]
async fn test_trim_edits_the_clip_on_its_own_track() {
    let h = harness_with(tree_with_audio(), Some(8.0));
    h.studio.load_tree().await.unwrap();
    assert_eq!(h.studio.clip_track("aud"), Some(Track::Audio));
    assert_eq!(h.studio.clip_track("img"), Some(Track::Video));
    assert_eq!(h.studio.clip_track("r"), None);

    assert_eq!(h.studio.add_clip("vid", None).await.unwrap(), (Track::Video, 0));
    let (track, index) = h.studio.add_clip("aud", None).await.unwrap();
    assert_eq!((track, index), (Track::Audio, 0));

    let err = h.studio.trim_clip(track, index, 1.0, 2.0).unwrap_err();
    assert!(matches!(
        err,
        StudioError::Timeline(TimelineError::WrongKind(ClipKind::Audio))
    ));
    assert!(matches!(
        h.studio.trim_clip(Track::Video, 3, 1.0, 2.0),
        Err(StudioError::Timeline(TimelineError::IndexOutOfRange { len: 1, .. }))
    ));

    h.studio.request_stitch().await.unwrap();
    assert_eq!(
        h.backend.calls().last().unwrap(),
        &Call::Stitch(json!({
            "clips": [{"path": "/view?filename=v.mp4", "type": "video", "startTime": 0.0, "endTime": 8.0}],
            "audio_clips": [{"path": "/view?filename=s.wav", "type": "audio", "duration": 8.0}]
        }))
    );
}

#[tokio::test]
async fn test_buffered_clips_move_onto_tracks() {
    let h = harness_with(tree_with_audio(), Some(8.0));
    h.studio.load_tree().await.unwrap();
    assert_eq!(h.studio.stage_clip("img", None).await.unwrap(), 0);
    assert_eq!(h.studio.stage_clip("aud", None).await.unwrap(), 1);
    assert!(matches!(
        h.studio.stage_clip("img", None).await,
        Err(StudioError::ClipRejected { .. })
    ));
    assert!(matches!(h.studio.request_stitch().await, Err(StudioError::NoClips)));

    h.studio.add_clip("vid", None).await.unwrap();
    h.studio.begin_drag(Track::Buffer, 0);
    h.studio.hover_clip(Track::Video, 0);
    assert!(h.studio.drop_on_clip(Track::Video, 0));
    h.studio.end_drag();

    let alerts = h.notifier.alerts().len();
    h.studio.begin_drag(Track::Buffer, 0);
    assert!(!h.studio.drop_on_track(Track::Video));
    assert_eq!(h.notifier.alerts().len(), alerts + 1);
    assert_eq!(h.studio.with_state(|s| s.timeline.len(Track::Buffer)), 1);
    h.studio.end_drag();

    h.studio.begin_drag(Track::Buffer, 0);
    assert!(h.studio.drop_on_track(Track::Audio));
    h.studio.end_drag();

    h.studio.with_state(|s| {
        let video: Vec<&str> = s.timeline.track(Track::Video).iter().map(|c| c.node_id.as_str()).collect();
        assert_eq!(video, vec!["img", "vid"]);
        assert_eq!(s.timeline.len(Track::Audio), 1);
        assert!(s.timeline.is_empty(Track::Buffer));
    });
    h.studio.request_stitch().await.unwrap();
    match h.backend.calls().last().unwrap() {
        Call::Stitch(body) => {
            assert_eq!(body["clips"].as_array().unwrap().len(), 2);
            assert_eq!(body["audio_clips"][0]["type"], "audio");
        }
        other => panic!("unexpected call {other:?}"),
    }
}

#[tokio::test]
async fn test_unlisted_operation_goes_to_backend() {
    let h = loaded().await;
    h.studio.toggle_select("img");
    h.studio.generate("BackendOnlyWorkflow", Map::new()).await.unwrap();
    match h.backend.calls().last().unwrap() {
        Call::Create(request) => {
            assert_eq!(request.module_id, "BackendOnlyWorkflow");
            assert_eq!(request.parent_ids, vec!["img"]);
        }
        other => panic!("unexpected call {other:?}"),
    }
}

#[tokio::test]
async fn test_agent_context_round_trip() {
    let h = loaded().await;
    {
        let mut result = h.backend.agent.lock().unwrap();
        result.recommendation.workflow_file = "TextGenerateImage.json".into();
        result.prompts.positive = Some("a fox in snow".into());
        result.prompts.negative = Some("blurry".into());
    }
    assert!(matches!(
        h.studio.create_from_agent("txt").await,
        Err(StudioError::NoAgentContext)
    ));

    let context = h
        .studio
        .invoke_agent("txt", "make it wintry", Some("/view?filename=a.png"))
        .await
        .unwrap();
    assert_eq!(context.node_id, "txt");
    match h.backend.calls().last().unwrap() {
        Call::Agent(request) => {
            assert_eq!(request.image_url.as_deref(), Some("http://media/view?filename=a.png"));
            assert_eq!(request.workflow_context.as_deref(), Some("AddText"));
        }
        other => panic!("unexpected call {other:?}"),
    }

    h.studio.create_from_agent("txt").await.unwrap();
    match h.backend.calls().last().unwrap() {
        Call::Create(request) => {
            assert_eq!(request.module_id, "TextGenerateImage");
            assert_eq!(request.parent_ids, vec!["txt"]);
            assert_eq!(request.parameters["positive_prompt"], "a fox in snow");
            assert_eq!(request.parameters["negative_prompt"], "blurry");
        }
        other => panic!("unexpected call {other:?}"),
    }
    assert!(h.studio.agent_context().is_none());
}

#[tokio::test]
async fn test_dispatch_routes_card_events() {
    let h = loaded().await;
    h.studio
        .dispatch(workflow::CardEvent::ToggleSelect { node_id: "img".into() })
        .await
        .unwrap();
    assert_eq!(h.studio.selection().ids(), ["img"]);

    h.studio
        .dispatch(workflow::CardEvent::Context {
            anchor: "img".into(),
            action: workflow::ContextAction::CreateWorkflowPlanning,
        })
        .await
        .unwrap();
    match h.backend.calls().last().unwrap() {
        Call::Create(request) => {
            assert_eq!(request.module_id, "AddWorkflow");
            assert_eq!(request.parent_ids, vec!["img"]);
        }
        other => panic!("unexpected call {other:?}"),
    }
    // context nodes leave the selection alone
    assert_eq!(h.studio.selection().ids(), ["img"]);
}

#[tokio::test]
async fn test_anchored_form_generates_under_anchor() {
    let h = loaded().await;
    h.studio.toggle_select("r");
    let quick_start = h.studio.view().get("img").unwrap().chrome.quick_starts[0].clone();
    h.studio.open_quick_start("img", &quick_start);
    assert_eq!(h.studio.selection().ids(), ["img"]);
    h.studio.submit_form().await.unwrap();
    match h.backend.calls().last().unwrap() {
        Call::Create(request) => {
            assert_eq!(request.module_id, "ImageCanny");
            assert_eq!(request.parent_ids, vec!["img"]);
        }
        other => panic!("unexpected call {other:?}"),
    }
    assert!(h.studio.with_state(|s| s.form.is_none()));
    assert!(matches!(h.studio.submit_form().await, Err(StudioError::NoForm)));
}
