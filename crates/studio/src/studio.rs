use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};
use workflow::{
    check_parents, normalize, project, ContextAction, GenerationForm, LayeredLayout, LayoutEngine, MediaKind,
    QuickStart, RegenerateRequest, Selection, TreeSnapshot, TreeView,
};

use backend::{AssetUpload, BackendConfig, CreateNodeRequest, MediaProbe, WorkflowBackend};

use crate::{delete_confirmation, short_id, Busy, Notifier, Preview, StudioError, StudioState};

/// Outcome of a tree-replacing action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeUpdate {
    Replaced { nodes: usize },
    /// A newer response had already been applied; this one was dropped.
    Stale,
}

/// Sets a busy flag for the lifetime of an action.
pub(crate) struct BusyGuard {
    state: Arc<Mutex<StudioState>>,
    busy: Busy,
}

impl BusyGuard {
    fn enter(state: &Arc<Mutex<StudioState>>, busy: Busy) -> Self {
        state.lock().busy.set(busy, true);
        Self {
            state: Arc::clone(state),
            busy,
        }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.state.lock().busy.set(self.busy, false);
    }
}

/// The workflow orchestration state and every action on it. Cheap to clone;
/// clones share state.
#[derive(Clone)]
pub struct Studio {
    pub(crate) config: BackendConfig,
    pub(crate) backend: Arc<dyn WorkflowBackend>,
    pub(crate) probe: Arc<dyn MediaProbe>,
    pub(crate) notifier: Arc<dyn Notifier>,
    layout: Arc<dyn LayoutEngine>,
    pub(crate) state: Arc<Mutex<StudioState>>,
}

impl Studio {
    pub fn new(
        config: BackendConfig,
        backend: Arc<dyn WorkflowBackend>,
        probe: Arc<dyn MediaProbe>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            backend,
            probe,
            notifier,
            layout: Arc::new(LayeredLayout::default()),
            state: Arc::new(Mutex::new(StudioState {
                status: "Initializing...".to_string(),
                ..Default::default()
            })),
        }
    }

    pub fn with_layout(mut self, layout: Arc<dyn LayoutEngine>) -> Self {
        self.layout = layout;
        self
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Read access to the whole state.
    pub fn with_state<R>(&self, f: impl FnOnce(&StudioState) -> R) -> R {
        f(&self.state.lock())
    }

    pub fn status(&self) -> String {
        self.state.lock().status.clone()
    }

    pub fn selection(&self) -> Selection {
        self.state.lock().selection.clone()
    }

    pub(crate) fn busy(&self, busy: Busy) -> BusyGuard {
        BusyGuard::enter(&self.state, busy)
    }

    pub(crate) fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        debug!(%status, "status");
        self.state.lock().status = status;
    }

    /// Reports a failed action: status line, alert, log. State is otherwise
    /// left as it was.
    pub(crate) fn fail(&self, action: &str, err: StudioError) -> StudioError {
        if matches!(err, StudioError::Cancelled) {
            info!(action, "cancelled");
            self.set_status(format!("{action} cancelled"));
            return err;
        }
        if err.is_rejection() {
            warn!(action, error = %err, "rejected");
        } else {
            error!(action, error = %err, "action failed");
        }
        let message = format!("{action} failed: {err}");
        self.set_status(message.clone());
        self.notifier.alert(&message);
        err
    }

    /// Decodes and applies a tree snapshot unless a newer one won already.
    fn apply_tree(&self, ticket: u64, snapshot: TreeSnapshot, status: &str) -> Result<TreeUpdate, StudioError> {
        let nodes = normalize(snapshot.nodes)?;
        let mut state = self.state.lock();
        if !state.tickets.accept(ticket) {
            warn!(ticket, "discarding stale tree response");
            return Ok(TreeUpdate::Stale);
        }
        let count = nodes.len();
        state.replace_nodes(nodes);
        state.status = if count == 0 {
            "The tree is empty. Start with a first generation.".to_string()
        } else {
            status.to_string()
        };
        Ok(TreeUpdate::Replaced { nodes: count })
    }

    fn ticket(&self) -> u64 {
        self.state.lock().tickets.issue()
    }

    /// Fetches the whole tree and replaces the node list.
    pub async fn load_tree(&self) -> Result<TreeUpdate, StudioError> {
        debug!(tree_id = self.config.tree_id, "load tree");
        let _busy = self.busy(Busy::LoadingTree);
        self.set_status("Loading tree...");
        let ticket = self.ticket();
        let result: Result<TreeUpdate, StudioError> = async {
            let snapshot = self.backend.fetch_tree(self.config.tree_id).await?;
            self.apply_tree(ticket, snapshot, "Tree loaded.")
        }
        .await;
        result.map_err(|e| self.fail("Load", e))
    }

    /// Uploads a file as a new node under the last selected node, else the
    /// root.
    pub async fn upload(&self, path: &Path) -> Result<TreeUpdate, StudioError> {
        let parent = {
            let state = self.state.lock();
            state
                .selection
                .last()
                .map(str::to_string)
                .or_else(|| state.root_id.clone())
        };
        debug!(path = %path.display(), ?parent, "upload");
        let _busy = self.busy(Busy::Generating);
        self.set_status("Uploading...");
        let ticket = self.ticket();
        let result: Result<TreeUpdate, StudioError> = async {
            let upload = AssetUpload::from_path(self.config.tree_id, parent, path).await?;
            let snapshot = self.backend.upload_asset(upload).await?;
            self.apply_tree(ticket, snapshot, "Upload finished. The new node was added to the tree.")
        }
        .await;
        result.map_err(|e| self.fail("Upload", e))
    }

    /// Creates a node from the current selection. A successful generation
    /// consumes the selection.
    pub async fn generate(&self, module_id: &str, parameters: Map<String, Value>) -> Result<TreeUpdate, StudioError> {
        let parents = self.selection().ids().to_vec();
        let update = self.create_node("Generate", module_id, parameters, parents).await?;
        if let TreeUpdate::Replaced { .. } = update {
            self.state.lock().selection.clear();
        }
        Ok(update)
    }

    /// Re-runs a card's operation with edited parameters on the same parents.
    pub async fn regenerate(&self, request: RegenerateRequest) -> Result<TreeUpdate, StudioError> {
        let parents = self.state.lock().node(&request.node_id).map(|n| n.parents.clone());
        let Some(parents) = parents else {
            return Err(self.fail("Regenerate", StudioError::UnknownNode(request.node_id)));
        };
        self.create_node("Regenerate", &request.module_id, request.parameters, parents)
            .await
    }

    /// Right-click action: a text or planning child of `anchor`.
    pub async fn create_context_node(&self, anchor: &str, action: ContextAction) -> Result<TreeUpdate, StudioError> {
        let known = self.state.lock().node(anchor).is_some();
        if !known {
            return Err(self.fail(action.label(), StudioError::UnknownNode(anchor.to_string())));
        }
        let mut parameters = Map::new();
        parameters.insert("text".to_string(), Value::String(String::new()));
        self.create_node(action.label(), action.module_id(), parameters, vec![anchor.to_string()])
            .await
    }

    pub(crate) async fn create_node(
        &self,
        action: &str,
        module_id: &str,
        parameters: Map<String, Value>,
        parents: Vec<String>,
    ) -> Result<TreeUpdate, StudioError> {
        debug!(module_id, ?parents, "{action}");
        if let Err(err) = check_parents(module_id, parents.len()) {
            return Err(self.fail(action, err.into()));
        }
        let _busy = self.busy(Busy::Generating);
        self.set_status("Generating...");
        let ticket = self.ticket();
        let request = CreateNodeRequest {
            tree_id: self.config.tree_id,
            parent_ids: parents,
            module_id: module_id.to_string(),
            parameters,
        };
        let result: Result<TreeUpdate, StudioError> = async {
            let snapshot = self.backend.create_node(&request).await?;
            self.apply_tree(ticket, snapshot, "Generation finished. The new node was added to the tree.")
        }
        .await;
        result.map_err(|e| self.fail(action, e))
    }

    /// Deletes a node after confirmation; the backend removes its whole
    /// subtree, so the tree is reloaded afterwards.
    pub async fn delete(&self, node_id: &str) -> Result<TreeUpdate, StudioError> {
        if !self.notifier.confirm(&delete_confirmation(node_id)) {
            return Err(self.fail("Delete", StudioError::Cancelled));
        }
        let deleted = {
            let _busy = self.busy(Busy::Generating);
            self.set_status(format!("Deleting node {}...", short_id(node_id)));
            self.backend.delete_node(node_id).await
        };
        if let Err(e) = deleted {
            return Err(self.fail("Delete", e.into()));
        }
        self.state.lock().selection.remove(node_id);
        info!(node_id, "node deleted");
        let update = self.load_tree().await?;
        self.set_status("Node deleted.");
        Ok(update)
    }

    /// Returns whether the selection changed.
    pub fn toggle_select(&self, node_id: &str) -> bool {
        let mut state = self.state.lock();
        if state.node(node_id).is_none() {
            return false;
        }
        state.selection.toggle(node_id)
    }

    pub fn clear_selection(&self) {
        self.state.lock().selection.clear();
    }

    /// Returns the new collapsed flag, or `None` for an unknown node.
    pub fn toggle_collapse(&self, node_id: &str) -> Option<bool> {
        let mut state = self.state.lock();
        let node = state.node_mut(node_id)?;
        node.collapsed = !node.collapsed;
        Some(node.collapsed)
    }

    /// Blank names clear the override.
    pub fn rename(&self, node_id: &str, name: &str) -> bool {
        let mut state = self.state.lock();
        let Some(node) = state.node_mut(node_id) else {
            return false;
        };
        let name = name.trim();
        node.display_name = (!name.is_empty()).then(|| name.to_string());
        true
    }

    pub fn resize_card(&self, node_id: &str, height: f64) -> bool {
        let mut state = self.state.lock();
        let Some(node) = state.node_mut(node_id) else {
            return false;
        };
        node.card_height = Some(workflow::clamp_card_height(height));
        true
    }

    pub fn open_preview(&self, url: impl Into<String>, kind: MediaKind) {
        self.state.lock().preview = Some(Preview { url: url.into(), kind });
    }

    pub fn close_preview(&self) {
        self.state.lock().preview = None;
    }

    /// Opens the generation form. An anchored form makes the anchor the
    /// only selected node, so it becomes the parent of what it generates.
    pub fn open_form(&self, form: GenerationForm) {
        let mut state = self.state.lock();
        if let Some(anchor) = form.anchor() {
            state.selection = Selection::from_ids([anchor]);
        }
        state.form = Some(form);
    }

    pub fn open_quick_start(&self, anchor: &str, quick_start: &QuickStart) {
        self.open_form(GenerationForm::for_quick_start(quick_start, anchor));
    }

    /// Edits the open form in place; `None` when no form is open.
    pub fn edit_form<R>(&self, f: impl FnOnce(&mut GenerationForm) -> R) -> Option<R> {
        self.state.lock().form.as_mut().map(f)
    }

    pub fn close_form(&self) {
        self.state.lock().form = None;
    }

    /// Generates from the open form and closes it on success.
    pub async fn submit_form(&self) -> Result<TreeUpdate, StudioError> {
        let submitted = self.state.lock().form.as_ref().map(GenerationForm::submit);
        let Some((module_id, parameters)) = submitted else {
            return Err(self.fail("Generate", StudioError::NoForm));
        };
        let update = self.generate(&module_id, parameters).await?;
        self.close_form();
        Ok(update)
    }

    /// Tree view for a renderer. The viewport keeps its pan/zoom between calls.
    pub fn view(&self) -> TreeView {
        let mut state = self.state.lock();
        let StudioState {
            nodes,
            selection,
            viewport,
            ..
        } = &mut *state;
        project(nodes, selection, self.layout.as_ref(), viewport, self.config.media_base())
    }

    pub fn zoom_tree(&self, delta_y: f64, anchor: workflow::Point) {
        self.state.lock().viewport.wheel(delta_y, anchor);
    }

    pub fn pan_tree(&self, dx: f64, dy: f64) {
        self.state.lock().viewport.pan(dx, dy);
    }

    pub fn resize_view(&self, width: f64, height: f64) {
        self.state.lock().viewport.resize(width, height);
    }

    /// Forgets the pan/zoom and fits the tree again.
    pub fn reset_view(&self) -> TreeView {
        {
            let mut state = self.state.lock();
            let (width, height) = (state.viewport.width, state.viewport.height);
            state.viewport = workflow::Viewport::new(width, height);
        }
        self.view()
    }
}
