use serde::Serialize;
use timeline::{ReorderDrag, StitchTimeline, TimelineZoom};
use tracing::debug;
use workflow::{carry_client_flags, find_root, GenerationForm, MediaKind, Node, Selection, Viewport};

use backend::AgentResult;

/// Action families that show a busy indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Busy {
    LoadingTree,
    Generating,
    Stitching,
    Agent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusyFlags {
    pub loading_tree: bool,
    pub generating: bool,
    pub stitching: bool,
    pub agent: bool,
}

impl BusyFlags {
    pub fn get(&self, busy: Busy) -> bool {
        match busy {
            Busy::LoadingTree => self.loading_tree,
            Busy::Generating => self.generating,
            Busy::Stitching => self.stitching,
            Busy::Agent => self.agent,
        }
    }

    pub fn set(&mut self, busy: Busy, on: bool) {
        let flag = match busy {
            Busy::LoadingTree => &mut self.loading_tree,
            Busy::Generating => &mut self.generating,
            Busy::Stitching => &mut self.stitching,
            Busy::Agent => &mut self.agent,
        };
        *flag = on;
    }

    pub fn any(&self) -> bool {
        self.loading_tree || self.generating || self.stitching || self.agent
    }
}

/// Media open in the full-size preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    pub url: String,
    pub kind: MediaKind,
}

/// Last planning-agent answer, waiting to seed a new node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentContext {
    /// Node the agent was invoked from.
    pub node_id: String,
    pub user_input: String,
    pub result: AgentResult,
}

/// Orders tree-replacing responses. Only a response newer than the last one
/// applied may replace the tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tickets {
    issued: u64,
    applied: u64,
}

impl Tickets {
    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    pub fn accept(&mut self, ticket: u64) -> bool {
        if ticket <= self.applied {
            return false;
        }
        self.applied = ticket;
        true
    }
}

/// Everything the studio owns. Only [`crate::Studio`] mutates it.
#[derive(Debug, Default)]
pub struct StudioState {
    pub nodes: Vec<Node>,
    pub root_id: Option<String>,
    pub selection: Selection,
    pub busy: BusyFlags,
    pub status: String,
    pub timeline: StitchTimeline,
    pub zoom: TimelineZoom,
    pub drag: ReorderDrag,
    pub viewport: Viewport,
    pub preview: Option<Preview>,
    pub form: Option<GenerationForm>,
    pub agent_context: Option<AgentContext>,
    pub last_output_url: Option<String>,
    pub(crate) tickets: Tickets,
}

impl StudioState {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Swaps in a freshly decoded tree, keeping client flags of surviving
    /// nodes and dropping selected ids that vanished.
    pub(crate) fn replace_nodes(&mut self, mut nodes: Vec<Node>) {
        carry_client_flags(&self.nodes, &mut nodes);
        self.root_id = find_root(&nodes).map(|n| n.id.clone());
        self.selection
            .retain_existing(|id| nodes.iter().any(|n| n.id == id));
        debug!(count = nodes.len(), root = ?self.root_id, "tree replaced");
        self.nodes = nodes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tickets_reject_older_responses() {
        let mut tickets = Tickets::default();
        let first = tickets.issue();
        let second = tickets.issue();
        assert!(tickets.accept(second));
        assert!(!tickets.accept(first));
        assert!(!tickets.accept(second));
        let third = tickets.issue();
        assert!(tickets.accept(third));
    }

    #[test]
    fn test_busy_flags() {
        let mut flags = BusyFlags::default();
        assert!(!flags.any());
        flags.set(Busy::Stitching, true);
        assert!(flags.get(Busy::Stitching) && flags.stitching && flags.any());
        flags.set(Busy::Stitching, false);
        assert!(!flags.any());
    }
}
