use tracing::debug;
use workflow::{CardEvent, GenerationForm};

use crate::{Studio, StudioError};

impl Studio {
    /// Routes an event emitted by a rendered card to its action.
    pub async fn dispatch(&self, event: CardEvent) -> Result<(), StudioError> {
        debug!(?event, "card event");
        match event {
            CardEvent::ToggleSelect { node_id } => {
                self.toggle_select(&node_id);
            }
            CardEvent::ToggleCollapse { node_id } => {
                self.toggle_collapse(&node_id);
            }
            CardEvent::Delete { node_id } => {
                self.delete(&node_id).await?;
            }
            CardEvent::OpenPreview { url, kind } => self.open_preview(url, kind),
            CardEvent::AddClip { node_id, media } => {
                self.add_clip(&node_id, Some(media)).await?;
            }
            CardEvent::Regenerate(request) => {
                self.regenerate(request).await?;
            }
            CardEvent::OpenGeneration {
                anchor,
                module_id,
                category,
            } => self.open_form(GenerationForm::open(Some(category), Some(&module_id), Some(anchor))),
            CardEvent::Context { anchor, action } => {
                self.create_context_node(&anchor, action).await?;
            }
            CardEvent::InvokeAgent {
                node_id,
                user_input,
                image_path,
            } => {
                self.invoke_agent(&node_id, &user_input, image_path.as_deref()).await?;
            }
            CardEvent::Resized { node_id, height } => {
                self.resize_card(&node_id, height);
            }
        }
        Ok(())
    }
}
