//! Model selection between `session/new` and the prompt.

use tracing::info;

use crate::acp::schema::SessionModels;
use crate::operator::{OperatorPrompt, Selection};
use crate::Result;

/// What the operator decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelChoice {
    /// Keep the agent's current model; no request is sent.
    Keep,
    /// Switch to this model id before prompting.
    Switch(String),
    /// The operator cancelled the invocation.
    Cancelled,
}

/// Menu offered to the operator: the default entry first, then the
/// alternatives in the agent's order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMenu {
    /// The question.
    pub selection: Selection,
    /// Model id per item after the default one.
    pub alternatives: Vec<String>,
}

/// Build the menu, or `None` when there is nothing to choose.
#[must_use]
pub fn model_menu(models: &SessionModels) -> Option<ModelMenu> {
    if models.available_models.len() <= 1 {
        return None;
    }

    let current_name = models
        .available_models
        .iter()
        .find(|model| model.model_id == models.current_model_id)
        .map_or(models.current_model_id.as_str(), |model| model.name.as_str());

    let mut items = vec![format!("Default ({current_name})")];
    let mut alternatives = Vec::new();
    for model in &models.available_models {
        if model.model_id == models.current_model_id {
            continue;
        }
        items.push(match &model.description {
            Some(description) => format!("{} - {description}", model.name),
            None => model.name.clone(),
        });
        alternatives.push(model.model_id.clone());
    }

    Some(ModelMenu {
        selection: Selection {
            title: "Select a model".to_owned(),
            items,
            default: 0,
        },
        alternatives,
    })
}

/// Ask the operator for a model when the agent offers more than one.
///
/// # Errors
///
/// Propagates the prompt's error.
pub async fn choose_model(
    models: Option<&SessionModels>,
    prompt: &dyn OperatorPrompt,
) -> Result<ModelChoice> {
    let Some(menu) = models.and_then(model_menu) else {
        return Ok(ModelChoice::Keep);
    };

    let choice = match prompt.select(menu.selection).await? {
        None => ModelChoice::Cancelled,
        Some(0) => ModelChoice::Keep,
        Some(index) => menu
            .alternatives
            .get(index - 1)
            .map_or(ModelChoice::Keep, |id| ModelChoice::Switch(id.clone())),
    };
    info!(?choice, "model selection: decided");
    Ok(choice)
}
