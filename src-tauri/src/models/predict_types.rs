use serde::Serialize;

/// Classification result for one submitted leaf image.
/// `confidence` is on a 0-100 scale as delivered by the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionOutcome {
    pub label: String,
    pub confidence: f64,
}

impl PredictionOutcome {
    /// Two-decimal percentage string for display, e.g. "87.50%".
    pub fn confidence_display(&self) -> String {
        format!("{:.2}%", self.confidence)
    }
}

/// The single authoritative representation of what the screen shows.
/// Owned by the session controller; every mutation goes through its
/// transition methods.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ViewState {
    Idle,
    Predicting {
        image: String,
    },
    Succeeded {
        image: String,
        prediction: PredictionOutcome,
    },
    Failed {
        image: Option<String>,
        reason: String,
    },
}

impl ViewState {
    pub fn is_predicting(&self) -> bool {
        matches!(self, ViewState::Predicting { .. })
    }
}
