use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenaiModelList {
    pub object: String,
    pub data: Vec<OpenaiModel>,
}

impl Default for OpenaiModelList {
    fn default() -> Self {
        Self {
            object: "list".to_string(),
            data: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenaiModel {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

impl OpenaiModelList {
    /// Build a list from upstream model ids, inferring the owner from the id.
    pub fn from_model_ids<I, S>(model_ids: I, created: i64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let data = model_ids
            .into_iter()
            .map(|model| {
                let id = model.into();
                OpenaiModel {
                    owned_by: owner_for_model(&id).to_string(),
                    id,
                    object: "model".to_string(),
                    created,
                }
            })
            .collect();

        Self {
            data,
            ..Self::default()
        }
    }
}

fn owner_for_model(id: &str) -> &'static str {
    let id = id.to_ascii_lowercase();
    if id.contains("claude") {
        "anthropic"
    } else if id.contains("gpt") {
        "openai"
    } else {
        "google"
    }
}
