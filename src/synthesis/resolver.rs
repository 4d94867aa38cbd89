//! Request resolution
//!
//! Turns loosely specified client identifiers into exactly one
//! (bundle, speaker id, style) selection against a single generation.
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. `model_id` bounds
//! 2. `model_name` (wins over `model_id`)
//! 3. `speaker_name` (wins over `speaker_id`) or `speaker_id`
//! 4. `style`

use std::sync::Arc;

use crate::core::error::ResolveError;
use crate::model::{Generation, ModelBundle};
use super::params::DEFAULT_STYLE;

/// Client-supplied selection, as read from the query string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelQuery {
    pub model_name: Option<String>,
    pub model_id: i64,
    pub speaker_name: Option<String>,
    pub speaker_id: i64,
    pub style: Option<String>,
}

impl ModelQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model_id(mut self, id: i64) -> Self {
        self.model_id = id;
        self
    }

    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }

    pub fn speaker_id(mut self, id: i64) -> Self {
        self.speaker_id = id;
        self
    }

    pub fn speaker_name(mut self, name: impl Into<String>) -> Self {
        self.speaker_name = Some(name.into());
        self
    }

    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }
}

/// A validated selection. Holds the bundle itself, so it stays usable
/// after the generation it was resolved against has been replaced.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub bundle: Arc<ModelBundle>,
    pub speaker_id: i64,
    pub style: String,
}

impl PartialEq for ResolvedRequest {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.bundle, &other.bundle)
            && self.speaker_id == other.speaker_id
            && self.style == other.style
    }
}

/// Stateless resolver over a generation snapshot
pub struct RequestResolver;

impl RequestResolver {
    pub fn resolve(
        generation: &Generation,
        query: &ModelQuery,
    ) -> Result<ResolvedRequest, ResolveError> {
        // The default id must be in range even when a name is also given,
        // so an empty generation never resolves.
        let in_range = usize::try_from(query.model_id)
            .map(|id| id < generation.len())
            .unwrap_or(false);
        if !in_range {
            return Err(ResolveError::ModelIdNotFound(query.model_id));
        }

        let index = match non_empty(&query.model_name) {
            Some(name) => {
                let matches = generation.indices_named(name);
                match matches.as_slice() {
                    [] => return Err(ResolveError::ModelNameNotFound(name.to_string())),
                    [index] => *index,
                    _ => return Err(ResolveError::ModelNameAmbiguous(name.to_string())),
                }
            }
            None => query.model_id as usize,
        };

        let bundle = generation
            .get(index)
            .cloned()
            .ok_or(ResolveError::ModelIdNotFound(index as i64))?;

        let speaker_id = match query.speaker_name.as_deref() {
            Some(name) => bundle
                .speaker_id(name)
                .ok_or_else(|| ResolveError::SpeakerNameNotFound(name.to_string()))?,
            None => {
                if !bundle.has_speaker_id(query.speaker_id) {
                    return Err(ResolveError::SpeakerIdNotFound(query.speaker_id));
                }
                query.speaker_id
            }
        };

        let style = query.style.as_deref().unwrap_or(DEFAULT_STYLE);
        if !bundle.has_style(style) {
            return Err(ResolveError::StyleNotFound(style.to_string()));
        }

        Ok(ResolvedRequest {
            bundle,
            speaker_id,
            style: style.to_string(),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
