//! In-memory tutorial catalog.
//!
//! Loaded fresh from the store on every request; all queries are plain filters
//! over the loaded list.

use std::collections::BTreeSet;

use crate::errors::AppError;
use crate::loader::TutorialLoader;
use crate::models::Tutorial;

const FEATURED_TAGS: [&str; 2] = ["Featured", "featured"];

/// Every tutorial currently in the store.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tutorials: Vec<Tutorial>,
}

impl Catalog {
    pub fn new(tutorials: Vec<Tutorial>) -> Self {
        Self { tutorials }
    }

    /// Load every tutorial id in turn. Ids that are incomplete or fail to load
    /// are skipped. Only a failure to list the store is an error.
    pub async fn load(loader: &TutorialLoader) -> Result<Self, AppError> {
        let ids = loader.list_tutorial_ids().await?;
        let mut tutorials = Vec::with_capacity(ids.len());

        for id in ids {
            match loader.load(&id).await {
                Ok(Some(tutorial)) => tutorials.push(tutorial),
                Ok(None) => tracing::warn!("Skipping incomplete tutorial: {}", id),
                Err(e) => tracing::warn!("Skipping tutorial {} that failed to load: {}", id, e),
            }
        }

        tracing::debug!("Catalog loaded with {} tutorials", tutorials.len());
        Ok(Self { tutorials })
    }

    pub fn into_vec(self) -> Vec<Tutorial> {
        self.tutorials
    }

    /// Tutorials carrying `tag`, compared case-insensitively.
    pub fn filter_by_tag(&self, tag: &str) -> Vec<Tutorial> {
        let tag = tag.to_lowercase();
        self.tutorials
            .iter()
            .filter(|t| t.metadata.tags.iter().any(|own| own.to_lowercase() == tag))
            .cloned()
            .collect()
    }

    /// Case-insensitive substring search over title, description, tags,
    /// repository language and topics. Any field may match.
    pub fn search(&self, query: &str) -> Vec<Tutorial> {
        let query = query.to_lowercase();
        let hit = |text: &str| text.to_lowercase().contains(&query);

        self.tutorials
            .iter()
            .filter(|t| {
                hit(&t.metadata.title)
                    || hit(&t.metadata.description)
                    || t.metadata.tags.iter().any(|tag| hit(tag))
                    || t.repository.language.as_deref().is_some_and(|lang| hit(lang))
                    || t.repository.topics.iter().any(|topic| hit(topic))
            })
            .cloned()
            .collect()
    }

    /// Distinct tags across the catalog, sorted case-sensitively.
    pub fn all_tags(&self) -> Vec<String> {
        self.tutorials
            .iter()
            .flat_map(|t| t.metadata.tags.iter())
            .filter(|tag| !tag.is_empty())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn featured(&self) -> Vec<Tutorial> {
        self.tutorials
            .iter()
            .filter(|t| {
                t.metadata
                    .tags
                    .iter()
                    .any(|tag| FEATURED_TAGS.contains(&tag.as_str()))
            })
            .cloned()
            .collect()
    }
}
