use crate::models::TranslationRecord;
use crate::services::tokenizer::{LookupTarget, lookup_target_for};
use crate::services::translation_cache::TranslationCache;
use crate::services::transliteration::Transliterator;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Dictionary backend queried with an already normalized key.
#[async_trait]
pub trait Dictionary: Send + Sync {
    async fn search(&self, word: &str) -> Result<Vec<TranslationRecord>>;
}

#[derive(Deserialize)]
struct SearchResponse {
    processed: Option<Processed>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Processed {
    firestore_word: Option<FirestoreWord>,
}

#[derive(Deserialize)]
struct FirestoreWord {
    #[serde(default)]
    meanings: Vec<Meaning>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Meaning {
    meaning: String,
    part_of_speech: Option<String>,
    #[serde(default)]
    display_order: i64,
}

/// Client for the thai2english search API.
pub struct Thai2EnglishClient {
    client: reqwest::Client,
    base_url: String,
}

impl Thai2EnglishClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building dictionary HTTP client")?;

        Ok(Thai2EnglishClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Dictionary for Thai2EnglishClient {
    async fn search(&self, word: &str) -> Result<Vec<TranslationRecord>> {
        let response: SearchResponse = self
            .client
            .get(format!("{}/api/search", self.base_url))
            .query(&[("q", word)])
            .send()
            .await
            .context("calling dictionary API")?
            .error_for_status()?
            .json()
            .await
            .context("decoding dictionary response")?;

        Ok(records_from_response(response))
    }
}

fn records_from_response(response: SearchResponse) -> Vec<TranslationRecord> {
    let Some(word) = response.processed.and_then(|p| p.firestore_word) else {
        return Vec::new();
    };

    let mut meanings = word.meanings;
    meanings.sort_by_key(|m| m.display_order);
    meanings
        .into_iter()
        .map(|m| TranslationRecord {
            result: m.meaning,
            part_of_speech: m.part_of_speech,
            ..Default::default()
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LookupOutcome {
    /// The clicked token is a character's name, not a dictionary word.
    CharacterName,
    NotAWord,
    Translations {
        word: String,
        records: Vec<TranslationRecord>,
        transliteration: Option<String>,
    },
}

/// Resolves clicked tokens to translations, consulting the cache first.
pub struct WordLookup {
    dictionary: Arc<dyn Dictionary>,
    cache: Arc<TranslationCache>,
    transliterator: Option<Arc<dyn Transliterator>>,
}

impl WordLookup {
    pub fn new(dictionary: Arc<dyn Dictionary>, cache: Arc<TranslationCache>) -> Self {
        WordLookup {
            dictionary,
            cache,
            transliterator: None,
        }
    }

    pub fn with_transliterator(self, transliterator: Arc<dyn Transliterator>) -> Self {
        WordLookup {
            transliterator: Some(transliterator),
            ..self
        }
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub async fn lookup(&self, token: &str) -> LookupOutcome {
        let word = match lookup_target_for(token) {
            LookupTarget::CharacterName => return LookupOutcome::CharacterName,
            LookupTarget::Nothing => return LookupOutcome::NotAWord,
            LookupTarget::Word(word) => word,
        };

        let (records, transliteration) = tokio::join!(self.translate(&word), self.romanize(&word));
        LookupOutcome::Translations {
            word,
            records,
            transliteration,
        }
    }

    async fn translate(&self, word: &str) -> Vec<TranslationRecord> {
        if let Some(records) = self.cache.get(word) {
            tracing::debug!("Dictionary cache hit for '{}'", word);
            return records;
        }

        match self.dictionary.search(word).await {
            Ok(records) => {
                self.cache.insert(word, records.clone());
                records
            }
            Err(e) => {
                tracing::error!("Error searching dictionary for '{}': {:#}", word, e);
                Vec::new()
            }
        }
    }

    async fn romanize(&self, word: &str) -> Option<String> {
        let transliterator = self.transliterator.as_ref()?;
        match transliterator.romanize(word).await {
            Ok(romanized) => romanized,
            Err(e) => {
                tracing::error!("Error in transliteration for '{}': {:#}", word, e);
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupTicket(u64);

/// Tracks the latest lookup so responses for superseded clicks can be dropped.
#[derive(Debug, Default)]
pub struct LookupGuard {
    latest: AtomicU64,
}

impl LookupGuard {
    pub fn begin(&self) -> LookupTicket {
        LookupTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: LookupTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}
