pub mod dictionary;
pub mod jobs;
pub mod llm;
pub mod progress;
pub mod prompt;
pub mod response_time;
pub mod session;
pub mod story;
pub mod story_parser;
pub mod tokenizer;
pub mod translation_cache;
pub mod transliteration;
