use crate::models::StoryParams;
use crate::models::modifiers::{StoryModifier, find_modifier};

const FORMAT_RULES: &str = r#"Formatting rules:
1. Write the story in Thai and place a single space between EVERY Thai word.
2. End every sentence with a period, separated from the last word by a space.
3. Prefix every character name with [name], for example: [name]สมชาย
4. Structure the response exactly like this:

[GOAL]
<one sentence in English describing the protagonist's goal>

[STORY]
<the story in Thai>

[SUMMARY]
<a short English summary of this part of the story>

[CHOICES]
1. <choice in Thai>
2. <choice in Thai>
3. <choice in Thai>"#;

/// Context needed to continue an existing story.
pub struct ContinuePrompt<'a> {
    pub goal: &'a str,
    pub summary: &'a str,
    pub story_context: &'a str,
    pub user_choice: &'a str,
}

pub fn resolve_modifiers(ids: &[String]) -> Vec<&'static StoryModifier> {
    ids.iter()
        .filter_map(|id| {
            let found = find_modifier(id);
            if found.is_none() {
                tracing::debug!("Ignoring unknown story modifier '{}'", id);
            }
            found
        })
        .collect()
}

fn modifier_lines(ids: &[String]) -> String {
    let modifiers = resolve_modifiers(ids);
    if modifiers.is_empty() {
        return String::new();
    }
    let mut lines = String::from("\nStory modifiers:\n");
    for modifier in modifiers {
        lines.push_str(&format!("- {}: {}\n", modifier.modifier, modifier.description));
    }
    lines
}

pub fn format_initial_prompt(params: &StoryParams, modifier_ids: &[String]) -> String {
    format!(
        "Generate the opening of a \"choose your own adventure\" story in Thai for language learners.\n\n\
         - Genre/Theme: {genre}\n\
         - Parental Rating: {rating}\n\
         - Reading Level: {level}\n\
         - Number of paragraphs: {paragraphs}\n\
         {modifiers}\n\
         {rules}\n\n\
         Provide exactly 3 meaningful choices that lead the story in different directions.",
        genre = params.genre,
        rating = params.parental_rating,
        level = params.reading_level,
        paragraphs = params.paragraphs,
        modifiers = modifier_lines(modifier_ids),
        rules = FORMAT_RULES,
    )
}

pub fn format_continue_prompt(
    context: &ContinuePrompt<'_>,
    params: &StoryParams,
    modifier_ids: &[String],
) -> String {
    format!(
        "Continue the following \"choose your own adventure\" story in Thai.\n\n\
         Story goal:\n{goal}\n\n\
         Summary so far:\n{summary}\n\n\
         Previous story context:\n{story}\n\n\
         The reader chose:\n{choice}\n\n\
         - Parental Rating: {rating}\n\
         - Reading Level: {level}\n\
         - Number of paragraphs: {paragraphs}\n\
         {modifiers}\n\
         {rules}\n\n\
         If the story reaches a natural conclusion, write \"THE END\" under [CHOICES] instead of numbered choices.",
        goal = context.goal,
        summary = context.summary,
        story = context.story_context,
        choice = context.user_choice,
        rating = params.parental_rating,
        level = params.reading_level,
        paragraphs = params.paragraphs,
        modifiers = modifier_lines(modifier_ids),
        rules = FORMAT_RULES,
    )
}
