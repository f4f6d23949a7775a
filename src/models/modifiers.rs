use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ModifierCategory {
    Setting,
    Character,
    Plot,
    Tone,
    NarrativeStyle,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoryModifier {
    pub id: &'static str,
    pub modifier: &'static str,
    pub description: &'static str,
    pub category: ModifierCategory,
}

const fn modifier(
    id: &'static str,
    modifier: &'static str,
    description: &'static str,
    category: ModifierCategory,
) -> StoryModifier {
    StoryModifier {
        id,
        modifier,
        description,
        category,
    }
}

use ModifierCategory::*;

pub static STORY_MODIFIERS: &[StoryModifier] = &[
    modifier("s1", "Bangkok City", "Set the story in the bustling capital city of Thailand", Setting),
    modifier("s2", "Northern Village", "Set the story in a peaceful village in northern Thailand", Setting),
    modifier("s3", "Island Paradise", "Set the story on one of Thailand's beautiful islands", Setting),
    modifier("s4", "Ancient Temple", "Set the story in or around a historic Thai temple", Setting),
    modifier("c1", "Thai Language Student", "The protagonist is a Thai language student", Character),
    modifier("c2", "Foreign Traveler", "The protagonist is a foreigner traveler", Character),
    modifier("c3", "Wise Elder", "Include a wise elder who offers guidance and wisdom", Character),
    modifier("c4", "Street Vendor", "Include a character who sells Thai street food or goods", Character),
    modifier("c6", "Secret Identity", "Someone is hiding a secret identity that will be revealed.", Character),
    modifier("p1", "Lost Treasure", "The story involves finding a lost Thai artifact or treasure", Plot),
    modifier("p2", "Cultural Festival", "The story takes place during a traditional Thai festival", Plot),
    modifier("p3", "Nature Adventure", "Characters explore Thailand's natural environments", Plot),
    modifier("p4", "Mystery to Solve", "Characters must solve a local mystery using Thai knowledge", Plot),
    modifier("p5", "Difficult Moral Choice", "You must make a difficult moral choice", Plot),
    modifier("p6", "Twist Ending", "The story has a twist ending", Plot),
    modifier("t1", "Humorous", "Include Thai humor and playful situations", Tone),
    modifier("t2", "Friendship", "There is a friendship at the heart of the story", Tone),
    modifier("t3", "Mysterious", "Include elements of mystery", Tone),
    modifier("t4", "Inspirational", "Tell an uplifting story with inspirational values", Tone),
    modifier("t5", "Dark Comedy", "Make the story a dark comedy", Tone),
    modifier("ns1", "Non-linear Timeline", "Events unfold out of chronological order", NarrativeStyle),
    modifier("ns2", "Fable with Talking Animals", "Tell the story as a fable with talking animals", NarrativeStyle),
    modifier("ns3", "Shaggy Dog Story", "A long, winding tale ends in an absurd or anticlimactic way", NarrativeStyle),
    modifier("ns4", "Frame Narrative", "The main story is told within a larger context", NarrativeStyle),
    modifier("ns5", "Unreliable Narrator", "The narrator cannot be fully trusted", NarrativeStyle),
];

pub fn find_modifier(id: &str) -> Option<&'static StoryModifier> {
    STORY_MODIFIERS.iter().find(|m| m.id == id)
}
