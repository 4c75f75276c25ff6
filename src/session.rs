use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
}

/// A closed set of values the input panel lets the user step through.
pub trait Choice: Copy + PartialEq + 'static {
    const ALL: &'static [Self];

    fn label(&self) -> &'static str;

    fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Pdf,
    Word,
    Url,
}

impl Choice for OutputFormat {
    const ALL: &'static [Self] = &[Self::Text, Self::Pdf, Self::Word, Self::Url];

    fn label(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Pdf => "PDF",
            Self::Word => "Word",
            Self::Url => "URL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryType {
    #[default]
    Brief,
    Detailed,
    DeepDive,
}

impl Choice for SummaryType {
    const ALL: &'static [Self] = &[Self::Brief, Self::Detailed, Self::DeepDive];

    fn label(&self) -> &'static str {
        match self {
            Self::Brief => "Brief",
            Self::Detailed => "Detailed",
            Self::DeepDive => "Deep Dive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Story,
    Podcast,
    Education,
    Entertainment,
}

impl Choice for Theme {
    const ALL: &'static [Self] = &[Self::Story, Self::Podcast, Self::Education, Self::Entertainment];

    fn label(&self) -> &'static str {
        match self {
            Self::Story => "Story",
            Self::Podcast => "Podcast",
            Self::Education => "Education",
            Self::Entertainment => "Entertainment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioVoice {
    #[default]
    Male,
    Female,
}

impl Choice for AudioVoice {
    const ALL: &'static [Self] = &[Self::Male, Self::Female];

    fn label(&self) -> &'static str {
        match self {
            Self::Male => "Male Voice",
            Self::Female => "Female Voice",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    Hindi,
}

impl Choice for Language {
    const ALL: &'static [Self] = &[Self::English, Self::Hindi];

    fn label(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Hindi => "Hindi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Children,
    Teenager,
    #[default]
    Adult,
    Senior,
}

impl Choice for Audience {
    const ALL: &'static [Self] = &[Self::Children, Self::Teenager, Self::Adult, Self::Senior];

    fn label(&self) -> &'static str {
        match self {
            Self::Children => "Children",
            Self::Teenager => "Teenager",
            Self::Adult => "Adult",
            Self::Senior => "Senior",
        }
    }
}

/// Options captured alongside every submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    pub format: OutputFormat,
    pub summary_type: SummaryType,
    pub theme: Theme,
    pub audio_voice: AudioVoice,
    pub language: Language,
    pub audience: Audience,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionField {
    Format,
    SummaryType,
    Theme,
    AudioVoice,
    Language,
    Audience,
}

impl OptionField {
    pub const ALL: [OptionField; 6] = [
        OptionField::Format,
        OptionField::SummaryType,
        OptionField::Theme,
        OptionField::AudioVoice,
        OptionField::Language,
        OptionField::Audience,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            OptionField::Format => "Input Format",
            OptionField::SummaryType => "Summary Type",
            OptionField::Theme => "Theme",
            OptionField::AudioVoice => "Voice",
            OptionField::Language => "Language",
            OptionField::Audience => "Audience",
        }
    }
}

fn step<C: Choice>(value: C, forward: bool) -> C {
    if forward { value.next() } else { value.prev() }
}

impl GenerationOptions {
    pub fn cycle(&mut self, field: OptionField, forward: bool) {
        match field {
            OptionField::Format => self.format = step(self.format, forward),
            OptionField::SummaryType => self.summary_type = step(self.summary_type, forward),
            OptionField::Theme => self.theme = step(self.theme, forward),
            OptionField::AudioVoice => self.audio_voice = step(self.audio_voice, forward),
            OptionField::Language => self.language = step(self.language, forward),
            OptionField::Audience => self.audience = step(self.audience, forward),
        }
    }

    pub fn label_of(&self, field: OptionField) -> &'static str {
        match field {
            OptionField::Format => self.format.label(),
            OptionField::SummaryType => self.summary_type.label(),
            OptionField::Theme => self.theme.label(),
            OptionField::AudioVoice => self.audio_voice.label(),
            OptionField::Language => self.language.label(),
            OptionField::Audience => self.audience.label(),
        }
    }
}

/// Which synthetic output a submission pretends to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConverterMode {
    Summary,
    Image,
    Video,
    Audio,
    Sign,
}

impl Choice for ConverterMode {
    const ALL: &'static [Self] = &[Self::Summary, Self::Image, Self::Video, Self::Audio, Self::Sign];

    fn label(&self) -> &'static str {
        match self {
            Self::Summary => "text summary",
            Self::Image => "text to image",
            Self::Video => "text to video",
            Self::Audio => "text to audio",
            Self::Sign => "text to sign",
        }
    }
}

impl ConverterMode {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Image => "text-to-image",
            Self::Video => "text-to-video",
            Self::Audio => "text-to-audio",
            Self::Sign => "text-to-sign",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.id() == id)
    }

    pub fn credit_cost(&self) -> u32 {
        match self {
            Self::Summary => 0,
            Self::Image => 10,
            Self::Video => 20,
            Self::Audio => 15,
            Self::Sign => 25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerationOptions>,
    #[serde(default)]
    pub loading: bool,
}

impl Message {
    pub fn user_text(id: String, content: String, options: GenerationOptions) -> Self {
        Message { id, kind: MessageKind::Text, content, options: Some(options), loading: false }
    }

    pub fn generated(id: String, kind: MessageKind, content: String) -> Self {
        Message { id, kind, content, options: None, loading: false }
    }

    /// Submissions carry their options; generated output never does.
    pub fn is_from_user(&self) -> bool {
        self.options.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub date: String,
}

impl ChatSummary {
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query) || self.preview.to_lowercase().contains(&query)
    }
}

pub fn demo_chats() -> Vec<ChatSummary> {
    [
        ("demo-1", "AI Portrait Artist", "Create a stunning portrait in the style of Van Gogh with vibrant colors...", "2:30 PM"),
        ("demo-2", "3D Product Design", "Generate a photorealistic 3D model of a futuristic smartphone...", "3:45 PM"),
        ("demo-3", "Sci-fi Landscape", "Design an immersive cityscape with flying cars and neon lights...", "4:15 PM"),
        ("demo-4", "Character Creation", "Create a fantasy character with detailed armor and magical effects...", "5:00 PM"),
    ]
    .into_iter()
    .map(|(id, title, preview, date)| ChatSummary {
        id: id.to_string(),
        title: title.to_string(),
        preview: preview.to_string(),
        date: date.to_string(),
    })
    .collect()
}

pub fn display_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%-I:%M %p").to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditEntry {
    pub id: String,
    pub mode: ConverterMode,
    pub points: u32,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    pub created_at: DateTime<Utc>,
    pub credits: u32,
    #[serde(default)]
    pub credit_history: Vec<CreditEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl User {
    pub fn new(username: String, email: String, credits: u32) -> Self {
        User {
            id: Uuid::new_v4(),
            username,
            email,
            profile_pic: None,
            created_at: Utc::now(),
            credits,
            credit_history: Vec::new(),
            credential: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionFlags {
    pub dark_mode: bool,
    pub sidebar_open: bool,
    pub auth_modal_open: bool,
    pub profile_open: bool,
    pub input_expanded: bool,
}

impl Default for SessionFlags {
    fn default() -> Self {
        SessionFlags {
            dark_mode: true,
            sidebar_open: false,
            auth_modal_open: false,
            profile_open: false,
            input_expanded: false,
        }
    }
}

/// Hands out millisecond timestamps as ids, bumping past the last one issued
/// or observed. Seeded from stored ids so restarts never reissue one.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    /// Raises the floor to a previously issued id. Non-numeric ids are ignored.
    pub fn observe(&mut self, id: &str) {
        if let Ok(value) = id.parse::<i64>() {
            self.last = self.last.max(value);
        }
    }

    pub fn next_id(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        let id = if now > self.last { now } else { self.last + 1 };
        self.last = id;
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_stay_unique_under_rapid_generation() {
        let mut ids = IdGenerator::default();
        let issued: Vec<i64> = (0..50).map(|_| ids.next_id().parse().unwrap()).collect();
        assert!(issued.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn observed_ids_raise_the_floor() {
        let mut ids = IdGenerator::default();
        let ahead = Utc::now().timestamp_millis() + 60_000;
        ids.observe(&ahead.to_string());
        ids.observe("demo-1");
        ids.observe("5");
        assert_eq!(ids.next_id(), (ahead + 1).to_string());
    }

    #[test]
    fn choices_wrap_in_both_directions() {
        assert_eq!(Audience::Senior.next(), Audience::Children);
        assert_eq!(Audience::Children.prev(), Audience::Senior);
        assert_eq!(SummaryType::Brief.prev(), SummaryType::DeepDive);
    }

    #[test]
    fn cycling_an_option_leaves_the_others_alone() {
        let mut options = GenerationOptions::default();
        options.cycle(OptionField::Theme, true);
        assert_eq!(options.theme, Theme::Podcast);
        assert_eq!(options.audience, Audience::Adult);
        assert_eq!(options.label_of(OptionField::Theme), "Podcast");
    }

    #[test]
    fn converter_mode_ids_round_trip() {
        for mode in ConverterMode::ALL {
            assert_eq!(ConverterMode::from_id(mode.id()), Some(*mode));
        }
        assert_eq!(ConverterMode::from_id("text-to-smell"), None);
    }

    #[test]
    fn message_serializes_kind_as_type() {
        let msg = Message::generated("1".into(), MessageKind::Image, "https://example.com/a.png".into());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "image");
        assert!(json.get("options").is_none());
        assert!(!msg.is_from_user());
    }

    #[test]
    fn search_matches_title_or_preview_case_insensitively() {
        let chats = demo_chats();
        assert!(chats[0].matches("portrait"));
        assert!(chats[1].matches("SMARTPHONE"));
        assert!(!chats[2].matches("armor"));
    }
}
