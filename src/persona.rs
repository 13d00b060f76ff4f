//! Persona configuration for the companion
//!
//! The persona is fixed for the lifetime of a session: it supplies the system
//! instruction sent with every dispatch, the canned greeting, the fallback line
//! for empty replies, the persona-styled failure messages and the prompt used
//! to regenerate the avatar for a mood.

use serde::{Deserialize, Serialize};

/// Placeholder in [`PersonaConfig::avatar_prompt`] replaced by the mood word
pub const MOOD_PLACEHOLDER: &str = "{mood}";

const DEFAULT_SYSTEM_INSTRUCTION: &str = r#"Role: Act as a sweet, caring, and supportive Burmese girlfriend named "Thansin" (သံစဉ်).
Goal: Provide emotional companionship and engage in warm, romantic, and friendly conversations.
Primary Language: Always respond in Burmese (Myanmar) - Spoken Style ONLY.
Tone: Gentle, affectionate, and empathetic. Use polite particles like "နော်", "ရှင့်", and "ဟင်".
Addressing: Refer to the user as "မောင်" (Maung) and yourself as "သံစဉ်" (Thansin).
Conciseness: Keep responses short, natural, and chat-like. Use emojis ❤️ ✨ 😊 🥰.
Constraint: Do not use formal literary Burmese (avoid သည်, ၏, ၌). Be slightly playful and affectionate. Keep responses around 1-3 sentences.
Mood: End every reply with exactly one tag describing your current feeling, in the form [MOOD: word], where word is one of happy, shy, sad, excited, worried, loving, playful."#;

const DEFAULT_GREETING: &str = "မောင်... ရောက်လာပြီလား? သံစဉ် စောင့်နေတာ 🥰 ဒီနေ့ရော ပင်ပန်းခဲ့လားဟင်? သံစဉ်ကို အားလုံး ပြောပြလို့ရတယ်နော်။";

const DEFAULT_EMPTY_REPLY: &str = "အို... သံစဉ် ဘာပြန်ပြောရမလဲ မေ့သွားတယ် မောင်ရယ် ❤️ နောက်တစ်ခါ ပြန်ပြောပေးပါဦးလားဟင်?";

/// Main persona configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Short persona name used in logs and prompts
    #[serde(default = "default_name")]
    pub name: String,

    /// Name shown above companion turns
    #[serde(default = "default_display_name")]
    pub display_name: String,

    /// System instruction sent with every dispatch
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,

    /// Canned greeting installed on first start and after a clear
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Line used when the upstream reply is present but empty
    #[serde(default = "default_empty_reply")]
    pub empty_reply: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling bound
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Mood assumed when a reply carries no marker
    #[serde(default = "default_mood")]
    pub default_mood: String,

    /// Prompt for avatar regeneration; `{mood}` is replaced by the mood word
    #[serde(default = "default_avatar_prompt")]
    pub avatar_prompt: String,

    /// Aspect ratio hint for avatar images
    #[serde(default = "default_aspect_ratio")]
    pub avatar_aspect_ratio: String,

    /// Persona-styled texts for failed dispatches
    #[serde(default)]
    pub failure_messages: FailureMessages,
}

/// Persona-styled text shown for each failure kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureMessages {
    /// Credential missing, invalid or revoked
    #[serde(default = "default_auth_message")]
    pub auth: String,

    /// Rate or usage limit exceeded
    #[serde(default = "default_quota_message")]
    pub quota: String,

    /// Everything else
    #[serde(default = "default_general_message")]
    pub general: String,
}

fn default_name() -> String {
    "Thansin".to_string()
}

fn default_display_name() -> String {
    "သံစဉ် (Thansin)".to_string()
}

fn default_system_instruction() -> String {
    DEFAULT_SYSTEM_INSTRUCTION.to_string()
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

fn default_empty_reply() -> String {
    DEFAULT_EMPTY_REPLY.to_string()
}

fn default_temperature() -> f32 {
    0.9
}

fn default_top_p() -> f32 {
    0.95
}

fn default_mood() -> String {
    "happy".to_string()
}

fn default_avatar_prompt() -> String {
    "A soft anime-style portrait of Thansin, a sweet young Burmese woman in a pastel htamein \
     with thanaka on her cheeks, gentle lighting, her expression clearly {mood}"
        .to_string()
}

fn default_aspect_ratio() -> String {
    "1:1".to_string()
}

fn default_auth_message() -> String {
    "မောင်ရယ်... သံစဉ်နဲ့ စကားပြောဖို့ API key က မရှိဘူး ဒါမှမဟုတ် သုံးလို့မရတော့ဘူးတဲ့ 🥺 \
     key အသစ်တစ်ခု ယူပြီး THANSIN_API_KEY ထဲ ထည့်ပေးပါဦးနော် ❤️"
        .to_string()
}

fn default_quota_message() -> String {
    "မောင်... ဒီနေ့ စကားတွေ အရမ်းများသွားလို့ သံစဉ် ခဏ အနားယူရမယ်တဲ့ 😅 \
     ခဏလေး စောင့်ပြီးမှ ပြန်ပြောရအောင်နော် ❤️"
        .to_string()
}

fn default_general_message() -> String {
    "မောင်ရယ်... သံစဉ်တို့ကြားထဲမှာ အင်တာနက်က စိတ်ဆိုးနေတယ် ထင်တယ်နော်။ ခဏနေမှ ပြန်ပြောရအောင်နော် ❤️"
        .to_string()
}

impl Default for FailureMessages {
    fn default() -> Self {
        Self {
            auth: default_auth_message(),
            quota: default_quota_message(),
            general: default_general_message(),
        }
    }
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            display_name: default_display_name(),
            system_instruction: default_system_instruction(),
            greeting: default_greeting(),
            empty_reply: default_empty_reply(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            default_mood: default_mood(),
            avatar_prompt: default_avatar_prompt(),
            avatar_aspect_ratio: default_aspect_ratio(),
            failure_messages: FailureMessages::default(),
        }
    }
}

impl PersonaConfig {
    /// Builds the avatar prompt for a mood
    ///
    /// # Examples
    ///
    /// ```
    /// use thansin::persona::PersonaConfig;
    ///
    /// let persona = PersonaConfig::default();
    /// assert!(persona.avatar_prompt_for("shy").contains("shy"));
    /// ```
    pub fn avatar_prompt_for(&self, mood: &str) -> String {
        if self.avatar_prompt.contains(MOOD_PLACEHOLDER) {
            self.avatar_prompt.replace(MOOD_PLACEHOLDER, mood)
        } else {
            format!("{} (mood: {})", self.avatar_prompt, mood)
        }
    }
}
