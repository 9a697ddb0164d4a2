/*!
 * Voice catalogs and voice resolution.
 *
 * Each speech provider ships a fixed set of voices. Users pick one by
 * catalog position, by (approximate) name or by a free-form description
 * such as "calm, lower pitch, male". Resolution never fails: when nothing
 * matches well, the closest entry or the first voice is used and the choice
 * is logged.
 */

use std::fmt;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app_config::SpeechProvider;

/// Minimum similarity for a fuzzy match to be accepted on the first pass
pub const FUZZY_CUTOFF: f32 = 0.6;

/// A voice understood by one speech provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub provider: SpeechProvider,

    /// Human-readable name
    pub name: String,

    /// Identifier sent to the provider (the name for Gemini, an opaque id for ElevenLabs)
    pub id: String,

    pub description: String,
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.description)
    }
}

// Gemini prebuilt voices: name, description
const GEMINI_VOICES: &[(&str, &str)] = &[
    ("Zephyr", "Bright, Higher pitch, Female"),
    ("Puck", "Upbeat, Middle pitch, Male"),
    ("Charon", "Informative, Lower pitch, Male"),
    ("Kore", "Firm, Middle pitch, Female"),
    ("Fenrir", "Excitable, Lower middle pitch, Male"),
    ("Leda", "Youthful, Higher pitch, Female"),
    ("Orus", "Firm, Lower middle pitch, Male"),
    ("Aoede", "Breezy, Middle pitch, Female"),
    ("Callirrhoe", "Easy-going, Middle pitch, Female"),
    ("Autonoe", "Bright, Middle pitch, Female"),
    ("Enceladus", "Breathy, Lower pitch, Male"),
    ("Iapetus", "Clear, Lower middle pitch, Male"),
    ("Umbriel", "Easy-going, Lower middle pitch, Male"),
    ("Algieba", "Smooth, Lower pitch, Male"),
    ("Despina", "Smooth, Middle pitch, Female"),
    ("Erinome", "Clear, Middle pitch, Female"),
    ("Algenib", "Gravelly, Lower pitch, Male"),
    ("Rasalgethi", "Informative, Middle pitch, Male"),
    ("Laomedeia", "Upbeat, Higher pitch, Female"),
    ("Achernar", "Soft, Higher pitch, Female"),
    ("Alnilam", "Firm, Lower middle pitch, Male"),
    ("Schedar", "Even, Lower middle pitch, Male"),
    ("Gacrux", "Mature, Middle pitch, Female"),
    ("Pulcherrima", "Forward, Middle pitch, Female"),
    ("Achird", "Friendly, Lower middle pitch, Male"),
    ("Zubenelgenubi", "Casual, Lower middle pitch, Male"),
    ("Vindemiatrix", "Gentle, Middle pitch, Female"),
    ("Sadachbia", "Lively, Lower pitch, Male"),
    ("Sadaltager", "Knowledgeable, Middle pitch, Male"),
    ("Sulafat", "Warm, Middle pitch, Female"),
];

// ElevenLabs premade voices: name, voice id, description
const ELEVENLABS_VOICES: &[(&str, &str, &str)] = &[
    ("Aria", "9BWtsMINqrJLrRacOk9x", "A middle-aged female with an African-American accent. Calm with a hint of rasp."),
    ("Sarah", "EXAVITQu4vr4xnSDxMaL", "Young adult woman with a confident and warm, mature quality and a reassuring, professional tone."),
    ("Laura", "FGY2WhTYpPnrIDTdsKH5", "This young adult female voice delivers sunny enthusiasm with a quirky attitude."),
    ("Charlie", "IKne3meq5aSn9XLyUdCD", "A young Australian male with a confident and energetic voice."),
    ("George", "JBFqnCBsd6RMkjVDRZzb", "Warm resonance that instantly captivates listeners."),
    ("Callum", "N2lVS1w4EtoT3dr4eOWO", "Deceptively gravelly, yet unsettling edge."),
    ("River", "SAz9YHcvj6GT2YYXdXww", "A relaxed, neutral voice ready for narrations or conversational projects."),
    ("Liam", "TX3LPaxmHKxFdv7VOQHJ", "A young adult with energy and warmth - suitable for reels and shorts."),
    ("Charlotte", "XB0fDUnXU5powFXDhCwa", "Sensual and raspy, she's ready to voice your temptress in video games."),
    ("Alice", "Xb7hH8MSUJpSbSDYk0k2", "Clear and engaging, friendly woman with a British accent suitable for e-learning."),
    ("Matilda", "XrExE9yKIg1WjnnlVkGX", "A professional woman with a pleasing alto pitch. Suitable for many use cases."),
    ("Will", "bIHbv24MWmeRgasZH58o", "Conversational and laid back."),
    ("Jessica", "cgSgspJ2msm6clMCkdW9", "Young and popular, this playful American female voice is perfect for trendy content."),
    ("Eric", "cjVigY5qzO86Huf0OWal", "A smooth tenor pitch from a man in his 40s - perfect for agentic use cases."),
    ("Chris", "iP95p4xoKVk53GoZ742B", "Natural and real, this down-to-earth voice is great across many use-cases."),
    ("Brian", "nPczCjzI2devNBz1zQrb", "Middle-aged man with a resonant and comforting tone. Great for narrations and advertisements."),
    ("Daniel", "onwK4e9ZLuTAKqWW03F9", "A strong voice perfect for delivering a professional broadcast or news story."),
    ("Lily", "pFZP5JQG7iQjIQuC4Bku", "Velvety British female voice delivers news and narrations with warmth and clarity."),
    ("Bill", "pqHfZKP75CvOlQylNhV4", "Friendly and comforting voice ready to narrate your stories."),
];

/// The voices offered by one provider
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    provider: SpeechProvider,
    voices: Vec<Voice>,
}

impl VoiceCatalog {
    /// Built-in catalog for a provider
    pub fn for_provider(provider: SpeechProvider) -> Self {
        let voices = match provider {
            SpeechProvider::Gemini => GEMINI_VOICES
                .iter()
                .map(|(name, description)| Voice {
                    provider,
                    name: name.to_string(),
                    id: name.to_string(),
                    description: description.to_string(),
                })
                .collect(),
            SpeechProvider::ElevenLabs => ELEVENLABS_VOICES
                .iter()
                .map(|(name, id, description)| Voice {
                    provider,
                    name: name.to_string(),
                    id: id.to_string(),
                    description: description.to_string(),
                })
                .collect(),
        };
        VoiceCatalog { provider, voices }
    }

    pub fn provider(&self) -> SpeechProvider {
        self.provider
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    fn first(&self) -> Voice {
        self.voices[0].clone()
    }

    /// Voice at a catalog position; out of range falls back to the first voice
    pub fn by_index(&self, index: usize) -> Voice {
        match self.voices.get(index) {
            Some(voice) => {
                info!("Selected voice by index {}: {}", index, voice);
                voice.clone()
            }
            None => {
                let voice = self.first();
                warn!("Voice index {} is out of range, using {}", index, voice);
                voice
            }
        }
    }

    /// Voice whose name is closest to `name`
    pub fn by_name(&self, name: &str) -> Voice {
        self.fuzzy_pick(name, "name", |v| &v.name)
    }

    /// Voice whose description is closest to `description`
    pub fn by_characteristic(&self, description: &str) -> Voice {
        self.fuzzy_pick(description, "characteristic", |v| &v.description)
    }

    /// Resolve a user query: a catalog position, a name or a description
    pub fn resolve(&self, query: &str) -> Voice {
        let query = query.trim();
        if let Ok(index) = query.parse::<usize>() {
            return self.by_index(index);
        }
        if let Some(voice) = self.best_match(query, |v| &v.name, FUZZY_CUTOFF) {
            info!("Selected voice by name '{}': {}", query, voice);
            return voice.clone();
        }
        if let Some(voice) = self.best_match(query, |v| &v.description, FUZZY_CUTOFF) {
            info!("Selected voice by characteristic '{}': {}", query, voice);
            return voice.clone();
        }
        self.by_name(query)
    }

    fn fuzzy_pick(&self, query: &str, kind: &str, key: impl Fn(&Voice) -> &str) -> Voice {
        if let Some(voice) = self.best_match(query, &key, FUZZY_CUTOFF) {
            info!("Selected voice by {} '{}': {}", kind, query, voice);
            return voice.clone();
        }

        warn!("No close {} match for '{}', retrying without cutoff", kind, query);
        if let Some(voice) = self.best_match(query, &key, 0.0) {
            info!("Selected voice by {} (no cutoff) '{}': {}", kind, query, voice);
            return voice.clone();
        }

        let voice = self.first();
        warn!("No voice matches {} '{}', using {}", kind, query, voice);
        voice
    }

    fn best_match(&self, query: &str, key: impl Fn(&Voice) -> &str, cutoff: f32) -> Option<&Voice> {
        let mut best: Option<(&Voice, f32)> = None;
        for voice in &self.voices {
            let score = similarity(query, key(voice));
            if score < cutoff {
                continue;
            }
            // Ties keep the earlier catalog entry
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((voice, score));
            }
        }
        best.map(|(voice, _)| voice)
    }
}

/// Case-insensitive similarity in [0.0, 1.0] from normalized Levenshtein distance
pub fn similarity(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let max_len = a.len().max(b.len());
    1.0 - levenshtein(&a, &b) as f32 / max_len as f32
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
