//! Nāda presets — named carrier pairs with a suggested timbre.

use serde::Serialize;

use crate::params::Timbre;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NadaPreset {
    pub name: &'static str,
    pub left_frequency: f64,
    pub right_frequency: f64,
    pub timbre: Timbre,
    pub description: &'static str,
    /// Solfeggio tone the preset is built around.
    pub solfeggio_base: f64,
}

const fn preset(
    name: &'static str,
    left_frequency: f64,
    right_frequency: f64,
    timbre: Timbre,
    solfeggio_base: f64,
    description: &'static str,
) -> NadaPreset {
    NadaPreset {
        name,
        left_frequency,
        right_frequency,
        timbre,
        description,
        solfeggio_base,
    }
}

pub const PRESETS: [NadaPreset; 12] = [
    preset("Bhumi", 7.83, 11.83, Timbre::Sine, 174.0, "Earth's vibration - Grounding and stability"),
    preset("Pravaha", 174.0, 178.0, Timbre::Sine, 174.0, "Relieves Pain & Stress - Calming and soothing"),
    preset("Shanta", 285.0, 291.0, Timbre::Sine, 285.0, "Heals Tissues & Organs - Restorative energy"),
    preset("Arogya", 396.0, 402.0, Timbre::Square, 396.0, "Eliminates Fear - Courage and confidence"),
    preset("Chapala", 417.0, 423.0, Timbre::Sawtooth, 417.0, "Wipes out Negativity - Cleansing and renewal"),
    preset("Matri", 528.0, 534.0, Timbre::Sine, 528.0, "Repairs DNA, Brings Positive Transformation - Healing and growth"),
    preset("Samatva", 639.0, 645.0, Timbre::Sine, 639.0, "Brings Love & Compassion in Life - Emotional balance"),
    preset("Gupta", 741.0, 747.0, Timbre::Triangle, 741.0, "Detoxifies Cells & Organs - Purification"),
    preset("Jyoti", 852.0, 858.0, Timbre::Square, 852.0, "Awakens Intuition, Raises Energy - Insight and vitality"),
    preset("Tejas", 963.0, 969.0, Timbre::Sine, 963.0, "Connects to Higher Self - Spiritual connection"),
    preset("Sthira", 1074.0, 1080.0, Timbre::Sawtooth, 1074.0, "Consciousness Expansion - Awareness and clarity"),
    preset("Ananta", 1179.0, 1185.0, Timbre::Triangle, 1179.0, "Cosmic Connection - Universal harmony"),
];

/// Case-insensitive lookup by preset name.
pub fn find_preset(name: &str) -> Option<&'static NadaPreset> {
    let name = name.trim();
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}
