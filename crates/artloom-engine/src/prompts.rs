use std::fmt;

use rand::seq::SliceRandom;

pub const MAX_PROMPT_CHARS: usize = 500;

pub const SURPRISE_PROMPTS: &[&str] = &[
    "A majestic dragon soaring through storm clouds",
    "Cyberpunk cityscape with neon reflections in rain",
    "Ancient library filled with floating magical books",
    "Underwater palace with bioluminescent coral gardens",
    "Steampunk airship flying over Victorian London",
    "Crystal cave with rainbow light refractions",
    "Futuristic space station orbiting a purple nebula",
    "Enchanted forest with glowing mushrooms and fireflies",
    "Desert oasis with palm trees under starry night sky",
    "Floating islands connected by rainbow bridges",
    "Gothic cathedral made entirely of ice and snow",
    "Mechanical clockwork city with brass gears",
    "Tropical beach on an alien planet with two moons",
    "Medieval castle perched on a floating mountain",
    "Neon-lit Tokyo street during cherry blossom season",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    Empty,
    TooLong { chars: usize, max: usize },
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Please describe the image you want to create"),
            Self::TooLong { chars, max } => {
                write!(f, "Prompt is {chars} characters; keep it under {max}")
            }
        }
    }
}

impl std::error::Error for PromptError {}

/// Caller-side check run before generation. Returns the prompt unmodified.
pub fn validate_prompt(prompt: &str) -> Result<&str, PromptError> {
    if prompt.trim().is_empty() {
        return Err(PromptError::Empty);
    }
    let chars = prompt.chars().count();
    if chars > MAX_PROMPT_CHARS {
        return Err(PromptError::TooLong {
            chars,
            max: MAX_PROMPT_CHARS,
        });
    }
    Ok(prompt)
}

pub fn random_surprise_prompt() -> &'static str {
    SURPRISE_PROMPTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(SURPRISE_PROMPTS[0])
}
