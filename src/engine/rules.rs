use super::source::{ Clock, RandomSource };
use serde::{ Deserialize, Serialize };
use thiserror::Error;

pub const SHORT_INPUT_THRESHOLD: usize = 5;

pub const GREETING_REPLY: &str = "Hello! How can I assist you today?";
pub const FAREWELL_REPLY: &str = "Goodbye! It was nice chatting with you. Have a great day!";
pub const WELLBEING_REPLY: &str =
    "I'm doing well, thank you for asking! How can I help you today?";
pub const IDENTITY_REPLY: &str = "I'm a Chat Assistant, here to help you with your questions!";
pub const HELP_REPLY: &str =
    "I can help you with various questions! Try asking me about:\n- Greetings and general conversation\n- Information about topics\n- Or just have a friendly chat!";
pub const WEATHER_REPLY: &str =
    "I don't have access to real-time weather data, but I'd recommend checking a weather service for accurate information!";
pub const THANKS_REPLY: &str = "You're welcome! Is there anything else I can help you with?";
pub const QUESTION_REPLY: &str =
    "That's an interesting question! While I'm a simple rule-based assistant, I'd be happy to discuss general topics. Could you provide more details?";
pub const SHORT_INPUT_REPLY: &str = "Could you please provide more details? I'd love to help!";

pub const DEFAULT_REPLIES: [&str; 5] = [
    "I understand. Could you tell me more about that?",
    "That's interesting! What else would you like to know?",
    "I see. How can I assist you further?",
    "Thanks for sharing! Is there anything specific you'd like help with?",
    "Got it! Feel free to ask me anything else.",
];

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("Rule '{0}' has no patterns")]
    EmptyPatterns(String),
    #[error("Responder for '{0}' has no choices")]
    EmptyChoices(String),
    #[error("Rule table has no rules")]
    NoRules,
}

/// Predicate over normalized (trimmed, lowercased) text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Matcher {
    Prefix { patterns: Vec<String> },
    Contains { patterns: Vec<String> },
    ShorterThan { chars: usize },
}

impl Matcher {
    pub fn prefix(patterns: &[&str]) -> Self {
        Matcher::Prefix { patterns: patterns.iter().map(|p| p.to_string()).collect() }
    }

    pub fn contains(patterns: &[&str]) -> Self {
        Matcher::Contains { patterns: patterns.iter().map(|p| p.to_string()).collect() }
    }

    pub fn matches(&self, normalized: &str) -> bool {
        match self {
            Matcher::Prefix { patterns } => patterns.iter().any(|p| normalized.starts_with(p.as_str())),
            Matcher::Contains { patterns } => patterns.iter().any(|p| normalized.contains(p.as_str())),
            Matcher::ShorterThan { chars } => normalized.chars().count() < *chars,
        }
    }

    fn lowercase_patterns(&mut self) {
        match self {
            Matcher::Prefix { patterns } | Matcher::Contains { patterns } => {
                for p in patterns.iter_mut() {
                    *p = p.to_lowercase();
                }
            }
            Matcher::ShorterThan { .. } => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Responder {
    Fixed { text: String },
    /// Live clock, e.g. "The current time is 3:04:05 PM."
    Time,
    /// Live clock, e.g. "Today's date is 10/18/2026."
    Date,
    Random { choices: Vec<String> },
}

impl Responder {
    pub fn fixed(text: &str) -> Self {
        Responder::Fixed { text: text.to_string() }
    }

    pub fn random(choices: &[&str]) -> Self {
        Responder::Random { choices: choices.iter().map(|c| c.to_string()).collect() }
    }

    pub fn respond(&self, clock: &dyn Clock, random: &dyn RandomSource) -> String {
        match self {
            Responder::Fixed { text } => text.clone(),
            Responder::Time => format!("The current time is {}.", clock.now().format("%-I:%M:%S %p")),
            Responder::Date => format!("Today's date is {}.", clock.now().format("%-m/%-d/%Y")),
            Responder::Random { choices } => {
                // validated non-empty at construction
                choices[random.pick(choices.len())].clone()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub matcher: Matcher,
    pub responder: Responder,
}

impl Rule {
    pub fn new(name: &str, matcher: Matcher, responder: Responder) -> Self {
        Self { name: name.to_string(), matcher, responder }
    }
}

/// Ordered rules plus the reply used when none of them match. Evaluated
/// top to bottom; the first match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    rules: Vec<Rule>,
    fallback: Responder,
}

impl RuleTable {
    pub fn new(mut rules: Vec<Rule>, fallback: Responder) -> Result<Self, RulesError> {
        if rules.is_empty() {
            return Err(RulesError::NoRules);
        }
        for rule in rules.iter_mut() {
            match &rule.matcher {
                Matcher::Prefix { patterns } | Matcher::Contains { patterns } if
                    patterns.is_empty()
                => {
                    return Err(RulesError::EmptyPatterns(rule.name.clone()));
                }
                _ => {}
            }
            if let Responder::Random { choices } = &rule.responder {
                if choices.is_empty() {
                    return Err(RulesError::EmptyChoices(rule.name.clone()));
                }
            }
            rule.matcher.lowercase_patterns();
        }
        if let Responder::Random { choices } = &fallback {
            if choices.is_empty() {
                return Err(RulesError::EmptyChoices("fallback".to_string()));
            }
        }
        Ok(Self { rules, fallback })
    }

    /// Re-runs the constructor checks on a table built by deserialization.
    pub fn validated(self) -> Result<Self, RulesError> {
        Self::new(self.rules, self.fallback)
    }

    pub fn canonical() -> Self {
        let rules = vec![
            Rule::new(
                "greeting",
                Matcher::prefix(
                    &[
                        "hi",
                        "hello",
                        "hey",
                        "greetings",
                        "good morning",
                        "good afternoon",
                        "good evening",
                    ]
                ),
                Responder::fixed(GREETING_REPLY)
            ),
            Rule::new(
                "farewell",
                Matcher::prefix(&["bye", "goodbye", "see you", "farewell", "exit", "quit"]),
                Responder::fixed(FAREWELL_REPLY)
            ),
            Rule::new(
                "wellbeing",
                Matcher::prefix(&["how are you", "how's it going", "how do you do"]),
                Responder::fixed(WELLBEING_REPLY)
            ),
            Rule::new(
                "identity",
                Matcher::contains(&["what is your name", "who are you", "what's your name"]),
                Responder::fixed(IDENTITY_REPLY)
            ),
            Rule::new(
                "help",
                Matcher::prefix(&["help", "what can you do", "what do you do"]),
                Responder::fixed(HELP_REPLY)
            ),
            Rule::new(
                "weather",
                Matcher::contains(&["weather", "temperature", "rain", "sunny"]),
                Responder::fixed(WEATHER_REPLY)
            ),
            Rule::new(
                "time",
                Matcher::contains(&["what time", "current time", "time now"]),
                Responder::Time
            ),
            Rule::new(
                "date",
                Matcher::contains(&["what date", "today's date", "current date"]),
                Responder::Date
            ),
            Rule::new(
                "thanks",
                Matcher::prefix(&["thanks", "thank you", "appreciate it"]),
                Responder::fixed(THANKS_REPLY)
            ),
            Rule::new(
                "question",
                Matcher::prefix(&["what", "who", "where", "when", "why", "how"]),
                Responder::fixed(QUESTION_REPLY)
            ),
            Rule::new(
                "short_input",
                Matcher::ShorterThan { chars: SHORT_INPUT_THRESHOLD },
                Responder::fixed(SHORT_INPUT_REPLY)
            )
        ];

        Self {
            rules,
            fallback: Responder::random(&DEFAULT_REPLIES),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn fallback(&self) -> &Responder {
        &self.fallback
    }

    pub fn first_match(&self, normalized: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matcher.matches(normalized))
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::canonical()
    }
}
