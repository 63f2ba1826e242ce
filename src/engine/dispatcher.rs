use super::rules::RuleTable;
use super::source::{ Clock, RandomSource, SystemClock, ThreadRandom };
use log::debug;
use std::sync::Arc;

pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Evaluates a [`RuleTable`] against user input and produces exactly one reply.
///
/// Callers reject whitespace-only input before dispatching; an empty string
/// simply falls through to whatever the table says about short input.
#[derive(Clone)]
pub struct ResponseDispatcher {
    table: Arc<RuleTable>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
}

impl ResponseDispatcher {
    pub fn new(table: RuleTable, clock: Arc<dyn Clock>, random: Arc<dyn RandomSource>) -> Self {
        Self { table: Arc::new(table), clock, random }
    }

    pub fn with_table(table: RuleTable) -> Self {
        Self::new(table, Arc::new(SystemClock), Arc::new(ThreadRandom))
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Same clock and random source, different rules.
    pub fn with_rules(&self, table: RuleTable) -> Self {
        Self {
            table: Arc::new(table),
            clock: Arc::clone(&self.clock),
            random: Arc::clone(&self.random),
        }
    }

    pub fn dispatch(&self, raw_input: &str) -> String {
        let normalized = normalize(raw_input);
        match self.table.first_match(&normalized) {
            Some(rule) => {
                debug!("Dispatch matched rule '{}'", rule.name);
                rule.responder.respond(self.clock.as_ref(), self.random.as_ref())
            }
            None => {
                debug!("Dispatch fell through to default replies");
                self.table.fallback().respond(self.clock.as_ref(), self.random.as_ref())
            }
        }
    }
}

impl Default for ResponseDispatcher {
    fn default() -> Self {
        Self::with_table(RuleTable::canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rules::{
        DEFAULT_REPLIES,
        GREETING_REPLY,
        QUESTION_REPLY,
        SHORT_INPUT_REPLY,
        WELLBEING_REPLY,
    };
    use crate::engine::source::{ FixedClock, FixedPick };
    use chrono::{ DateTime, FixedOffset };

    fn fixed_dispatcher(pick: usize) -> ResponseDispatcher {
        let at = DateTime::<FixedOffset>::parse_from_rfc3339("2026-10-18T15:04:05+02:00").unwrap();
        ResponseDispatcher::new(
            RuleTable::canonical(),
            Arc::new(FixedClock(at)),
            Arc::new(FixedPick(pick))
        )
    }

    #[test]
    fn greetings_get_the_greeting_reply() {
        let dispatcher = ResponseDispatcher::default();
        for input in ["Hello", "hey there", "  HI  ", "Good Morning, bot", "greetings!"] {
            assert_eq!(dispatcher.dispatch(input), GREETING_REPLY, "input {:?}", input);
        }
    }

    #[test]
    fn earlier_rules_shadow_question_words() {
        let dispatcher = ResponseDispatcher::default();
        assert_eq!(dispatcher.dispatch("How are you?"), WELLBEING_REPLY);
        assert_eq!(dispatcher.dispatch("Why is the sky blue?"), QUESTION_REPLY);
    }

    #[test]
    fn short_unmatched_input_asks_for_detail() {
        let dispatcher = ResponseDispatcher::default();
        assert_eq!(dispatcher.dispatch("ok!"), SHORT_INPUT_REPLY);
        assert_eq!(dispatcher.dispatch("  lol "), SHORT_INPUT_REPLY);
    }

    #[test]
    fn unmatched_input_draws_from_default_set() {
        let dispatcher = ResponseDispatcher::default();
        for _ in 0..50 {
            let reply = dispatcher.dispatch("this is a test");
            assert!(DEFAULT_REPLIES.contains(&reply.as_str()), "unexpected reply {:?}", reply);
        }
    }

    #[test]
    fn injected_random_source_pins_the_default_reply() {
        assert_eq!(fixed_dispatcher(3).dispatch("this is a test"), DEFAULT_REPLIES[3]);
        assert_eq!(fixed_dispatcher(0).dispatch("this is a test"), DEFAULT_REPLIES[0]);
    }

    #[test]
    fn time_reply_uses_injected_clock() {
        assert_eq!(fixed_dispatcher(0).dispatch("What time is it?"), "The current time is 3:04:05 PM.");
        assert_eq!(fixed_dispatcher(0).dispatch("current date please"), "Today's date is 10/18/2026.");
    }

    #[test]
    fn time_reply_from_live_clock_has_clock_format() {
        let reply = ResponseDispatcher::default().dispatch("What time is it?");
        let value = reply
            .strip_prefix("The current time is ")
            .and_then(|rest| rest.strip_suffix('.'))
            .expect("time reply shape");
        let (clock, meridiem) = value.split_once(' ').expect("meridiem");
        assert!(meridiem == "AM" || meridiem == "PM");
        let parts: Vec<&str> = clock.split(':').collect();
        assert_eq!(parts.len(), 3);
        let hour: u32 = parts[0].parse().unwrap();
        assert!((1..=12).contains(&hour));
        assert!(parts[1..].iter().all(|p| p.len() == 2 && p.parse::<u32>().unwrap() < 60));
    }
}
