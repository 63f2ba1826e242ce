pub mod dispatcher;
pub mod rules;
pub mod source;

pub use dispatcher::{ normalize, ResponseDispatcher };
pub use rules::{ Matcher, Responder, Rule, RuleTable, RulesError };
pub use source::{ Clock, FixedClock, FixedPick, RandomSource, SeededRandom, SystemClock, ThreadRandom };
