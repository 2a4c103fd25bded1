//! Parsers for the pieces of a content file.
//!
//! - `front_matter`: sub-document splitting and YAML front matter
//! - `markdown`: line-level fence/quiz state machine over the body
//! - `quiz`: questions, options and explanations inside a quizdown block

pub mod front_matter;
pub mod markdown;
pub mod quiz;
