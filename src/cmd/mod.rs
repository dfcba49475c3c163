pub mod detect;
pub mod output;
pub mod parse;
pub mod platforms;
