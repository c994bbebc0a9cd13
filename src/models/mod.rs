pub mod answer;
pub mod attempt;
pub mod choice;
pub mod profile;
pub mod question;
pub mod quiz;
pub mod user;
