pub mod attempt_service;
pub mod leaderboard_service;
pub mod profile_service;
pub mod quiz_service;
pub mod rank_service;
pub mod scoring;
