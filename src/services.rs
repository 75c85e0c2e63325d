pub mod access;
pub mod accounts;
pub mod categories;
pub mod content;
pub mod playlists;
pub mod tokens;
pub mod uploads;
pub mod watch_history;
