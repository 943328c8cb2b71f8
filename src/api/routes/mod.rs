pub mod health;
pub mod points;
pub mod snapshots;
pub mod standings;
