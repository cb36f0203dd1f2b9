pub mod health;
pub mod ws;
