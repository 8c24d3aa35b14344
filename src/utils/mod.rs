pub mod ratelimit;

pub use ratelimit::check_cooldown;
