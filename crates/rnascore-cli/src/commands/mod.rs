pub mod score;
pub mod selftest;
