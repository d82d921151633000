pub mod display;
pub mod sound;
pub mod sound_type;
