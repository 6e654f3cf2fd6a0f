//! Safety module root.
//!
//! Single authority over live PWM: the packed armed/law word, the sticky
//! fault bitmask, and the guards evaluated before a law may be armed.

pub mod arm;
pub mod state;
