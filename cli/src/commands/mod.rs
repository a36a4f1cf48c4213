pub mod inspect;
pub mod loopback;
pub mod pending;
pub mod recover;
