pub mod serve;
pub mod subscribe;
