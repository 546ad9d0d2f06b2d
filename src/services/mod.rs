pub mod export;
pub mod sync;
pub mod token;
pub mod upstream;
