pub mod classification;
pub mod job;
