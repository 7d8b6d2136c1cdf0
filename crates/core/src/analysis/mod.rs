pub mod dark_horse;
pub mod narrative;
pub mod pipeline;
pub mod rank;
pub mod scoring;
pub mod sector;
pub mod signals;
