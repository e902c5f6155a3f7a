pub mod job;
pub mod playlist;
pub mod recommendation;
pub mod track;
