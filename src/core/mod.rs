pub mod domain;
pub mod kpoints;
pub mod spatial;
pub mod symmetry;
