//! Reshaping of raw entity tables into warehouse dimensions and facts.

pub mod dimension;
pub mod fact;

pub use dimension::{
    Dimension, DimensionColumn, map_candidates, map_departments, map_processes, map_users,
    map_vacancies,
};
pub use fact::{FactSources, build_facts};
