pub mod audit;
pub mod availability;
pub mod capacity;
pub mod draft;
pub mod eta;
pub mod publish;
pub mod roster;
pub mod stops;
pub mod validation;
